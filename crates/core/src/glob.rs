/// Match a model name against a grant pattern.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one character; everything else matches literally and case-sensitively.
/// Works on `char`s so `?` never splits a multi-byte character.
///
/// - `"llama-*"` grants `"llama-3-70b"`
/// - `"*-embed"` grants `"nomic-embed"`
/// - `"bge-?"` grants `"bge-m"` but not `"bge-m3"`
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Position of the most recent `*` and the name index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    // Let the star swallow one more character.
                    backtrack = Some((star, tried + 1));
                    p = star + 1;
                    n = tried + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(glob_match("llama-3-8b", "llama-3-8b"));
        assert!(!glob_match("llama-3-8b", "llama-3-70b"));
        assert!(!glob_match("llama", "Llama"));
    }

    #[test]
    fn test_trailing_star() {
        assert!(glob_match("llama-*", "llama-3-70b"));
        assert!(glob_match("llama-*", "llama-"));
        assert!(!glob_match("llama-*", "mistral-7b"));
    }

    #[test]
    fn test_leading_and_inner_star() {
        assert!(glob_match("*-embed", "nomic-embed"));
        assert!(!glob_match("*-embed", "nomic-embed-v2"));
        assert!(glob_match("*embed*", "nomic-embed-v2"));
        assert!(glob_match("q*-*-instruct", "qwen2-7b-instruct"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("bge-?", "bge-m"));
        assert!(!glob_match("bge-?", "bge-m3"));
        assert!(glob_match("bge-??", "bge-m3"));
        assert!(glob_match("模型-?", "模型-甲"));
    }

    #[test]
    fn test_star_alone_and_empty() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*", ""));
        assert!(glob_match("**", ""));
        assert!(glob_match("", ""));
        assert!(!glob_match("", "m"));
    }
}
