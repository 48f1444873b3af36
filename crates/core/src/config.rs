use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use notify::{RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ─── Config ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    /// Host name used to address backends when a request has no Host header.
    pub server_name: String,
    /// `ip:port` of the operational listener (health, metrics, config).
    /// `null` disables it.
    pub admin_listen: Option<String>,

    // Request body size limit (MB)
    pub body_limit_mb: usize,

    // Logging
    pub logging_to_file: bool,
    pub log_dir: Option<String>,
    pub log_format: LogFormat,

    // Egress proxy for backend calls
    pub proxy_url: Option<String>,

    pub backend: BackendConfig,
    pub entitlements: EntitlementsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            server_name: "localhost".to_string(),
            admin_listen: Some("127.0.0.1:9090".to_string()),
            body_limit_mb: 10,
            logging_to_file: false,
            log_dir: None,
            log_format: LogFormat::Text,
            proxy_url: None,
            backend: BackendConfig::default(),
            entitlements: EntitlementsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file, sanitize, and validate.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse, sanitize and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let mut config: Config = serde_yaml_ng::from_str(contents)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(self.port != 0, "port must be non-zero");
        anyhow::ensure!(self.body_limit_mb > 0, "body-limit-mb must be greater than zero");
        anyhow::ensure!(
            self.backend.request_timeout > 0,
            "backend.request-timeout must be greater than zero"
        );
        anyhow::ensure!(
            !self.server_name.is_empty(),
            "server-name must not be empty"
        );
        if let Some(ref admin) = self.admin_listen {
            admin
                .parse::<std::net::SocketAddr>()
                .map_err(|e| anyhow::anyhow!("invalid admin-listen '{admin}': {e}"))?;
        }
        if let Some(ref proxy) = self.proxy_url {
            crate::proxy::validate_proxy_url(proxy)?;
        }
        if self.entitlements.mode == EntitlementMode::Remote {
            let url = self
                .entitlements
                .remote
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("entitlements.remote.url is required in remote mode"))?;
            let parsed = url::Url::parse(url)
                .map_err(|e| anyhow::anyhow!("invalid entitlements.remote.url '{url}': {e}"))?;
            anyhow::ensure!(
                matches!(parsed.scheme(), "http" | "https"),
                "entitlements.remote.url must use http or https, got '{}'",
                parsed.scheme()
            );
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        sanitize_keys(&mut self.entitlements.keys);
        if let Some(ref mut url) = self.entitlements.remote.url {
            while url.ends_with('/') {
                url.pop();
            }
        }
        self.server_name = self.server_name.trim().to_string();
    }

    /// Body size limit in bytes.
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

/// Remove entries with empty keys and drop duplicates (first entry wins).
fn sanitize_keys(entries: &mut Vec<ApiKeyEntry>) {
    for entry in entries.iter_mut() {
        entry.key = entry.key.trim().to_string();
    }
    entries.retain(|e| !e.key.is_empty());

    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.key.clone()));
}

// ─── Sub-configs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BackendConfig {
    /// Seconds.
    pub connect_timeout: u64,
    /// Seconds. Bounds every forwarded call.
    pub request_timeout: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct EntitlementsConfig {
    pub mode: EntitlementMode,
    pub keys: Vec<ApiKeyEntry>,
    pub remote: RemoteEntitlementsConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EntitlementMode {
    #[default]
    Static,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiKeyEntry {
    pub key: String,
    /// Caller identity reported in logs.
    #[serde(default)]
    pub user: Option<String>,
    /// Glob patterns of completion models this key may use.
    #[serde(default)]
    pub completion_models: Vec<String>,
    /// Glob patterns of embedding models this key may use.
    #[serde(default)]
    pub embedding_models: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RemoteEntitlementsConfig {
    pub url: Option<String>,
    /// Seconds.
    pub timeout: u64,
}

impl Default for RemoteEntitlementsConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: 5,
        }
    }
}

// ─── Config Watcher ────────────────────────────────────────────────────────

pub struct ConfigWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl ConfigWatcher {
    /// Watch a config file. On changes (debounced 150ms, SHA256 dedup),
    /// reload the config and atomically swap it in via ArcSwap.
    pub fn start(
        path: String,
        config: Arc<ArcSwap<Config>>,
        on_reload: impl Fn(&Config) + Send + Sync + 'static,
    ) -> Result<Self, anyhow::Error> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(16);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res
                && (event.kind.is_modify() || event.kind.is_create())
            {
                let _ = tx.blocking_send(());
            }
        })?;
        watcher.watch(Path::new(&path), RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            let mut last_hash: Option<[u8; 32]> = std::fs::read(&path)
                .ok()
                .map(|c| sha2::Sha256::digest(&c).into());
            let mut debounce: Option<tokio::time::Instant> = None;

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        if msg.is_none() {
                            break;
                        }
                        debounce = Some(tokio::time::Instant::now() + Duration::from_millis(150));
                    }
                    _ = async {
                        match debounce {
                            Some(deadline) => tokio::time::sleep_until(deadline).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        debounce = None;
                        let contents = match std::fs::read(&path) {
                            Ok(c) => c,
                            Err(e) => {
                                tracing::error!("Config file read failed: {e}");
                                continue;
                            }
                        };
                        let hash: [u8; 32] = sha2::Sha256::digest(&contents).into();
                        if last_hash.as_ref() == Some(&hash) {
                            continue;
                        }
                        last_hash = Some(hash);

                        match Config::load(&path) {
                            Ok(new_cfg) => {
                                tracing::info!("Configuration reloaded from {path}");
                                on_reload(&new_cfg);
                                config.store(Arc::new(new_cfg));
                            }
                            Err(e) => tracing::error!("Config reload failed: {e}"),
                        }
                    }
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.server_name, "localhost");
        assert_eq!(cfg.admin_listen.as_deref(), Some("127.0.0.1:9090"));
        assert_eq!(cfg.body_limit_mb, 10);
        assert_eq!(cfg.backend.request_timeout, 60);
        assert_eq!(cfg.backend.connect_timeout, 10);
        assert_eq!(cfg.entitlements.mode, EntitlementMode::Static);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert!(cfg.entitlements.keys.is_empty());
    }

    #[test]
    fn test_yaml_deserialization() {
        let yaml = r#"
host: "127.0.0.1"
port: 9000
server-name: gateway.internal
log-format: json
backend:
  request-timeout: 30
entitlements:
  mode: static
  keys:
    - key: "sk-team-a"
      user: team-a
      completion-models: ["llama-*"]
      embedding-models: ["bge-*"]
      expires-at: "2030-01-01T00:00:00Z"
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.server_name, "gateway.internal");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.backend.request_timeout, 30);
        assert_eq!(cfg.backend.connect_timeout, 10);
        assert_eq!(cfg.entitlements.keys.len(), 1);
        let key = &cfg.entitlements.keys[0];
        assert_eq!(key.user.as_deref(), Some("team-a"));
        assert_eq!(key.completion_models, vec!["llama-*"]);
        assert_eq!(key.embedding_models, vec!["bge-*"]);
        assert!(key.expires_at.is_some());
    }

    #[test]
    fn test_sanitize_keys() {
        let yaml = r#"
entitlements:
  keys:
    - key: " sk-1 "
      completion-models: ["a"]
    - key: ""
    - key: "sk-1"
      completion-models: ["b"]
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.entitlements.keys.len(), 1);
        assert_eq!(cfg.entitlements.keys[0].key, "sk-1");
        assert_eq!(cfg.entitlements.keys[0].completion_models, vec!["a"]);
    }

    #[test]
    fn test_remote_mode_requires_url() {
        let err = Config::from_yaml("entitlements:\n  mode: remote\n").unwrap_err();
        assert!(err.to_string().contains("remote.url"));

        let err = Config::from_yaml(
            "entitlements:\n  mode: remote\n  remote:\n    url: ftp://authz\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let cfg = Config::from_yaml(
            "entitlements:\n  mode: remote\n  remote:\n    url: http://authz.internal/check/\n",
        )
        .unwrap();
        assert_eq!(
            cfg.entitlements.remote.url.as_deref(),
            Some("http://authz.internal/check")
        );
        assert_eq!(cfg.entitlements.remote.timeout, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(Config::from_yaml("port: 0\n").is_err());
        assert!(Config::from_yaml("backend:\n  request-timeout: 0\n").is_err());
        assert!(Config::from_yaml("proxy-url: ftp://proxy:21\n").is_err());
        assert!(Config::from_yaml("body-limit-mb: 0\n").is_err());
        assert!(Config::from_yaml("admin-listen: localhost\n").is_err());
    }

    #[test]
    fn test_admin_listener_can_be_disabled() {
        let cfg = Config::from_yaml("admin-listen: null\n").unwrap();
        assert!(cfg.admin_listen.is_none());
        let cfg = Config::from_yaml("admin-listen: \"0.0.0.0:9191\"\n").unwrap();
        assert_eq!(cfg.admin_listen.as_deref(), Some("0.0.0.0:9191"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: 9100\n").unwrap();
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.port, 9100);
        assert!(Config::load(dir.path().join("missing.yaml").to_str().unwrap()).is_err());
    }
}
