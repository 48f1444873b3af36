mod app;
mod cli;

use clap::Parser;
use cli::{CheckArgs, Cli, Command, RunArgs};
use model_gateway_core::config::Config;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = app::load_config(&args)?;

    let _guard = model_gateway_core::lifecycle::logging::init_logging(
        &args.log_level,
        config.log_format,
        config.logging_to_file,
        config.log_dir.as_deref(),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let application = app::Application::build(config, &args)?;
        application.serve().await
    })
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    println!(
        "{}: ok ({:?} entitlements, {} static keys, listening on {}:{})",
        args.config,
        config.entitlements.mode,
        config.entitlements.keys.len(),
        config.host,
        config.port,
    );
    Ok(())
}
