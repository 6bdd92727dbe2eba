use clap::Parser;
use estate_scout::boundary::{self, RecoveryAction};
use estate_scout::cli::{execute, App, Cli, Command};
use estate_scout::config::Config;
use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_with_env(&cli.config)?;
    info!("🏠 Estate Scout ({})", config.api.base_url);

    let mut app = App::new(&config)?;
    let storage = app.storage.clone();
    let command = cli.command;

    let outcome = boundary::guard(async move { execute(&mut app, command).await }).await;

    let crash = match outcome {
        Ok(()) => return Ok(()),
        Err(crash) => crash,
    };

    eprintln!("{}", crash);
    eprint!("> ");
    io::stderr().flush()?;

    let mut choice = String::new();
    io::stdin().lock().read_line(&mut choice)?;
    let action = choice.parse::<RecoveryAction>().unwrap_or_else(|e| {
        warn!("{}, returning home", e);
        RecoveryAction::ReturnHome
    });
    let home = async move {
        let mut app = App::new(&config)?;
        execute(&mut app, Command::Home).await
    };
    if let Err(crash) = boundary::recover(action, storage.as_ref(), home).await {
        eprintln!("{}", crash.message);
        std::process::exit(1);
    }
    Ok(())
}
