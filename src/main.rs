// ABOUTME: Entry point for the sitepush CLI application.
// ABOUTME: Parses arguments, installs logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use sitepush::error::{Error, Result};
use sitepush::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // -v forces debug; otherwise RUST_LOG wins over the warn default
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(OutputMode::from_flags(cli.quiet, cli.json));

    // Dropping the command future on Ctrl-C runs its cleanup guards.
    let result = tokio::select! {
        result = run(cli.command, &mut output) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
    };

    if let Err(e) = result {
        if e.is_cancelled() {
            output.line("Cancelled, nothing was changed.");
        } else {
            output.error(&e.to_string());
            output.hints(&e.remediation());
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands, output: &mut Output) -> Result<()> {
    match command {
        Commands::Init { bucket, force } => commands::init(bucket.as_deref(), force, output),
        Commands::Deploy {
            config,
            version,
            delete,
            dry_run,
            yes,
        } => {
            let options = commands::DeployOptions {
                version,
                delete,
                dry_run,
                yes,
            };
            commands::deploy(&config, options, output).await
        }
        Commands::Rollback {
            config,
            to,
            apply,
            yes,
        } => commands::rollback(&config, to.as_deref(), apply, yes, output).await,
        Commands::Releases { config } => commands::releases(&config, output).await,
        Commands::Status { config } => commands::status(&config, output).await,
    }
}
