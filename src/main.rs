//! wallhub: catalog desktop wallpapers, animated images, videos and engine
//! packages.

mod cli;
mod error;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let config = match cli::resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_tracing(cli.log_level.as_deref());
            eprintln!("error: {err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_tracing(config.log_level.as_deref());
    tracing::debug!(library = %config.library.display(), "loaded configuration");

    let mut out = std::io::stdout().lock();
    match cli::run(cli.command, &config, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// applies when no level is configured.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}
