mod cli;
mod dashboard;
mod engine;
mod error;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod reveal;
mod summary;
#[cfg(test)]
mod testing;
#[cfg(feature = "tui")]
mod tui;
mod validate;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.is_headless() || cfg!(not(feature = "tui"));
    logging::init(args.log_file.as_deref(), is_non_tui)?;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            Err(e)
        }
    }
}
