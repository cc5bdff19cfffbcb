mod api;
mod cli;
mod error;
mod export;
mod job;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
mod view;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless() || !cfg!(feature = "tui");

    let target = if is_headless {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File(args.log_file.clone().unwrap_or_else(logging::default_log_file))
    };
    // Flushes buffered file output on drop.
    let _log_guard = logging::init(target, args.verbose)?;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "exiting with error");
            Err(e)
        }
    }
}
