use crate::api::HttpBackend;
use crate::model::{ClientConfig, FilterState, LabelFilter, PollPolicy, SortOrder};
use crate::orchestrator::{self, DashboardController};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sentiment-dash",
    version,
    about = "Sentiment dashboard for ticker posts with backend re-analysis"
)]
pub struct Cli {
    /// Base URL of the sentiment API server
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Path of the results endpoint
    #[arg(long, default_value = "/api/sentiment")]
    pub results_path: String,

    /// Path of the job-start endpoint
    #[arg(long, default_value = "/api/analyze")]
    pub analyze_path: String,

    /// Path of the job-status endpoint
    #[arg(long, default_value = "/api/status")]
    pub status_path: String,

    /// Timeout for each HTTP request
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Print the view as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text listing and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Start a backend analysis first and wait for it (with --json or --text)
    #[arg(long)]
    pub analyze: bool,

    /// Case-insensitive substring to match against titles
    #[arg(long, default_value = "")]
    pub query: String,

    /// Only show posts with this label
    #[arg(long, value_enum, default_value_t = LabelFilter::All)]
    pub label: LabelFilter,

    /// Only show posts mentioning this ticker (exact match)
    #[arg(long, default_value = "")]
    pub ticker: String,

    /// Sort order
    #[arg(long, value_enum, default_value_t = SortOrder::ScoreDesc)]
    pub sort: SortOrder,

    /// Export the view as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Export the view as CSV
    #[arg(long)]
    pub export_csv: Option<std::path::PathBuf>,

    /// Log file for the TUI (headless modes log to stderr)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text
    }

    pub fn initial_filter(&self) -> FilterState {
        FilterState {
            query: self.query.clone(),
            label: self.label,
            ticker: self.ticker.clone(),
        }
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        results_path: args.results_path.clone(),
        analyze_path: args.analyze_path.clone(),
        status_path: args.status_path.clone(),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("sentiment-dash/{}", env!("CARGO_PKG_VERSION")),
        poll: PollPolicy::default(),
    }
}

/// Build a controller talking to the configured backend.
pub(crate) fn build_controller(args: &Cli) -> Result<DashboardController> {
    let cfg = build_config(args);
    let backend = HttpBackend::new(&cfg).context("create backend client")?;
    tracing::info!(base_url = %cfg.base_url, "using backend");
    Ok(DashboardController::new(
        Arc::new(backend),
        cfg.poll,
        args.initial_filter(),
        args.sort,
    ))
}

pub async fn run(args: Cli) -> Result<()> {
    if args.analyze && !args.is_headless() {
        return Err(anyhow::anyhow!(
            "--analyze is only for --json or --text; press 'a' in the dashboard instead."
        ));
    }

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args).await;
        }
    }

    run_headless(args).await
}

/// Load, optionally run an analysis job to completion, then print and export the view.
async fn run_headless(args: Cli) -> Result<()> {
    let mut controller = build_controller(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();

    controller.request_load();
    controller.drive_until_idle().await;

    if args.analyze {
        let _ = out_tx.send(OutputLine::Stderr("Starting analysis…".into()));
        controller
            .request_analysis()
            .context("could not start analysis")?;
        controller.drive_until_idle().await;
        tracing::info!(phase = ?controller.job().phase, polls = controller.job().polls, "analysis settled");
    }

    let snapshot = controller.snapshot();
    controller.teardown();

    let processed = orchestrator::process_view_output(&args, &snapshot);
    for msg in processed.export_messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }
    if let Some(msg) = processed.job_message.as_ref() {
        let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
    }

    if args.json {
        let out = serde_json::to_string_pretty(&crate::export::build_report(&snapshot))?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        if let Some(advisory) = snapshot.advisory.as_deref() {
            tracing::warn!("{advisory}");
        }
        let summary = crate::text_summary::build_text_summary(&snapshot);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    if args.analyze && snapshot.job.phase != crate::model::JobPhase::Succeeded {
        return Err(anyhow::anyhow!(
            "analysis did not succeed: {}",
            snapshot
                .job
                .error_message
                .as_deref()
                .unwrap_or("unknown error")
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> ClientConfig {
    let args = Cli::parse_from(["sentiment-dash", "--base-url", base_url]);
    build_config(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_routes_and_poll_constants() {
        let cfg = test_config("http://localhost:8000");
        assert_eq!(cfg.results_path, "/api/sentiment");
        assert_eq!(cfg.analyze_path, "/api/analyze");
        assert_eq!(cfg.status_path, "/api/status");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.poll.interval, Duration::from_secs(2));
        assert_eq!(cfg.poll.max_polls, 150);
    }

    #[test]
    fn filter_flags_parse() {
        let args = Cli::parse_from([
            "sentiment-dash",
            "--text",
            "--query",
            "moon",
            "--label",
            "bearish",
            "--ticker",
            "TSLA",
            "--sort",
            "recent",
        ]);
        assert!(args.is_headless());
        let f = args.initial_filter();
        assert_eq!(f.query, "moon");
        assert_eq!(f.label, LabelFilter::Bearish);
        assert_eq!(f.ticker, "TSLA");
        assert_eq!(args.sort, SortOrder::Original);
    }

    #[tokio::test]
    async fn analyze_requires_headless_mode() {
        let args = Cli::parse_from(["sentiment-dash", "--analyze"]);
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("--analyze"));
    }
}
