use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go. The TUI owns the terminal, so it logs to a file.
pub(crate) enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "warn,sentiment_dash=debug"
        } else {
            "warn,sentiment_dash=info"
        })
    })
}

/// Default log file for TUI sessions.
pub(crate) fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sentiment-dash")
        .join("sentiment-dash.log")
}

/// Install the global subscriber. Keep the returned guard alive until exit so buffered file
/// output is flushed.
pub(crate) fn init(target: LogTarget, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = default_filter(verbose);
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("install tracing subscriber")?;
            Ok(None)
        }
        LogTarget::File(path) => {
            let (dir, name) = split_log_path(&path)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .try_init()
                .context("install tracing subscriber")?;
            Ok(Some(guard))
        }
    }
}

fn split_log_path(path: &Path) -> Result<(PathBuf, std::ffi::OsString)> {
    let name = path
        .file_name()
        .with_context(|| format!("log path has no file name: {}", path.display()))?
        .to_os_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_splits_into_dir_and_file() {
        let (dir, name) = split_log_path(Path::new("/tmp/x/app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/x"));
        assert_eq!(name, "app.log");

        let (dir, _) = split_log_path(Path::new("app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn default_log_file_lives_in_app_dir() {
        let p = default_log_file();
        assert!(p.ends_with("sentiment-dash/sentiment-dash.log"));
    }
}
