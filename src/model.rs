use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint and transport settings for one backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub results_path: String,
    pub analyze_path: String,
    pub status_path: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub poll: PollPolicy,
}

impl ClientConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Status polling cadence for an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

/// 150 polls at 2 seconds: the backend script itself gives up after 5 minutes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_POLLS: u32 = 150;

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_polls: MAX_POLLS,
        }
    }
}

/// Lexical features extracted by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len_tokens: Option<u32>,
}

/// One analyzed post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neg: Option<f64>,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<PostFeatures>,
}

impl Post {
    /// Lowercased label used for filter comparisons.
    pub fn normalized_label(&self) -> String {
        self.label.to_lowercase()
    }

    /// Label shown to the user; an empty label renders as neutral.
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            "neutral".to_string()
        } else {
            self.normalized_label()
        }
    }

    /// Score used for ordering; a missing score counts as exactly 0.
    pub fn score(&self) -> f64 {
        self.compound.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LabelFilter {
    #[default]
    All,
    Bullish,
    Bearish,
    Neutral,
}

impl LabelFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelFilter::All => "all",
            LabelFilter::Bullish => "bullish",
            LabelFilter::Bearish => "bearish",
            LabelFilter::Neutral => "neutral",
        }
    }

    pub fn next(self) -> Self {
        match self {
            LabelFilter::All => LabelFilter::Bullish,
            LabelFilter::Bullish => LabelFilter::Bearish,
            LabelFilter::Bearish => LabelFilter::Neutral,
            LabelFilter::Neutral => LabelFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    ScoreDesc,
    ScoreAsc,
    /// Order as received. The results carry no timestamps, so "recent" means the same thing.
    #[value(alias = "recent")]
    #[serde(alias = "recent")]
    Original,
}

impl SortOrder {
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::ScoreDesc => "Score: High → Low",
            SortOrder::ScoreAsc => "Score: Low → High",
            SortOrder::Original => "Original order",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortOrder::ScoreDesc => SortOrder::ScoreAsc,
            SortOrder::ScoreAsc => SortOrder::Original,
            SortOrder::Original => SortOrder::ScoreDesc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
    pub label: LabelFilter,
    /// Empty means no ticker filter.
    pub ticker: String,
}

/// Body of the job-status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub is_running: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub posts_count: Option<u64>,
    #[serde(default)]
    pub sentiment_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, JobPhase::Starting | JobPhase::Running)
    }
}

/// Snapshot of controller state handed to presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub view: Vec<Post>,
    pub available_tickers: Vec<String>,
    pub total: usize,
    pub filter: FilterState,
    pub sort: SortOrder,
    pub loading: bool,
    pub advisory: Option<String>,
    pub job: crate::job::AnalysisJob,
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    Snapshot(Box<DashboardSnapshot>),
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoEvent {
    AnalysisRejected,
    AnalysisStarted,
    AnalysisFinished(JobPhase),
    Reloaded { count: usize },
    FallbackData,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::AnalysisRejected => "Analysis already in progress".to_string(),
            InfoEvent::AnalysisStarted => "Analysis started, polling status…".to_string(),
            InfoEvent::AnalysisFinished(phase) => match phase {
                JobPhase::Succeeded => "Analysis complete, reloading results".to_string(),
                JobPhase::Failed => "Analysis failed".to_string(),
                JobPhase::TimedOut => "Analysis timed out".to_string(),
                other => format!("Analysis {other:?}"),
            },
            InfoEvent::Reloaded { count } => format!("Loaded {count} post(s)"),
            InfoEvent::FallbackData => "Backend unreachable, showing demo data".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_decodes_with_optional_fields_missing() {
        let p: Post = serde_json::from_str(r#"{"id":"1","title":"t","label":"Bullish"}"#).unwrap();
        assert!(p.tickers.is_empty());
        assert_eq!(p.compound, None);
        assert_eq!(p.score(), 0.0);
        assert_eq!(p.normalized_label(), "bullish");
    }

    #[test]
    fn empty_label_displays_as_neutral_but_does_not_normalize_to_it() {
        let p: Post = serde_json::from_str(r#"{"id":"1","title":"t"}"#).unwrap();
        assert_eq!(p.normalized_label(), "");
        assert_eq!(p.display_label(), "neutral");
    }

    #[test]
    fn sort_order_accepts_recent_alias() {
        let s: SortOrder = serde_json::from_str(r#""recent""#).unwrap();
        assert_eq!(s, SortOrder::Original);
    }

    #[test]
    fn status_decodes_backend_shape() {
        let s: JobStatus = serde_json::from_str(
            r#"{"is_running":false,"last_run":null,"error":"API not available","posts_count":0,"sentiment_count":0}"#,
        )
        .unwrap();
        assert!(!s.is_running);
        assert_eq!(s.error.as_deref(), Some("API not available"));
        assert_eq!(s.last_run, None);
    }

    #[test]
    fn endpoint_joins_slashes() {
        let cfg = ClientConfig {
            base_url: "http://localhost:8000/".into(),
            results_path: "/api/sentiment".into(),
            analyze_path: "api/analyze".into(),
            status_path: "/api/status".into(),
            request_timeout: Duration::from_secs(1),
            user_agent: "t".into(),
            poll: PollPolicy::default(),
        };
        assert_eq!(
            cfg.endpoint(&cfg.results_path),
            "http://localhost:8000/api/sentiment"
        );
        assert_eq!(
            cfg.endpoint(&cfg.analyze_path),
            "http://localhost:8000/api/analyze"
        );
    }
}
