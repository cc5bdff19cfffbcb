//! Text summary builder for CLI output.
//!
//! This module formats the derived view and its statistics as human-readable lines for text mode.

use crate::metrics;
use crate::model::DashboardSnapshot;
use crate::view::format_score;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a settled snapshot.
pub(crate) fn build_text_summary(snapshot: &DashboardSnapshot) -> TextSummary {
    let mut lines = Vec::new();

    if let Some(advisory) = snapshot.advisory.as_deref() {
        lines.push(format!("! {advisory}"));
    }

    let f = &snapshot.filter;
    let mut active = Vec::new();
    if !f.query.trim().is_empty() {
        active.push(format!("query \"{}\"", f.query.trim()));
    }
    if f.label.as_str() != "all" {
        active.push(format!("label {}", f.label.as_str()));
    }
    if !f.ticker.is_empty() {
        active.push(format!("ticker {}", f.ticker));
    }
    lines.push(format!(
        "Showing {} of {} post(s){} · {}",
        snapshot.view.len(),
        snapshot.total,
        if active.is_empty() {
            String::new()
        } else {
            format!(" ({})", active.join(", "))
        },
        snapshot.sort.label()
    ));

    if snapshot.view.is_empty() {
        lines.push("No posts match your filters.".to_string());
    }
    for p in &snapshot.view {
        let tickers = if p.tickers.is_empty() {
            String::new()
        } else {
            format!(" ({})", p.tickers.join(", "))
        };
        lines.push(format!(
            "[{:<7}] {:>6}  {}{}",
            p.display_label(),
            format_score(p.compound),
            p.title,
            tickers
        ));
    }

    let s = metrics::summarize(&snapshot.view);
    lines.push(format!(
        "Labels: {} bullish / {} bearish / {} neutral / {} other",
        s.bullish, s.bearish, s.neutral, s.other
    ));
    if let (Some(mean), Some(median), Some(p25), Some(p75)) = (s.mean, s.median, s.p25, s.p75) {
        lines.push(format!(
            "Score: avg {mean:+.3} med {median:+.3} p25 {p25:+.3} p75 {p75:+.3}"
        ));
    }

    TextSummary { lines }
}
