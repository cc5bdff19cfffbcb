//! JSON and CSV export of the current view.

use crate::job::AnalysisJob;
use crate::model::{DashboardSnapshot, FilterState, Post, SortOrder};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Document written by `--json` and the JSON exports.
#[derive(Debug, Serialize)]
pub struct ViewReport<'a> {
    pub generated_at: String,
    pub advisory: Option<&'a str>,
    pub filter: &'a FilterState,
    pub sort: SortOrder,
    pub job: &'a AnalysisJob,
    pub available_tickers: &'a [String],
    pub total: usize,
    pub shown: usize,
    pub posts: &'a [Post],
}

pub fn build_report(snapshot: &DashboardSnapshot) -> ViewReport<'_> {
    ViewReport {
        generated_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        advisory: snapshot.advisory.as_deref(),
        filter: &snapshot.filter,
        sort: snapshot.sort,
        job: &snapshot.job,
        available_tickers: &snapshot.available_tickers,
        total: snapshot.total,
        shown: snapshot.view.len(),
        posts: &snapshot.view,
    }
}

pub fn export_json(path: &Path, snapshot: &DashboardSnapshot) -> Result<()> {
    let out = serde_json::to_string_pretty(&build_report(snapshot))?;
    std::fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

const CSV_HEADER: &str = "id,title,label,compound,tickers,permalink,emoji_count,caps_ratio,len_tokens";

pub fn export_csv(path: &Path, posts: &[Post]) -> Result<()> {
    std::fs::write(path, render_csv(posts)).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn render_csv(posts: &[Post]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for p in posts {
        let features = p.features.clone().unwrap_or_default();
        let row = [
            csv_field(&p.id),
            csv_field(&p.title),
            csv_field(&p.label),
            p.compound.map(|c| c.to_string()).unwrap_or_default(),
            csv_field(&p.tickers.join(" ")),
            csv_field(p.permalink.as_deref().unwrap_or("")),
            features.emoji_count.map(|v| v.to_string()).unwrap_or_default(),
            features.caps_ratio.map(|v| v.to_string()).unwrap_or_default(),
            features.len_tokens.map(|v| v.to_string()).unwrap_or_default(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Default export location in the current directory, named after the export time.
pub fn default_export_path(extension: &str) -> Result<PathBuf> {
    let stamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
        .replace(':', "-")
        .replace('T', "_");
    let current_dir = std::env::current_dir().context("get current directory")?;
    Ok(current_dir.join(format!("sentiment-view-{stamp}.{extension}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostFeatures;

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            label: "bullish".into(),
            compound: Some(0.5),
            pos: None,
            neu: None,
            neg: None,
            tickers: vec!["AAPL".into(), "MSFT".into()],
            permalink: None,
            features: Some(PostFeatures {
                emoji_count: Some(2),
                caps_ratio: None,
                len_tokens: Some(10),
            }),
        }
    }

    #[test]
    fn csv_quotes_fields_that_need_it() {
        let csv = render_csv(&[post("1", "Buy, \"hold\", sell")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("1,\"Buy, \"\"hold\"\", sell\",bullish,0.5,AAPL MSFT,,2,,10")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn report_counts_shown_and_total() {
        let snapshot = DashboardSnapshot {
            view: vec![post("1", "a")],
            available_tickers: vec!["AAPL".into(), "MSFT".into()],
            total: 4,
            filter: FilterState::default(),
            sort: SortOrder::Original,
            loading: false,
            advisory: Some("demo".into()),
            job: AnalysisJob::default(),
        };
        let v = serde_json::to_value(build_report(&snapshot)).unwrap();
        assert_eq!(v["total"], 4);
        assert_eq!(v["shown"], 1);
        assert_eq!(v["sort"], "original");
        assert_eq!(v["advisory"], "demo");
        assert_eq!(v["job"]["phase"], "idle");
        assert_eq!(v["posts"][0]["tickers"][1], "MSFT");
    }

    #[test]
    fn default_path_is_timestamped() {
        let p = default_export_path("csv").unwrap();
        let name = p.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("sentiment-view-"));
        assert!(name.ends_with(".csv"));
        assert!(!name.contains(':'));
    }
}
