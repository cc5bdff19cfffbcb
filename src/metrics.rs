use crate::model::Post;
use serde::Serialize;

/// Compute metrics (mean, median, 25th percentile, 75th percentile) from samples
pub fn compute_metrics(samples: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
    pub other: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
}

impl SentimentSummary {
    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral + self.other
    }
}

/// Label distribution and score statistics for a set of posts. Missing scores count as 0.
pub fn summarize(posts: &[Post]) -> SentimentSummary {
    let mut summary = SentimentSummary::default();
    for p in posts {
        match p.display_label().as_str() {
            "bullish" => summary.bullish += 1,
            "bearish" => summary.bearish += 1,
            "neutral" => summary.neutral += 1,
            _ => summary.other += 1,
        }
    }
    let scores: Vec<f64> = posts.iter().map(Post::score).collect();
    if let Some((mean, median, p25, p75)) = compute_metrics(&scores) {
        summary.mean = Some(mean);
        summary.median = Some(median);
        summary.p25 = Some(p25);
        summary.p75 = Some(p75);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(label: &str, compound: Option<f64>) -> Post {
        Post {
            id: label.into(),
            title: String::new(),
            label: label.into(),
            compound,
            pos: None,
            neu: None,
            neg: None,
            tickers: Vec::new(),
            permalink: None,
            features: None,
        }
    }

    #[test]
    fn needs_two_samples() {
        assert_eq!(compute_metrics(&[1.0]), None);
        assert_eq!(
            compute_metrics(&[4.0, 1.0, 3.0, 2.0]),
            Some((2.5, 3.0, 2.0, 4.0))
        );
    }

    #[test]
    fn summary_counts_labels_and_scores() {
        let s = summarize(&[
            post("Bullish", Some(0.5)),
            post("bearish", Some(-0.5)),
            post("", None),
            post("yolo", Some(1.0)),
        ]);
        assert_eq!((s.bullish, s.bearish, s.neutral, s.other), (1, 1, 1, 1));
        assert_eq!(s.total(), 4);
        assert_eq!(s.mean, Some(0.25));
    }

    #[test]
    fn single_post_has_no_score_stats() {
        let s = summarize(&[post("bullish", Some(0.3))]);
        assert_eq!(s.bullish, 1);
        assert_eq!(s.mean, None);
    }
}
