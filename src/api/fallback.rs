use crate::error::FetchError;
use crate::model::{Post, PostFeatures};

/// Fixed demo posts shown when the results endpoint cannot be reached, so the dashboard
/// never renders blank.
pub fn fallback_posts() -> Vec<Post> {
    vec![
        demo(
            "demo-1",
            "HIMS pre earnings run up?",
            "bullish",
            0.7865,
            "HIMS",
            (2, 0.02, 140),
        ),
        demo(
            "demo-2",
            "TSLA margins compressing – adding puts",
            "bearish",
            -0.612,
            "TSLA",
            (0, 0.01, 90),
        ),
        demo(
            "demo-3",
            "AAPL earnings were fine; probably range-bound",
            "neutral",
            0.02,
            "AAPL",
            (0, 0.0, 75),
        ),
    ]
}

/// Advisory shown alongside the fallback data.
pub fn fallback_advisory(err: &FetchError) -> String {
    format!("Could not load sentiment results ({err}). Showing demo data.")
}

fn demo(
    id: &str,
    title: &str,
    label: &str,
    compound: f64,
    ticker: &str,
    (emoji_count, caps_ratio, len_tokens): (u32, f64, u32),
) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        label: label.to_string(),
        compound: Some(compound),
        pos: None,
        neu: None,
        neg: None,
        tickers: vec![ticker.to_string()],
        permalink: Some(format!(
            "https://reddit.com/r/wallstreetbets/comments/{}",
            id.replace('-', "")
        )),
        features: Some(PostFeatures {
            emoji_count: Some(emoji_count),
            caps_ratio: Some(caps_ratio),
            len_tokens: Some(len_tokens),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_is_small_and_uniquely_keyed() {
        let posts = fallback_posts();
        assert_eq!(posts.len(), 3);
        let labels: Vec<_> = posts.iter().map(|p| p.normalized_label()).collect();
        assert_eq!(labels, ["bullish", "bearish", "neutral"]);
        assert_eq!(posts[0].permalink.as_deref(), Some("https://reddit.com/r/wallstreetbets/comments/demo1"));
    }

    #[test]
    fn advisory_mentions_cause() {
        let err = FetchError::Status {
            endpoint: "http://localhost:8000/api/sentiment".into(),
            status: 503,
        };
        assert_eq!(
            fallback_advisory(&err),
            "Could not load sentiment results (http://localhost:8000/api/sentiment returned HTTP 503). Showing demo data."
        );
    }
}
