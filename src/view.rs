//! Filtered and sorted projection of the loaded result set.
//!
//! Everything here is synchronous and side-effect free. [`ViewPipeline`] caches the last
//! projection and recomputes it on every mutation, so callers never see a stale view.

use crate::model::{FilterState, LabelFilter, Post, SortOrder};

/// Apply label, ticker and query filters (in that order), then sort.
pub fn compute_view(posts: &[Post], filter: &FilterState, sort: SortOrder) -> Vec<Post> {
    let query = filter.query.trim().to_lowercase();

    let mut items: Vec<Post> = posts
        .iter()
        .filter(|p| match filter.label {
            LabelFilter::All => true,
            label => p.normalized_label() == label.as_str(),
        })
        .filter(|p| filter.ticker.is_empty() || p.tickers.iter().any(|t| *t == filter.ticker))
        .filter(|p| query.is_empty() || p.title.to_lowercase().contains(&query))
        .cloned()
        .collect();

    // slice::sort_by is stable, so equal scores keep their filtered order.
    match sort {
        SortOrder::ScoreDesc => items.sort_by(|a, b| b.score().total_cmp(&a.score())),
        SortOrder::ScoreAsc => items.sort_by(|a, b| a.score().total_cmp(&b.score())),
        SortOrder::Original => {}
    }

    items
}

/// Sorted, de-duplicated tickers across the whole (unfiltered) result set.
pub fn available_tickers(posts: &[Post]) -> Vec<String> {
    let mut tickers: Vec<String> = posts.iter().flat_map(|p| p.tickers.iter().cloned()).collect();
    tickers.sort();
    tickers.dedup();
    tickers
}

/// Render a compound score for display. A missing score gets a placeholder, not "0.000".
pub fn format_score(compound: Option<f64>) -> String {
    match compound {
        None => "–".to_string(),
        Some(n) if n > 0.0 => format!("+{n:.3}"),
        Some(n) => format!("{n:.3}"),
    }
}

/// Owns the raw result set together with the current filter and sort parameters.
#[derive(Debug, Default)]
pub struct ViewPipeline {
    posts: Vec<Post>,
    filter: FilterState,
    sort: SortOrder,
    view: Vec<Post>,
    tickers: Vec<String>,
}

impl ViewPipeline {
    pub fn new(filter: FilterState, sort: SortOrder) -> Self {
        let mut pipeline = Self {
            filter,
            sort,
            ..Default::default()
        };
        pipeline.recompute();
        pipeline
    }

    /// Replace the whole result set. There is no merge with the previous set.
    pub fn replace_results(&mut self, posts: Vec<Post>) {
        warn_on_duplicate_ids(&posts);
        self.posts = posts;
        self.tickers = available_tickers(&self.posts);
        self.recompute();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.recompute();
    }

    pub fn set_label_filter(&mut self, label: LabelFilter) {
        self.filter.label = label;
        self.recompute();
    }

    pub fn set_ticker_filter(&mut self, ticker: impl Into<String>) {
        self.filter.ticker = ticker.into();
        self.recompute();
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.recompute();
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn view(&self) -> &[Post] {
        &self.view
    }

    pub fn available_tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    fn recompute(&mut self) {
        self.view = compute_view(&self.posts, &self.filter, self.sort);
    }
}

fn warn_on_duplicate_ids(posts: &[Post]) {
    let mut ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    if ids.len() != before {
        tracing::warn!(
            duplicates = before - ids.len(),
            "result set contains duplicate post ids"
        );
    }
}
