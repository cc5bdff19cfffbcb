//! Backend access: results, job start and job status.

mod fallback;
mod http;

pub use fallback::{fallback_advisory, fallback_posts};
pub use http::HttpBackend;

use crate::error::{FetchError, JobError};
use crate::model::{JobStatus, Post};
use async_trait::async_trait;

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Fetch the current result set.
    async fn load_results(&self) -> Result<Vec<Post>, FetchError>;

    /// Ask the backend to start an analysis job. Any failure is a [`JobError::Start`].
    async fn start_analysis(&self) -> Result<(), JobError>;

    async fn job_status(&self) -> Result<JobStatus, FetchError>;
}
