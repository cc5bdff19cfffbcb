use thiserror::Error;

/// Failure talking to one of the backend endpoints.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reasons an analysis job ends without success, or is refused.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Analysis is already running")]
    AlreadyRunning,

    #[error("Dashboard is shutting down")]
    Closed,

    /// Start request rejected; message comes from the server when it sent one.
    #[error("{0}")]
    Start(String),

    /// Status poll reported an error.
    #[error("{0}")]
    Runtime(String),

    #[error("Analysis timed out after 5 minutes")]
    Timeout,

    #[error("Status check failed: {0}")]
    Status(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            JobError::Timeout.to_string(),
            "Analysis timed out after 5 minutes"
        );
        assert_eq!(JobError::Runtime("boom".into()).to_string(), "boom");
        let e = JobError::from(FetchError::Status {
            endpoint: "http://x/api/status".into(),
            status: 502,
        });
        assert_eq!(
            e.to_string(),
            "Status check failed: http://x/api/status returned HTTP 502"
        );
    }
}
