use super::Backend;
use crate::error::{FetchError, JobError};
use crate::model::{ClientConfig, JobStatus, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Results come either as a bare array or wrapped by the API server.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultsBody {
    Bare(Vec<Post>),
    Envelope { sentiment: Vec<Post> },
}

impl ResultsBody {
    fn into_posts(self) -> Vec<Post> {
        match self {
            ResultsBody::Bare(posts) => posts,
            ResultsBody::Envelope { sentiment } => sentiment,
        }
    }
}

/// Client for the sentiment API server.
pub struct HttpBackend {
    client: Client,
    results_url: String,
    analyze_url: String,
    status_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            results_url: cfg.endpoint(&cfg.results_path),
            analyze_url: cfg.endpoint(&cfg.analyze_path),
            status_url: cfg.endpoint(&cfg.status_path),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(|source| FetchError::Transport {
            endpoint: url.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            endpoint: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn load_results(&self) -> Result<Vec<Post>, FetchError> {
        let body: ResultsBody = self.get_json(&self.results_url).await?;
        Ok(body.into_posts())
    }

    async fn start_analysis(&self) -> Result<(), JobError> {
        let resp = self
            .client
            .post(&self.analyze_url)
            .send()
            .await
            .map_err(|e| JobError::Start(format!("Failed to start analysis: {e}")))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        // The body is best effort; an unreadable body falls back to the generic message.
        let body = resp.bytes().await.unwrap_or_default();
        Err(JobError::Start(start_error_message(status, &body)))
    }

    async fn job_status(&self) -> Result<JobStatus, FetchError> {
        self.get_json(&self.status_url).await
    }
}

/// Pick the server's own explanation out of an error body, else a generic message.
fn start_error_message(status: StatusCode, body: &[u8]) -> String {
    let server_msg = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "error", "message"].iter().find_map(|key| {
                v.get(*key)
                    .and_then(|m| m.as_str())
                    .filter(|m| !m.trim().is_empty())
                    .map(str::to_string)
            })
        });
    server_msg.unwrap_or_else(|| format!("Failed to start analysis (HTTP {})", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_error_prefers_detail() {
        let msg = start_error_message(
            StatusCode::CONFLICT,
            br#"{"detail":"Analysis is already running"}"#,
        );
        assert_eq!(msg, "Analysis is already running");
    }

    #[test]
    fn start_error_uses_error_field_from_stub_server() {
        let msg = start_error_message(
            StatusCode::SERVICE_UNAVAILABLE,
            br#"{"error":"Analysis not available in production yet.","message":"Analysis not available"}"#,
        );
        assert_eq!(msg, "Analysis not available in production yet.");
    }

    #[test]
    fn start_error_falls_back_to_generic() {
        assert_eq!(
            start_error_message(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>"),
            "Failed to start analysis (HTTP 500)"
        );
        assert_eq!(
            start_error_message(StatusCode::BAD_GATEWAY, br#"{"detail":"  "}"#),
            "Failed to start analysis (HTTP 502)"
        );
    }

    #[test]
    fn results_body_accepts_both_shapes() {
        let bare: ResultsBody =
            serde_json::from_str(r#"[{"id":"1","title":"AAPL to the moon","label":"bullish","compound":0.5,"tickers":["AAPL"]}]"#)
                .unwrap();
        assert_eq!(bare.into_posts().len(), 1);

        let wrapped: ResultsBody = serde_json::from_str(
            r#"{"sentiment":[{"id":"1","title":"a"},{"id":"2","title":"b"}],"count":2}"#,
        )
        .unwrap();
        let posts = wrapped.into_posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].id, "2");
    }

    /// Serve canned responses by request path until the test ends. One connection per request.
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let mut req = Vec::new();
                let mut buf = [0u8; 1024];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => req.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&req);
                let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, s, b)| (*s, *b))
                    .unwrap_or((404, ""));
                let resp = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn non_success_results_become_status_errors() {
        let base = serve(vec![("/api/sentiment", 409, r#"{"detail":"busy"}"#)]).await;
        let backend = HttpBackend::new(&crate::cli::test_config(&base)).unwrap();
        let err = backend.load_results().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 409, .. }), "{err}");
        assert_eq!(err.to_string(), format!("{base}/api/sentiment returned HTTP 409"));
    }

    #[tokio::test]
    async fn bare_array_results_decode_to_posts() {
        let base = serve(vec![(
            "/api/sentiment",
            200,
            r#"[{"id":"1","title":"AAPL to the moon","label":"bullish","compound":0.5,"tickers":["AAPL"]}]"#,
        )])
        .await;
        let backend = HttpBackend::new(&crate::cli::test_config(&base)).unwrap();
        let posts = backend.load_results().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].tickers, ["AAPL"]);
        assert_eq!(posts[0].compound, Some(0.5));
    }

    #[tokio::test]
    async fn rejected_start_carries_server_detail() {
        let base = serve(vec![(
            "/api/analyze",
            409,
            r#"{"detail":"Analysis is already running"}"#,
        )])
        .await;
        let backend = HttpBackend::new(&crate::cli::test_config(&base)).unwrap();
        match backend.start_analysis().await {
            Err(JobError::Start(msg)) => assert_eq!(msg, "Analysis is already running"),
            other => panic!("unexpected start result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_without_is_running_is_a_decode_error() {
        let base = serve(vec![
            ("/api/status", 200, r#"{"error":null,"last_run":null}"#),
            ("/api/analyze", 202, r#"{"status":"started"}"#),
        ])
        .await;
        let backend = HttpBackend::new(&crate::cli::test_config(&base)).unwrap();
        backend.start_analysis().await.unwrap();
        let err = backend.job_status().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "{err}");
        assert!(err.to_string().contains("missing field `is_running`"), "{err}");
    }

    #[test]
    fn urls_are_built_from_config() {
        let cfg = crate::cli::test_config("http://127.0.0.1:8000");
        let backend = HttpBackend::new(&cfg).unwrap();
        assert_eq!(backend.results_url, "http://127.0.0.1:8000/api/sentiment");
        assert_eq!(backend.analyze_url, "http://127.0.0.1:8000/api/analyze");
        assert_eq!(backend.status_url, "http://127.0.0.1:8000/api/status");
    }
}
