use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    clip::{Clip, ClipSubmission},
    ClipSyncError, Result, HTTP_TIMEOUT_SECS,
};

/// Remote side of the sync: wherever the latest clip lives.
#[async_trait]
pub trait ClipRemote: Send + Sync {
    /// Submits a clip, replacing the remote latest.
    async fn push(&self, submission: &ClipSubmission) -> Result<()>;

    /// Fetches the remote latest, `None` when nothing was submitted yet.
    async fn latest(&self) -> Result<Option<Clip>>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for a clipboard server.
#[derive(Debug, Clone)]
pub struct ClipClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClipClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(HTTP_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ClipRemote for ClipClient {
    async fn push(&self, submission: &ClipSubmission) -> Result<()> {
        let url = format!("{}/clip", self.base_url);
        let response = self.http.post(&url).json(submission).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!("Pushed clip to {}", url);
            return Ok(());
        }

        if status.is_client_error() {
            let reason = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("Server responded with {status}"),
            };
            return Err(ClipSyncError::MalformedRequest(reason));
        }

        Err(ClipSyncError::Network(format!(
            "Server responded with {status}"
        )))
    }

    async fn latest(&self) -> Result<Option<Clip>> {
        let url = format!("{}/clip/latest", self.base_url);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<Clip>().await?)),
            status => Err(ClipSyncError::Network(format!(
                "Server responded with {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ClipClient::new("http://192.168.1.10:5000/").unwrap();
        assert_eq!(client.base_url(), "http://192.168.1.10:5000");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            ClipClient::with_timeout(&format!("http://{addr}"), Duration::from_millis(500))
                .unwrap();
        let err = client.latest().await.unwrap_err();
        assert!(matches!(err, ClipSyncError::Network(_)));
    }
}
