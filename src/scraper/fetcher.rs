//! Page fetching

#[cfg(test)]
use mockall::automock;

use std::time::Duration;

use tracing::{info, warn};

use crate::scraper::error::FetchError;

/// Trait for retrieving the installer page markup
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page body as text. A single attempt, no retry.
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Fetches one fixed URL over HTTP
pub struct HttpPageFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Page returned status {}: {}", status, self.url);
            return Err(FetchError::Status(status));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        info!("Fetched {} bytes from {}", body.len(), self.url);

        Ok(body)
    }
}

impl HttpPageFetcher {
    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            warn!("Timed out fetching {}", self.url);
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            warn!("Failed to fetch {}: {}", self.url, error);
            FetchError::Network(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const UA: &str = "test-agent/1.0";

    #[tokio::test]
    async fn fetch_returns_body_and_sends_user_agent() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/installers")
            .match_header("user-agent", UA)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>ok</body></html>")
            .create_async()
            .await;

        let url = format!("{}/installers", server.url());
        let fetcher = HttpPageFetcher::new(&url, UA, Duration::from_secs(5)).unwrap();
        let body = fetcher.fetch().await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, "<html><body>ok</body></html>");
    }

    #[tokio::test]
    async fn fetch_returns_status_error_for_non_success_response() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/installers")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let url = format!("{}/installers", server.url());
        let fetcher = HttpPageFetcher::new(&url, UA, Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch().await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(FetchError::Status(status)) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn fetch_returns_network_error_when_server_unreachable() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let fetcher =
            HttpPageFetcher::new("http://127.0.0.1:9/page", UA, Duration::from_secs(5)).unwrap();

        let result = fetcher.fetch().await;

        assert!(result.is_err());
    }
}
