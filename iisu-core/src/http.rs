use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{ArtError, Result};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "iiSU-Icons/1.0";

/// Client construction and retry settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Downloads allowed in flight at once.
    pub max_concurrent: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Attempts per request, counting the first.
    pub max_attempts: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            timeout: Duration::from_secs(40),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_attempts: 3,
        }
    }
}

/// Shared HTTP client with a download concurrency cap and transient-error
/// retry. Cloning is cheap; clones share the client and the permits.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    permits: Arc<Semaphore>,
    max_attempts: usize,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("permits_available", &self.permits.available_permits())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl HttpFetcher {
    /// Build the client and the download permits.
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent)
            .build()?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            max_attempts: settings.max_attempts.max(1),
        })
    }

    /// The underlying `reqwest` client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request built by `build`, retrying 429/5xx/timeouts with
    /// exponential backoff. Non-success statuses become
    /// [`ArtError::HttpStatus`].
    pub async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ArtError::Internal("http permits closed".into()))?;

        let mut attempt = 1usize;
        let mut backoff = Duration::from_millis(200);
        let max_backoff = Duration::from_secs(5);

        loop {
            match self.send_once(&build).await {
                Ok(response) => return Ok(response),
                Err(err)
                    if attempt < self.max_attempts && err.is_retryable() =>
                {
                    warn!(
                        "[http] retrying (attempt {}/{}): {}",
                        attempt, self.max_attempts, err
                    );
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, max_backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<F>(&self, build: &F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let request = build(&self.client).build()?;
        let url = request.url().to_string();
        debug!("[http] {} {}", request.method(), url);

        let response = self.client.execute(request).await?;
        if !response.status().is_success() {
            return Err(ArtError::HttpStatus {
                status: response.status(),
                url,
            });
        }
        Ok(response)
    }

    /// GET `url` and return the body.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(|c| c.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Send the request built by `build` and decode a JSON body.
    pub async fn get_json<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Courtesy pause between calls to a rate-limited API.
pub async fn polite_delay(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Percent-encode one path segment.
pub fn quote_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let status = |code: u16| ArtError::HttpStatus {
            status: reqwest::StatusCode::from_u16(code).unwrap(),
            url: "https://example.invalid".into(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!ArtError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn quotes_path_segments() {
        assert_eq!(
            quote_segment("Nintendo - Game Boy"),
            "Nintendo%20-%20Game%20Boy"
        );
        assert_eq!(quote_segment("Zelda, The.png"), "Zelda%2C%20The.png");
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let started = std::time::Instant::now();
        polite_delay(Duration::ZERO).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
