use crate::types::{AggregatorError, FetchConfig, FetchError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// HTTP client shared by the listing sources.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    // Earliest instant the next request to each host may start.
    rate_limiter: Arc<RwLock<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(AggregatorError::Http)?;

        Ok(Self {
            client,
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Fetch a listing page body, retrying transient failures.
    pub async fn fetch_page(&self, url: &str) -> std::result::Result<String, FetchError> {
        let start_time = Instant::now();
        debug!("Fetching listing page: {}", url);

        self.apply_rate_limit(url).await?;

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 8),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds * 2)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.fetch_once(url).await {
                Ok(body) => {
                    info!(
                        "Fetched listing page: {} ({} bytes in {} ms)",
                        url,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                Err(e) => {
                    if !Self::is_retryable(&e) || attempt == self.config.max_retries {
                        last_error = Some(e);
                        break;
                    }
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt + 1, url, e, delay);
                            last_error = Some(e);
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            last_error = Some(e);
                            break;
                        }
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| FetchError::Transport("no attempt made".to_string()));
        warn!("Giving up on {} after {} ms: {}", url, start_time.elapsed().as_millis(), error);
        Err(error)
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<String, FetchError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let limit_bytes = self.config.max_page_bytes;
        if response.content_length().is_some_and(|length| length as usize > limit_bytes) {
            return Err(FetchError::BodyTooLarge { limit_bytes });
        }

        // Chunked bodies carry no length up front.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit_bytes {
                return Err(FetchError::BodyTooLarge { limit_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn is_retryable(error: &FetchError) -> bool {
        match error {
            FetchError::Timeout | FetchError::Transport(_) => true,
            FetchError::HttpStatus(code) => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(code)
            }
            FetchError::BodyTooLarge { .. } => false,
        }
    }

    async fn apply_rate_limit(&self, url: &str) -> std::result::Result<(), FetchError> {
        let parsed_url = Url::parse(url).map_err(|e| FetchError::Transport(format!("invalid URL {}: {}", url, e)))?;
        let host = parsed_url.host_str().unwrap_or("").to_string();
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);

        let now = Instant::now();
        let slot = {
            let mut rate_limiter = self.rate_limiter.write().await;
            let slot = match rate_limiter.get(&host) {
                Some(next_allowed) if *next_allowed > now => *next_allowed,
                _ => now,
            };
            rate_limiter.insert(host.clone(), slot + min_interval);
            slot
        };

        if slot > now {
            let wait_time = slot - now;
            debug!("Rate limiting {}: waiting {:?}", host, wait_time);
            tokio::time::sleep(wait_time).await;
        }

        Ok(())
    }
}
