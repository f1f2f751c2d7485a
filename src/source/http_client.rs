use crate::config::SourceConfig;
use crate::error::SourceError;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, warn};
use url::Url;

/// Thin `reqwest` wrapper that retries transient faults.
pub struct HttpClient {
    inner: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Yahoo hands out a session cookie on first contact
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// GET `url` as text. Returns `Ok(None)` on 404.
    pub async fn get_text(&self, url: &Url) -> Result<Option<String>, SourceError> {
        let strategy = FixedInterval::new(self.retry_delay).take(self.max_retries as usize);

        RetryIf::spawn(
            strategy,
            move || self.get_once(url),
            |e: &SourceError| {
                let retry = e.is_transient();
                if retry {
                    warn!("{}, retrying in {:?}", e, self.retry_delay);
                }
                retry
            },
        )
        .await
    }

    async fn get_once(&self, url: &Url) -> Result<Option<String>, SourceError> {
        debug!("GET {}", url);

        let resp = self.inner.get(url.clone()).send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(Some(resp.text().await?));
        }

        match status.as_u16() {
            404 => Ok(None),
            429 => Err(SourceError::RateLimited(429)),
            code => Err(SourceError::Status {
                status: code,
                url: url.to_string(),
            }),
        }
    }
}
