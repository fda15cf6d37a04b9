//! Outbound HTTP: a shared client with a browser-like User-Agent, plus the
//! fixed-delay retry used by the ingestion job.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self { inner })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let response = self.inner.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    pub async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {url}");
        let response = self.inner.get(url).send().await?.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    pub async fn get_response(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET {url}");
        Ok(self.inner.get(url).send().await?.error_for_status()?)
    }
}

/// Run `operation` up to `max_attempts` times, sleeping `delay` between
/// attempts. Only transport errors are retried; the last error is returned
/// once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(mut operation: F, max_attempts: u32, delay: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(Error::Http(e)) if attempt < max_attempts => {
                warn!("Attempt {attempt} failed: {e}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if let Error::Http(ref http) = e {
                    warn!("Attempt {attempt} failed: {http}");
                }
                return Err(e);
            }
        }
    }
}
