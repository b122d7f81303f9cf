//! HTTP access to the registrar and to the registered sites themselves.
//!
//! Registrar pages are fetched with a bounded retry policy: transport errors
//! and 5xx answers are retried with exponential backoff until the attempt
//! budget runs out, then surface as `RetriesExhausted`. Status probes and
//! host resolution are single-shot and never fail the run.

use crate::error::AnalyzerError;
use crate::registrar::{PageSource, SiteProbe};
use crate::types::{AnalyzerConfig, RetryPolicy};
use crate::utils::status_class;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Fetcher for registrar pages and live-site probes.
#[derive(Clone)]
pub struct HttpFetcher {
    /// Client for registrar pages
    http_client: reqwest::Client,
    /// Client for status probes; never follows redirects so the class is
    /// the one of the first response
    probe_client: reqwest::Client,
    /// Retry policy for registrar pages
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Create a new fetcher with default settings.
    pub fn new() -> Result<Self, AnalyzerError> {
        Self::with_config(&AnalyzerConfig::default())
    }

    /// Create a new fetcher with the timeouts and retry policy of `config`.
    pub fn with_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AnalyzerError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        let probe_client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| {
                AnalyzerError::internal(format!("Failed to create probe client: {}", e))
            })?;

        Ok(Self {
            http_client,
            probe_client,
            retry: config.retry.clone(),
        })
    }

    /// Get the retry policy used for registrar pages.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// One GET without retrying.
    async fn get_once(&self, url: &Url) -> Result<String, AnalyzerError> {
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AnalyzerError::no_connection(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::http_status(url.as_str(), status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| AnalyzerError::no_connection(url.as_str(), e.to_string()))
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String, AnalyzerError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "No connection to {} (attempt {}/{}): {}. Will try again in {:?}",
                        url, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(AnalyzerError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SiteProbe for HttpFetcher {
    async fn status_class(&self, domain: &str) -> Option<String> {
        let site = format!("http://{}", domain);

        match self.probe_client.get(&site).send().await {
            Ok(response) => Some(status_class(response.status().as_u16())),
            Err(e) => {
                debug!("Status probe for {} failed: {}", site, e);
                None
            }
        }
    }

    async fn resolve_host(&self, domain: &str) -> Option<IpAddr> {
        let addresses: Vec<IpAddr> = match tokio::net::lookup_host((domain, 80)).await {
            Ok(addrs) => addrs.map(|a| a.ip()).collect(),
            Err(e) => {
                debug!("Could not resolve {}: {}", domain, e);
                return None;
            }
        };

        // Prefer IPv4, only IPv4 hosts can be geolocated
        addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
    }
}

/// Pause between requests; a zero pause returns immediately.
pub async fn politeness_pause(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetcher_creation() {
        let fetcher = HttpFetcher::new();
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_fetcher_uses_configured_retry_policy() {
        let config = AnalyzerConfig::default().with_retry(RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(20),
        });

        let fetcher = HttpFetcher::with_config(&config).unwrap();
        assert_eq!(fetcher.retry_policy().max_attempts, 2);
    }

    #[tokio::test]
    async fn test_unreachable_registrar_gives_up() {
        let config = AnalyzerConfig::default().with_retry(RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        });
        let fetcher = HttpFetcher::with_config(&config).unwrap();

        // Port 9 on localhost (discard) is closed on any sane test machine
        let url = Url::parse("http://127.0.0.1:9/registar.php").unwrap();
        match fetcher.fetch_page(&url).await {
            Err(AnalyzerError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let fetcher = HttpFetcher::new().unwrap();
        let ip = fetcher.resolve_host("127.0.0.1").await;
        assert_eq!(ip, Some("127.0.0.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_zero_pause_returns() {
        politeness_pause(Duration::ZERO).await;
    }
}
