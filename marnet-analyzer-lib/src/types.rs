//! Core data types for crawling and analysis.
//!
//! This module defines the per-domain record built from one detail page,
//! the run metadata written to `main.json`, and the analyzer configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default registrar endpoint serving both listings and detail pages.
pub const DEFAULT_BASE_URL: &str = "http://reg.marnet.net.mk/registar.php";

/// Listing prefixes in the order the registrar exposes them.
pub const DEFAULT_LETTERS: [&str; 27] = [
    "NUM", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
    "R", "S", "T", "U", "V", "X", "Y", "W", "Z",
];

/// Label used when a host cannot be geolocated.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Everything scraped about one registered domain.
///
/// Built once from a detail page plus the status and host side queries;
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRecord {
    /// The domain name (e.g., "example.com.mk")
    pub name: String,

    /// The live site URL that was probed
    pub url: String,

    /// Date until which the registration is valid, as printed by the registrar
    pub date_valid: String,

    /// Registration date, or the registrar's pre-2003 placeholder text
    pub date_registered: String,

    /// Registrant (holder) name
    pub registrant: String,

    /// Domain type suffix (e.g., ".mk", ".edu.mk")
    pub domain_type: String,

    /// Nameservers in the order listed on the detail page
    pub nameservers: Vec<Nameserver>,

    /// HTTP status class of the live site ("2xx", "3xx", ...)
    pub status_code: Option<String>,

    /// Country and continent of the resolved host
    pub location: Location,
}

/// A nameserver name/IP pair from the detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nameserver {
    pub name: String,
    pub ip: String,
}

/// Geolocation of a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub continent: String,
}

impl Location {
    /// The sentinel for hosts that are not IPv4 or not in the database.
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN_LOCATION.to_string(),
            continent: UNKNOWN_LOCATION.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.country == UNKNOWN_LOCATION && self.continent == UNKNOWN_LOCATION
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Run metadata persisted as `main.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    /// Start of the analysis, formatted `dd.mm.YYYY HH:MM:SS`
    pub start: String,

    /// End of the analysis, same format
    pub end: String,

    /// Number of domain names in the list
    pub total: usize,

    /// Number of domains that produced a record
    pub analyzed: usize,

    /// Number of domains without a (well-formed) record
    pub not_available: usize,
}

/// Bounded retry with exponential backoff for registrar requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// Doubles from `initial_backoff` and saturates at `max_backoff`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1u32 << exponent);
        delay.min(self.max_backoff)
    }
}

/// Configuration options for a crawl.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Registrar endpoint for listings and detail pages
    pub base_url: String,

    /// Listing prefixes to walk during discovery
    pub letters: Vec<String>,

    /// Politeness pause between requests
    /// Default: 5 seconds
    pub pause: Duration,

    /// Whether to persist the domain list and tallies as JSON
    /// Default: true
    pub save_json: bool,

    /// Directory receiving `domains.json` and the per-run result directories
    pub storage: PathBuf,

    /// MaxMind country database used for geolocation
    pub geoip_database: PathBuf,

    /// Retry policy for registrar page fetches
    pub retry: RetryPolicy,

    /// Timeout for one registrar request
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Timeout for the live-site status probe
    /// Default: 10 seconds
    pub probe_timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            letters: DEFAULT_LETTERS.iter().map(|l| l.to_string()).collect(),
            pause: Duration::from_secs(5),
            save_json: true,
            storage: PathBuf::from("results"),
            geoip_database: PathBuf::from("countries.mmdb"),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

impl AnalyzerConfig {
    /// Set the registrar endpoint.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Restrict discovery to the given listing prefixes.
    pub fn with_letters(mut self, letters: Vec<String>) -> Self {
        self.letters = letters;
        self
    }

    /// Set the politeness pause between requests.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Enable or disable JSON persistence.
    pub fn with_save_json(mut self, enabled: bool) -> Self {
        self.save_json = enabled;
        self
    }

    /// Set the results directory.
    pub fn with_storage<P: Into<PathBuf>>(mut self, storage: P) -> Self {
        self.storage = storage.into();
        self
    }

    /// Set the GeoIP database path.
    pub fn with_geoip_database<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.geoip_database = path.into();
        self
    }

    /// Set the retry policy for registrar requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        };

        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
        assert_eq!(policy.delay_after(30), Duration::from_secs(5));
    }

    #[test]
    fn test_default_config_walks_all_letters() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.letters.len(), 27);
        assert_eq!(config.letters[0], "NUM");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.save_json);
    }

    #[test]
    fn test_run_details_json_keys() {
        let details = RunDetails {
            start: "01.02.2014 10:00:00".to_string(),
            end: "01.02.2014 11:00:00".to_string(),
            total: 3,
            analyzed: 2,
            not_available: 1,
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["notAvailable"], 1);
        assert_eq!(json["analyzed"], 2);
    }

    #[test]
    fn test_unknown_location() {
        assert!(Location::unknown().is_unknown());
        assert_eq!(Location::default(), Location::unknown());
    }
}
