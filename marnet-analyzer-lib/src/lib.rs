//! # MARnet Analyzer Library
//!
//! Crawls the public registry of the MARnet `.mk` registrar and aggregates
//! per-domain registration metadata into summary statistics.
//!
//! A run has two phases. Discovery walks the alphabetical listing pages and
//! collects every linked domain name. Analysis fetches each domain's detail
//! page, probes the live site, geolocates its host and folds the resulting
//! [`DomainRecord`] into a set of [`Tallies`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marnet_analyzer_lib::{open_locator, Analyzer, AnalyzerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::default();
//!     let locator = open_locator(&config.geoip_database);
//!     let mut analyzer = Analyzer::new(config, locator)?;
//!
//!     analyzer.fetch_domains(&mut |_| {}).await?;
//!     let report = analyzer.analyze(&mut |_| {}).await?;
//!
//!     println!("Analyzed: {}", report.details.analyzed);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Polite crawling**: strictly sequential requests with a pause between them
//! - **Bounded retries**: exponential backoff on connection failures and 5xx replies
//! - **Resumable discovery**: the domain list is saved and can be re-used
//! - **Pluggable I/O**: registrar, site probe and GeoIP access sit behind traits

// Re-export main public API types and functions
// This makes them available as marnet_analyzer_lib::TypeName
pub use analyzer::{AnalysisReport, Analyzer, AnalyzerEvent, RUN_ID_FORMAT, TIMESTAMP_FORMAT};
pub use config::{
    load_env_config, parse_duration_string, split_list, ConfigManager, EnvConfig, FileConfig,
    GeoIpConfig, OutputConfig, RegistrarConfig, RetryConfig,
};
pub use error::AnalyzerError;
pub use geo::{locate, open_locator, GeoLookup, MaxMindLocator, StaticLocator, UnknownLocator};
pub use registrar::{HttpFetcher, PageSource, SiteProbe};
pub use storage::{load_domains, save_domains, ResultWriter, DOMAINS_FILE};
pub use tally::{classify_registration, RegistrationBucket, RegistrationPeriod, Tallies};
pub use types::{
    AnalyzerConfig, DomainRecord, Location, Nameserver, RetryPolicy, RunDetails,
    DEFAULT_BASE_URL, DEFAULT_LETTERS,
};

// Public modules
pub mod registrar;
pub mod tally;
pub mod utils;

// Internal modules - reached through the re-exports above
mod analyzer;
mod config;
mod error;
mod geo;
mod storage;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, AnalyzerError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        default_base_url: DEFAULT_BASE_URL,
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub default_base_url: &'static str,
}
