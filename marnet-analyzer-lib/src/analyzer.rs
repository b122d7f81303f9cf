//! Main analyzer implementation.
//!
//! This module provides the `Analyzer` struct that drives a run: listing
//! discovery, per-domain detail extraction, tallying and result persistence.
//! Everything is sequential, with one request in flight at a time.

use crate::error::AnalyzerError;
use crate::geo::{locate, GeoLookup};
use crate::registrar::fetcher::politeness_pause;
use crate::registrar::{
    detail_url, listing_url, parse_base_url, DetailPage, HttpFetcher, ListingPage, PageSource,
    SiteProbe,
};
use crate::storage::{load_domains, save_domains, ResultWriter, DOMAINS_FILE};
use crate::tally::Tallies;
use crate::types::{AnalyzerConfig, DomainRecord, RunDetails};
use crate::utils::{domain_type, is_valid_domain_name};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Format of the start/end timestamps in `main.json`.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Format of the per-run result directory name.
pub const RUN_ID_FORMAT: &str = "%d.%m-%H:%M:%S";

/// Progress notifications emitted while a run is in progress.
#[derive(Debug)]
pub enum AnalyzerEvent<'a> {
    /// Discovery of a listing prefix started
    LetterStarted { letter: &'a str },

    /// Discovery of a listing prefix finished
    LetterFetched {
        letter: &'a str,
        domains: usize,
        pages: usize,
    },

    /// All prefixes were walked
    DiscoveryFinished { total: usize, elapsed: Duration },

    /// A domain's detail page is being fetched (`index` is 1-based)
    DomainStarted {
        index: usize,
        total: usize,
        domain: &'a str,
    },

    /// A domain was folded into the tallies
    DomainAnalyzed { domain: &'a str },

    /// A domain had no (well-formed) record; `not_available` is the running count
    DomainUnavailable {
        domain: &'a str,
        not_available: usize,
        reason: &'a AnalyzerError,
    },
}

/// Outcome of [`Analyzer::analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub details: RunDetails,
    pub tallies: Tallies,
    /// Where the result files were written, if persistence is enabled
    pub results_dir: Option<PathBuf>,
}

/// Drives a crawl of the registrar.
///
/// # Example
///
/// ```rust,no_run
/// use marnet_analyzer_lib::{open_locator, Analyzer, AnalyzerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AnalyzerConfig::default().with_letters(vec!["X".to_string()]);
///     let locator = open_locator(&config.geoip_database);
///     let mut analyzer = Analyzer::new(config, locator)?;
///
///     analyzer.fetch_domains(&mut |_| {}).await?;
///     let report = analyzer.analyze(&mut |_| {}).await?;
///     println!("Analyzed {} of {}", report.details.analyzed, report.details.total);
///     Ok(())
/// }
/// ```
pub struct Analyzer {
    /// Configuration settings for this run
    config: AnalyzerConfig,
    /// Parsed registrar endpoint
    base_url: Url,
    /// Registrar pages
    source: Box<dyn PageSource>,
    /// Live-site status and host resolution
    probe: Box<dyn SiteProbe>,
    /// Country/continent lookup
    locator: Box<dyn GeoLookup>,
    /// Domain names to analyze
    domains: Vec<String>,
}

impl Analyzer {
    /// Create an analyzer that talks to the registrar over HTTP.
    pub fn new(config: AnalyzerConfig, locator: Box<dyn GeoLookup>) -> Result<Self, AnalyzerError> {
        let fetcher = HttpFetcher::with_config(&config)?;
        Self::with_parts(config, Box::new(fetcher.clone()), Box::new(fetcher), locator)
    }

    /// Create an analyzer from explicit collaborators.
    pub fn with_parts(
        config: AnalyzerConfig,
        source: Box<dyn PageSource>,
        probe: Box<dyn SiteProbe>,
        locator: Box<dyn GeoLookup>,
    ) -> Result<Self, AnalyzerError> {
        let base_url = parse_base_url(&config.base_url)?;

        Ok(Self {
            config,
            base_url,
            source,
            probe,
            locator,
            domains: Vec::new(),
        })
    }

    /// Get the configuration for this analyzer.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Domain names queued for analysis.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Replace the queued domain names.
    pub fn set_domains(&mut self, domains: Vec<String>) {
        self.domains = domains;
    }

    /// Queue the domain names stored in a JSON list file.
    pub fn load_domains_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, AnalyzerError> {
        self.domains = load_domains(path)?;
        Ok(self.domains.len())
    }

    /// Save the queued domain names; defaults to `<storage>/domains.json`.
    pub fn save_domains_as_json(&self, dest: Option<&Path>) -> Result<PathBuf, AnalyzerError> {
        let path = match dest {
            Some(dest) => dest.to_path_buf(),
            None => self.config.storage.join(DOMAINS_FILE),
        };
        save_domains(&path, &self.domains)?;
        Ok(path)
    }

    /// Walk every configured listing prefix and queue the linked domains.
    ///
    /// Returns the number of domains discovered. When JSON persistence is
    /// enabled the list is also saved to `<storage>/domains.json`.
    pub async fn fetch_domains(
        &mut self,
        on_event: &mut dyn FnMut(AnalyzerEvent<'_>),
    ) -> Result<usize, AnalyzerError> {
        let started = Instant::now();
        let mut domains = Vec::new();

        for letter in &self.config.letters {
            on_event(AnalyzerEvent::LetterStarted { letter });

            let landing = self
                .source
                .fetch_page(&listing_url(&self.base_url, letter, None))
                .await?;
            let (page_count, landing_domains) = {
                let page = ListingPage::parse(&landing);
                (page.page_count(), page.domain_names(&self.base_url))
            };

            let fetched = if page_count == 0 {
                // No pagination bar: the landing page is the only page
                politeness_pause(self.config.pause).await;
                landing_domains
            } else {
                let mut fetched = Vec::new();
                for index in 0..page_count {
                    let html = self
                        .source
                        .fetch_page(&listing_url(&self.base_url, letter, Some(index)))
                        .await?;
                    fetched.extend(ListingPage::parse(&html).domain_names(&self.base_url));
                    politeness_pause(self.config.pause).await;
                }
                fetched
            };

            debug!(
                "Letter {}: {} domains on {} pages",
                letter,
                fetched.len(),
                page_count.max(1)
            );
            on_event(AnalyzerEvent::LetterFetched {
                letter,
                domains: fetched.len(),
                pages: page_count.max(1),
            });
            domains.extend(fetched);
        }

        self.domains = domains;
        on_event(AnalyzerEvent::DiscoveryFinished {
            total: self.domains.len(),
            elapsed: started.elapsed(),
        });

        if self.config.save_json {
            let path = self.save_domains_as_json(None)?;
            info!("Saved {} domains to {}", self.domains.len(), path.display());
        }

        Ok(self.domains.len())
    }

    /// Build the record of a single domain.
    ///
    /// # Errors
    ///
    /// `DomainNotFound` when the registrar has no record, `ParseError` when
    /// the detail page is malformed, and fetcher errors when the registrar
    /// cannot be reached.
    pub async fn fetch_record(&self, name: &str) -> Result<DomainRecord, AnalyzerError> {
        let html = self
            .source
            .fetch_page(&detail_url(&self.base_url, name))
            .await?;
        let fields = DetailPage::parse(&html).extract(name)?;

        let status_code = self.probe.status_class(name).await;
        let host = self.probe.resolve_host(name).await;
        let location = locate(host, self.locator.as_ref());

        Ok(DomainRecord {
            name: name.to_string(),
            url: format!("http://{}", name),
            date_valid: fields.date_valid,
            date_registered: fields.date_registered,
            registrant: fields.registrant,
            domain_type: domain_type(name),
            nameservers: fields.nameservers,
            status_code,
            location,
        })
    }

    /// Build the record of one domain outside of a run.
    ///
    /// Nothing is tallied or persisted.
    pub async fn inspect(&self, name: &str) -> Result<DomainRecord, AnalyzerError> {
        let name = name.trim().to_lowercase();
        if !is_valid_domain_name(&name) {
            return Err(AnalyzerError::config(format!(
                "'{}' is not a valid domain name",
                name
            )));
        }

        self.fetch_record(&name).await
    }

    /// Analyze every queued domain and fold the results into tallies.
    ///
    /// Domains without a record are counted as not available and skipped.
    /// When JSON persistence is enabled the results are written under
    /// `<storage>/<run id>/`.
    pub async fn analyze(
        &self,
        on_event: &mut dyn FnMut(AnalyzerEvent<'_>),
    ) -> Result<AnalysisReport, AnalyzerError> {
        let total = self.domains.len();
        let started = Local::now();
        let mut tallies = Tallies::new();
        let mut not_available = 0;

        for (i, name) in self.domains.iter().enumerate() {
            on_event(AnalyzerEvent::DomainStarted {
                index: i + 1,
                total,
                domain: name,
            });

            match self.fetch_record(name).await {
                Ok(record) => {
                    tallies.record(&record);
                    on_event(AnalyzerEvent::DomainAnalyzed { domain: name });
                    politeness_pause(self.config.pause).await;
                }
                Err(e) if e.is_unavailable_record() => {
                    not_available += 1;
                    debug!("{}: {}", name, e);
                    on_event(AnalyzerEvent::DomainUnavailable {
                        domain: name,
                        not_available,
                        reason: &e,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let details = RunDetails {
            start: started.format(TIMESTAMP_FORMAT).to_string(),
            end: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            total,
            analyzed: total - not_available,
            not_available,
        };

        let results_dir = if self.config.save_json {
            let run_id = started.format(RUN_ID_FORMAT).to_string();
            let writer = ResultWriter::new(&self.config.storage, &run_id);
            writer.write_results(&details, &tallies)?;
            info!("Results written to {}", writer.dir().display());
            Some(writer.dir().to_path_buf())
        } else {
            None
        };

        Ok(AnalysisReport {
            details,
            tallies,
            results_dir,
        })
    }
}
