//! JSON persistence of the domain list and of a run's results.
//!
//! Layout under the storage directory:
//!
//! ```text
//! <storage>/domains.json
//! <storage>/<run id>/main.json
//! <storage>/<run id>/types.json
//! <storage>/<run id>/registrants.json
//! <storage>/<run id>/registeredPerMonths.json
//! <storage>/<run id>/nameservers.json
//! <storage>/<run id>/statusCodes.json
//! <storage>/<run id>/countries.json
//! <storage>/<run id>/continents.json
//! ```

use crate::error::AnalyzerError;
use crate::types::RunDetails;
use crate::tally::Tallies;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the discovery checkpoint.
pub const DOMAINS_FILE: &str = "domains.json";

/// Save a domain list as a JSON array of strings.
pub fn save_domains<P: AsRef<Path>>(path: P, domains: &[String]) -> Result<(), AnalyzerError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AnalyzerError::file_error(parent.to_string_lossy(), e.to_string())
            })?;
        }
    }

    let json = serde_json::to_string(domains)?;
    fs::write(path, json)
        .map_err(|e| AnalyzerError::file_error(path.to_string_lossy(), e.to_string()))?;

    debug!("Saved {} domains to {}", domains.len(), path.display());
    Ok(())
}

/// Load a domain list saved by [`save_domains`].
///
/// # Errors
///
/// Returns `FileError` if the file does not exist or cannot be read, and
/// `ParseError` if it is not a JSON array of strings.
pub fn load_domains<P: AsRef<Path>>(path: P) -> Result<Vec<String>, AnalyzerError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(AnalyzerError::file_error(
            path.to_string_lossy(),
            "The file doesn't exist",
        ));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| AnalyzerError::file_error(path.to_string_lossy(), e.to_string()))?;

    serde_json::from_str(&content).map_err(|e| AnalyzerError::ParseError {
        message: format!("'{}' is not a JSON list of domains: {}", path.display(), e),
        content: Some(content.chars().take(200).collect()),
    })
}

/// Writes the result files of one run into `<storage>/<run id>/`.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new<P: AsRef<Path>>(storage: P, run_id: &str) -> Self {
        Self {
            dir: storage.as_ref().join(run_id),
        }
    }

    /// Directory the run's files go to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `<name>.json`, creating the run directory on first use.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, AnalyzerError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AnalyzerError::file_error(self.dir.to_string_lossy(), e.to_string()))?;

        let path = self.dir.join(format!("{}.json", name));
        let json = serde_json::to_string(value)?;
        fs::write(&path, json)
            .map_err(|e| AnalyzerError::file_error(path.to_string_lossy(), e.to_string()))?;

        Ok(path)
    }

    /// Write the run metadata and every tally map.
    pub fn write_results(&self, details: &RunDetails, tallies: &Tallies) -> Result<(), AnalyzerError> {
        self.write("main", details)?;
        self.write("types", &tallies.types)?;
        self.write("registrants", &tallies.registrants)?;
        self.write("registeredPerMonths", &tallies.registered_per_months)?;
        self.write("nameservers", &tallies.nameservers)?;
        self.write("statusCodes", &tallies.status_codes)?;
        self.write("countries", &tallies.countries)?;
        self.write("continents", &tallies.continents)?;

        debug!("Wrote results to {}", self.dir.display());
        Ok(())
    }
}
