//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `MA_*`
//! environment variables, and merging file configurations with proper
//! precedence rules.

use crate::error::AnalyzerError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [registrar]
/// base_url = "http://reg.marnet.net.mk/registar.php"
/// letters = ["A", "B"]
/// pause = "5s"
///
/// [output]
/// storage = "results"
/// save_json = true
///
/// [geoip]
/// database = "countries.mmdb"
///
/// [retry]
/// max_attempts = 5
/// initial_backoff = "2s"
/// max_backoff = "1m"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<RegistrarConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoip: Option<GeoIpConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

/// Where and how politely to crawl.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrarConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Listing prefixes to walk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letters: Option<Vec<String>>,

    /// Pause between requests (as string, e.g., "5s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause: Option<String>,
}

/// Result persistence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_json: Option<bool>,
}

/// GeoIP database location.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeoIpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Retry policy for registrar requests.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_backoff: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to emit warnings for config issues
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, AnalyzerError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(AnalyzerError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AnalyzerError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            AnalyzerError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config first, then the home directory, then the working
    /// directory; later files win.
    pub fn discover_and_load(&self) -> Result<FileConfig, AnalyzerError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            // A broken file found by discovery is skipped, an explicit
            // --config file is not (see load_file)
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    if self.verbose {
                        eprintln!("⚠️  Ignoring {}: {}", path.display(), e);
                    }
                }
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            eprintln!("⚠️  Multiple config files found. Using precedence:");
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "highest"
                } else {
                    "overridden"
                };
                eprintln!("   {} ({})", path.display(), status);
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./marnet-analyzer.toml", "./.marnet-analyzer.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".marnet-analyzer.toml", "marnet-analyzer.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("marnet-analyzer").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            registrar: match (lower.registrar, higher.registrar) {
                (Some(mut lower), Some(higher)) => {
                    if higher.base_url.is_some() {
                        lower.base_url = higher.base_url;
                    }
                    if higher.letters.is_some() {
                        lower.letters = higher.letters;
                    }
                    if higher.pause.is_some() {
                        lower.pause = higher.pause;
                    }
                    Some(lower)
                }
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(mut lower), Some(higher)) => {
                    if higher.storage.is_some() {
                        lower.storage = higher.storage;
                    }
                    if higher.save_json.is_some() {
                        lower.save_json = higher.save_json;
                    }
                    Some(lower)
                }
                (lower, higher) => higher.or(lower),
            },
            geoip: match (lower.geoip, higher.geoip) {
                (Some(lower), Some(higher)) => Some(GeoIpConfig {
                    database: higher.database.or(lower.database),
                }),
                (lower, higher) => higher.or(lower),
            },
            retry: match (lower.retry, higher.retry) {
                (Some(mut lower), Some(higher)) => {
                    if higher.max_attempts.is_some() {
                        lower.max_attempts = higher.max_attempts;
                    }
                    if higher.initial_backoff.is_some() {
                        lower.initial_backoff = higher.initial_backoff;
                    }
                    if higher.max_backoff.is_some() {
                        lower.max_backoff = higher.max_backoff;
                    }
                    Some(lower)
                }
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), AnalyzerError> {
        if let Some(registrar) = &config.registrar {
            if let Some(letters) = &registrar.letters {
                if letters.is_empty() || letters.iter().any(|l| l.trim().is_empty()) {
                    return Err(AnalyzerError::config(
                        "'letters' must be a non-empty list of non-empty prefixes",
                    ));
                }
            }

            if let Some(base_url) = &registrar.base_url {
                url::Url::parse(base_url).map_err(|e| {
                    AnalyzerError::config(format!("Invalid base_url '{}': {}", base_url, e))
                })?;
            }

            validate_duration("pause", registrar.pause.as_deref())?;
        }

        if let Some(retry) = &config.retry {
            if let Some(max_attempts) = retry.max_attempts {
                if max_attempts == 0 || max_attempts > 20 {
                    return Err(AnalyzerError::config(
                        "max_attempts must be between 1 and 20",
                    ));
                }
            }

            validate_duration("initial_backoff", retry.initial_backoff.as_deref())?;
            validate_duration("max_backoff", retry.max_backoff.as_deref())?;
        }

        Ok(())
    }
}

fn validate_duration(field: &str, value: Option<&str>) -> Result<(), AnalyzerError> {
    match value {
        Some(value) if parse_duration_string(value).is_none() => Err(AnalyzerError::config(
            format!(
                "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                field, value
            ),
        )),
        _ => Ok(()),
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via MA_* environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub base_url: Option<String>,
    pub letters: Option<Vec<String>>,
    pub pause: Option<Duration>,
    pub storage: Option<String>,
    pub save_json: Option<bool>,
    pub geoip_database: Option<String>,
    pub domains_file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Parses all MA_* environment variables. Invalid values are reported
/// when `verbose` is set and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    let mut env_config = EnvConfig {
        base_url: env_string("MA_BASE_URL", verbose),
        storage: env_string("MA_STORAGE", verbose),
        geoip_database: env_string("MA_GEOIP_DB", verbose),
        domains_file: env_string("MA_DOMAINS_FILE", verbose),
        config: env_string("MA_CONFIG", verbose),
        ..Default::default()
    };

    // MA_LETTERS - comma-separated listing prefixes
    if let Ok(letters_str) = env::var("MA_LETTERS") {
        let letters = split_list(&letters_str);
        if !letters.is_empty() {
            env_config.letters = Some(letters);
            if verbose {
                eprintln!("🔧 Using MA_LETTERS={}", letters_str);
            }
        }
    }

    // MA_PAUSE - politeness pause
    if let Ok(pause_str) = env::var("MA_PAUSE") {
        match parse_duration_string(&pause_str) {
            Some(pause) => {
                env_config.pause = Some(pause);
                if verbose {
                    eprintln!("🔧 Using MA_PAUSE={}", pause_str);
                }
            }
            None => {
                if verbose {
                    eprintln!(
                        "⚠️ Invalid MA_PAUSE='{}', use format like '500ms', '5s', '2m'",
                        pause_str
                    );
                }
            }
        }
    }

    // MA_SAVE_JSON - enable/disable result files
    if let Ok(val) = env::var("MA_SAVE_JSON") {
        match parse_bool(&val) {
            Some(save) => {
                env_config.save_json = Some(save);
                if verbose {
                    eprintln!("🔧 Using MA_SAVE_JSON={}", save);
                }
            }
            None => {
                if verbose {
                    eprintln!("⚠️ Invalid MA_SAVE_JSON='{}', use true/false", val);
                }
            }
        }
    }

    env_config
}

fn env_string(name: &str, verbose: bool) -> Option<String> {
    let value = env::var(name).ok()?;
    if value.trim().is_empty() {
        return None;
    }
    if verbose {
        eprintln!("🔧 Using {}={}", name, value);
    }
    Some(value)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated list, dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a duration string like "500ms", "5s", "2m"; a bare number is seconds.
pub fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(ms) = duration_str.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = duration_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = duration_str.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        duration_str.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration_string("invalid"), None);
    }

    #[test]
    fn test_parse_duration_string_overflow() {
        assert_eq!(parse_duration_string("400000000000000000m"), None);
        assert_eq!(
            parse_duration_string("1000m"),
            Some(Duration::from_secs(60_000))
        );
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[registrar]
letters = ["A", "B"]
pause = "0s"

[output]
storage = "/tmp/marnet"
save_json = false

[retry]
max_attempts = 3
initial_backoff = "500ms"
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let registrar = config.registrar.unwrap();
        assert_eq!(
            registrar.letters,
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(registrar.pause, Some("0s".to_string()));

        let output = config.output.unwrap();
        assert_eq!(output.storage, Some("/tmp/marnet".to_string()));
        assert_eq!(output.save_json, Some(false));

        assert_eq!(config.retry.unwrap().max_attempts, Some(3));
    }

    #[test]
    fn test_invalid_max_attempts() {
        let temp_file = write_config("[retry]\nmax_attempts = 0\n");
        let manager = ConfigManager::new(false);
        assert!(manager.load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_invalid_pause() {
        let temp_file = write_config("[registrar]\npause = \"soon\"\n");
        let manager = ConfigManager::new(false);
        assert!(manager.load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_empty_letters_rejected() {
        let temp_file = write_config("[registrar]\nletters = []\n");
        let manager = ConfigManager::new(false);
        assert!(manager.load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new(false);
        assert!(matches!(
            manager.load_file("/nonexistent/marnet-analyzer.toml"),
            Err(AnalyzerError::FileError { .. })
        ));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            registrar: Some(RegistrarConfig {
                base_url: Some("http://lower.example/registar.php".to_string()),
                pause: Some("5s".to_string()),
                ..Default::default()
            }),
            geoip: Some(GeoIpConfig {
                database: Some("lower.mmdb".to_string()),
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            registrar: Some(RegistrarConfig {
                pause: Some("1s".to_string()),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                save_json: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let registrar = merged.registrar.unwrap();

        assert_eq!(registrar.pause, Some("1s".to_string())); // Higher wins
        assert_eq!(
            registrar.base_url,
            Some("http://lower.example/registar.php".to_string())
        ); // Lower preserved
        assert_eq!(merged.output.unwrap().save_json, Some(false));
        assert_eq!(merged.geoip.unwrap().database, Some("lower.mmdb".to_string()));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("A, B,,C "), vec!["A", "B", "C"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
