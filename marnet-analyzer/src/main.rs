//! MARnet Analyzer CLI Application
//!
//! A command-line interface that crawls the MARnet `.mk` registrar, analyzes
//! every registered domain and prints summary statistics. This CLI is a thin
//! layer over the marnet-analyzer-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use marnet_analyzer_lib::{
    load_env_config, open_locator, parse_duration_string, Analyzer, AnalyzerConfig,
    ConfigManager, FileConfig,
};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for marnet-analyzer
#[derive(Parser, Debug)]
#[command(name = "marnet-analyzer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Dejan Angelov <angelovdejan92@gmail.com>")]
#[command(about = "Crawl the MARnet .mk registrar and aggregate domain statistics")]
#[command(
    long_about = "Crawl the MARnet .mk registrar and aggregate domain statistics.\n\nWalks the alphabetical listing, fetches every domain's record, probes the live site, geolocates its host and writes the tallies as JSON files. Without flags a full default run is performed."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Load domain names from a JSON list instead of crawling the listing
    #[arg(
        short = 'f',
        long = "domains-file",
        value_name = "FILE",
        help_heading = "Domain Selection"
    )]
    pub domains_file: Option<String>,

    /// Listing prefixes to crawl (comma-separated)
    #[arg(
        short = 'l',
        long = "letters",
        value_name = "LETTERS",
        value_delimiter = ',',
        help_heading = "Domain Selection"
    )]
    pub letters: Option<Vec<String>>,

    /// Print the record of a single domain as JSON and exit
    #[arg(long = "inspect", value_name = "DOMAIN", help_heading = "Domain Selection")]
    pub inspect: Option<String>,

    /// Registrar endpoint
    #[arg(long = "base-url", value_name = "URL", help_heading = "Registrar")]
    pub base_url: Option<String>,

    /// Pause between requests (e.g. 5s, 500ms, 2m)
    #[arg(long = "pause", value_name = "DURATION", help_heading = "Registrar")]
    pub pause: Option<String>,

    /// Directory for domains.json and the per-run result directories
    #[arg(long = "storage", value_name = "DIR", help_heading = "Output")]
    pub storage: Option<String>,

    /// Do not write any JSON files
    #[arg(long = "no-save", help_heading = "Output")]
    pub no_save: bool,

    /// MaxMind country database
    #[arg(long = "geoip-db", value_name = "FILE", help_heading = "Output")]
    pub geoip_db: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed debug information and error messages
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(&args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.inspect.is_some() && args.domains_file.is_some() {
        return Err("Cannot use --inspect together with --domains-file".to_string());
    }

    if let Some(letters) = &args.letters {
        if letters.iter().all(|l| l.trim().is_empty()) {
            return Err("--letters needs at least one listing prefix".to_string());
        }
    }

    if let Some(pause) = &args.pause {
        if parse_duration_string(pause).is_none() {
            return Err(format!(
                "Invalid pause '{}'. Use format like '500ms', '5s', '2m'",
                pause
            ));
        }
    }

    Ok(())
}

/// Route library logs to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level follows `--debug`/`--verbose`.
fn init_tracing(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();
}

/// Main analyzer logic
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let domains_file = resolve_domains_file(&args);
    debug!("Effective configuration: {:?}", config);

    let locator = open_locator(&config.geoip_database);

    if let Some(domain) = &args.inspect {
        let analyzer = Analyzer::new(config, locator)?;
        let record = analyzer.inspect(domain).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let source = match &domains_file {
        Some(path) => path.display().to_string(),
        None => format!("{} listing prefixes", config.letters.len()),
    };
    let base_url = config.base_url.clone();
    let mut analyzer = Analyzer::new(config, locator)?;

    // Load the list before printing anything so a bad file fails fast
    match &domains_file {
        Some(path) => {
            let count = analyzer.load_domains_from_file(path)?;
            info!("Loaded {} domains from {}", count, path.display());
            ui::print_header(&base_url, &source);
        }
        None => {
            ui::print_header(&base_url, &source);
            analyzer
                .fetch_domains(&mut |event| ui::print_event(&event))
                .await?;
        }
    }

    let report = analyzer
        .analyze(&mut |event| ui::print_event(&event))
        .await?;

    ui::print_details(&report.details);
    ui::print_tallies(&report.tallies);
    ui::print_results_location(report.results_dir.as_deref());

    Ok(())
}

/// Build the analyzer configuration from all sources.
///
/// Precedence (highest first):
/// 1. CLI arguments
/// 2. Environment variables (MA_*)
/// 3. Explicit config file (--config or MA_CONFIG)
/// 4. Local config file (./marnet-analyzer.toml)
/// 5. Global config file (~/.marnet-analyzer.toml)
/// 6. XDG config file (~/.config/marnet-analyzer/config.toml)
/// 7. Built-in defaults
fn build_config(args: &Args) -> Result<AnalyzerConfig, Box<dyn std::error::Error>> {
    let mut config = AnalyzerConfig::default();

    // Create config manager for file discovery
    let config_manager = ConfigManager::new(args.verbose);

    // Step 1: Determine config file path and load config files
    let explicit_config_path = args.config.clone().or_else(|| std::env::var("MA_CONFIG").ok());

    if let Some(path) = explicit_config_path {
        if args.verbose {
            eprintln!("🔧 Using explicit config file: {}", path);
        }

        let file_config = config_manager
            .load_file(&path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;

        config = merge_file_config_into_analyzer_config(config, file_config);
    } else {
        if args.verbose {
            eprintln!("🔧 Discovering config files...");
        }

        match config_manager.discover_and_load() {
            Ok(file_config) => {
                config = merge_file_config_into_analyzer_config(config, file_config);
            }
            Err(e) if args.verbose => {
                eprintln!("⚠️ Config discovery warning: {}", e);
            }
            Err(_) => {
                // Continue with defaults
            }
        }
    }

    // Step 2: Apply environment variables (MA_*)
    config = apply_environment_config(config, args.verbose);

    // Step 3: Apply CLI arguments (highest precedence)
    config = apply_cli_args_to_config(config, args)?;

    Ok(config)
}

/// Merge FileConfig into AnalyzerConfig
fn merge_file_config_into_analyzer_config(
    mut config: AnalyzerConfig,
    file_config: FileConfig,
) -> AnalyzerConfig {
    if let Some(registrar) = file_config.registrar {
        if let Some(base_url) = registrar.base_url {
            config.base_url = base_url;
        }
        if let Some(letters) = registrar.letters {
            config.letters = letters;
        }
        if let Some(pause) = registrar.pause.as_deref().and_then(parse_duration_string) {
            config.pause = pause;
        }
    }

    if let Some(output) = file_config.output {
        if let Some(storage) = output.storage {
            config.storage = PathBuf::from(storage);
        }
        if let Some(save_json) = output.save_json {
            config.save_json = save_json;
        }
    }

    if let Some(database) = file_config.geoip.and_then(|geoip| geoip.database) {
        config.geoip_database = PathBuf::from(database);
    }

    if let Some(retry) = file_config.retry {
        if let Some(max_attempts) = retry.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(backoff) = retry.initial_backoff.as_deref().and_then(parse_duration_string) {
            config.retry.initial_backoff = backoff;
        }
        if let Some(backoff) = retry.max_backoff.as_deref().and_then(parse_duration_string) {
            config.retry.max_backoff = backoff;
        }
    }

    config
}

/// Apply environment variables to config.
///
/// Uses the library's load_env_config() for validation and proper handling.
fn apply_environment_config(mut config: AnalyzerConfig, verbose: bool) -> AnalyzerConfig {
    let env_config = load_env_config(verbose);

    if let Some(base_url) = env_config.base_url {
        config.base_url = base_url;
    }
    if let Some(letters) = env_config.letters {
        config.letters = letters;
    }
    if let Some(pause) = env_config.pause {
        config.pause = pause;
    }
    if let Some(storage) = env_config.storage {
        config.storage = PathBuf::from(storage);
    }
    if let Some(save_json) = env_config.save_json {
        config.save_json = save_json;
    }
    if let Some(database) = env_config.geoip_database {
        config.geoip_database = PathBuf::from(database);
    }

    config
}

/// Apply CLI arguments to config (highest precedence).
fn apply_cli_args_to_config(
    mut config: AnalyzerConfig,
    args: &Args,
) -> Result<AnalyzerConfig, Box<dyn std::error::Error>> {
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }

    if let Some(letters) = &args.letters {
        config.letters = letters
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
    }

    if let Some(pause) = &args.pause {
        config.pause = parse_duration_string(pause)
            .ok_or_else(|| format!("Invalid pause '{}'", pause))?;
    }

    if let Some(storage) = &args.storage {
        config.storage = PathBuf::from(storage);
    }

    if let Some(database) = &args.geoip_db {
        config.geoip_database = PathBuf::from(database);
    }

    // Only override when the flag is passed so config/env values survive
    if args.no_save {
        config.save_json = false;
    }

    Ok(config)
}

/// Domain list file from `--domains-file` or `MA_DOMAINS_FILE`.
fn resolve_domains_file(args: &Args) -> Option<PathBuf> {
    args.domains_file
        .clone()
        .or_else(|| load_env_config(false).domains_file)
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marnet_analyzer_lib::{OutputConfig, RegistrarConfig, RetryConfig};
    use std::time::Duration;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["marnet-analyzer"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_no_flags_is_valid() {
        let args = parse(&[]);
        assert!(validate_args(&args).is_ok());
        assert!(args.domains_file.is_none());
        assert!(!args.no_save);
    }

    #[test]
    fn test_letters_are_comma_separated() {
        let args = parse(&["--letters", "A,B,NUM"]);
        assert_eq!(
            args.letters,
            Some(vec!["A".to_string(), "B".to_string(), "NUM".to_string()])
        );
    }

    #[test]
    fn test_invalid_pause_rejected() {
        let args = parse(&["--pause", "soon"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_inspect_conflicts_with_domains_file() {
        let args = parse(&["--inspect", "test.mk", "--domains-file", "domains.json"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_cli_args_override_config() {
        let args = parse(&[
            "--letters",
            "X",
            "--pause",
            "500ms",
            "--storage",
            "/tmp/out",
            "--no-save",
            "--geoip-db",
            "geo.mmdb",
        ]);

        let config = apply_cli_args_to_config(AnalyzerConfig::default(), &args).unwrap();
        assert_eq!(config.letters, vec!["X"]);
        assert_eq!(config.pause, Duration::from_millis(500));
        assert_eq!(config.storage, PathBuf::from("/tmp/out"));
        assert_eq!(config.geoip_database, PathBuf::from("geo.mmdb"));
        assert!(!config.save_json);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let base = AnalyzerConfig::default()
            .with_pause(Duration::from_secs(1))
            .with_save_json(false);

        let config = apply_cli_args_to_config(base, &parse(&[])).unwrap();
        assert_eq!(config.pause, Duration::from_secs(1));
        assert!(!config.save_json);
    }

    #[test]
    fn test_merge_file_config() {
        let file_config = FileConfig {
            registrar: Some(RegistrarConfig {
                letters: Some(vec!["A".to_string()]),
                pause: Some("2s".to_string()),
                ..Default::default()
            }),
            output: Some(OutputConfig {
                storage: Some("out".to_string()),
                save_json: Some(false),
            }),
            retry: Some(RetryConfig {
                max_attempts: Some(3),
                initial_backoff: Some("100ms".to_string()),
                max_backoff: None,
            }),
            ..Default::default()
        };

        let config = merge_file_config_into_analyzer_config(AnalyzerConfig::default(), file_config);
        assert_eq!(config.letters, vec!["A"]);
        assert_eq!(config.pause, Duration::from_secs(2));
        assert_eq!(config.storage, PathBuf::from("out"));
        assert!(!config.save_json);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(60));
    }
}
