//! Console output for the marnet-analyzer CLI.
//!
//! Progress lines, the run summary and the top-N tables. Everything goes to
//! stdout through the `console` crate; log output stays on stderr.

use chrono::Local;
use console::{pad_str, style, Alignment};
use marnet_analyzer_lib::{AnalyzerError, AnalyzerEvent, RunDetails, Tallies};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Rows shown per table in the summary.
pub const TOP_ROWS: usize = 10;

const LABEL_WIDTH: usize = 40;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print the banner at the start of a run.
pub fn print_header(base_url: &str, source: &str) {
    println!(
        "{} {}",
        style("MARnet Domain Analyzer").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
    );
    println!(
        "{}",
        style(format!("Registrar: {} | Domains: {}", base_url, source)).dim()
    );
    println!();
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Print one progress event.
pub fn print_event(event: &AnalyzerEvent<'_>) {
    match event {
        AnalyzerEvent::LetterStarted { letter } => {
            println!(
                "  {} {}",
                style("Fetching domains starting with").dim(),
                style(letter).cyan().bold()
            );
        }
        AnalyzerEvent::LetterFetched {
            letter,
            domains,
            pages,
        } => {
            println!(
                "  {} {} domain{} on {} page{} for {}",
                style("└─").dim(),
                domains,
                plural(*domains),
                pages,
                plural(*pages),
                letter
            );
        }
        AnalyzerEvent::DiscoveryFinished { total, elapsed } => {
            println!();
            println!(
                "  {}",
                style(format!(
                    "Fetched {} domains in {}",
                    total,
                    format_elapsed(*elapsed)
                ))
                .green()
                .bold()
            );
            println!();
        }
        AnalyzerEvent::DomainStarted {
            index,
            total,
            domain,
        } => {
            // Outcome is printed on the same line by the next event
            print!(
                "  {}{} analyzing {}: ",
                style(format!("[{}]", Local::now().format("%H:%M:%S"))).dim(),
                style(format!("[{}/{}]", index, total)).dim(),
                domain
            );
            let _ = io::stdout().flush();
        }
        AnalyzerEvent::DomainAnalyzed { .. } => {
            println!("{}", style("Done.").green());
        }
        AnalyzerEvent::DomainUnavailable {
            not_available,
            reason,
            ..
        } => {
            println!(
                "{} {}",
                style("No info.").yellow(),
                style(format!("({}) {}", not_available, brief_reason(reason))).dim()
            );
        }
    }
}

/// Short reason shown next to "No info."
fn brief_reason(error: &AnalyzerError) -> &'static str {
    match error {
        AnalyzerError::DomainNotFound { .. } => "not registered",
        AnalyzerError::ParseError { .. } => "malformed record",
        _ => "",
    }
}

/// Format an elapsed duration as `HHh MMm SSs`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}h {:02}m {:02}s",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the run metadata block.
pub fn print_details(details: &RunDetails) {
    println!();
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    print_row("Start", &details.start);
    print_row("End", &details.end);
    print_row("Total", &details.total.to_string());
    print_row("Analyzed", &style(details.analyzed).green().to_string());
    print_row(
        "Not available",
        &style(details.not_available).yellow().to_string(),
    );
    println!();
}

fn print_row(label: &str, value: &str) {
    println!("  {:<15}{}", style(format!("{}:", label)).bold(), value);
}

/// Print the top tables of a run.
pub fn print_tallies(tallies: &Tallies) {
    print_table("Domain types", &tallies.types);
    print_table("Registrants", &tallies.registrants);
    print_table("Registrations per year", &tallies.registered_per_years());
    print_table("Nameserver providers", &tallies.nameservers);
    print_table("Status codes", &tallies.status_codes);
    print_table("Countries", &tallies.countries);
    print_table("Continents", &tallies.continents);
}

fn print_table(title: &str, map: &BTreeMap<String, u64>) {
    let rows = Tallies::top(map, Some(TOP_ROWS));
    if rows.iter().all(|(_, count)| *count == 0) {
        return;
    }

    println!(
        "  {} {}",
        style(format!("── {} ", title)).cyan().bold(),
        style("─".repeat(LABEL_WIDTH.saturating_sub(title.len()))).cyan().dim(),
    );
    for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
        let label = if label.is_empty() { "(none)" } else { label.as_str() };
        println!(
            "  {}  {}",
            pad_str(label, LABEL_WIDTH, Alignment::Left, Some("..")),
            style(count).bold()
        );
    }
    println!();
}

/// Print where the result files went.
pub fn print_results_location(dir: Option<&Path>) {
    match dir {
        Some(dir) => println!("  {} {}", style("Results written to").dim(), dir.display()),
        None => println!("  {}", style("Results were not saved").dim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00h 00m 00s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01h 02m 05s");
        assert_eq!(format_elapsed(Duration::from_secs(86_399)), "23h 59m 59s");
    }

    #[test]
    fn test_brief_reason() {
        assert_eq!(
            brief_reason(&AnalyzerError::domain_not_found("test.mk")),
            "not registered"
        );
        assert_eq!(
            brief_reason(&AnalyzerError::parse("missing registrant")),
            "malformed record"
        );
        assert_eq!(brief_reason(&AnalyzerError::internal("boom")), "");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(0), "s");
        assert_eq!(plural(2), "s");
    }
}
