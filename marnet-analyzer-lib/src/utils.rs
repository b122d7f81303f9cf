//! Utility functions for domain name processing.
//!
//! Small, layout-independent helpers used by the tallies and the fetcher.

/// Classify a domain by the suffix that follows its first label.
///
/// Second-level names keep one label (`example.mk` -> `.mk`), everything
/// deeper keeps two (`example.edu.mk` -> `.edu.mk`).
pub fn domain_type(domain: &str) -> String {
    let parts: Vec<&str> = domain.split('.').collect();

    match parts.len() {
        0 | 1 => format!(".{}", domain),
        2 => format!(".{}", parts[1]),
        _ => format!(".{}.{}", parts[1], parts[2]),
    }
}

/// Provider of a nameserver: its name without the first label.
///
/// `ns1.provider.com` -> `provider.com`. A single-label name has no provider
/// and maps to the empty string.
pub fn nameserver_provider(nameserver: &str) -> String {
    let parts: Vec<&str> = nameserver.split('.').collect();

    if parts.len() >= 2 {
        parts[1..].join(".")
    } else {
        String::new()
    }
}

/// Status class label for an HTTP status code (`301` -> `3xx`).
pub fn status_class(status: u16) -> String {
    format!("{}xx", status / 100)
}

/// Validate that a domain name has basic valid structure.
///
/// Used to drop junk entries (empty strings, stray whitespace) from
/// scraped or loaded lists before they reach the detail fetcher.
pub fn is_valid_domain_name(domain: &str) -> bool {
    if domain.len() < 4 || domain.len() > 253 {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    for part in parts {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        // IDN labels are shown in Cyrillic by the registrar, so allow any
        // alphanumeric character
        if !part.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}
