//! Error handling for crawling and analysis operations.
//!
//! This module defines a single error type that covers all the different ways
//! a run can fail, from network issues to malformed local files.

use std::fmt;

/// Main error type for analyzer operations.
///
/// Some variants are expected outcomes rather than failures: a domain without
/// a registry record surfaces as `DomainNotFound` and is tallied, not fatal.
#[derive(Debug, Clone)]
pub enum AnalyzerError {
    /// Transport failure (DNS, connect, reset, body read)
    NoConnection {
        url: String,
        message: String,
    },

    /// The registrar answered with a non-success HTTP status
    HttpStatus {
        url: String,
        status: u16,
    },

    /// A retryable request kept failing until the retry budget ran out
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// The registrar has no record for this domain
    DomainNotFound {
        domain: String,
    },

    /// HTML or JSON did not have the expected shape
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// File I/O errors when reading or writing lists and results
    FileError {
        path: String,
        message: String,
    },

    /// GeoIP database could not be opened
    GeoIpError {
        message: String,
    },

    /// Configuration errors (invalid settings, etc.)
    ConfigError {
        message: String,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl AnalyzerError {
    /// Create a new transport error.
    pub fn no_connection<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::NoConnection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new HTTP status error.
    pub fn http_status<U: Into<String>>(url: U, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Create a new "no record" error for a domain.
    pub fn domain_not_found<D: Into<String>>(domain: D) -> Self {
        Self::DomainNotFound {
            domain: domain.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error suggests the request should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoConnection { .. } | Self::HttpStatus { status: 500..=599, .. }
        )
    }

    /// Check if this error means the domain should be skipped and counted
    /// as not available rather than aborting the run.
    pub fn is_unavailable_record(&self) -> bool {
        matches!(self, Self::DomainNotFound { .. } | Self::ParseError { .. })
    }
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConnection { url, message } => {
                write!(f, "No connection to '{}': {}", url, message)
            }
            Self::HttpStatus { url, status } => {
                write!(f, "HTTP {} from '{}'", status, url)
            }
            Self::RetriesExhausted {
                url,
                attempts,
                last_error,
            } => {
                write!(
                    f,
                    "Giving up on '{}' after {} attempts: {}",
                    url, attempts, last_error
                )
            }
            Self::DomainNotFound { domain } => {
                write!(f, "The domain {} doesn't have a record", domain)
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::GeoIpError { message } => {
                write!(f, "GeoIP error: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for AnalyzerError {}

// Implement From conversions for common error types
impl From<reqwest::Error> for AnalyzerError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if let Some(status) = err.status() {
            Self::http_status(url, status.as_u16())
        } else if err.is_timeout() {
            Self::no_connection(url, "request timed out")
        } else {
            Self::no_connection(url, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for AnalyzerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<url::ParseError> for AnalyzerError {
    fn from(err: url::ParseError) -> Self {
        Self::config(format!("Invalid URL: {}", err))
    }
}

impl From<maxminddb::MaxMindDBError> for AnalyzerError {
    fn from(err: maxminddb::MaxMindDBError) -> Self {
        Self::GeoIpError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AnalyzerError::no_connection("http://x", "reset").is_retryable());
        assert!(AnalyzerError::http_status("http://x", 503).is_retryable());
        assert!(!AnalyzerError::http_status("http://x", 404).is_retryable());
        assert!(!AnalyzerError::domain_not_found("test.mk").is_retryable());
    }

    #[test]
    fn test_unavailable_record_errors() {
        assert!(AnalyzerError::domain_not_found("test.mk").is_unavailable_record());
        assert!(AnalyzerError::parse("missing cell").is_unavailable_record());
        assert!(!AnalyzerError::no_connection("http://x", "reset").is_unavailable_record());
    }

    #[test]
    fn test_display_messages() {
        let err = AnalyzerError::domain_not_found("test.mk");
        assert_eq!(err.to_string(), "The domain test.mk doesn't have a record");

        let err = AnalyzerError::RetriesExhausted {
            url: "http://reg".to_string(),
            attempts: 3,
            last_error: "reset".to_string(),
        };
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
