//! Host geolocation against a local MaxMind country database.
//!
//! The database is opened once by the caller and handed to the analyzer as
//! a [`GeoLookup`]. Lookups never fail: anything that is not an IPv4 address
//! present in the database is located at ("Unknown", "Unknown").

use crate::error::AnalyzerError;
use crate::types::Location;
use maxminddb::geoip2;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use tracing::{debug, warn};

/// Country/continent lookup for IPv4 addresses.
pub trait GeoLookup: Send + Sync {
    /// Location of `ip`, `None` when the address is not in the database.
    fn lookup(&self, ip: Ipv4Addr) -> Option<Location>;
}

/// Locate a resolved host; only IPv4 hosts are looked up.
pub fn locate(host: Option<IpAddr>, geo: &dyn GeoLookup) -> Location {
    match host {
        Some(IpAddr::V4(ip)) => geo.lookup(ip).unwrap_or_else(Location::unknown),
        _ => Location::unknown(),
    }
}

/// [`GeoLookup`] backed by a MaxMind GeoIP2/GeoLite2 country database.
pub struct MaxMindLocator {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindLocator {
    /// Open the database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AnalyzerError> {
        let path = path.as_ref();
        let reader = maxminddb::Reader::open_readfile(path).map_err(|e| AnalyzerError::GeoIpError {
            message: format!("Failed to open '{}': {}", path.display(), e),
        })?;

        debug!(
            "Opened GeoIP database {} ({})",
            path.display(),
            reader.metadata.database_type
        );

        Ok(Self { reader })
    }
}

impl GeoLookup for MaxMindLocator {
    fn lookup(&self, ip: Ipv4Addr) -> Option<Location> {
        let country: geoip2::Country = match self.reader.lookup(IpAddr::V4(ip)) {
            Ok(country) => country,
            Err(e) => {
                debug!("GeoIP miss for {}: {}", ip, e);
                return None;
            }
        };

        let country_name = country
            .country
            .and_then(|c| c.names)
            .and_then(|names| names.get("en").map(|n| n.to_string()));
        let continent_name = country
            .continent
            .and_then(|c| c.names)
            .and_then(|names| names.get("en").map(|n| n.to_string()));

        Some(Location {
            country: country_name.unwrap_or_else(|| Location::unknown().country),
            continent: continent_name.unwrap_or_else(|| Location::unknown().continent),
        })
    }
}

/// [`GeoLookup`] that knows no addresses; used when no database is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownLocator;

impl GeoLookup for UnknownLocator {
    fn lookup(&self, _ip: Ipv4Addr) -> Option<Location> {
        None
    }
}

/// [`GeoLookup`] over a fixed address table.
#[derive(Debug, Default, Clone)]
pub struct StaticLocator {
    entries: HashMap<Ipv4Addr, Location>,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address with its country and continent.
    pub fn with_entry(mut self, ip: Ipv4Addr, country: &str, continent: &str) -> Self {
        self.entries.insert(
            ip,
            Location {
                country: country.to_string(),
                continent: continent.to_string(),
            },
        );
        self
    }
}

impl GeoLookup for StaticLocator {
    fn lookup(&self, ip: Ipv4Addr) -> Option<Location> {
        self.entries.get(&ip).cloned()
    }
}

/// Open the database at `path`, or fall back to [`UnknownLocator`] with a
/// warning when the file is missing or unreadable.
pub fn open_locator<P: AsRef<Path>>(path: P) -> Box<dyn GeoLookup> {
    let path = path.as_ref();

    match MaxMindLocator::open(path) {
        Ok(locator) => Box::new(locator),
        Err(e) => {
            warn!("{}; every host will be located as Unknown", e);
            Box::new(UnknownLocator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> StaticLocator {
        StaticLocator::new().with_entry(
            Ipv4Addr::new(192, 0, 2, 1),
            "North Macedonia",
            "Europe",
        )
    }

    #[test]
    fn test_locate_known_ipv4() {
        let location = locate(Some("192.0.2.1".parse().unwrap()), &locator());
        assert_eq!(location.country, "North Macedonia");
        assert_eq!(location.continent, "Europe");
    }

    #[test]
    fn test_locate_ipv4_miss_is_unknown() {
        let location = locate(Some("198.51.100.7".parse().unwrap()), &locator());
        assert!(location.is_unknown());
    }

    #[test]
    fn test_locate_ipv6_is_unknown() {
        let location = locate(Some("2001:db8::1".parse().unwrap()), &locator());
        assert!(location.is_unknown());
    }

    #[test]
    fn test_locate_unresolved_is_unknown() {
        assert!(locate(None, &locator()).is_unknown());
    }

    #[test]
    fn test_missing_database() {
        let result = MaxMindLocator::open("/nonexistent/countries.mmdb");
        assert!(matches!(result, Err(AnalyzerError::GeoIpError { .. })));

        let fallback = open_locator("/nonexistent/countries.mmdb");
        assert_eq!(fallback.lookup(Ipv4Addr::new(192, 0, 2, 1)), None);
    }
}
