//! Statistical tallies folded from domain records.
//!
//! Each map goes from a category label to the number of analyzed domains in
//! that category. The maps serialize directly to the per-run JSON files.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::DomainRecord;
use crate::utils::nameserver_provider;

/// Bucket for registrations the registrar only dates as "before 2003".
pub const BEFORE_2003: &str = "< 2003";

/// Bucket for registration dates that match no known pattern.
pub const UNKNOWN_DATE: &str = "Unknown";

/// Status label for sites that did not answer the probe.
pub const UNREACHABLE: &str = "Unreachable";

/// Domain types the registrar hands out; always present in `types.json`.
pub const KNOWN_TYPES: [&str; 9] = [
    ".mk", ".gov.mk", ".edu.mk", ".org.mk", ".com.mk", ".net.mk", ".inf.mk", ".name.mk",
    ".mil.mk",
];

/// Placeholder dates are longer than any `dd.mm.yyyy` date.
const MAX_DATE_LEN: usize = 10;

lazy_static! {
    static ref DAY_FIRST: Regex = Regex::new(r"(\d{1,2})[./-](\d{1,2})[./-](\d{4})").unwrap();
    static ref YEAR_FIRST: Regex = Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap();
}

/// Where a registration date falls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationPeriod {
    /// The registrar's placeholder for registrations before 2003
    Before2003,
    /// A dated registration; `month` is zero-padded ("03")
    Month { year: String, month: String },
    /// Not a date we can read
    Unknown,
}

/// Classify a registration date string.
///
/// Anything longer than ten characters is the registrar's pre-2003
/// placeholder, even if it happens to contain a date.
pub fn classify_registration(date: &str) -> RegistrationPeriod {
    let date = date.trim();

    if date.chars().count() > MAX_DATE_LEN {
        return RegistrationPeriod::Before2003;
    }

    let (year, month) = if let Some(caps) = YEAR_FIRST.captures(date) {
        (caps[1].to_string(), caps[2].to_string())
    } else if let Some(caps) = DAY_FIRST.captures(date) {
        (caps[3].to_string(), caps[2].to_string())
    } else {
        return RegistrationPeriod::Unknown;
    };

    match month.parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => RegistrationPeriod::Month {
            year,
            month: format!("{:02}", m),
        },
        _ => RegistrationPeriod::Unknown,
    }
}

/// One entry of `registeredPerMonths.json`: either a flat bucket count or
/// a year's month → count map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistrationBucket {
    Count(u64),
    Months(BTreeMap<String, u64>),
}

impl RegistrationBucket {
    pub fn total(&self) -> u64 {
        match self {
            Self::Count(count) => *count,
            Self::Months(months) => months.values().sum(),
        }
    }
}

/// All tally maps of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tallies {
    pub types: BTreeMap<String, u64>,
    pub registrants: BTreeMap<String, u64>,
    pub registered_per_months: BTreeMap<String, RegistrationBucket>,
    pub nameservers: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<String, u64>,
    pub countries: BTreeMap<String, u64>,
    pub continents: BTreeMap<String, u64>,
}

impl Default for Tallies {
    fn default() -> Self {
        Self::new()
    }
}

impl Tallies {
    /// Empty tallies with the known domain types seeded at zero.
    pub fn new() -> Self {
        Self {
            types: KNOWN_TYPES.iter().map(|t| (t.to_string(), 0)).collect(),
            registrants: BTreeMap::new(),
            registered_per_months: BTreeMap::new(),
            nameservers: BTreeMap::new(),
            status_codes: BTreeMap::new(),
            countries: BTreeMap::new(),
            continents: BTreeMap::new(),
        }
    }

    /// Fold one record into every map.
    pub fn record(&mut self, record: &DomainRecord) {
        increment(&mut self.types, &record.domain_type);
        increment(&mut self.registrants, &record.registrant);
        self.record_registration(&record.date_registered);

        // A provider counts once per domain however many of its servers
        // the domain uses
        let providers: BTreeSet<String> = record
            .nameservers
            .iter()
            .map(|ns| nameserver_provider(&ns.name))
            .collect();
        for provider in providers {
            increment(&mut self.nameservers, &provider);
        }

        let status = record.status_code.as_deref().unwrap_or(UNREACHABLE);
        increment(&mut self.status_codes, status);

        increment(&mut self.countries, &record.location.country);
        increment(&mut self.continents, &record.location.continent);
    }

    fn record_registration(&mut self, date: &str) {
        match classify_registration(date) {
            RegistrationPeriod::Before2003 => self.increment_flat_bucket(BEFORE_2003),
            RegistrationPeriod::Unknown => self.increment_flat_bucket(UNKNOWN_DATE),
            RegistrationPeriod::Month { year, month } => {
                let bucket = self
                    .registered_per_months
                    .entry(year)
                    .or_insert_with(|| RegistrationBucket::Months(BTreeMap::new()));
                if let RegistrationBucket::Months(months) = bucket {
                    *months.entry(month).or_insert(0) += 1;
                }
            }
        }
    }

    fn increment_flat_bucket(&mut self, label: &str) {
        let bucket = self
            .registered_per_months
            .entry(label.to_string())
            .or_insert(RegistrationBucket::Count(0));
        if let RegistrationBucket::Count(count) = bucket {
            *count += 1;
        }
    }

    /// Registrations per year, with the flat buckets kept as-is.
    pub fn registered_per_years(&self) -> BTreeMap<String, u64> {
        self.registered_per_months
            .iter()
            .map(|(label, bucket)| (label.clone(), bucket.total()))
            .collect()
    }

    /// Entries of `map` by descending count, ties by label, optionally
    /// truncated to `limit`.
    pub fn top(map: &BTreeMap<String, u64>, limit: Option<usize>) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> =
            map.iter().map(|(label, count)| (label.clone(), *count)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }
}

fn increment(map: &mut BTreeMap<String, u64>, label: &str) {
    *map.entry(label.to_string()).or_insert(0) += 1;
}

/// Sum of the counts in a flat tally map.
pub fn total(map: &BTreeMap<String, u64>) -> u64 {
    map.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Nameserver};

    fn record(name: &str, registered: &str, nameservers: &[&str]) -> DomainRecord {
        DomainRecord {
            name: name.to_string(),
            url: format!("http://{}", name),
            date_valid: "31.12.2030".to_string(),
            date_registered: registered.to_string(),
            registrant: "Registrant".to_string(),
            domain_type: crate::utils::domain_type(name),
            nameservers: nameservers
                .iter()
                .map(|ns| Nameserver {
                    name: ns.to_string(),
                    ip: "192.0.2.1".to_string(),
                })
                .collect(),
            status_code: Some("2xx".to_string()),
            location: Location::unknown(),
        }
    }

    #[test]
    fn test_classify_registration() {
        assert_eq!(
            classify_registration("15.03.2008"),
            RegistrationPeriod::Month {
                year: "2008".to_string(),
                month: "03".to_string()
            }
        );
        assert_eq!(
            classify_registration("2011-11-02"),
            RegistrationPeriod::Month {
                year: "2011".to_string(),
                month: "11".to_string()
            }
        );
        assert_eq!(
            classify_registration("Пред 01.01.2003"),
            RegistrationPeriod::Before2003
        );
        assert_eq!(
            classify_registration("01.01.2003 г."),
            RegistrationPeriod::Before2003
        );
        assert_eq!(classify_registration("n/a"), RegistrationPeriod::Unknown);
        assert_eq!(classify_registration("40.13.2010"), RegistrationPeriod::Unknown);
    }

    #[test]
    fn test_seeded_types() {
        let tallies = Tallies::new();
        assert_eq!(tallies.types.len(), 9);
        assert_eq!(total(&tallies.types), 0);
    }

    #[test]
    fn test_record_updates_every_map() {
        let mut tallies = Tallies::new();
        tallies.record(&record("example.edu.mk", "15.03.2008", &["ns1.provider.com"]));

        assert_eq!(tallies.types[".edu.mk"], 1);
        assert_eq!(tallies.registrants["Registrant"], 1);
        assert_eq!(tallies.nameservers["provider.com"], 1);
        assert_eq!(tallies.status_codes["2xx"], 1);
        assert_eq!(tallies.countries["Unknown"], 1);
        assert_eq!(tallies.continents["Unknown"], 1);

        let year = &tallies.registered_per_months["2008"];
        assert_eq!(year, &RegistrationBucket::Months(BTreeMap::from([("03".to_string(), 1)])));
    }

    #[test]
    fn test_nameserver_providers_deduplicated_per_domain() {
        let mut tallies = Tallies::new();
        tallies.record(&record(
            "a.mk",
            "15.03.2008",
            &["ns1.provider.com", "ns2.provider.com", "dns.other.mk"],
        ));
        tallies.record(&record("b.mk", "15.03.2008", &["ns1.provider.com"]));

        assert_eq!(tallies.nameservers["provider.com"], 2);
        assert_eq!(tallies.nameservers["other.mk"], 1);
    }

    #[test]
    fn test_unreachable_status_is_counted() {
        let mut tallies = Tallies::new();
        let mut rec = record("down.mk", "15.03.2008", &[]);
        rec.status_code = None;
        tallies.record(&rec);

        assert_eq!(tallies.status_codes[UNREACHABLE], 1);
    }

    #[test]
    fn test_registered_per_months_json_shape() {
        let mut tallies = Tallies::new();
        tallies.record(&record("a.mk", "15.03.2008", &[]));
        tallies.record(&record("b.mk", "20.03.2008", &[]));
        tallies.record(&record("c.mk", "Пред 01.01.2003", &[]));

        let json = serde_json::to_value(&tallies.registered_per_months).unwrap();
        assert_eq!(json["2008"]["03"], 2);
        assert_eq!(json["< 2003"], 1);

        let per_year = tallies.registered_per_years();
        assert_eq!(per_year["2008"], 2);
        assert_eq!(per_year[BEFORE_2003], 1);
    }

    #[test]
    fn test_top_sorts_by_count() {
        let map = BTreeMap::from([
            ("a".to_string(), 1),
            ("b".to_string(), 5),
            ("c".to_string(), 3),
            ("d".to_string(), 3),
        ]);

        assert_eq!(
            Tallies::top(&map, Some(3)),
            vec![
                ("b".to_string(), 5),
                ("c".to_string(), 3),
                ("d".to_string(), 3)
            ]
        );
        assert_eq!(Tallies::top(&map, None).len(), 4);
    }
}
