//! External sources of sighting-like records.
//!
//! # Data Sources
//!
//! - [`external_reports`]: HTTP-polled external reports API
//! - [`geodata`]: public geodata snapshot consumed in-process
//!
//! Both yield a [`SourceBatch`] of [`SourceRecord`]s. Which records count as
//! wildlife sightings is decided by a [`SightingFilter`] injected by the caller.
//!
//! Records are decoded one by one. A missing or null id or coordinate decodes
//! to an empty id or NaN and is rejected later by payload validation; an entry
//! that is not a record at all is counted in [`SourceBatch::rejected`].

pub mod external_reports;
pub mod geodata;

pub use external_reports::ExternalReportsClient;
pub use geodata::GeodataSnapshot;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// A record from an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Identifier unique within the source. Numbers are accepted and kept as text.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,

    /// Free-form record type, e.g. "Urs" or "Bear sighting".
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default = "missing_coordinate", deserialize_with = "lenient_f64")]
    pub latitude: f64,

    #[serde(default = "missing_coordinate", deserialize_with = "lenient_f64")]
    pub longitude: f64,

    #[serde(default)]
    pub description: Option<String>,

    /// Publication time as reported by the source.
    #[serde(default)]
    pub posted: Option<String>,

    /// Event date, used when `posted` is missing.
    #[serde(default)]
    pub date: Option<String>,
}

impl SourceRecord {
    /// When the record was reported, preferring `posted` over `date`.
    pub fn reported_at(&self) -> Option<&str> {
        self.posted.as_deref().or(self.date.as_deref())
    }
}

/// Records decoded from one source read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    pub records: Vec<SourceRecord>,
    /// Entries that could not be decoded as a record.
    pub rejected: usize,
}

impl SourceBatch {
    /// Decode each entry on its own so one bad entry never drops the rest.
    pub fn from_values(values: Vec<Value>) -> Self {
        let mut batch = Self::default();
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<SourceRecord>(value) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    batch.rejected += 1;
                    warn!(index, error = %e, "Skipping malformed source record");
                }
            }
        }
        batch
    }

    /// Number of entries read, decoded or not.
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decides whether a record describes a wildlife sighting.
pub trait SightingFilter: Send + Sync {
    fn matches(&self, record: &SourceRecord) -> bool;
}

impl<F> SightingFilter for F
where
    F: Fn(&SourceRecord) -> bool + Send + Sync,
{
    fn matches(&self, record: &SourceRecord) -> bool {
        self(record)
    }
}

/// Keywords matched against the record type by default.
pub const DEFAULT_SIGHTING_KEYWORDS: &[&str] = &["urs", "bear", "ursus"];

/// Case-insensitive substring match of the record type against a keyword list.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SIGHTING_KEYWORDS)
    }
}

impl SightingFilter for KeywordFilter {
    fn matches(&self, record: &SourceRecord) -> bool {
        let kind = record.kind.to_lowercase();
        self.keywords.iter().any(|k| kind.contains(k.as_str()))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Int(n)) => n.to_string(),
        Some(Raw::Float(n)) => n.to_string(),
        None => String::new(),
    })
}

fn missing_coordinate() -> f64 {
    f64::NAN
}

/// Accept numbers or numeric strings. Null and unparseable strings become NaN
/// and are rejected later by payload validation.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => n,
        Some(Raw::Text(s)) => s.trim().parse().unwrap_or(f64::NAN),
        None => f64::NAN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str) -> SourceRecord {
        SourceRecord {
            id: "1".to_string(),
            kind: kind.to_string(),
            latitude: 45.6,
            longitude: 25.6,
            description: None,
            posted: None,
            date: None,
        }
    }

    #[test]
    fn test_keyword_filter_is_case_insensitive_substring() {
        let filter = KeywordFilter::default();
        assert!(filter.matches(&record("URS")));
        assert!(filter.matches(&record("Brown bear sighting")));
        assert!(filter.matches(&record("Ursus arctos")));
        assert!(!filter.matches(&record("Wolf")));
        assert!(!filter.matches(&record("")));
    }

    #[test]
    fn test_custom_keyword_filter() {
        let filter = KeywordFilter::new(["lup", "wolf"]);
        assert!(filter.matches(&record("Lup")));
        assert!(!filter.matches(&record("Urs")));
    }

    #[test]
    fn test_closure_filter() {
        let only_wolves = |r: &SourceRecord| r.kind == "Wolf";
        assert!(only_wolves.matches(&record("Wolf")));
        assert!(!only_wolves.matches(&record("Urs")));
    }

    #[test]
    fn test_record_accepts_numeric_id_and_string_coordinates() {
        let r: SourceRecord = serde_json::from_str(
            r#"{"id":42,"type":"Urs","latitude":"45.65","longitude":25.6,"date":"2025-06-01"}"#,
        )
        .unwrap();

        assert_eq!(r.id, "42");
        assert!((r.latitude - 45.65).abs() < 1e-9);
        assert_eq!(r.reported_at(), Some("2025-06-01"));
    }

    #[test]
    fn test_garbage_coordinate_becomes_nan() {
        let r: SourceRecord = serde_json::from_str(
            r#"{"id":"a","type":"Urs","latitude":"n/a","longitude":25.6}"#,
        )
        .unwrap();
        assert!(r.latitude.is_nan());
    }

    #[test]
    fn test_null_and_missing_fields_decode_leniently() {
        let r: SourceRecord =
            serde_json::from_str(r#"{"type":"Urs","latitude":null,"longitude":25.6}"#).unwrap();

        assert!(r.id.is_empty());
        assert!(r.latitude.is_nan());

        let r: SourceRecord = serde_json::from_str(r#"{"id":null,"type":"Urs"}"#).unwrap();
        assert!(r.id.is_empty());
        assert!(r.longitude.is_nan());
    }

    #[test]
    fn test_batch_keeps_good_records_next_to_bad_entries() {
        let values: Vec<Value> = serde_json::from_str(
            r#"[
                {"id":"ok","type":"Urs","latitude":45.6,"longitude":25.6},
                {"id":"bad","type":"Urs","latitude":null,"longitude":25.6},
                {"type":"Urs","latitude":45.6,"longitude":25.6},
                "not a record",
                {"id":"odd","type":{"nested":true},"latitude":45.6,"longitude":25.6}
            ]"#,
        )
        .unwrap();

        let batch = SourceBatch::from_values(values);

        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.rejected, 2);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.records[0].id, "ok");
        assert!(batch.records[1].latitude.is_nan());
        assert!(batch.records[2].id.is_empty());
    }

    #[test]
    fn test_posted_preferred_over_date() {
        let mut r = record("Urs");
        r.posted = Some("2025-06-02T10:00:00Z".to_string());
        r.date = Some("2025-06-01".to_string());
        assert_eq!(r.reported_at(), Some("2025-06-02T10:00:00Z"));
    }
}
