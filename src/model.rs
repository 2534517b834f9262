/// Core data types for the weather-alert enrichment service.
///
/// This module defines the shared domain model imported by all other modules:
/// the ordinal alert classifications, the normalized `AlertRecord`, the
/// canonical `Organization`, match bookkeeping, and the error types raised
/// by the core. It performs no I/O.

use chrono::{DateTime, FixedOffset};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Ordinal classifications
// ---------------------------------------------------------------------------

/// CAP severity, in ascending order of impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Unknown,
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    /// Parses the CAP text value case-insensitively. Anything unrecognised
    /// (including the empty string) is `Unknown`.
    pub fn from_text(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Severity::Minor,
            "moderate" => Severity::Moderate,
            "severe" => Severity::Severe,
            "extreme" => Severity::Extreme,
            _ => Severity::Unknown,
        }
    }

    /// Ordinal rank, 0 (Unknown) through 4 (Extreme).
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Unknown => "Unknown",
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
            Severity::Extreme => "Extreme",
        }
    }
}

/// CAP urgency, in ascending order of immediacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Urgency {
    #[default]
    Unknown,
    Past,
    Future,
    Expected,
    Immediate,
}

impl Urgency {
    pub fn from_text(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "past" => Urgency::Past,
            "future" => Urgency::Future,
            "expected" => Urgency::Expected,
            "immediate" => Urgency::Immediate,
            _ => Urgency::Unknown,
        }
    }

    /// Ordinal rank, 0 (Unknown) through 4 (Immediate).
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Unknown => "Unknown",
            Urgency::Past => "Past",
            Urgency::Future => "Future",
            Urgency::Expected => "Expected",
            Urgency::Immediate => "Immediate",
        }
    }
}

/// CAP certainty, in ascending order of confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Certainty {
    #[default]
    Unknown,
    Unlikely,
    Possible,
    Likely,
    Observed,
}

impl Certainty {
    pub fn from_text(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "unlikely" => Certainty::Unlikely,
            "possible" => Certainty::Possible,
            "likely" => Certainty::Likely,
            "observed" => Certainty::Observed,
            _ => Certainty::Unknown,
        }
    }

    /// Ordinal rank, 0 (Unknown) through 4 (Observed).
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Certainty::Unknown => "Unknown",
            Certainty::Unlikely => "Unlikely",
            Certainty::Possible => "Possible",
            Certainty::Likely => "Likely",
            Certainty::Observed => "Observed",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CAP message status. Only `Actual` alerts count as active hazards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertStatus {
    Actual,
    Exercise,
    System,
    Test,
    Draft,
    #[default]
    Unknown,
}

impl AlertStatus {
    pub fn from_text(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "actual" => AlertStatus::Actual,
            "exercise" => AlertStatus::Exercise,
            "system" => AlertStatus::System,
            "test" => AlertStatus::Test,
            "draft" => AlertStatus::Draft,
            _ => AlertStatus::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

/// One alert as handed over by the alert-source collaborator, already
/// deserialized but not yet validated. Every field is optional; validation
/// happens in `AlertRecord::from_raw`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlert {
    pub id: Option<String>,
    pub event: Option<String>,
    pub severity: Option<String>,
    pub urgency: Option<String>,
    pub certainty: Option<String>,
    pub status: Option<String>,
    pub message_type: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub area_desc: Option<String>,
    pub affected_zones: Vec<String>,
    /// Office code the payload reports for itself, if any.
    pub region_code: Option<String>,
    pub effective: Option<String>, // RFC 3339
    pub expires: Option<String>,   // RFC 3339
}

/// A normalized weather alert. Lives only for the duration of one
/// enrichment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub id: String,
    pub event: String,
    pub severity: Severity,
    pub urgency: Urgency,
    pub certainty: Certainty,
    pub status: AlertStatus,
    pub message_type: String,
    pub headline: String,
    pub description: String,
    pub instruction: String,
    pub area_desc: String,
    /// Affected zone URLs or bare zone ids, in payload order.
    pub zones: Vec<String>,
    /// Explicit office code carried by the payload, normalized uppercase.
    pub region_code: Option<String>,
    pub effective: Option<DateTime<FixedOffset>>,
    pub expires: Option<DateTime<FixedOffset>>,
}

impl AlertRecord {
    /// Validates and normalizes a raw alert.
    ///
    /// A missing or blank id, or a timestamp that is present but not valid
    /// RFC 3339, rejects the record. Unrecognised classification text is
    /// not an error; it becomes the `Unknown` variant.
    pub fn from_raw(raw: RawAlert) -> Result<AlertRecord, AlertRecordError> {
        let id = raw
            .id
            .as_deref()
            .map(short_alert_id)
            .filter(|id| !id.is_empty())
            .ok_or(AlertRecordError::MissingId)?;

        let effective = parse_timestamp("effective", raw.effective.as_deref())?;
        let expires = parse_timestamp("expires", raw.expires.as_deref())?;

        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();

        Ok(AlertRecord {
            id,
            event: text(raw.event),
            severity: Severity::from_text(raw.severity.as_deref().unwrap_or("")),
            urgency: Urgency::from_text(raw.urgency.as_deref().unwrap_or("")),
            certainty: Certainty::from_text(raw.certainty.as_deref().unwrap_or("")),
            status: AlertStatus::from_text(raw.status.as_deref().unwrap_or("")),
            message_type: text(raw.message_type),
            headline: text(raw.headline),
            description: text(raw.description),
            instruction: text(raw.instruction),
            area_desc: text(raw.area_desc),
            zones: raw
                .affected_zones
                .into_iter()
                .map(|z| z.trim().to_string())
                .filter(|z| !z.is_empty())
                .collect(),
            region_code: raw.region_code.as_deref().and_then(normalize_region_code),
            effective,
            expires,
        })
    }
}

/// NWS alert ids arrive as URLs (`https://api.weather.gov/alerts/urn:oid:...`);
/// only the last path segment is kept.
pub fn short_alert_id(id: &str) -> String {
    id.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string()
}

fn parse_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<FixedOffset>>, AlertRecordError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => DateTime::parse_from_rfc3339(v)
            .map(Some)
            .map_err(|_| AlertRecordError::InvalidTimestamp {
                field,
                value: v.to_string(),
            }),
    }
}

/// Trims and uppercases a region code. Returns `None` for anything that is
/// not 2-4 ASCII alphanumerics (blank cells, "nan", free text).
pub fn normalize_region_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = (2..=4).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric())
        && code != "NAN"
        && code != "NULL";
    valid.then_some(code)
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// The canonical view of one organization row, produced once at ingestion.
/// Alias column names are resolved before this point; nothing downstream
/// reasons about them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Organization {
    /// Position of the row in the input table.
    pub row: usize,
    pub id: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Canonical region code, `None` when the cell is blank or unusable.
    pub region_code: Option<String>,
    /// Office name used as a text-fallback token.
    pub office_name: Option<String>,
    /// Alert ids assigned by a previous enrichment run.
    pub prior_alert_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// The strategy that produced a match, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchMethod {
    AlertId,
    RegionCode,
    ZoneUrl,
    TextContent,
}

/// How much weight a match deserves when reviewing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl MatchMethod {
    pub const ALL: [MatchMethod; 4] = [
        MatchMethod::AlertId,
        MatchMethod::RegionCode,
        MatchMethod::ZoneUrl,
        MatchMethod::TextContent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::AlertId => "alert_id",
            MatchMethod::RegionCode => "region_code",
            MatchMethod::ZoneUrl => "zone_url",
            MatchMethod::TextContent => "text_content",
        }
    }

    /// Confidence tag recorded with matches from this strategy.
    pub fn confidence(self) -> Confidence {
        match self {
            MatchMethod::AlertId | MatchMethod::RegionCode => Confidence::High,
            MatchMethod::ZoneUrl => Confidence::Medium,
            MatchMethod::TextContent => Confidence::Low,
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alert matched to one organization, tagged with the winning strategy
/// and that strategy's confidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMatch {
    pub alert_id: String,
    pub method: MatchMethod,
    pub confidence: Confidence,
}

/// Matches for a single organization, in alert input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMatches {
    pub row: usize,
    pub org_id: String,
    pub matches: Vec<AlertMatch>,
}

/// Output of `OrgMatcher::match_all`: one entry per organization, in input
/// row order, including organizations with no matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub entries: Vec<OrgMatches>,
}

impl MatchResult {
    pub fn for_org(&self, org_id: &str) -> Option<&OrgMatches> {
        self.entries.iter().find(|e| e.org_id == org_id)
    }

    pub fn total_matches(&self) -> usize {
        self.entries.iter().map(|e| e.matches.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal errors that abort a whole enrichment run.
#[derive(Debug, Error, PartialEq)]
pub enum EnrichError {
    /// None of the recognized region-code columns exists in the table.
    #[error("region code column not found (expected one of {expected:?}), available: {available:?}")]
    MissingRegionColumn {
        expected: Vec<String>,
        available: Vec<String>,
    },
    /// The alert source returned nothing while alerts were required.
    #[error("alert feed is empty but alerts are required for this run")]
    EmptyAlertFeed,
    /// Every alert in a non-empty feed failed validation.
    #[error("none of the {received} alerts received were usable ({malformed} malformed)")]
    NoUsableAlerts { received: usize, malformed: usize },
    /// A row has more cells than the header declares.
    #[error("row {row} has {found} cells, header declares {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Per-record validation failure. The alert is excluded and counted; the
/// run continues.
#[derive(Debug, Error, PartialEq)]
pub enum AlertRecordError {
    #[error("alert has no identifier")]
    MissingId,
    #[error("alert {field} timestamp is not RFC 3339: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str) -> RawAlert {
        RawAlert {
            id: Some(id.to_string()),
            event: Some("Winter Storm Warning".to_string()),
            severity: Some("Severe".to_string()),
            urgency: Some("Expected".to_string()),
            certainty: Some("Likely".to_string()),
            status: Some("Actual".to_string()),
            effective: Some("2024-01-15T06:00:00-05:00".to_string()),
            expires: Some("2024-01-16T18:00:00-05:00".to_string()),
            ..RawAlert::default()
        }
    }

    #[test]
    fn test_ordinal_orderings_are_total_and_ascending() {
        assert!(Severity::Unknown < Severity::Minor);
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Moderate < Severity::Severe);
        assert!(Severity::Severe < Severity::Extreme);

        assert!(Urgency::Unknown < Urgency::Past);
        assert!(Urgency::Past < Urgency::Future);
        assert!(Urgency::Future < Urgency::Expected);
        assert!(Urgency::Expected < Urgency::Immediate);

        assert!(Certainty::Unknown < Certainty::Unlikely);
        assert!(Certainty::Unlikely < Certainty::Possible);
        assert!(Certainty::Possible < Certainty::Likely);
        assert!(Certainty::Likely < Certainty::Observed);
    }

    #[test]
    fn test_ranks_span_zero_to_four() {
        assert_eq!(Severity::Unknown.rank(), 0);
        assert_eq!(Severity::Extreme.rank(), 4);
        assert_eq!(Urgency::Immediate.rank(), 4);
        assert_eq!(Certainty::Observed.rank(), 4);
    }

    #[test]
    fn test_classification_parsing_is_case_insensitive_with_unknown_fallback() {
        assert_eq!(Severity::from_text("EXTREME"), Severity::Extreme);
        assert_eq!(Severity::from_text(" severe "), Severity::Severe);
        assert_eq!(Severity::from_text(""), Severity::Unknown);
        assert_eq!(Severity::from_text("catastrophic"), Severity::Unknown);
        assert_eq!(Urgency::from_text("immediate"), Urgency::Immediate);
        assert_eq!(Certainty::from_text("Observed"), Certainty::Observed);
        assert_eq!(AlertStatus::from_text("Test"), AlertStatus::Test);
    }

    #[test]
    fn test_short_alert_id_keeps_last_path_segment() {
        assert_eq!(
            short_alert_id("https://api.weather.gov/alerts/urn:oid:2.49.0.1.840.0.abc"),
            "urn:oid:2.49.0.1.840.0.abc"
        );
        assert_eq!(short_alert_id("urn:oid:1"), "urn:oid:1");
        assert_eq!(short_alert_id("  "), "");
    }

    #[test]
    fn test_from_raw_normalizes_fields() {
        let mut r = raw("https://api.weather.gov/alerts/urn:oid:42");
        r.region_code = Some(" lwx ".to_string());
        r.affected_zones = vec![" MDZ013 ".to_string(), "".to_string()];
        let alert = AlertRecord::from_raw(r).expect("valid raw alert");

        assert_eq!(alert.id, "urn:oid:42");
        assert_eq!(alert.severity, Severity::Severe);
        assert_eq!(alert.urgency, Urgency::Expected);
        assert_eq!(alert.certainty, Certainty::Likely);
        assert_eq!(alert.status, AlertStatus::Actual);
        assert_eq!(alert.region_code.as_deref(), Some("LWX"));
        assert_eq!(alert.zones, vec!["MDZ013".to_string()]);
        assert!(alert.effective.is_some());
        assert!(alert.expires.is_some());
    }

    #[test]
    fn test_from_raw_rejects_missing_id() {
        let mut r = raw("x");
        r.id = None;
        assert_eq!(AlertRecord::from_raw(r), Err(AlertRecordError::MissingId));

        let blank = raw("   ");
        assert_eq!(AlertRecord::from_raw(blank), Err(AlertRecordError::MissingId));
    }

    #[test]
    fn test_from_raw_rejects_garbage_timestamp_but_accepts_empty() {
        let mut bad = raw("a1");
        bad.expires = Some("tomorrow-ish".to_string());
        assert!(matches!(
            AlertRecord::from_raw(bad),
            Err(AlertRecordError::InvalidTimestamp { field: "expires", .. })
        ));

        let mut empty = raw("a2");
        empty.effective = Some(String::new());
        let alert = AlertRecord::from_raw(empty).expect("empty timestamp means absent");
        assert!(alert.effective.is_none());
    }

    #[test]
    fn test_normalize_region_code() {
        assert_eq!(normalize_region_code(" lwx"), Some("LWX".to_string()));
        assert_eq!(normalize_region_code("PHI"), Some("PHI".to_string()));
        assert_eq!(normalize_region_code(""), None);
        assert_eq!(normalize_region_code("nan"), None);
        assert_eq!(normalize_region_code("Sterling VA"), None);
        assert_eq!(normalize_region_code("X"), None);
    }

    #[test]
    fn test_match_method_priority_and_confidence() {
        let mut sorted = MatchMethod::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, MatchMethod::ALL.to_vec());
        assert_eq!(MatchMethod::RegionCode.confidence(), Confidence::High);
        assert_eq!(MatchMethod::TextContent.confidence(), Confidence::Low);
        assert!(Confidence::Low < Confidence::Medium && Confidence::Medium < Confidence::High);
        assert_eq!(Confidence::Medium.to_string(), "medium");
        assert_eq!(MatchMethod::ZoneUrl.to_string(), "zone_url");
    }
}
