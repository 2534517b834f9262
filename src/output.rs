//! Enriched table and its CSV sink.
//!
//! The enriched table is the original organization table, row for row and
//! column for column, followed by the derived alert columns. When the input
//! is the output of a previous run its derived columns are replaced, not
//! duplicated; otherwise a clashing derived header is renamed.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use csv::{Terminator, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::analysis::severity::AlertSummary;
use crate::config::TextSettings;
use crate::ingest::orgs::{OrgTable, TableError};

/// Derived columns, in output order.
pub const DERIVED_COLUMNS: [&str; 16] = [
    "alert_ids",
    "alert_type",
    "severity",
    "urgency",
    "certainty",
    "headline",
    "description",
    "areas_affected",
    "effective_time",
    "expires_time",
    "severity_score",
    "alert_count",
    "match_methods",
    "match_confidence",
    "has_active_alerts",
    "last_updated",
];

/// Joins the `areas_affected` cell, matching the NWS `areaDesc` style.
const AREA_SEPARATOR: &str = "; ";

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// One output row: the kept original cells plus the organization's summary.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub values: Vec<String>,
    pub summary: AlertSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTable {
    /// Kept original headers, in input order.
    pub headers: Vec<String>,
    /// Names written for `DERIVED_COLUMNS`, in the same order. A derived
    /// name that clashes with a kept original header gets a suffix.
    pub derived_headers: Vec<String>,
    pub rows: Vec<EnrichedRow>,
    pub generated_at: DateTime<Utc>,
}

impl EnrichedTable {
    /// Joins `summaries` onto `table` by row position. `summaries` must hold
    /// exactly one entry per table row.
    ///
    /// A table carrying every derived column is a previous output: those
    /// columns are dropped and written fresh. Any other table keeps all of
    /// its columns.
    pub fn build(table: &OrgTable, summaries: Vec<AlertSummary>, generated_at: DateTime<Utc>) -> Self {
        let previous_output = is_previous_output(&table.headers);
        let kept: Vec<usize> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !(previous_output && DERIVED_COLUMNS.contains(&h.as_str())))
            .map(|(i, _)| i)
            .collect();

        let headers: Vec<String> = kept.iter().map(|&i| table.headers[i].clone()).collect();
        let derived_headers = derived_headers(&headers);
        let rows = table
            .rows
            .iter()
            .zip(summaries)
            .map(|(row, summary)| EnrichedRow {
                values: kept
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect(),
                summary,
            })
            .collect();

        EnrichedTable {
            headers,
            derived_headers,
            rows,
            generated_at,
        }
    }

    /// Kept original headers followed by the derived headers.
    pub fn column_names(&self) -> Vec<&str> {
        self.headers
            .iter()
            .chain(&self.derived_headers)
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl EnrichedRow {
    /// Renders the derived cells in `DERIVED_COLUMNS` order. A row with no
    /// matches renders explicit defaults: empty text, `Unknown`
    /// classifications, score `0.0`, count `0`.
    pub fn derived_cells(&self, text: &TextSettings, generated_at: DateTime<Utc>) -> Vec<String> {
        let s = &self.summary;
        let join = |values: &[String]| flatten(&values.join(text.separator.as_str()), text.flatten_newlines);

        vec![
            join(&s.alert_ids),
            join(&s.event_types),
            s.severity.to_string(),
            s.urgency.to_string(),
            s.certainty.to_string(),
            join(&s.headlines),
            join(&s.descriptions),
            flatten(&s.areas.join(AREA_SEPARATOR), text.flatten_newlines),
            format_time(s.effective),
            format_time(s.expires),
            format!("{:.1}", s.severity_score),
            s.alert_count.to_string(),
            s.methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(text.separator.as_str()),
            s.match_confidence.map(|c| c.to_string()).unwrap_or_default(),
            s.has_active_alerts.to_string(),
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ]
    }
}

fn is_previous_output(headers: &[String]) -> bool {
    DERIVED_COLUMNS
        .iter()
        .all(|name| headers.iter().any(|h| h == name))
}

/// `DERIVED_COLUMNS`, with `_alert` appended to any name already taken by
/// an original header.
fn derived_headers(original: &[String]) -> Vec<String> {
    let taken = |name: &str| original.iter().any(|h| h == name);
    DERIVED_COLUMNS
        .iter()
        .map(|&name| {
            let mut header = name.to_string();
            while taken(&header) {
                header.push_str("_alert");
            }
            header
        })
        .collect()
}

fn format_time(t: Option<DateTime<FixedOffset>>) -> String {
    t.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn flatten(value: &str, enabled: bool) -> String {
    if !enabled {
        return value.to_string();
    }
    value
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// CSV sink
// ---------------------------------------------------------------------------

/// Writes the table as CSV: one header row, then one row per organization.
pub fn write_enriched_csv<W: Write>(
    writer: W,
    table: &EnrichedTable,
    text: &TextSettings,
) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(table.column_names())?;
    for row in &table.rows {
        let derived = row.derived_cells(text, table.generated_at);
        wtr.write_record(row.values.iter().chain(derived.iter()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_enriched_csv_path(
    path: &Path,
    table: &EnrichedTable,
    text: &TextSettings,
) -> Result<(), TableError> {
    let file = File::create(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_enriched_csv(file, table, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Certainty, Confidence, MatchMethod, Severity, Urgency};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn org_table() -> OrgTable {
        OrgTable {
            headers: vec!["Organization ID".into(), "CWA_Region".into(), "alert_ids".into()],
            rows: vec![
                vec!["org-1".into(), "LWX".into(), "stale-id".into()],
                vec!["org-2".into(), "ABC".into(), String::new()],
            ],
        }
    }

    fn matched_summary() -> AlertSummary {
        AlertSummary {
            alert_ids: vec!["a1".into(), "a2".into()],
            event_types: vec!["Winter Storm Warning".into()],
            severity: Severity::Severe,
            urgency: Urgency::Expected,
            certainty: Certainty::Likely,
            headlines: vec!["Heavy snow\nexpected".into()],
            descriptions: vec!["Snow.".into()],
            areas: vec!["Fairfax".into(), "Arlington".into()],
            effective: Some(DateTime::parse_from_rfc3339("2024-01-15T06:00:00-05:00").unwrap()),
            expires: None,
            severity_score: 75.0,
            alert_count: 2,
            methods: vec![MatchMethod::RegionCode],
            match_confidence: Some(Confidence::High),
            has_active_alerts: true,
        }
    }

    fn previous_output_table() -> OrgTable {
        let mut headers = vec!["Organization ID".to_string(), "CWA_Region".to_string()];
        headers.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
        let mut row = vec!["org-1".to_string(), "LWX".to_string()];
        row.extend(DERIVED_COLUMNS.iter().map(|c| format!("old {}", c)));
        OrgTable {
            headers,
            rows: vec![row],
        }
    }

    #[test]
    fn test_previous_output_columns_are_replaced() {
        let table = EnrichedTable::build(&previous_output_table(), vec![matched_summary()], now());
        assert_eq!(table.headers, vec!["Organization ID", "CWA_Region"]);
        assert_eq!(table.rows[0].values, vec!["org-1", "LWX"]);
        let names = table.column_names();
        assert_eq!(names.len(), 2 + DERIVED_COLUMNS.len());
        assert_eq!(names[2], "alert_ids");
        assert_eq!(names.last(), Some(&"last_updated"));
    }

    #[test]
    fn test_clashing_original_columns_are_kept() {
        let table = EnrichedTable::build(&org_table(), vec![matched_summary(), AlertSummary::empty()], now());
        assert_eq!(table.headers, vec!["Organization ID", "CWA_Region", "alert_ids"]);
        assert_eq!(table.rows[0].values, vec!["org-1", "LWX", "stale-id"]);

        let names = table.column_names();
        assert_eq!(names.len(), 3 + DERIVED_COLUMNS.len());
        assert_eq!(names[2], "alert_ids");
        assert_eq!(names[3], "alert_ids_alert");
        assert_eq!(names[4], "alert_type");
        assert_eq!(names.last(), Some(&"last_updated"));
    }

    #[test]
    fn test_derived_header_suffix_skips_taken_names() {
        let original = vec!["severity".to_string(), "severity_alert".to_string()];
        let headers = derived_headers(&original);
        assert_eq!(headers[2], "severity_alert_alert");
        assert_eq!(headers[0], "alert_ids");
    }

    #[test]
    fn test_zero_match_row_renders_defaults() {
        let row = EnrichedRow {
            values: Vec::new(),
            summary: AlertSummary::empty(),
        };
        let cells = row.derived_cells(&TextSettings::default(), now());
        assert_eq!(cells.len(), DERIVED_COLUMNS.len());
        assert_eq!(cells[0], "");
        assert_eq!(cells[2], "Unknown");
        assert_eq!(cells[3], "Unknown");
        assert_eq!(cells[4], "Unknown");
        assert_eq!(cells[10], "0.0");
        assert_eq!(cells[11], "0");
        assert_eq!(cells[12], "");
        assert_eq!(cells[13], "");
        assert_eq!(cells[14], "false");
        assert_eq!(cells[15], "2024-01-15T12:00:00Z");
    }

    #[test]
    fn test_matched_row_cells() {
        let row = EnrichedRow {
            values: Vec::new(),
            summary: matched_summary(),
        };
        let cells = row.derived_cells(&TextSettings::default(), now());
        assert_eq!(cells[0], "a1 | a2");
        assert_eq!(cells[2], "Severe");
        assert_eq!(cells[5], "Heavy snow expected");
        assert_eq!(cells[7], "Fairfax; Arlington");
        assert_eq!(cells[8], "2024-01-15T06:00:00-05:00");
        assert_eq!(cells[9], "");
        assert_eq!(cells[10], "75.0");
        assert_eq!(cells[12], "region_code");
        assert_eq!(cells[13], "high");
        assert_eq!(cells[14], "true");
    }

    #[test]
    fn test_newlines_kept_when_flattening_disabled() {
        let row = EnrichedRow {
            values: Vec::new(),
            summary: matched_summary(),
        };
        let text = TextSettings {
            flatten_newlines: false,
            ..TextSettings::default()
        };
        assert_eq!(row.derived_cells(&text, now())[5], "Heavy snow\nexpected");
    }

    #[test]
    fn test_write_enriched_csv() {
        let table = EnrichedTable::build(&org_table(), vec![matched_summary(), AlertSummary::empty()], now());
        let mut buf = Vec::new();
        write_enriched_csv(&mut buf, &table, &TextSettings::default()).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Organization ID,CWA_Region,alert_ids,alert_ids_alert,alert_type,severity"));
        assert!(lines[1].starts_with("org-1,LWX,stale-id,a1 | a2,Winter Storm Warning,Severe,Expected,Likely"));
        assert!(lines[2].starts_with("org-2,ABC,,,,Unknown,Unknown,Unknown"));
        assert!(!out.contains('\r'));
    }
}
