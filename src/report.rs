//! Run report
//!
//! Counters describing one enrichment pass: how many organizations and
//! alerts went in, how many alerts were excluded and why, and which
//! strategies produced the matches. Always logged; written as pretty JSON
//! when a report path is configured.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::model::MatchMethod;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub generated_at: Option<DateTime<Utc>>,
    /// Column the region codes were read from.
    pub region_column: Option<String>,

    pub organizations_total: usize,
    pub organizations_with_region: usize,
    pub organizations_matched: usize,

    /// Records delivered by the alert source.
    pub alerts_received: usize,
    /// Excluded: no id or an unparseable timestamp.
    pub alerts_malformed: usize,
    /// Excluded: repeated id within the feed.
    pub alerts_duplicate: usize,
    /// Alerts that entered matching.
    pub alerts_considered: usize,
    /// Considered alerts no resolution strategy could map to a region.
    pub alerts_unmatched_by_zone: usize,
    /// Considered alerts matched to at least one organization.
    pub alerts_matched: usize,
    /// Considered alerts that matched no organization.
    pub alerts_dropped: usize,

    /// Match count per strategy, keyed by `MatchMethod::as_str`. Every
    /// strategy is listed, including those with zero matches.
    pub matches_by_method: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        RunReport {
            generated_at: Some(generated_at),
            matches_by_method: MatchMethod::ALL
                .iter()
                .map(|m| (m.as_str().to_string(), 0))
                .collect(),
            ..RunReport::default()
        }
    }

    pub fn record_match(&mut self, method: MatchMethod) {
        *self
            .matches_by_method
            .entry(method.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn total_matches(&self) -> usize {
        self.matches_by_method.values().sum()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        std::fs::write(path, json + "\n")
    }
}
