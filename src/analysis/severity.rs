//! Per-organization alert aggregation.
//!
//! Folds the list of alerts matched to one organization into the scalar
//! summary columns of the enriched table. Every field has an explicit
//! zero-match default; nothing here is ever "missing".

use chrono::{DateTime, FixedOffset, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::alert::activity::is_active_at;
use crate::alert::scoring::ScoreWeights;
use crate::model::{AlertRecord, Certainty, Confidence, MatchMethod, Severity, Urgency};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Aggregated alert fields for one organization.
///
/// List fields are in display order: most severe first (see
/// `display_order`), duplicates removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlertSummary {
    pub alert_ids: Vec<String>,
    pub event_types: Vec<String>,
    pub severity: Severity,
    pub urgency: Urgency,
    pub certainty: Certainty,
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
    pub areas: Vec<String>,
    /// Earliest effective time among the matched alerts.
    pub effective: Option<DateTime<FixedOffset>>,
    /// Latest expiration among the matched alerts.
    pub expires: Option<DateTime<FixedOffset>>,
    /// Highest per-alert score; 0 with no matches.
    pub severity_score: f64,
    pub alert_count: usize,
    /// Distinct strategies that produced the matches, in priority order.
    pub methods: Vec<MatchMethod>,
    /// Lowest confidence among `methods`; `None` with no matches.
    pub match_confidence: Option<Confidence>,
    pub has_active_alerts: bool,
}

impl AlertSummary {
    /// The zero-match row: count 0, `Unknown` classifications, empty text,
    /// score 0.
    pub fn empty() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Display order for matched alerts: severity, urgency and certainty
/// descending, then later expiration first (absent last), then earlier
/// effective first (absent last), then id ascending.
pub fn display_order(a: &AlertRecord, b: &AlertRecord) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then(b.urgency.cmp(&a.urgency))
        .then(b.certainty.cmp(&a.certainty))
        .then_with(|| desc_absent_last(a.expires, b.expires))
        .then_with(|| asc_absent_last(a.effective, b.effective))
        .then_with(|| a.id.cmp(&b.id))
}

fn desc_absent_last(a: Option<DateTime<FixedOffset>>, b: Option<DateTime<FixedOffset>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_absent_last(a: Option<DateTime<FixedOffset>>, b: Option<DateTime<FixedOffset>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct SeverityAggregator {
    weights: ScoreWeights,
    description_max_chars: usize,
}

impl SeverityAggregator {
    pub fn new(weights: ScoreWeights, description_max_chars: usize) -> Self {
        Self {
            weights,
            description_max_chars,
        }
    }

    /// Aggregates the alerts matched to one organization.
    ///
    /// `matched` pairs each alert with the strategy that matched it. Alerts
    /// repeated under the same id are counted once. `now` decides
    /// `has_active_alerts`.
    pub fn aggregate(&self, matched: &[(&AlertRecord, MatchMethod)], now: DateTime<Utc>) -> AlertSummary {
        let mut seen = HashSet::new();
        let mut alerts: Vec<&AlertRecord> = Vec::new();
        let mut methods: Vec<MatchMethod> = Vec::new();
        for &(alert, method) in matched {
            if seen.insert(alert.id.as_str()) {
                alerts.push(alert);
                methods.push(method);
            }
        }

        if alerts.is_empty() {
            return AlertSummary::empty();
        }

        alerts.sort_by(|a, b| display_order(a, b));
        methods.sort();
        methods.dedup();

        AlertSummary {
            alert_ids: alerts.iter().map(|a| a.id.clone()).collect(),
            event_types: distinct(alerts.iter().map(|a| a.event.as_str())),
            severity: alerts.iter().map(|a| a.severity).max().unwrap_or_default(),
            urgency: alerts.iter().map(|a| a.urgency).max().unwrap_or_default(),
            certainty: alerts.iter().map(|a| a.certainty).max().unwrap_or_default(),
            headlines: distinct(alerts.iter().map(|a| a.headline.as_str())),
            descriptions: distinct(
                alerts
                    .iter()
                    .map(|a| truncate_chars(&a.description, self.description_max_chars)),
            ),
            areas: distinct(alerts.iter().flat_map(|a| a.area_desc.split(';'))),
            effective: alerts.iter().filter_map(|a| a.effective).min(),
            expires: alerts.iter().filter_map(|a| a.expires).max(),
            severity_score: alerts
                .iter()
                .map(|a| self.weights.score(a))
                .fold(0.0, f64::max),
            alert_count: alerts.len(),
            match_confidence: methods.iter().map(|m| m.confidence()).min(),
            methods,
            has_active_alerts: alerts.iter().any(|a| is_active_at(a, now)),
        }
    }
}

/// Trimmed, non-empty values in first-seen order with duplicates removed.
fn distinct<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Cuts `s` to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
