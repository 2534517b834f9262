//! Enrichment pipeline
//!
//! One synchronous pass from an in-memory organization table and an
//! in-memory alert list to the enriched table:
//!
//! 1. normalize organizations (region-code alias resolution)
//! 2. validate and de-duplicate alerts
//! 3. build the run's zone table and resolve every alert to region codes
//! 4. match organizations to alerts
//! 5. aggregate each organization's matches
//! 6. join the summaries back onto the original rows
//!
//! Nothing is carried between runs.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::alert::scoring::ScoreWeights;
use crate::analysis::matching::{OrgMatcher, PreparedAlert};
use crate::analysis::severity::{AlertSummary, SeverityAggregator};
use crate::analysis::zones::{ZoneMapping, ZoneResolver};
use crate::config::{Config, ConfigError};
use crate::ingest::orgs::{OrgTable, normalize_organizations};
use crate::logging::{self, DataSource};
use crate::model::{AlertRecord, EnrichError, MatchResult, RawAlert};
use crate::output::EnrichedTable;
use crate::regions::OfficeDirectory;
use crate::report::RunReport;

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct EnrichmentOutput {
    pub table: EnrichedTable,
    /// Per-organization matches with their strategy tags.
    pub matches: MatchResult,
    pub report: RunReport,
}

pub struct EnrichmentPipeline {
    zone_entries: BTreeMap<String, String>,
    offices: OfficeDirectory,
    weights: ScoreWeights,
    description_max_chars: usize,
    require_alerts: bool,
    matcher: OrgMatcher,
}

impl EnrichmentPipeline {
    /// Builds a pipeline from configuration. Reads the zone table file if
    /// one is configured.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let zone_entries = config.zone_table()?;
        logging::debug(
            DataSource::Zones,
            None,
            &format!("{} static zone entries", zone_entries.len()),
        );
        Ok(EnrichmentPipeline {
            zone_entries,
            offices: OfficeDirectory::new(&config.offices),
            weights: config.scoring.clone(),
            description_max_chars: config.text.description_max_chars,
            require_alerts: config.require_alerts,
            matcher: OrgMatcher::standard(),
        })
    }

    /// Replaces the standard strategy order.
    pub fn with_matcher(mut self, matcher: OrgMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Runs one enrichment pass. `now` stamps the output and decides which
    /// alerts are currently active.
    pub fn run(
        &self,
        table: &OrgTable,
        raw_alerts: Vec<RawAlert>,
        now: DateTime<Utc>,
    ) -> Result<EnrichmentOutput, EnrichError> {
        let mut report = RunReport::new(now);

        // --- Organizations ---
        let orgs = normalize_organizations(table, &self.offices)?;
        report.region_column = Some(orgs.region_column.clone());
        report.organizations_total = orgs.organizations.len();
        report.organizations_with_region = orgs
            .organizations
            .iter()
            .filter(|o| o.region_code.is_some())
            .count();
        logging::info(
            DataSource::Orgs,
            Some(&orgs.region_column),
            &format!(
                "{} organizations, {} with a usable region code",
                report.organizations_total, report.organizations_with_region
            ),
        );

        // --- Alerts ---
        report.alerts_received = raw_alerts.len();
        if raw_alerts.is_empty() {
            if self.require_alerts {
                return Err(EnrichError::EmptyAlertFeed);
            }
            logging::warn(DataSource::Nws, None, "alert feed is empty");
        }

        let alerts = self.validate_alerts(raw_alerts, &mut report);
        if alerts.is_empty() && report.alerts_malformed > 0 {
            return Err(EnrichError::NoUsableAlerts {
                received: report.alerts_received,
                malformed: report.alerts_malformed,
            });
        }
        report.alerts_considered = alerts.len();

        // --- Zones ---
        let mapping = ZoneMapping::build(&self.zone_entries, &alerts);
        logging::debug(
            DataSource::Zones,
            None,
            &format!("zone table has {} entries for this run", mapping.len()),
        );
        let resolver = ZoneResolver::new(&mapping);
        let prepared: Vec<PreparedAlert<'_>> = alerts
            .iter()
            .map(|a| PreparedAlert::new(a, resolver.resolve(a)))
            .collect();
        report.alerts_unmatched_by_zone = prepared
            .iter()
            .filter(|p| p.regions.is_unmatched_by_zone())
            .count();

        // --- Matching ---
        let matches = self.matcher.match_all(&orgs.organizations, &prepared);

        // --- Aggregation ---
        let by_id: HashMap<&str, &AlertRecord> = alerts.iter().map(|a| (a.id.as_str(), a)).collect();
        let aggregator = SeverityAggregator::new(self.weights.clone(), self.description_max_chars);
        let mut matched_ids: HashSet<&str> = HashSet::new();

        let summaries: Vec<AlertSummary> = matches
            .entries
            .iter()
            .map(|entry| {
                let pairs: Vec<_> = entry
                    .matches
                    .iter()
                    .filter_map(|m| by_id.get(m.alert_id.as_str()).map(|a| (*a, m.method)))
                    .collect();
                for &(alert, method) in &pairs {
                    matched_ids.insert(alert.id.as_str());
                    report.record_match(method);
                }
                if !pairs.is_empty() {
                    report.organizations_matched += 1;
                    logging::debug(
                        DataSource::Match,
                        Some(&entry.org_id),
                        &format!("{} alerts matched", pairs.len()),
                    );
                }
                aggregator.aggregate(&pairs, now)
            })
            .collect();

        report.alerts_matched = matched_ids.len();
        report.alerts_dropped = report.alerts_considered - report.alerts_matched;

        let enriched = EnrichedTable::build(table, summaries, now);
        logging::log_run_summary(&report);

        Ok(EnrichmentOutput {
            table: enriched,
            matches,
            report,
        })
    }

    /// Converts raw alerts, excluding malformed records and repeated ids.
    /// Exclusions are counted on `report` and logged.
    fn validate_alerts(&self, raw_alerts: Vec<RawAlert>, report: &mut RunReport) -> Vec<AlertRecord> {
        let mut seen = HashSet::new();
        let mut alerts = Vec::with_capacity(raw_alerts.len());

        for (i, raw) in raw_alerts.into_iter().enumerate() {
            match AlertRecord::from_raw(raw) {
                Ok(alert) => {
                    if seen.insert(alert.id.clone()) {
                        alerts.push(alert);
                    } else {
                        report.alerts_duplicate += 1;
                        logging::debug(DataSource::Nws, Some(&alert.id), "duplicate alert id skipped");
                    }
                }
                Err(e) => {
                    report.alerts_malformed += 1;
                    logging::warn(
                        DataSource::Nws,
                        Some(&format!("alert[{}]", i)),
                        &format!("excluded: {}", e),
                    );
                }
            }
        }

        alerts
    }
}
