//! Zone-to-region resolution.
//!
//! An alert names the forecast zones and counties it covers; organizations
//! are keyed by forecast office. This module bridges the two: `ZoneMapping`
//! is the read-only zone → office table for one run, and `ZoneResolver`
//! turns an alert into the set of office codes it affects.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AlertRecord, normalize_region_code};
use crate::regions::infer_regions_from_text;

// ---------------------------------------------------------------------------
// Zone identifiers
// ---------------------------------------------------------------------------

/// Reduces a zone URL (`https://api.weather.gov/zones/forecast/MDZ013`) or a
/// bare zone id to its canonical uppercase id (`MDZ013`).
pub fn zone_id(zone: &str) -> String {
    zone.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_ascii_uppercase()
}

// ---------------------------------------------------------------------------
// Zone mapping
// ---------------------------------------------------------------------------

/// Zone id → region code lookup table. Built once per run, never mutated
/// while matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneMapping {
    zones: BTreeMap<String, String>,
}

impl ZoneMapping {
    /// Builds the table from static reference entries, then adds zones
    /// learned from alerts that report their own office code.
    ///
    /// Static entries win over learned ones. Among alerts, the first alert
    /// (in input order) to claim a zone wins. Entries whose code is not a
    /// valid region code are skipped.
    pub fn build(static_entries: &BTreeMap<String, String>, alerts: &[AlertRecord]) -> Self {
        let mut zones = BTreeMap::new();

        for (zone, code) in static_entries {
            let id = zone_id(zone);
            if id.is_empty() {
                continue;
            }
            if let Some(code) = normalize_region_code(code) {
                zones.insert(id, code);
            }
        }

        for alert in alerts {
            let Some(code) = alert.region_code.as_ref() else {
                continue;
            };
            for zone in &alert.zones {
                let id = zone_id(zone);
                if !id.is_empty() {
                    zones.entry(id).or_insert_with(|| code.clone());
                }
            }
        }

        ZoneMapping { zones }
    }

    /// Looks up a zone URL or id.
    pub fn lookup(&self, zone: &str) -> Option<&str> {
        self.zones.get(&zone_id(zone)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Which resolution strategy produced an alert's region codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The payload carried its own office code.
    Explicit,
    /// One or more affected zones were found in the zone table.
    ZoneTable,
    /// Inferred from state names in the area description.
    AreaText,
}

/// Region codes an alert resolves to. An empty set means the alert is
/// unmatched-by-zone and can only be matched by text fallback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedRegions {
    pub codes: BTreeSet<String>,
    pub source: Option<ResolutionSource>,
}

impl ResolvedRegions {
    pub fn is_unmatched_by_zone(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

/// Resolves alerts to region codes against one run's `ZoneMapping`.
pub struct ZoneResolver<'a> {
    mapping: &'a ZoneMapping,
}

impl<'a> ZoneResolver<'a> {
    pub fn new(mapping: &'a ZoneMapping) -> Self {
        Self { mapping }
    }

    /// Resolves every zone of the alert and unions the results.
    ///
    /// Per zone, the explicit payload code wins; otherwise the zone table is
    /// consulted. Only when neither yields anything for any zone (or the
    /// alert lists no zones) is the area description searched for state
    /// names.
    pub fn resolve(&self, alert: &AlertRecord) -> ResolvedRegions {
        if let Some(code) = &alert.region_code {
            return ResolvedRegions {
                codes: BTreeSet::from([code.clone()]),
                source: Some(ResolutionSource::Explicit),
            };
        }

        let codes: BTreeSet<String> = alert
            .zones
            .iter()
            .filter_map(|zone| self.mapping.lookup(zone))
            .map(str::to_string)
            .collect();
        if !codes.is_empty() {
            return ResolvedRegions {
                codes,
                source: Some(ResolutionSource::ZoneTable),
            };
        }

        let codes = infer_regions_from_text(&alert.area_desc);
        if !codes.is_empty() {
            return ResolvedRegions {
                codes,
                source: Some(ResolutionSource::AreaText),
            };
        }

        ResolvedRegions::default()
    }
}
