/// Region registry for the weather-alert enrichment service.
///
/// Static reference data about NWS forecast offices (county warning areas):
/// which offices serve which states, the human-readable office names used
/// as text-fallback tokens, and the column names an organization table may
/// use for its region code. All other modules should reference this data
/// from here rather than hardcoding office codes.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::normalize_region_code;

// ---------------------------------------------------------------------------
// Organization table column aliases
// ---------------------------------------------------------------------------

/// Accepted region-code column names, in precedence order. Matching is
/// case-sensitive and exact; the first alias present in the header wins.
pub const REGION_CODE_ALIASES: &[&str] =
    &["CWA_Region", "CWA_region", "CWA", "Weather_Office", "NWS_Office"];

/// True when `raw` normalizes to a usable region code (2-4 ASCII
/// alphanumerics after trimming and uppercasing).
pub fn is_valid_region_code(raw: &str) -> bool {
    normalize_region_code(raw).is_some()
}

// ---------------------------------------------------------------------------
// State -> office table
// ---------------------------------------------------------------------------

/// A state or territory name as it appears in alert area descriptions,
/// together with the offices whose areas cover part of it.
pub struct StateRegions {
    /// Uppercase name as it appears in `areaDesc` text.
    pub name: &'static str,
    pub offices: &'static [&'static str],
}

/// Offices by state, used only by the lowest-confidence area-text
/// inference. Coverage is intentionally partial: a state missing here
/// simply contributes nothing.
pub static STATE_REGIONS: &[StateRegions] = &[
    StateRegions { name: "CALIFORNIA", offices: &["LOX", "MTR", "SGX", "HNX", "STO", "EKA", "MFR"] },
    StateRegions { name: "TEXAS", offices: &["FWD", "HGX", "EWX", "LZK", "EPZ"] },
    StateRegions { name: "FLORIDA", offices: &["MFL", "TBW", "JAX", "MLB"] },
    StateRegions { name: "NEW YORK", offices: &["OKX", "ALY", "BGM", "BUF"] },
    StateRegions { name: "PENNSYLVANIA", offices: &["PHI", "PBZ", "BGM", "CTP"] },
    StateRegions { name: "ILLINOIS", offices: &["LOT", "ILX"] },
    StateRegions { name: "VIRGINIA", offices: &["LWX", "AKQ", "RNK"] },
    StateRegions { name: "WEST VIRGINIA", offices: &["RLX"] },
    StateRegions { name: "WASHINGTON", offices: &["SEW", "OTX", "PQR"] },
    StateRegions { name: "COLORADO", offices: &["BOU", "GJT", "PUB"] },
    StateRegions { name: "MONTANA", offices: &["TFX", "MSO", "BYZ", "GGW"] },
    StateRegions { name: "NORTH CAROLINA", offices: &["RAH", "GSP", "ILM", "MHX"] },
    StateRegions { name: "SOUTH CAROLINA", offices: &["CAE", "CHS", "GSP"] },
    StateRegions { name: "GEORGIA", offices: &["FFC", "JAX"] },
    StateRegions { name: "ALABAMA", offices: &["BMX", "HUN", "MOB"] },
    StateRegions { name: "TENNESSEE", offices: &["OHX", "MEG"] },
    StateRegions { name: "KENTUCKY", offices: &["JKL", "PAH", "LMK"] },
    StateRegions { name: "OHIO", offices: &["CLE", "ILN", "PBZ"] },
    StateRegions { name: "MICHIGAN", offices: &["DTX", "GRR", "APX"] },
    StateRegions { name: "WISCONSIN", offices: &["MKX", "GRB", "MPX"] },
    StateRegions { name: "MINNESOTA", offices: &["MPX", "DLH"] },
    StateRegions { name: "IOWA", offices: &["DVN", "DMX", "ARX"] },
    StateRegions { name: "MISSOURI", offices: &["SGF", "LSX", "EAX"] },
    StateRegions { name: "ARKANSAS", offices: &["LZK", "SHV", "TSA"] },
    StateRegions { name: "LOUISIANA", offices: &["LIX", "SHV", "LCH"] },
    StateRegions { name: "MISSISSIPPI", offices: &["JAN", "LIX"] },
    StateRegions { name: "OKLAHOMA", offices: &["OUN", "TSA"] },
    StateRegions { name: "KANSAS", offices: &["ICT", "TOP", "DDC"] },
    StateRegions { name: "NEBRASKA", offices: &["OAX", "GID", "LBF"] },
    StateRegions { name: "SOUTH DAKOTA", offices: &["FSD", "ABR", "UNR"] },
    StateRegions { name: "NORTH DAKOTA", offices: &["BIS", "FGF"] },
    StateRegions { name: "WYOMING", offices: &["CYS", "RIW"] },
    StateRegions { name: "UTAH", offices: &["SLC"] },
    StateRegions { name: "NEVADA", offices: &["REV", "VEF", "LKN"] },
    StateRegions { name: "ARIZONA", offices: &["PSR", "TWC", "FGZ"] },
    StateRegions { name: "NEW MEXICO", offices: &["ABQ", "EPZ"] },
    StateRegions { name: "IDAHO", offices: &["BOI", "PIH", "MSO"] },
    StateRegions { name: "OREGON", offices: &["PQR", "MFR", "PDT"] },
    StateRegions { name: "ALASKA", offices: &["AFC", "AJK", "AFG"] },
    StateRegions { name: "HAWAII", offices: &["HFO"] },
    StateRegions { name: "PUERTO RICO", offices: &["SJU"] },
];

/// Infers office codes from free text by looking for state names.
///
/// Longer names are tried first and their matched span is blanked out, so
/// "West Virginia" does not also count as "Virginia". Case-insensitive.
pub fn infer_regions_from_text(text: &str) -> BTreeSet<String> {
    let mut haystack = text.to_ascii_uppercase();
    let mut found = BTreeSet::new();

    let mut states: Vec<&StateRegions> = STATE_REGIONS.iter().collect();
    states.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.name.cmp(b.name)));

    for state in states {
        let mut hit = false;
        while let Some(pos) = haystack.find(state.name) {
            hit = true;
            let blank = " ".repeat(state.name.len());
            haystack.replace_range(pos..pos + state.name.len(), &blank);
        }
        if hit {
            found.extend(state.offices.iter().map(|o| o.to_string()));
        }
    }

    found
}

// ---------------------------------------------------------------------------
// Office names
// ---------------------------------------------------------------------------

/// Metadata for a single forecast office.
pub struct Office {
    pub code: &'static str,
    /// Name as it appears in NWS text products, e.g. "Baltimore/Washington".
    pub name: &'static str,
}

pub static OFFICE_REGISTRY: &[Office] = &[
    Office { code: "LWX", name: "Baltimore/Washington" },
    Office { code: "PHI", name: "Mount Holly" },
    Office { code: "OKX", name: "Upton" },
    Office { code: "BOX", name: "Boston" },
    Office { code: "AKQ", name: "Wakefield" },
    Office { code: "RNK", name: "Blacksburg" },
    Office { code: "RAH", name: "Raleigh" },
    Office { code: "CTP", name: "State College" },
    Office { code: "PBZ", name: "Pittsburgh" },
    Office { code: "LOT", name: "Chicago" },
    Office { code: "ILX", name: "Lincoln" },
    Office { code: "LSX", name: "St. Louis" },
    Office { code: "DTX", name: "Detroit/Pontiac" },
    Office { code: "MPX", name: "Twin Cities/Chanhassen" },
    Office { code: "FFC", name: "Peachtree City" },
    Office { code: "MFL", name: "Miami" },
    Office { code: "TBW", name: "Tampa Bay Area" },
    Office { code: "FWD", name: "Fort Worth" },
    Office { code: "HGX", name: "Houston/Galveston" },
    Office { code: "EWX", name: "Austin/San Antonio" },
    Office { code: "BOU", name: "Denver" },
    Office { code: "SEW", name: "Seattle" },
    Office { code: "LOX", name: "Los Angeles/Oxnard" },
    Office { code: "MTR", name: "San Francisco" },
    Office { code: "SGX", name: "San Diego" },
];

/// Looks up an office by code. Returns `None` if not found.
pub fn find_office(code: &str) -> Option<&'static Office> {
    OFFICE_REGISTRY.iter().find(|o| o.code == code)
}

/// Office names for one run: configured overrides first, then the static
/// registry.
#[derive(Debug, Clone, Default)]
pub struct OfficeDirectory {
    overrides: BTreeMap<String, String>,
}

impl OfficeDirectory {
    /// Override keys are normalized like region codes; invalid keys and
    /// blank names are dropped.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let overrides = overrides
            .iter()
            .filter_map(|(code, name)| {
                let code = normalize_region_code(code)?;
                let name = name.trim();
                (!name.is_empty()).then(|| (code, name.to_string()))
            })
            .collect();
        Self { overrides }
    }

    pub fn name_for(&self, code: &str) -> Option<String> {
        self.overrides
            .get(code)
            .cloned()
            .or_else(|| find_office(code).map(|o| o.name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
