//! Alert-to-organization matching.
//!
//! Matching is an ordered list of strategies evaluated per (organization,
//! alert) pair. The first strategy that succeeds is recorded as the match
//! reason and the pair is never counted twice. Strategies only see an
//! organization through its `OrgProfile`, so organizations that share a
//! profile (same office, same office name, no prior alert ids) are matched
//! once and the result reused.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::analysis::zones::{ResolvedRegions, zone_id};
use crate::model::{AlertMatch, AlertRecord, Confidence, MatchMethod, MatchResult, OrgMatches, Organization};

/// Office names shorter than this are not used as text-fallback tokens.
const MIN_OFFICE_NAME_LEN: usize = 4;

// ---------------------------------------------------------------------------
// Matching inputs
// ---------------------------------------------------------------------------

/// An alert with its resolved region codes and pre-normalized text, ready to
/// be tested against many organizations.
#[derive(Debug, Clone)]
pub struct PreparedAlert<'a> {
    pub alert: &'a AlertRecord,
    pub regions: ResolvedRegions,
    zone_ids: Vec<String>,
    zones_upper: Vec<String>,
    /// Area description, headline, description and instruction joined.
    text: String,
    text_upper: String,
}

impl<'a> PreparedAlert<'a> {
    pub fn new(alert: &'a AlertRecord, regions: ResolvedRegions) -> Self {
        let text = [
            alert.area_desc.as_str(),
            alert.headline.as_str(),
            alert.description.as_str(),
            alert.instruction.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

        Self {
            alert,
            regions,
            zone_ids: alert.zones.iter().map(|z| zone_id(z)).collect(),
            zones_upper: alert
                .zones
                .iter()
                .map(|z| z.trim().trim_end_matches('/').to_ascii_uppercase())
                .collect(),
            text_upper: text.to_uppercase(),
            text,
        }
    }

    pub fn id(&self) -> &str {
        &self.alert.id
    }
}

/// The parts of an organization that matching strategies may look at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrgProfile {
    pub region_code: String,
    pub office_name: Option<String>,
    pub prior_alert_ids: BTreeSet<String>,
}

impl OrgProfile {
    /// Returns `None` for organizations without a usable region code; those
    /// match nothing.
    pub fn of(org: &Organization) -> Option<Self> {
        let region_code = org.region_code.clone()?;
        Some(Self {
            region_code,
            office_name: org
                .office_name
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| n.len() >= MIN_OFFICE_NAME_LEN),
            prior_alert_ids: org.prior_alert_ids.iter().cloned().collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One matching heuristic. Implementations must be pure functions of their
/// two arguments.
pub trait MatchStrategy {
    /// Tag recorded on matches this strategy produces.
    fn method(&self) -> MatchMethod;

    /// Confidence tag recorded alongside `method`.
    fn confidence(&self) -> Confidence {
        self.method().confidence()
    }

    fn matches(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> bool;
}

/// The organization already carries this alert's id from a previous run.
pub struct AlertIdStrategy;

impl MatchStrategy for AlertIdStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::AlertId
    }

    fn matches(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> bool {
        org.prior_alert_ids.contains(alert.id())
    }
}

/// The organization's office is one the alert resolved to.
pub struct RegionCodeStrategy;

impl MatchStrategy for RegionCodeStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::RegionCode
    }

    fn matches(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> bool {
        alert.regions.contains(&org.region_code)
    }
}

/// The organization's code appears as a fragment of one of the alert's zone
/// identifiers: either as a path segment (`.../offices/LWX`) or as the
/// letter prefix of a zone id (`LWXZ001`, `MDZ013` for code `MD`/`MDZ`).
pub struct ZoneUrlStrategy;

impl MatchStrategy for ZoneUrlStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::ZoneUrl
    }

    fn matches(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> bool {
        let code = org.region_code.as_str();
        let segment = format!("/{}/", code);
        let tail = format!("/{}", code);

        alert
            .zones_upper
            .iter()
            .any(|z| z.contains(&segment) || z.ends_with(&tail))
            || alert.zone_ids.iter().any(|id| zone_prefix_matches(id, code))
    }
}

/// Splits a zone id into its letter prefix and numeric suffix and compares
/// the prefix, with and without a trailing `C`/`Z` type letter, to `code`.
fn zone_prefix_matches(zone_id: &str, code: &str) -> bool {
    let letters_len = zone_id
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let (letters, digits) = zone_id.split_at(letters_len);
    if letters.len() < 2 || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if letters == code {
        return true;
    }
    letters.len() > 2
        && (letters.ends_with('C') || letters.ends_with('Z'))
        && &letters[..letters.len() - 1] == code
}

/// Free-text fallback: the office code (as "NWS XXX" or a standalone
/// uppercase word) or the office name appears in the alert's text.
pub struct TextContentStrategy;

impl MatchStrategy for TextContentStrategy {
    fn method(&self) -> MatchMethod {
        MatchMethod::TextContent
    }

    fn matches(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> bool {
        let code = org.region_code.as_str();
        if alert.text_upper.contains(&format!("NWS {}", code)) || contains_word(&alert.text, code) {
            return true;
        }

        org.office_name
            .as_ref()
            .is_some_and(|name| alert.text_upper.contains(&name.to_uppercase()))
    }
}

/// True if `needle` occurs in `haystack` with no alphanumeric character
/// directly before or after it.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(pos, _)| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphanumeric()) && !after.is_some_and(|c| c.is_alphanumeric())
    })
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Applies an ordered set of strategies to every (organization, alert) pair.
pub struct OrgMatcher {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl Default for OrgMatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl OrgMatcher {
    /// A matcher with a custom strategy order. Earlier strategies win.
    pub fn new(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Alert id, region code, zone URL, text content.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(AlertIdStrategy),
            Box::new(RegionCodeStrategy),
            Box::new(ZoneUrlStrategy),
            Box::new(TextContentStrategy),
        ])
    }

    /// The first strategy that matches the pair, if any.
    pub fn first_match(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> Option<MatchMethod> {
        self.first_strategy(org, alert).map(|s| s.method())
    }

    fn first_strategy(&self, org: &OrgProfile, alert: &PreparedAlert<'_>) -> Option<&dyn MatchStrategy> {
        self.strategies
            .iter()
            .find(|s| s.matches(org, alert))
            .map(|s| &**s)
    }

    /// Matches every organization against every alert.
    ///
    /// The result has one entry per organization in input order; each
    /// entry lists its matches in alert input order. An alert id is
    /// matched at most once per organization.
    pub fn match_all(&self, orgs: &[Organization], alerts: &[PreparedAlert<'_>]) -> MatchResult {
        let mut by_profile: BTreeMap<OrgProfile, Vec<AlertMatch>> = BTreeMap::new();

        let entries = orgs
            .iter()
            .map(|org| {
                let matches = match OrgProfile::of(org) {
                    Some(profile) => by_profile
                        .entry(profile)
                        .or_insert_with_key(|p| self.match_profile(p, alerts))
                        .clone(),
                    None => Vec::new(),
                };
                OrgMatches {
                    row: org.row,
                    org_id: org.id.clone(),
                    matches,
                }
            })
            .collect();

        MatchResult { entries }
    }

    fn match_profile(&self, profile: &OrgProfile, alerts: &[PreparedAlert<'_>]) -> Vec<AlertMatch> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for alert in alerts {
            if seen.contains(alert.id()) {
                continue;
            }
            if let Some(strategy) = self.first_strategy(profile, alert) {
                seen.insert(alert.id());
                matches.push(AlertMatch {
                    alert_id: alert.id().to_string(),
                    method: strategy.method(),
                    confidence: strategy.confidence(),
                });
            }
        }
        matches
    }
}
