/// NWS (National Weather Service) Alerts API Client
///
/// Retrieves the active alert set from api.weather.gov and converts each
/// GeoJSON feature into a `RawAlert` for the enrichment core. A transport
/// failure, a non-2xx response, or a payload that is not an alert
/// collection is fatal for the run; a single feature that cannot be read is
/// passed on as an id-less record so the core excludes and counts it.
///
/// API Documentation: https://www.weather.gov/documentation/services-web-api
/// Active alerts: https://api.weather.gov/alerts/active

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::config::NwsSettings;
use crate::logging::{self, DataSource};
use crate::model::RawAlert;

// ============================================================================
// Errors
// ============================================================================

/// Failures of the alert source. Any of these aborts the run; the core
/// never proceeds with a partial alert set.
#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    /// Non-2xx HTTP response from the NWS API.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Connection, timeout or TLS failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The body is not a GeoJSON alert collection.
    #[error("Parse error: {0}")]
    Parse(String),
    /// A replay file could not be read.
    #[error("cannot read alert file {path}: {message}")]
    Io { path: String, message: String },
}

// ============================================================================
// NWS API Response Structures
// ============================================================================

/// `/alerts/active` response body.
#[derive(Debug, Deserialize)]
pub struct NwsAlertCollection {
    /// Required: a body without `features` is not an alert collection.
    pub features: Vec<serde_json::Value>,
}

/// Single GeoJSON feature.
#[derive(Debug, Deserialize)]
pub struct NwsFeature {
    pub id: Option<String>,
    pub properties: Option<NwsProperties>,
}

/// CAP properties of one alert.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwsProperties {
    pub id: Option<String>,
    pub area_desc: Option<AreaDesc>,
    #[serde(default)]
    pub affected_zones: Vec<String>,
    pub effective: Option<String>,
    pub expires: Option<String>,
    pub status: Option<String>,
    pub message_type: Option<String>,
    pub severity: Option<String>,
    pub certainty: Option<String>,
    pub urgency: Option<String>,
    pub event: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub parameters: Option<NwsParameters>,
}

/// `areaDesc` is normally a "; "-separated string but occasionally a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AreaDesc {
    Text(String),
    List(Vec<String>),
}

impl AreaDesc {
    fn joined(self) -> String {
        match self {
            AreaDesc::Text(s) => s,
            AreaDesc::List(items) => items.join("; "),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NwsParameters {
    /// Six-character AWIPS product id, e.g. `WSWLWX`; the last three
    /// characters are the issuing office.
    #[serde(rename = "AWIPSidentifier", default)]
    pub awips_identifier: Vec<String>,
}

// ============================================================================
// Conversion
// ============================================================================

/// Issuing office code from an AWIPS identifier (`WSWLWX` → `LWX`).
pub fn office_from_awips(awips: &str) -> Option<String> {
    let awips = awips.trim();
    if awips.len() != 6 || !awips.is_ascii() {
        return None;
    }
    Some(awips[3..].to_ascii_uppercase())
}

impl From<NwsFeature> for RawAlert {
    fn from(feature: NwsFeature) -> Self {
        let props = feature.properties.unwrap_or_default();
        let region_code = props
            .parameters
            .as_ref()
            .and_then(|p| p.awips_identifier.first())
            .and_then(|a| office_from_awips(a));

        RawAlert {
            id: props.id.or(feature.id),
            event: props.event,
            severity: props.severity,
            urgency: props.urgency,
            certainty: props.certainty,
            status: props.status,
            message_type: props.message_type,
            headline: props.headline,
            description: props.description,
            instruction: props.instruction,
            area_desc: props.area_desc.map(AreaDesc::joined),
            affected_zones: props.affected_zones,
            region_code,
            effective: props.effective,
            expires: props.expires,
        }
    }
}

/// Parses an `/alerts/active` body.
///
/// Returns `Err` only when the body as a whole is unusable. Features that
/// fail to deserialize are logged and returned as empty records.
pub fn parse_alert_collection(body: &str) -> Result<Vec<RawAlert>, FetchError> {
    let collection: NwsAlertCollection =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let alerts = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(i, value)| match serde_json::from_value::<NwsFeature>(value) {
            Ok(feature) => RawAlert::from(feature),
            Err(e) => {
                logging::warn(
                    DataSource::Nws,
                    Some(&format!("feature[{}]", i)),
                    &format!("unreadable alert feature: {}", e),
                );
                RawAlert::default()
            }
        })
        .collect();

    Ok(alerts)
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Builds the blocking HTTP client with the configured user agent and
/// timeout. api.weather.gov rejects requests without a User-Agent.
pub fn build_client(settings: &NwsSettings) -> Result<reqwest::blocking::Client, FetchError> {
    reqwest::blocking::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| FetchError::Transport(e.to_string()))
}

/// Fetches every active alert.
pub fn fetch_active_alerts(
    client: &reqwest::blocking::Client,
    settings: &NwsSettings,
) -> Result<Vec<RawAlert>, FetchError> {
    let response = client
        .get(&settings.alerts_url)
        .header("Accept", "application/geo+json")
        .send()
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    logging::debug(DataSource::Nws, None, &format!("API response: {}", status));
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    let body = response
        .text()
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    let alerts = parse_alert_collection(&body)?;

    logging::info(DataSource::Nws, None, &format!("retrieved {} alerts", alerts.len()));
    Ok(alerts)
}

/// Loads a saved `/alerts/active` payload instead of calling the API.
pub fn load_alerts_file(path: &Path) -> Result<Vec<RawAlert>, FetchError> {
    let body = std::fs::read_to_string(path).map_err(|e| FetchError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_alert_collection(&body)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "id": "https://api.weather.gov/alerts/urn:oid:2.49.0.1.840.0.aaa",
                "type": "Feature",
                "properties": {
                    "id": "urn:oid:2.49.0.1.840.0.aaa",
                    "areaDesc": "Frederick, MD; Montgomery, MD",
                    "affectedZones": [
                        "https://api.weather.gov/zones/forecast/MDZ004",
                        "https://api.weather.gov/zones/forecast/MDZ503"
                    ],
                    "effective": "2024-01-15T06:00:00-05:00",
                    "expires": "2024-01-16T18:00:00-05:00",
                    "status": "Actual",
                    "messageType": "Alert",
                    "severity": "Moderate",
                    "certainty": "Likely",
                    "urgency": "Expected",
                    "event": "Winter Weather Advisory",
                    "senderName": "NWS Sterling VA",
                    "headline": "Winter Weather Advisory issued January 15",
                    "description": "Snow expected.",
                    "instruction": null,
                    "parameters": { "AWIPSidentifier": ["WSWLWX"] }
                }
            },
            {
                "id": "https://api.weather.gov/alerts/urn:oid:2.49.0.1.840.0.bbb",
                "type": "Feature",
                "properties": {
                    "areaDesc": ["Cape May", "Atlantic Coastal Cape May"],
                    "affectedZones": [],
                    "severity": "Minor",
                    "event": "Coastal Flood Advisory"
                }
            },
            { "type": "Feature", "properties": { "affectedZones": "not-a-list" } }
        ]
    }"#;

    #[test]
    fn test_parse_alert_collection_maps_properties() {
        let alerts = parse_alert_collection(SAMPLE).expect("sample should parse");
        assert_eq!(alerts.len(), 3);

        let first = &alerts[0];
        assert_eq!(first.id.as_deref(), Some("urn:oid:2.49.0.1.840.0.aaa"));
        assert_eq!(first.region_code.as_deref(), Some("LWX"));
        assert_eq!(first.affected_zones.len(), 2);
        assert_eq!(first.severity.as_deref(), Some("Moderate"));
        assert_eq!(first.instruction, None);
        assert_eq!(first.area_desc.as_deref(), Some("Frederick, MD; Montgomery, MD"));
    }

    #[test]
    fn test_feature_id_is_used_when_properties_lack_one() {
        let alerts = parse_alert_collection(SAMPLE).unwrap();
        let second = &alerts[1];
        assert_eq!(
            second.id.as_deref(),
            Some("https://api.weather.gov/alerts/urn:oid:2.49.0.1.840.0.bbb")
        );
        assert_eq!(second.area_desc.as_deref(), Some("Cape May; Atlantic Coastal Cape May"));
        assert_eq!(second.region_code, None);
    }

    #[test]
    fn test_unreadable_feature_becomes_empty_record() {
        let alerts = parse_alert_collection(SAMPLE).unwrap();
        assert_eq!(alerts[2], RawAlert::default());
    }

    #[test]
    fn test_payload_without_features_is_fatal() {
        assert!(matches!(
            parse_alert_collection(r#"{"type": "FeatureCollection"}"#),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(parse_alert_collection("<html>"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_empty_collection_is_not_an_error() {
        let alerts = parse_alert_collection(r#"{"features": []}"#).unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_office_from_awips() {
        assert_eq!(office_from_awips("WSWLWX"), Some("LWX".to_string()));
        assert_eq!(office_from_awips(" ffwphi "), Some("PHI".to_string()));
        assert_eq!(office_from_awips("WSW"), None);
        assert_eq!(office_from_awips(""), None);
    }

    #[test]
    fn test_missing_replay_file_is_io_error() {
        let result = load_alerts_file(Path::new("/nonexistent/alerts.json"));
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
