/// End-to-end tests for the enrichment pipeline
///
/// Tests verify:
/// 1. A saved NWS payload and a CSV organization table enrich offline
/// 2. Row count, row order and original columns survive enrichment
/// 3. Each matching strategy is exercised and tagged
/// 4. Re-enriching a previous output replaces its derived columns, while an
///    organization table's own same-named columns are kept
/// 5. Text fallback reaches alerts that resolved to another office
///
/// No network or database access; run with: cargo test --test pipeline_integration

use chrono::{DateTime, TimeZone, Utc};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use wxalert_service::config::Config;
use wxalert_service::ingest::nws::{load_alerts_file, parse_alert_collection};
use wxalert_service::ingest::orgs::{read_org_table, read_org_table_path, OrgTable};
use wxalert_service::logging;
use wxalert_service::model::{Certainty, Confidence, MatchMethod, Severity, Urgency};
use wxalert_service::output::{write_enriched_csv, DERIVED_COLUMNS};
use wxalert_service::pipeline::{EnrichmentOutput, EnrichmentPipeline};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const ORGS_CSV: &str = "\
Organization ID,Organization Name,Primary Address Street,Primary Address City,Primary Address State,Latitude,Longitude,CWA_Region,Office_Name
org-1,Food Bank,1 Main St,Frederick,MD,39.41,-77.41,LWX,
org-2,Shelter,2 Oak Ave,Camden,NJ,39.93,-75.12,PHI,
org-3,Pantry,3 Elm St,Annapolis,MD,38.97,-76.49,XYZ,Maryland
org-4,Clinic,4 Pine Rd,Austin,TX,30.27,-97.74,,
org-5,Kitchen,\"5 Bay St, Suite 2\",Somewhere,ZZ,,,ABC,
";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap()
}

fn fixture_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/alerts_active.json"))
}

fn orgs_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(ORGS_CSV.as_bytes()).expect("write orgs");
    file
}

fn pipeline() -> EnrichmentPipeline {
    let mut config = Config::default();
    config.zones.entries.insert("NJZ017".to_string(), "PHI".to_string());
    EnrichmentPipeline::new(&config).expect("valid config")
}

fn run_fixture() -> (OrgTable, EnrichmentOutput) {
    logging::init_test();
    let file = orgs_file();
    let table = read_org_table_path(file.path()).expect("orgs table");
    let alerts = load_alerts_file(fixture_path()).expect("fixture payload");
    let output = pipeline().run(&table, alerts, now()).expect("run succeeds");
    (table, output)
}

fn methods_for(output: &EnrichmentOutput, org_id: &str) -> Vec<MatchMethod> {
    output
        .matches
        .for_org(org_id)
        .map(|e| e.matches.iter().map(|m| m.method).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_every_input_row_appears_once_in_order() {
    let (table, output) = run_fixture();

    assert_eq!(output.table.len(), table.len());
    for (row, original) in output.table.rows.iter().zip(&table.rows) {
        assert_eq!(&row.values, original, "original cells must pass through untouched");
    }
}

#[test]
fn test_run_report_counts() {
    let (_, output) = run_fixture();
    let report = &output.report;

    assert_eq!(report.region_column.as_deref(), Some("CWA_Region"));
    assert_eq!(report.organizations_total, 5);
    assert_eq!(report.organizations_with_region, 4);
    assert_eq!(report.organizations_matched, 3);
    assert_eq!(report.alerts_received, 6);
    assert_eq!(report.alerts_malformed, 1);
    assert_eq!(report.alerts_duplicate, 1);
    assert_eq!(report.alerts_considered, 4);
    assert_eq!(report.alerts_unmatched_by_zone, 1);
    assert_eq!(report.alerts_matched, 3);
    assert_eq!(report.alerts_dropped, 1);
    assert_eq!(report.matches_by_method["region_code"], 2);
    assert_eq!(report.matches_by_method["text_content"], 1);
    assert_eq!(report.matches_by_method["alert_id"], 0);
}

#[test]
fn test_explicit_office_code_matches_by_region() {
    let (_, output) = run_fixture();
    let summary = &output.table.rows[0].summary;

    assert_eq!(methods_for(&output, "org-1"), vec![MatchMethod::RegionCode]);
    assert_eq!(summary.alert_ids, vec!["urn:oid:2.49.0.1.840.0.lwx1"]);
    assert_eq!(summary.severity, Severity::Moderate);
    assert_eq!(summary.areas, vec!["Frederick, MD", "Montgomery, MD"]);
    assert!(summary.has_active_alerts);
}

#[test]
fn test_static_zone_table_matches_by_region() {
    let (_, output) = run_fixture();
    let summary = &output.table.rows[1].summary;

    assert_eq!(methods_for(&output, "org-2"), vec![MatchMethod::RegionCode]);
    assert_eq!(summary.severity, Severity::Severe);
    assert_eq!(summary.urgency, Urgency::Immediate);
    assert_eq!(summary.certainty, Certainty::Observed);
    assert_eq!(summary.severity_score, 85.0);
}

#[test]
fn test_office_name_in_area_text_matches_by_text_fallback() {
    let (_, output) = run_fixture();

    assert_eq!(methods_for(&output, "org-3"), vec![MatchMethod::TextContent]);
    assert_eq!(
        output.table.rows[2].summary.alert_ids,
        vec!["urn:oid:2.49.0.1.840.0.md1"]
    );
}

#[test]
fn test_unmatched_rows_get_explicit_defaults() {
    let (_, output) = run_fixture();

    for row in &output.table.rows[3..] {
        let s = &row.summary;
        assert_eq!(s.alert_count, 0);
        assert_eq!(s.severity, Severity::Unknown);
        assert_eq!(s.urgency, Urgency::Unknown);
        assert_eq!(s.certainty, Certainty::Unknown);
        assert_eq!(s.severity_score, 0.0);
        assert!(s.headlines.is_empty());
        assert!(!s.has_active_alerts);
    }
}

#[test]
fn test_csv_output_columns_and_defaults() {
    let (_, output) = run_fixture();
    let mut buf = Vec::new();
    write_enriched_csv(&mut buf, &output.table, &Config::default().text).expect("write csv");

    let written = read_org_table(buf.as_slice()).expect("output is valid csv");
    assert_eq!(written.len(), 5);
    assert_eq!(written.headers.len(), 9 + DERIVED_COLUMNS.len());
    assert_eq!(&written.headers[..9], &output.table.headers[..]);
    assert_eq!(&written.headers[9..], &DERIVED_COLUMNS[..]);

    let col = |name: &str| written.column(name).expect("column present");
    assert_eq!(written.rows[0][col("alert_count")], "1");
    assert_eq!(written.rows[0][col("severity")], "Moderate");
    assert_eq!(written.rows[0][col("match_methods")], "region_code");
    assert!(!written.rows[0][col("description")].contains('\n'));
    assert_eq!(written.rows[3][col("alert_count")], "0");
    assert_eq!(written.rows[3][col("severity")], "Unknown");
    assert_eq!(written.rows[3][col("severity_score")], "0.0");
    assert_eq!(written.rows[3][col("alert_ids")], "");
    assert_eq!(written.rows[4][col("Primary Address Street")], "5 Bay St, Suite 2");
    assert_eq!(written.rows[4][col("last_updated")], "2024-01-15T17:00:00Z");
}

#[test]
fn test_re_enrichment_replaces_derived_columns() {
    let (_, first) = run_fixture();
    let mut buf = Vec::new();
    write_enriched_csv(&mut buf, &first.table, &Config::default().text).expect("write csv");
    let previous = read_org_table(buf.as_slice()).expect("previous output");

    let alerts = load_alerts_file(fixture_path()).expect("fixture payload");
    let second = pipeline().run(&previous, alerts, now()).expect("second run");

    assert_eq!(second.table.headers, first.table.headers);
    assert_eq!(methods_for(&second, "org-1"), vec![MatchMethod::AlertId]);
    assert_eq!(methods_for(&second, "org-2"), vec![MatchMethod::AlertId]);
    assert_eq!(
        second.table.rows[0].summary.alert_ids,
        first.table.rows[0].summary.alert_ids
    );
}

#[test]
fn test_identical_inputs_give_identical_output() {
    let (_, first) = run_fixture();
    let (_, second) = run_fixture();

    assert_eq!(first.matches, second.matches);
    assert_eq!(first.table, second.table);
}

#[test]
fn test_org_columns_named_like_derived_columns_are_kept() {
    logging::init_test();
    let csv = "\
Organization ID,CWA_Region,description,severity
org-1,LWX,Community food bank,high-priority
org-2,ABC,Mobile pantry,
";
    let table = read_org_table(csv.as_bytes()).expect("orgs table");
    let alerts = load_alerts_file(fixture_path()).expect("fixture payload");
    let output = pipeline().run(&table, alerts, now()).expect("run succeeds");

    assert_eq!(
        output.table.headers,
        vec!["Organization ID", "CWA_Region", "description", "severity"]
    );
    assert_eq!(
        output.table.rows[0].values,
        vec!["org-1", "LWX", "Community food bank", "high-priority"]
    );

    let mut buf = Vec::new();
    write_enriched_csv(&mut buf, &output.table, &Config::default().text).expect("write csv");
    let written = read_org_table(buf.as_slice()).expect("output is valid csv");
    assert_eq!(written.headers.len(), 4 + DERIVED_COLUMNS.len());

    let col = |name: &str| written.column(name).expect("column present");
    assert_eq!(written.rows[0][col("description")], "Community food bank");
    assert_eq!(written.rows[0][col("severity")], "high-priority");
    assert_eq!(written.rows[0][col("severity_alert")], "Moderate");
    assert!(written.rows[0][col("description_alert")].starts_with("* WHAT...Snow expected."));
    assert_eq!(written.rows[1][col("description")], "Mobile pantry");
    assert_eq!(written.rows[1][col("severity_alert")], "Unknown");
}

#[test]
fn test_text_fallback_matches_alert_resolved_to_another_office() {
    logging::init_test();
    let payload = r#"{
        "type": "FeatureCollection",
        "features": [{
            "id": "https://api.weather.gov/alerts/sps1",
            "type": "Feature",
            "properties": {
                "id": "sps1",
                "areaDesc": "Camden",
                "affectedZones": ["https://api.weather.gov/zones/forecast/NJZ017"],
                "effective": "2024-01-15T10:00:00-05:00",
                "expires": "2024-01-15T18:00:00-05:00",
                "status": "Actual",
                "messageType": "Alert",
                "severity": "Minor",
                "certainty": "Observed",
                "urgency": "Expected",
                "event": "Special Weather Statement",
                "headline": "Statement issued by NWS LWX for Frederick",
                "parameters": { "AWIPSidentifier": ["SPSPHI"] }
            }
        }]
    }"#;
    let alerts = parse_alert_collection(payload).expect("payload parses");
    let csv = "Organization ID,CWA_Region\norg-lwx,LWX\norg-phi,PHI\norg-lot,LOT\n";
    let table = read_org_table(csv.as_bytes()).expect("orgs table");
    let output = pipeline().run(&table, alerts, now()).expect("run succeeds");

    assert_eq!(methods_for(&output, "org-phi"), vec![MatchMethod::RegionCode]);
    assert_eq!(methods_for(&output, "org-lwx"), vec![MatchMethod::TextContent]);
    assert!(methods_for(&output, "org-lot").is_empty());

    let lwx = output.matches.for_org("org-lwx").expect("entry for every org");
    assert_eq!(lwx.matches[0].confidence, Confidence::Low);
    assert_eq!(output.table.rows[0].summary.match_confidence, Some(Confidence::Low));
    assert_eq!(output.table.rows[1].summary.match_confidence, Some(Confidence::High));
    assert_eq!(output.report.matches_by_method["text_content"], 1);
}
