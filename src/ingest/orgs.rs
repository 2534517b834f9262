/// Organization table ingestion.
///
/// Reads the geocoded organization table (CSV) into an `OrgTable` that
/// keeps every original column untouched, then derives the canonical
/// `Organization` view the matcher works on. Column-name aliasing is
/// resolved here, once; nothing downstream reasons about alias names.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;

use crate::model::{EnrichError, Organization, normalize_region_code};
use crate::regions::{OfficeDirectory, REGION_CODE_ALIASES};

// ---------------------------------------------------------------------------
// Column aliases
// ---------------------------------------------------------------------------

pub const ID_ALIASES: &[&str] = &["Organization ID", "Org_ID", "org_id", "ID", "id"];
pub const STREET_ALIASES: &[&str] = &["Primary Address Street", "Address", "address", "Street"];
pub const CITY_ALIASES: &[&str] = &["Primary Address City", "City", "city"];
pub const STATE_ALIASES: &[&str] = &["Primary Address State", "State", "state"];
pub const LATITUDE_ALIASES: &[&str] = &["Latitude", "latitude", "Lat", "lat"];
pub const LONGITUDE_ALIASES: &[&str] = &["Longitude", "longitude", "Lon", "lon", "lng"];
pub const OFFICE_NAME_ALIASES: &[&str] = &["Office_Name", "NWS_Office_Name"];
/// Alert ids written by a previous enrichment run.
pub const PRIOR_ALERT_ALIASES: &[&str] = &["alert_ids", "alert_id"];

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Errors reading the organization table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("organization table has no header row")]
    Empty,
    #[error("row {row} has {found} cells, header declares {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// The organization table exactly as supplied: header order and raw cell
/// text. Never mutated by the core.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrgTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OrgTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the first alias present in the header.
    pub fn first_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.column(a))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads a CSV organization table. Short rows are padded with empty cells;
/// rows longer than the header are rejected.
pub fn read_org_table<R: Read>(reader: R) -> Result<OrgTable, TableError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(TableError::Empty);
    }

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(TableError::RowWidth {
                row: i + 1,
                expected: headers.len(),
                found: record.len(),
            });
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(OrgTable { headers, rows })
}

pub fn read_org_table_path(path: &Path) -> Result<OrgTable, TableError> {
    let file = File::open(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_org_table(file)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Canonical organizations plus the region column that was used.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOrgs {
    pub region_column: String,
    pub organizations: Vec<Organization>,
}

/// Derives one `Organization` per table row, in row order.
///
/// Fails only when no recognized region-code column exists at all. A row
/// whose region cell is blank or unusable still yields an organization,
/// with `region_code: None`.
pub fn normalize_organizations(
    table: &OrgTable,
    offices: &OfficeDirectory,
) -> Result<NormalizedOrgs, EnrichError> {
    let region_idx = table
        .first_column(REGION_CODE_ALIASES)
        .ok_or_else(|| EnrichError::MissingRegionColumn {
            expected: REGION_CODE_ALIASES.iter().map(|a| a.to_string()).collect(),
            available: table.headers.clone(),
        })?;

    for (i, row) in table.rows.iter().enumerate() {
        if row.len() > table.headers.len() {
            return Err(EnrichError::RowWidth {
                row: i + 1,
                expected: table.headers.len(),
                found: row.len(),
            });
        }
    }

    let id_idx = table.first_column(ID_ALIASES);
    let street_idx = table.first_column(STREET_ALIASES);
    let city_idx = table.first_column(CITY_ALIASES);
    let state_idx = table.first_column(STATE_ALIASES);
    let lat_idx = table.first_column(LATITUDE_ALIASES);
    let lon_idx = table.first_column(LONGITUDE_ALIASES);
    let office_idx = table.first_column(OFFICE_NAME_ALIASES);
    let prior_idx = table.first_column(PRIOR_ALERT_ALIASES);

    let organizations = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cell = |idx: Option<usize>| {
                idx.and_then(|j| row.get(j))
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
            };

            let region_code = cell(Some(region_idx)).and_then(normalize_region_code);
            let office_name = cell(office_idx)
                .map(str::to_string)
                .or_else(|| region_code.as_deref().and_then(|c| offices.name_for(c)));

            Organization {
                row: i,
                id: cell(id_idx)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("row-{}", i + 1)),
                address: [cell(street_idx), cell(city_idx), cell(state_idx)]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", "),
                latitude: cell(lat_idx).and_then(|v| v.parse().ok()),
                longitude: cell(lon_idx).and_then(|v| v.parse().ok()),
                region_code,
                office_name,
                prior_alert_ids: cell(prior_idx).map(split_alert_ids).unwrap_or_default(),
            }
        })
        .collect();

    Ok(NormalizedOrgs {
        region_column: table.headers[region_idx].clone(),
        organizations,
    })
}

/// Splits a previously written alert id cell (`id1 | id2`) into ids.
fn split_alert_ids(cell: &str) -> Vec<String> {
    cell.split(['|', ';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
