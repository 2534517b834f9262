//! Weather-alert enrichment service
//!
//! Pairs active NWS weather alerts with a geocoded organization table and
//! appends per-organization alert summaries for dashboarding.
//!
//! - `model`    - alert, organization and match types; core errors.
//! - `regions`  - static forecast-office reference data.
//! - `alert`    - per-alert activity and scoring.
//! - `analysis` - zone resolution, matching, aggregation.
//! - `ingest`   - NWS alert feed and organization table readers.
//! - `pipeline` - one enrichment pass end to end.
//! - `output`   - enriched table and CSV sink.
//! - `report`   - run counters.
//! - `config`, `logging` - ambient setup.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod regions;
pub mod report;
