//! Per-alert checks used during aggregation.
//!
//! - `activity` - is an alert in effect at a given instant.
//! - `scoring`  - weighted numeric severity score for one alert.

pub mod activity;
pub mod scoring;
