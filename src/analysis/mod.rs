/// Alert analysis for the enrichment service.
///
/// Turns normalized alerts and organizations into per-organization alert
/// summaries. No I/O happens here; everything is a pure function of the
/// inputs handed in by the pipeline.
///
/// Submodules:
/// - `zones`    - zone → region code table and per-alert region resolution.
/// - `matching` - ordered matching strategies pairing alerts with organizations.
/// - `severity` - folds each organization's matched alerts into summary fields.

pub mod matching;
pub mod severity;
pub mod zones;
