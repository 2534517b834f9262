//! Alert severity scoring.
//!
//! Collapses an alert's three ordinal classifications into one number for
//! dashboard sorting and coloring. The weights come from configuration and
//! must stay fixed between runs so dashboards remain comparable over time.

use serde::Deserialize;

use crate::model::AlertRecord;

/// Highest ordinal rank of any classification (Extreme / Immediate / Observed).
const MAX_RANK: f64 = 4.0;

/// Weights for the severity score. Defaults: severity 0.6, urgency 0.25,
/// certainty 0.15, scaled to 0..=100.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub severity_weight: f64,
    pub urgency_weight: f64,
    pub certainty_weight: f64,
    /// Score of an Extreme / Immediate / Observed alert.
    pub scale: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            severity_weight: 0.6,
            urgency_weight: 0.25,
            certainty_weight: 0.15,
            scale: 100.0,
        }
    }
}

impl ScoreWeights {
    /// Checks that the weights produce a well-defined score.
    pub fn validate(&self) -> Result<(), String> {
        let weights = [self.severity_weight, self.urgency_weight, self.certainty_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(format!("score weights must be finite and non-negative: {:?}", weights));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err("at least one score weight must be positive".to_string());
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!("score scale must be positive, got {}", self.scale));
        }
        Ok(())
    }

    /// Scores a single alert:
    ///
    ///   scale * (ws*sev + wu*urg + wc*cert) / (4 * (ws + wu + wc))
    ///
    /// rounded to one decimal place so the CSV output is byte-stable.
    pub fn score(&self, alert: &AlertRecord) -> f64 {
        let total = self.severity_weight + self.urgency_weight + self.certainty_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = self.severity_weight * f64::from(alert.severity.rank())
            + self.urgency_weight * f64::from(alert.urgency.rank())
            + self.certainty_weight * f64::from(alert.certainty.rank());
        let raw = self.scale * weighted / (MAX_RANK * total);
        (raw * 10.0).round() / 10.0
    }
}
