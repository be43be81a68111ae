use serde::{Deserialize, Serialize};

use crate::{Error, model::Severity};

/// Maps the highest active severity at a node to a cost multiplier.
/// `Critical` always blocks the node; the other levels are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            low: 1.2,
            moderate: 2.0,
            high: 5.0,
        }
    }
}

impl SeverityPolicy {
    /// Multipliers must be finite, at least `1.0` and non-decreasing with
    /// severity. Anything below `1.0` would let the A* estimate overshoot.
    pub fn validate(&self) -> Result<(), Error> {
        let levels = [("low", self.low), ("moderate", self.moderate), ("high", self.high)];

        for (name, value) in levels {
            if !value.is_finite() || value < 1.0 {
                return Err(Error::InvalidPolicy(format!(
                    "{name} multiplier must be a finite value >= 1.0, got {value}"
                )));
            }
        }
        if self.low > self.moderate || self.moderate > self.high {
            return Err(Error::InvalidPolicy(
                "multipliers must not decrease with severity".to_string(),
            ));
        }
        Ok(())
    }

    pub fn multiplier(&self, severity: Option<Severity>) -> f64 {
        match severity {
            None => 1.0,
            Some(Severity::Low) => self.low,
            Some(Severity::Moderate) => self.moderate,
            Some(Severity::High) => self.high,
            Some(Severity::Critical) => f64::INFINITY,
        }
    }
}
