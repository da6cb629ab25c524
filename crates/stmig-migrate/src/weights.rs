//! Dimension weights.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed distance of the weight sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Weights of the five scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Documentation weight.
    pub documentation: f64,
    /// Safety weight.
    pub safety: f64,
    /// Complexity weight.
    pub complexity: f64,
    /// Dependencies weight.
    pub dependencies: f64,
    /// Testability weight.
    pub testability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            documentation: 0.25,
            safety: 0.30,
            complexity: 0.15,
            dependencies: 0.15,
            testability: 0.15,
        }
    }
}

/// Invalid weights.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    /// A weight is below zero.
    #[error("scoring weight '{name}' is negative ({value})")]
    Negative {
        /// Dimension name.
        name: &'static str,
        /// The offending weight.
        value: f64,
    },
    /// The weights do not add up to 1.
    #[error("scoring weights sum to {sum}, expected 1.0")]
    Sum {
        /// Actual sum.
        sum: f64,
    },
}

impl ScoringWeights {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("documentation", self.documentation),
            ("safety", self.safety),
            ("complexity", self.complexity),
            ("dependencies", self.dependencies),
            ("testability", self.testability),
        ]
    }

    /// Returns the sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.named().iter().map(|(_, value)| value).sum()
    }

    /// Checks that every weight is non-negative and that they sum to 1.
    pub fn validate(&self) -> Result<(), WeightsError> {
        if let Some((name, value)) = self.named().into_iter().find(|(_, value)| *value < 0.0 || value.is_nan()) {
            return Err(WeightsError::Negative { name, value });
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::Sum { sum });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ScoringWeights::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_negative_and_unbalanced_weights() {
        let negative = ScoringWeights {
            safety: -0.1,
            documentation: 0.65,
            ..ScoringWeights::default()
        };
        assert!(matches!(negative.validate(), Err(WeightsError::Negative { name: "safety", .. })));

        let heavy = ScoringWeights {
            safety: 0.5,
            ..ScoringWeights::default()
        };
        assert!(matches!(heavy.validate(), Err(WeightsError::Sum { .. })));

        let close = ScoringWeights {
            safety: 0.305,
            ..ScoringWeights::default()
        };
        assert_eq!(close.validate(), Ok(()));
    }
}
