//! Severity scale shared by safety warnings and tribal-knowledge items.

use serde::{Deserialize, Serialize};

/// Severity or importance of a finding, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be resolved before migration.
    Critical,
    /// Needs review.
    High,
    /// Worth noting.
    Medium,
    /// Informational.
    Low,
}

impl Severity {
    /// Returns the serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
