//! Analyzer errors.

use smol_str::SmolStr;
use stmig_migrate::WeightsError;
use thiserror::Error;

/// Errors raised while configuring an analysis.
///
/// Analysis itself is total; only loading configuration and compiling
/// user-supplied patterns can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    /// Unreadable or malformed configuration.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// A user-supplied bypass pattern that does not compile.
    #[error("invalid bypass pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: SmolStr,
        /// Compiler message.
        reason: SmolStr,
    },

    /// Scoring weights out of range.
    #[error(transparent)]
    Weights(#[from] WeightsError),
}
