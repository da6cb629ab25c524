//! Analysis configuration loading.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use smol_str::SmolStr;
use stmig_extract::{SafetyPatterns, StateMachineOptions};
use stmig_migrate::ScoringWeights;
use stmig_syntax::ParseOptions;
use tracing::warn;

use crate::error::AnalyzerError;

/// Conventional configuration file name at a project root.
pub const CONFIG_FILE_NAME: &str = "stmig.toml";

/// Settings for one analysis run. Every key of `stmig.toml` is optional.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    /// Parser settings.
    pub parse: ParseOptions,
    /// State machine extraction settings.
    pub state_machines: StateMachineOptions,
    /// Bypass patterns added to the built-in family, as written.
    pub extra_bypass_patterns: Vec<SmolStr>,
    /// Compiled safety tables, built-ins plus `extra_bypass_patterns`.
    pub safety: SafetyPatterns,
    /// Validated scoring weights.
    pub scoring: ScoringWeights,
}

impl AnalysisConfig {
    /// Parses configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, AnalyzerError> {
        let raw: AnalysisToml = toml::from_str(text)
            .map_err(|err| AnalyzerError::InvalidConfig(format!("{CONFIG_FILE_NAME}: {err}").into()))?;
        raw.into_config().inspect_err(|err| warn!(%err, "rejected analysis configuration"))
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalyzerError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| AnalyzerError::InvalidConfig(format!("{CONFIG_FILE_NAME}: {err}").into()))?;
        Self::from_toml_str(&text)
    }

    /// Loads `stmig.toml` from `root` when present, else returns the defaults.
    pub fn load_from_root(root: impl AsRef<Path>) -> Result<Self, AnalyzerError> {
        let path = root.as_ref().join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnalysisToml {
    docstrings: Option<DocstringsSection>,
    state_machines: Option<StateMachinesSection>,
    safety: Option<SafetySection>,
    scoring: Option<ScoringWeights>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocstringsSection {
    adjacency_tolerance: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateMachinesSection {
    min_states: Option<usize>,
    max_gap_spacing: Option<f64>,
    fallback_window_lines: Option<u32>,
    max_actions_per_state: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SafetySection {
    extra_bypass_patterns: Option<Vec<String>>,
}

fn invalid(message: String) -> AnalyzerError {
    AnalyzerError::InvalidConfig(format!("{CONFIG_FILE_NAME}: {message}").into())
}

impl AnalysisToml {
    fn into_config(self) -> Result<AnalysisConfig, AnalyzerError> {
        let mut parse = ParseOptions::default();
        if let Some(tolerance) = self.docstrings.and_then(|section| section.adjacency_tolerance) {
            parse.adjacency_tolerance = tolerance;
        }

        let mut state_machines = StateMachineOptions::default();
        if let Some(section) = self.state_machines {
            if let Some(min_states) = section.min_states {
                if min_states == 0 {
                    return Err(invalid("state_machines.min_states must be at least 1".to_string()));
                }
                state_machines.min_states = min_states;
            }
            if let Some(spacing) = section.max_gap_spacing {
                if !spacing.is_finite() || spacing <= 0.0 {
                    return Err(invalid(format!("state_machines.max_gap_spacing must be positive, got {spacing}")));
                }
                state_machines.max_gap_spacing = spacing;
            }
            if let Some(window) = section.fallback_window_lines {
                if window == 0 {
                    return Err(invalid("state_machines.fallback_window_lines must be at least 1".to_string()));
                }
                state_machines.fallback_window_lines = window;
            }
            if let Some(actions) = section.max_actions_per_state {
                state_machines.max_actions_per_state = actions;
            }
        }

        let extra: Vec<String> = self
            .safety
            .and_then(|section| section.extra_bypass_patterns)
            .unwrap_or_default();
        for pattern in &extra {
            Regex::new(pattern).map_err(|err| AnalyzerError::InvalidPattern {
                pattern: pattern.as_str().into(),
                reason: err.to_string().into(),
            })?;
        }
        let safety = SafetyPatterns::with_extra_bypass_patterns(&extra).map_err(|err| {
            AnalyzerError::InvalidPattern {
                pattern: extra.join(" | ").into(),
                reason: err.to_string().into(),
            }
        })?;

        let scoring = self.scoring.unwrap_or_default();
        scoring.validate()?;

        Ok(AnalysisConfig {
            parse,
            state_machines,
            extra_bypass_patterns: extra.into_iter().map(SmolStr::from).collect(),
            safety,
            scoring,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config.parse, ParseOptions::default());
        assert_eq!(config.state_machines, StateMachineOptions::default());
        assert_eq!(config.scoring, ScoringWeights::default());
        assert!(config.extra_bypass_patterns.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AnalysisConfig::from_toml_str("[state_machines]\nmin_states = 3\n").unwrap();
        assert_eq!(config.state_machines.min_states, 3);
        assert_eq!(
            config.state_machines.fallback_window_lines,
            StateMachineOptions::default().fallback_window_lines
        );
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = AnalysisConfig::from_toml_str("[state_machines]\nfallback_window_lines = 0\n").unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidConfig(_)));
    }

    #[test]
    fn bad_pattern_names_the_pattern() {
        let err = AnalysisConfig::from_toml_str("[safety]\nextra_bypass_patterns = [\"(?i)jumper\", \"(unclosed\"]\n")
            .unwrap_err();
        match err {
            AnalyzerError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_file_under_root_gives_defaults() {
        let root = std::env::temp_dir().join("stmig-config-missing-root");
        let config = AnalysisConfig::load_from_root(&root).unwrap();
        assert_eq!(config.scoring, ScoringWeights::default());
    }
}
