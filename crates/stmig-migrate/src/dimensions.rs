//! The five scoring dimensions.
//!
//! Every dimension is a pure function of one unit and the findings assigned
//! to it, clamped to `[0, 100]`.

use stmig_extract::{CriticalWarning, SafetyBypass, SafetyInterlock, Severity, StateMachine};
use stmig_syntax::{Docstring, Pou, Variable};

/// A unit together with the findings located inside it.
#[derive(Debug, Clone)]
pub struct UnitFindings<'a> {
    /// The unit.
    pub pou: &'a Pou,
    /// Its docstring: the attached one, else one associated by name.
    pub documentation: Option<&'a Docstring>,
    /// State machines whose `pouName` is the unit.
    pub state_machines: Vec<&'a StateMachine>,
    /// Interlocks declared within the unit's lines.
    pub interlocks: Vec<&'a SafetyInterlock>,
    /// Bypasses located within the unit's lines.
    pub bypasses: Vec<&'a SafetyBypass>,
    /// Critical warnings located within the unit's lines.
    pub warnings: Vec<&'a CriticalWarning>,
    /// Outgoing dependency count, when a call graph is available.
    pub dependencies: Option<usize>,
}

impl UnitFindings<'_> {
    fn is_documented(&self, var: &Variable) -> bool {
        var.is_documented() || self.documentation.is_some_and(|doc| doc.param(&var.name).is_some())
    }

    fn ratio<'v>(&self, vars: impl Iterator<Item = &'v Variable>) -> Option<f64> {
        let (mut total, mut documented) = (0usize, 0usize);
        for var in vars {
            total += 1;
            if self.is_documented(var) {
                documented += 1;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = (total > 0).then(|| documented as f64 / total as f64);
        ratio
    }

    pub(crate) fn input_ratio(&self) -> Option<f64> {
        self.ratio(self.pou.inputs())
    }

    pub(crate) fn output_ratio(&self) -> Option<f64> {
        self.ratio(self.pou.outputs())
    }

    pub(crate) fn undocumented_safety_variables(&self) -> usize {
        self.pou
            .variables
            .iter()
            .filter(|var| var.is_safety_critical && !self.is_documented(var))
            .count()
    }

    pub(crate) fn undocumented_interlocks(&self) -> usize {
        self.interlocks
            .iter()
            .filter(|interlock| {
                !self
                    .pou
                    .find_variable(&interlock.name)
                    .is_some_and(|var| self.is_documented(var))
            })
            .count()
    }
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Documentation coverage.
#[must_use]
pub fn documentation_score(unit: &UnitFindings<'_>) -> f64 {
    let mut score = 0.0;
    if let Some(doc) = unit.documentation {
        score += 20.0;
        if !doc.summary.trim().is_empty() {
            score += 15.0;
        }
        if !doc.history.is_empty() {
            score += 15.0;
        }
    }
    score += 20.0 * unit.input_ratio().unwrap_or(1.0);
    score += 15.0 * unit.ratio(unit.pou.variables.iter()).unwrap_or(1.0);
    score += 15.0 * unit.ratio(unit.pou.variables.iter().filter(|var| var.is_safety_critical)).unwrap_or(1.0);
    clamp(score)
}

fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 20.0,
        Severity::High => 10.0,
        Severity::Medium => 5.0,
        Severity::Low => 2.0,
    }
}

/// Safety findings.
#[must_use]
pub fn safety_score(unit: &UnitFindings<'_>) -> f64 {
    let mut score = 100.0;
    if !unit.bypasses.is_empty() {
        score -= 40.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        score -= 5.0 * unit.undocumented_interlocks() as f64;
        score -= 3.0 * unit.undocumented_safety_variables() as f64;
    }
    score -= unit.warnings.iter().map(|warning| severity_penalty(warning.severity)).sum::<f64>();
    clamp(score)
}

fn tier(value: usize, tiers: [(usize, f64); 3]) -> f64 {
    tiers
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map_or(0.0, |(_, penalty)| *penalty)
}

/// Size and state machine shape.
#[must_use]
pub fn complexity_score(unit: &UnitFindings<'_>) -> f64 {
    let mut score = 100.0;
    score -= tier(unit.pou.body_length() as usize, [(500, 30.0), (200, 15.0), (100, 5.0)]);
    for machine in &unit.state_machines {
        score -= tier(machine.states.len(), [(20, 20.0), (10, 10.0), (5, 5.0)]);
        if machine.verification.has_deadlocks {
            score -= 15.0;
        }
        if machine.verification.has_gaps {
            score -= 10.0;
        }
        if !machine.verification.unreachable_states.is_empty() {
            score -= 5.0;
        }
    }
    score -= tier(unit.pou.variables.len(), [(50, 15.0), (30, 10.0), (20, 5.0)]);
    clamp(score)
}

/// Score used when no call graph is supplied.
pub const UNKNOWN_DEPENDENCIES_SCORE: f64 = 80.0;

/// Outgoing dependencies.
#[must_use]
pub fn dependencies_score(unit: &UnitFindings<'_>) -> f64 {
    match unit.dependencies {
        None => UNKNOWN_DEPENDENCIES_SCORE,
        Some(count) => clamp(100.0 - tier(count, [(10, 30.0), (5, 15.0), (3, 5.0)])),
    }
}

/// Interface clarity.
#[must_use]
pub fn testability_score(unit: &UnitFindings<'_>) -> f64 {
    let mut score = 100.0;
    let inputs = unit.input_ratio();
    let outputs = unit.output_ratio();
    if inputs.is_none() && outputs.is_none() {
        score -= 20.0;
    }
    if inputs.is_some_and(|ratio| ratio < 0.5) {
        score -= 15.0;
    }
    if outputs.is_some_and(|ratio| ratio < 0.5) {
        score -= 15.0;
    }
    for machine in &unit.state_machines {
        if machine.unnamed_ratio() > 0.5 {
            score -= 10.0;
        }
    }
    clamp(score)
}
