//! Weighted scoring, blockers, ordering and effort.

use smol_str::SmolStr;
use stmig_extract::{SafetyExtraction, Severity, StateMachine};
use stmig_syntax::{Docstring, Pou, PouType, SourceLocation};
use tracing::debug;

use crate::call_graph::CallGraph;
use crate::dimensions::{
    complexity_score, dependencies_score, documentation_score, safety_score, testability_score,
    UnitFindings,
};
use crate::report::{
    Blocker, BlockerKind, DimensionScores, EstimatedEffort, Grade, MigrationReport, MigrationStep,
    PouEffort, PouMigrationScore, ProjectRisk, RiskKind,
};
use crate::weights::ScoringWeights;

/// Documentation score below which a unit is blocked.
pub const DOCUMENTATION_BLOCKER_THRESHOLD: f64 = 30.0;
/// Share of unnamed states above which a state machine blocks its unit.
pub const UNNAMED_STATES_BLOCKER_RATIO: f64 = 0.5;
/// Upper bound of the effort confidence.
pub const MAX_EFFORT_CONFIDENCE: f64 = 0.9;

/// Baseline hours to migrate a unit of a kind.
#[must_use]
pub fn base_hours(pou_type: PouType) -> f64 {
    match pou_type {
        PouType::Program => 8.0,
        PouType::FunctionBlock => 4.0,
        PouType::Function => 2.0,
        PouType::Class | PouType::Interface => 4.0,
    }
}

/// Hours for one unit: `base × (2 − score/100) × (1 + 0.5 × blockers)`, rounded.
#[must_use]
pub fn unit_hours(pou_type: PouType, score: f64, blockers: usize) -> u32 {
    #[allow(clippy::cast_precision_loss)]
    let hours = base_hours(pou_type) * (2.0 - score / 100.0) * (1.0 + 0.5 * blockers as f64);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = hours.round().max(0.0) as u32;
    rounded
}

fn within(pou: &Pou, location: &SourceLocation) -> bool {
    let (first, last) = pou.line_span();
    location.file == pou.location.file && (first..=last).contains(&location.line)
}

fn find_docstring<'a>(pou: &'a Pou, docstrings: &'a [Docstring]) -> Option<&'a Docstring> {
    pou.documentation.as_ref().or_else(|| {
        docstrings.iter().find(|doc| {
            doc.location.file == pou.location.file
                && doc
                    .associated_block
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(&pou.name))
        })
    })
}

fn collect<'a>(
    pou: &'a Pou,
    docstrings: &'a [Docstring],
    state_machines: &'a [StateMachine],
    safety: &'a SafetyExtraction,
    call_graph: Option<&CallGraph>,
) -> UnitFindings<'a> {
    UnitFindings {
        pou,
        documentation: find_docstring(pou, docstrings),
        state_machines: state_machines
            .iter()
            .filter(|machine| {
                machine.pou_name.eq_ignore_ascii_case(&pou.name) && machine.location.file == pou.location.file
            })
            .collect(),
        interlocks: safety.interlocks.iter().filter(|i| within(pou, &i.location)).collect(),
        bypasses: safety.bypasses.iter().filter(|b| within(pou, &b.location)).collect(),
        warnings: safety
            .critical_warnings
            .iter()
            .filter(|w| within(pou, &w.location))
            .collect(),
        dependencies: call_graph.map(|graph| graph.outgoing_count(&pou.name)),
    }
}

fn blockers(unit: &UnitFindings<'_>, documentation: f64) -> Vec<Blocker> {
    let mut blockers: Vec<Blocker> = unit
        .bypasses
        .iter()
        .map(|bypass| Blocker {
            severity: Severity::Critical,
            kind: BlockerKind::SafetyBypass,
            message: format!(
                "Safety bypass '{}' at line {} must be reviewed before migration",
                bypass.name, bypass.location.line
            ),
        })
        .collect();
    for machine in &unit.state_machines {
        if machine.unnamed_ratio() > UNNAMED_STATES_BLOCKER_RATIO {
            blockers.push(Blocker {
                severity: Severity::High,
                kind: BlockerKind::UnnamedStates,
                message: format!(
                    "State machine '{}' has {} of {} states without a name",
                    machine.name,
                    machine.states.iter().filter(|s| !s.is_named()).count(),
                    machine.states.len()
                ),
            });
        }
    }
    if documentation < DOCUMENTATION_BLOCKER_THRESHOLD {
        blockers.push(Blocker {
            severity: Severity::High,
            kind: BlockerKind::LowDocumentation,
            message: format!("Documentation score {documentation:.0} is below {DOCUMENTATION_BLOCKER_THRESHOLD:.0}"),
        });
    }
    blockers
}

fn warnings(unit: &UnitFindings<'_>) -> Vec<String> {
    let mut warnings: Vec<String> = unit
        .warnings
        .iter()
        .filter(|warning| warning.severity != Severity::Critical)
        .map(|warning| format!("line {}: {}", warning.location.line, warning.message))
        .collect();
    for machine in &unit.state_machines {
        let verification = &machine.verification;
        if verification.has_deadlocks {
            let states: Vec<String> = verification.deadlock_states.iter().map(ToString::to_string).collect();
            warnings.push(format!("State machine '{}' has deadlock states: {}", machine.name, states.join(", ")));
        }
        if !verification.unreachable_states.is_empty() {
            let states: Vec<String> = verification.unreachable_states.iter().map(ToString::to_string).collect();
            warnings.push(format!("State machine '{}' has unreachable states: {}", machine.name, states.join(", ")));
        }
        if !verification.missing_transitions.is_empty() {
            warnings.push(format!(
                "State machine '{}' assigns {} undefined state value(s)",
                machine.name,
                verification.missing_transitions.len()
            ));
        }
    }
    let undocumented = unit.undocumented_interlocks();
    if undocumented > 0 {
        warnings.push(format!("{undocumented} interlock(s) without a comment"));
    }
    warnings
}

fn suggestions(unit: &UnitFindings<'_>, scores: &DimensionScores) -> Vec<String> {
    let mut suggestions = Vec::new();
    if unit.documentation.is_none() {
        suggestions.push(format!("Add a header docstring with a summary above '{}'", unit.pou.name));
    }
    if unit.input_ratio().is_some_and(|ratio| ratio < 1.0) {
        suggestions.push("Document every input with a trailing comment or @param".to_string());
    }
    if unit.undocumented_safety_variables() > 0 {
        suggestions.push("Comment every safety-critical variable with its role and wiring".to_string());
    }
    if unit.pou.body_length() > 200 {
        suggestions.push("Split the body into smaller function blocks or methods".to_string());
    }
    for machine in &unit.state_machines {
        if machine.unnamed_ratio() > 0.0 {
            suggestions.push(format!(
                "Replace the numeric states of '{}' with an enumeration",
                machine.name
            ));
        }
    }
    if scores.dependencies < 85.0 && unit.dependencies.is_some() {
        suggestions.push("Reduce the number of units this one depends on".to_string());
    }
    suggestions
}

fn weighted(scores: &DimensionScores, weights: &ScoringWeights) -> f64 {
    let total = scores.documentation * weights.documentation
        + scores.safety * weights.safety
        + scores.complexity * weights.complexity
        + scores.dependencies * weights.dependencies
        + scores.testability * weights.testability;
    total.clamp(0.0, 100.0)
}

/// Scores one unit.
#[must_use]
pub fn score_unit(unit: &UnitFindings<'_>, weights: &ScoringWeights) -> PouMigrationScore {
    let dimension_scores = DimensionScores {
        documentation: documentation_score(unit),
        safety: safety_score(unit),
        complexity: complexity_score(unit),
        dependencies: dependencies_score(unit),
        testability: testability_score(unit),
    };
    let overall_score = weighted(&dimension_scores, weights);
    PouMigrationScore {
        pou_id: unit.pou.id.clone(),
        pou_name: unit.pou.name.clone(),
        overall_score,
        grade: Grade::from_score(overall_score),
        blockers: blockers(unit, dimension_scores.documentation),
        warnings: warnings(unit),
        suggestions: suggestions(unit, &dimension_scores),
        dimension_scores,
    }
}

/// Orders units by ascending blocker count, then descending score. Ties keep
/// input order.
#[must_use]
pub fn migration_order(scores: &[PouMigrationScore]) -> Vec<MigrationStep> {
    let mut order: Vec<&PouMigrationScore> = scores.iter().collect();
    order.sort_by(|a, b| {
        a.blockers
            .len()
            .cmp(&b.blockers.len())
            .then_with(|| b.overall_score.total_cmp(&a.overall_score))
    });
    order
        .into_iter()
        .enumerate()
        .map(|(index, score)| MigrationStep {
            position: index + 1,
            pou_id: score.pou_id.clone(),
            pou_name: score.pou_name.clone(),
            overall_score: score.overall_score,
            blocker_count: score.blockers.len(),
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    #[allow(clippy::cast_precision_loss)]
    let mean = if count == 0 { 0.0 } else { sum / count as f64 };
    mean
}

fn effort(pous: &[Pou], scores: &[PouMigrationScore]) -> EstimatedEffort {
    let per_pou: Vec<PouEffort> = pous
        .iter()
        .zip(scores)
        .map(|(pou, score)| PouEffort {
            pou_id: score.pou_id.clone(),
            pou_name: score.pou_name.clone(),
            hours: unit_hours(pou.pou_type, score.overall_score, score.blockers.len()),
        })
        .collect();
    let mean_score = mean(scores.iter().map(|score| score.overall_score));
    EstimatedEffort {
        total_hours: per_pou.iter().map(|entry| entry.hours).sum(),
        per_pou,
        confidence: (mean_score / 100.0).min(MAX_EFFORT_CONFIDENCE),
    }
}

fn risks(scores: &[PouMigrationScore], state_machines: &[StateMachine], safety: &SafetyExtraction) -> Vec<ProjectRisk> {
    let mut risks = Vec::new();
    if !safety.bypasses.is_empty() {
        risks.push(ProjectRisk {
            kind: RiskKind::SafetyBypass,
            severity: Severity::Critical,
            description: format!("{} safety bypass(es) found in the project", safety.bypasses.len()),
            affected: safety.bypasses.iter().map(|b| b.name.clone()).collect(),
            mitigation: "Review every bypass with a safety engineer and decide whether the migrated system keeps it, gates it, or removes it.".to_string(),
        });
    }
    let deadlocked: Vec<SmolStr> = state_machines
        .iter()
        .filter(|machine| machine.verification.has_deadlocks)
        .map(|machine| machine.name.clone())
        .collect();
    if !deadlocked.is_empty() {
        risks.push(ProjectRisk {
            kind: RiskKind::StateMachineDeadlock,
            severity: Severity::High,
            description: format!("{} state machine(s) contain deadlock states", deadlocked.len()),
            affected: deadlocked,
            mitigation: "Confirm whether the deadlock states are intended terminal states and name them accordingly before rewriting the sequences.".to_string(),
        });
    }
    let documentation = mean(scores.iter().map(|score| score.dimension_scores.documentation));
    if !scores.is_empty() && documentation < 50.0 {
        risks.push(ProjectRisk {
            kind: RiskKind::LowDocumentation,
            severity: Severity::Medium,
            description: format!("Mean documentation score is {documentation:.0}"),
            affected: scores
                .iter()
                .filter(|score| score.dimension_scores.documentation < 50.0)
                .map(|score| score.pou_name.clone())
                .collect(),
            mitigation: "Interview the maintainers and capture the intent of the least documented units before migration.".to_string(),
        });
    }
    let failing: Vec<SmolStr> = scores
        .iter()
        .filter(|score| score.grade == Grade::F)
        .map(|score| score.pou_name.clone())
        .collect();
    if !failing.is_empty() {
        risks.push(ProjectRisk {
            kind: RiskKind::FailingUnits,
            severity: Severity::High,
            description: format!("{} unit(s) graded F", failing.len()),
            affected: failing,
            mitigation: "Resolve the blockers of the F-graded units first, or plan them as rewrites rather than ports.".to_string(),
        });
    }
    risks
}

/// Scores every unit and builds the migration plan.
///
/// Safety findings are assigned to a unit by file and line span, state
/// machines by `pouName`. Without a call graph every unit gets the default
/// dependency score.
#[must_use]
pub fn score(
    pous: &[Pou],
    docstrings: &[Docstring],
    state_machines: &[StateMachine],
    safety: &SafetyExtraction,
    call_graph: Option<&CallGraph>,
    weights: &ScoringWeights,
) -> MigrationReport {
    let pou_scores: Vec<PouMigrationScore> = pous
        .iter()
        .map(|pou| score_unit(&collect(pou, docstrings, state_machines, safety, call_graph), weights))
        .collect();
    let overall_score = mean(pou_scores.iter().map(|score| score.overall_score));
    debug!(units = pou_scores.len(), overall_score, "scored migration readiness");

    MigrationReport {
        overall_score,
        overall_grade: Grade::from_score(overall_score),
        migration_order: migration_order(&pou_scores),
        risks: risks(&pou_scores, state_machines, safety),
        estimated_effort: effort(pous, &pou_scores),
        pou_scores,
    }
}
