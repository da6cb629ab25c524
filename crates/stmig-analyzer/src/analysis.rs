//! Per-file pipeline and project fan-in.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stmig_extract::{
    extract_blocks, extract_comments, extract_safety, extract_state_machines, extract_timers,
    extract_tribal_knowledge, extract_variables, BlockExtraction, CommentExtraction,
    SafetyExtraction, SafetySummary, StateMachine, StateMachineExtraction, StateMachineSummary,
    TimerExtraction, TribalKnowledgeExtraction, VariableExtraction,
};
use stmig_migrate::{score, CallGraph, MigrationReport};
use stmig_syntax::{parse_with_options, Docstring, ParseResult, Pou, Vendor};
use tracing::{debug, debug_span, warn};

use crate::config::AnalysisConfig;

/// One input file. `path` appears verbatim in every location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as the caller names the file.
    pub path: String,
    /// Full source text.
    pub content: String,
}

impl SourceFile {
    /// Creates a source file.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    /// File path.
    pub path: String,
    /// Detected tool vendor.
    pub vendor: Vendor,
    /// Parsed units, docstrings and diagnostics.
    pub parse: ParseResult,
    /// Block structure.
    pub blocks: BlockExtraction,
    /// Declared variables.
    pub variables: VariableExtraction,
    /// Comments.
    pub comments: CommentExtraction,
    /// Timer and counter instances.
    pub timers: TimerExtraction,
    /// `CASE` state machines.
    pub state_machines: StateMachineExtraction,
    /// Interlocks, bypasses and warnings.
    pub safety: SafetyExtraction,
    /// Knowledge stated in comments.
    pub tribal_knowledge: TribalKnowledgeExtraction,
}

/// Project-wide counts, recomputed from the per-file results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Analyzed files.
    pub files: usize,
    /// Files with a non-recoverable parse error.
    pub failed_parses: usize,
    /// Units over all files.
    pub pous: usize,
    /// Declared variables over all files.
    pub variables: usize,
    /// Docstrings over all files.
    pub docstrings: usize,
    /// Timer instances.
    pub timers: usize,
    /// Counter instances.
    pub counters: usize,
    /// Tribal knowledge items.
    pub tribal_knowledge: usize,
    /// State machine counts.
    pub state_machines: StateMachineSummary,
    /// Safety counts.
    pub safety: SafetySummary,
}

/// Result of [`analyze_project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    /// Per-file results in input order.
    pub files: Vec<FileAnalysis>,
    /// Project-wide counts.
    pub summary: ProjectSummary,
    /// Unit dependencies across files.
    pub call_graph: CallGraph,
    /// Migration readiness of every unit.
    pub migration: MigrationReport,
}

/// Runs the parser and every extractor over one file.
#[must_use]
pub fn analyze_file(file: &SourceFile, config: &AnalysisConfig) -> FileAnalysis {
    let _span = debug_span!("analyze_file", path = %file.path).entered();
    let (path, source) = (file.path.as_str(), file.content.as_str());

    let parse = parse_with_options(source, path, &config.parse);
    if !parse.success {
        warn!(
            path,
            errors = parse.fatal_errors().count(),
            "parse failed, extractors run on the raw text"
        );
    }
    let analysis = FileAnalysis {
        path: file.path.clone(),
        vendor: parse.metadata.vendor,
        blocks: extract_blocks(source, path),
        variables: extract_variables(source, path),
        comments: extract_comments(source, path),
        timers: extract_timers(source, path),
        state_machines: extract_state_machines(source, path, None, &config.state_machines),
        safety: extract_safety(source, path, &config.safety),
        tribal_knowledge: extract_tribal_knowledge(source, path),
        parse,
    };
    debug!(
        pous = analysis.parse.pous.len(),
        state_machines = analysis.state_machines.state_machines.len(),
        interlocks = analysis.safety.interlocks.len(),
        bypasses = analysis.safety.bypasses.len(),
        "analyzed file"
    );
    analysis
}

/// Analyzes every file in parallel, then merges the results and scores the
/// project.
#[must_use]
pub fn analyze_project(files: &[SourceFile], config: &AnalysisConfig) -> ProjectAnalysis {
    let analyses: Vec<FileAnalysis> = files.par_iter().map(|file| analyze_file(file, config)).collect();
    reduce(files, analyses, config)
}

fn reduce(sources: &[SourceFile], files: Vec<FileAnalysis>, config: &AnalysisConfig) -> ProjectAnalysis {
    let pous: Vec<Pou> = files.iter().flat_map(|file| file.parse.pous.iter().cloned()).collect();
    let docstrings: Vec<Docstring> = files
        .iter()
        .flat_map(|file| file.parse.docstrings.iter().cloned())
        .collect();
    let machines: Vec<StateMachine> = files
        .iter()
        .flat_map(|file| file.state_machines.state_machines.iter().cloned())
        .collect();

    let mut safety = SafetyExtraction::default();
    for file in &files {
        safety.interlocks.extend(file.safety.interlocks.iter().cloned());
        safety.bypasses.extend(file.safety.bypasses.iter().cloned());
        safety.critical_warnings.extend(file.safety.critical_warnings.iter().cloned());
    }
    safety.summary = SafetySummary::from_parts(&safety.interlocks, &safety.bypasses, &safety.critical_warnings);

    let summary = ProjectSummary {
        files: files.len(),
        failed_parses: files.iter().filter(|file| !file.parse.success).count(),
        pous: pous.len(),
        variables: files.iter().map(|file| file.parse.all_variables().count()).sum(),
        docstrings: docstrings.len(),
        timers: files.iter().map(|file| file.timers.summary.timers).sum(),
        counters: files.iter().map(|file| file.timers.summary.counters).sum(),
        tribal_knowledge: files.iter().map(|file| file.tribal_knowledge.items.len()).sum(),
        state_machines: StateMachineSummary::from_machines(&machines),
        safety: safety.summary.clone(),
    };

    let contents: Vec<(&str, &str)> = sources
        .iter()
        .map(|file| (file.path.as_str(), file.content.as_str()))
        .collect();
    let call_graph = CallGraph::build(&pous, &contents);
    let migration = score(&pous, &docstrings, &machines, &safety, Some(&call_graph), &config.scoring);
    debug!(
        files = summary.files,
        pous = summary.pous,
        bypasses = summary.safety.total_bypasses,
        overall_score = migration.overall_score,
        "analyzed project"
    );

    ProjectAnalysis {
        files,
        summary,
        call_graph,
        migration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_project_is_empty() {
        let analysis = analyze_project(&[], &AnalysisConfig::default());
        assert!(analysis.files.is_empty());
        assert_eq!(analysis.summary, ProjectSummary::default());
        assert!(analysis.migration.pou_scores.is_empty());
        assert!(analysis.call_graph.is_empty());
    }

    #[test]
    fn garbage_file_still_analyzes() {
        let file = SourceFile::new("junk.st", "END_VAR ))) := ;; (* open");
        let analysis = analyze_file(&file, &AnalysisConfig::default());
        assert_eq!(analysis.path, "junk.st");
        assert!(analysis.parse.pous.is_empty());
        assert!(analysis.state_machines.state_machines.is_empty());
    }
}
