mod common;
use common::*;

use stmig_analyzer::{analyze_file, ParseCache, ProjectSummary};

#[test]
fn test_files_keep_input_order() {
    let analysis = analyze(&project());
    let paths: Vec<&str> = analysis.files.iter().map(|file| file.path.as_str()).collect();
    assert_eq!(paths, vec!["lib/valves.st", "cell.st"]);
    let units: Vec<&str> = analysis.migration.pou_scores.iter().map(|s| s.pou_name.as_str()).collect();
    assert_eq!(units, vec!["FB_Valve", "Cell"]);
}

#[test]
fn test_summary_is_recomputed_from_files() {
    let analysis = analyze(&project());
    let summary: &ProjectSummary = &analysis.summary;
    assert_eq!(summary.files, 2);
    assert_eq!(summary.failed_parses, 0);
    assert_eq!(summary.pous, 2);
    assert_eq!(summary.docstrings, 1);
    assert_eq!(summary.state_machines.total, 1);
    assert_eq!(summary.state_machines.total_states, 3);

    let per_file_bypasses: usize = analysis.files.iter().map(|file| file.safety.bypasses.len()).sum();
    assert_eq!(summary.safety.total_bypasses, per_file_bypasses);
    assert_eq!(summary.safety.total_bypasses, 1);
}

#[test]
fn test_call_graph_crosses_files() {
    let analysis = analyze(&project());
    let deps: Vec<&str> = analysis.call_graph.dependencies("Cell").map(|name| name.as_str()).collect();
    assert_eq!(deps, vec!["FB_Valve"]);
    let cell = &analysis.migration.pou_scores[1];
    assert!((cell.dimension_scores.dependencies - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_bypassed_program_migrates_after_library() {
    let analysis = analyze(&project());
    let order: Vec<&str> = analysis
        .migration
        .migration_order
        .iter()
        .map(|step| step.pou_name.as_str())
        .collect();
    assert_eq!(order, vec!["FB_Valve", "Cell"]);
    assert!(analysis.migration.pou_scores[1].dimension_scores.safety < 70.0);
}

#[test]
fn test_single_file_matches_project_entry() {
    let files = project();
    let config = AnalysisConfig::default();
    let project = analyze_project(&files, &config);
    assert_eq!(project.files[1], analyze_file(&files[1], &config));
}

#[test]
fn test_extra_bypass_pattern_from_config() {
    let config = AnalysisConfig::from_toml_str("[safety]\nextra_bypass_patterns = [\"(?i)jumper\"]\n").unwrap();
    let files = [SourceFile::new(
        "jumper.st",
        "PROGRAM P\nVAR\n    xJumperWire : BOOL;\nEND_VAR\nEND_PROGRAM\n",
    )];
    let strict = analyze_project(&files, &config);
    assert_eq!(strict.summary.safety.total_bypasses, 1);
    assert_eq!(strict.files[0].safety.bypasses[0].name, "xJumperWire");
}

#[test]
fn test_cache_serves_units_for_scoring() {
    let files = project();
    let mut cache = ParseCache::new();
    let config = AnalysisConfig::default();
    let units = cache.get_or_parse("cell-line", &files, &config.parse).len();
    assert_eq!(units, analyze_project(&files, &config).summary.pous);
    assert!(cache.get("cell-line").is_some());
}

#[test]
fn test_project_serializes_camel_case() {
    let analysis = analyze(&project());
    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["summary"]["safety"]["totalBypasses"], 1);
    assert_eq!(json["files"][1]["tribalKnowledge"]["summary"]["total"], analysis.files[1].tribal_knowledge.summary.total);
    assert!(json["migration"]["migrationOrder"].is_array());
}
