//! `stmig-analyzer` - Analysis pipeline for Structured Text projects.
//!
//! Ties the parser, the extractors and the migration scorer together:
//!
//! - **Configuration**: `stmig.toml` with parser, state machine, safety and scoring settings
//! - **Per file**: parse plus every extractor, sequential within the file
//! - **Per project**: files fan out over a thread pool and a single reducer
//!   merges the results, builds the call graph and scores every unit
//! - **Cache**: parsed units per project, owned and invalidated by the caller
//!
//! # Example
//!
//! ```
//! use stmig_analyzer::{analyze_project, AnalysisConfig, SourceFile};
//!
//! let files = [SourceFile::new(
//!     "main.st",
//!     "PROGRAM Main\nVAR\n  bDbg_SkipIL : BOOL;\nEND_VAR\nEND_PROGRAM\n",
//! )];
//! let analysis = analyze_project(&files, &AnalysisConfig::default());
//! assert_eq!(analysis.summary.pous, 1);
//! assert_eq!(analysis.summary.safety.total_bypasses, 1);
//! assert_eq!(analysis.migration.migration_order[0].blocker_count, analysis.migration.pou_scores[0].blockers.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;

pub use analysis::{analyze_file, analyze_project, FileAnalysis, ProjectAnalysis, ProjectSummary, SourceFile};
pub use cache::ParseCache;
pub use config::{AnalysisConfig, CONFIG_FILE_NAME};
pub use error::AnalyzerError;
