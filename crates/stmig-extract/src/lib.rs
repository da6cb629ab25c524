//! `stmig-extract` - Source-text extractors for Structured Text.
//!
//! Every extractor takes the raw text of one file and returns a typed result
//! with a summary. None of them can fail: empty or garbage input yields empty
//! results.
//!
//! - **Blocks**: POU, method, action and type headers with their extents
//! - **Variables**: declarations per section, with I/O bindings and comments
//! - **Comments**: placement and content classes, parsed docstrings
//! - **Timers**: timer and counter instances with presets in milliseconds
//! - **State machines**: `CASE`-based machines, their verification and diagrams
//! - **Safety**: interlocks, bypasses and critical warnings
//! - **Tribal knowledge**: warnings, workarounds and magic numbers from comments
//!
//! Structural scans run over a masked copy of the source ([`MaskedSource`])
//! so that text inside comments and strings never creates structure.
//!
//! # Example
//!
//! ```
//! use stmig_extract::{extract_safety, SafetyPatterns};
//!
//! let source = "PROGRAM Main\nVAR\n  bIL_DoorClosed : BOOL;\n  bDbg_SkipIL : BOOL;\nEND_VAR\nEND_PROGRAM";
//! let safety = extract_safety(source, "main.st", &SafetyPatterns::default());
//! assert_eq!(safety.interlocks.len(), 1);
//! assert_eq!(safety.bypasses[0].name, "bDbg_SkipIL");
//! assert_eq!(safety.critical_warnings.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod blocks;
pub mod comments;
pub mod masked;
pub mod safety;
pub mod severity;
pub mod state_machine;
pub mod timers;
pub mod tribal;
pub mod variables;

pub use blocks::{extract_blocks, Block, BlockExtraction, BlockKind, BlockSummary};
pub use comments::{
    extract_comments, looks_like_code, CommentExtraction, CommentStyle, CommentSummary,
    ExtractedComment,
};
pub use masked::{CommentSpan, MaskedSource};
pub use safety::{
    extract_safety, BypassSource, CriticalWarning, SafetyBypass, SafetyExtraction,
    SafetyInterlock, SafetyPatterns, SafetySummary, WarningKind,
};
pub use severity::Severity;
pub use state_machine::{
    extract_state_machines, render_mermaid, render_text, State, StateMachine,
    StateMachineExtraction, StateMachineOptions, StateMachineSummary, StateValue, Transition,
    Verification, Visualizations,
};
pub use stmig_patterns::SafetyRole;
pub use timers::{
    extract_timers, time_literal_ms, Counter, CounterType, Timer, TimerExtraction, TimerSummary,
    TimerType,
};
pub use tribal::{
    extract_tribal_knowledge, KnowledgeType, TribalKnowledge, TribalKnowledgeExtraction,
    TribalSummary,
};
pub use variables::{extract_variables, VariableExtraction, VariableSummary};
