//! `stmig-patterns` - Name-pattern tables for Structured Text analysis.
//!
//! The extractors classify identifiers by name. The tables that drive that
//! classification live here as plain ordered data so they can be tested
//! independently of the code that walks the source:
//!
//! - **State variables**: which `CASE` selectors look like state machines
//! - **Safety roles**: interlock, permissive, e-stop, safety relay, generic device
//! - **Bypass idioms**: the names and comment phrases that indicate a defeated
//!   safety function
//!
//! # Example
//!
//! ```
//! use stmig_patterns::{bypass_patterns, classify_role, SafetyRole};
//!
//! assert_eq!(classify_role("bIL_DoorClosed"), Some(SafetyRole::Interlock));
//! assert!(bypass_patterns().is_bypass_name("bDbg_SkipIL"));
//! assert!(!bypass_patterns().is_bypass_name("bMotorRunning"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod safety;
pub mod state;
mod table;

pub use safety::{
    bypass_patterns, classify_role, comment_words, has_safety_stem, has_safety_word_stem, is_safety_critical_name,
    BypassPatterns, SafetyRole, BYPASS_COMMENT_FIXTURE, BYPASS_NAME_FIXTURE,
};
pub use state::{is_state_variable_name, state_variable_patterns};
pub use table::{MatchMode, NamedPattern, PatternTable};
