//! Grammar rules for Structured Text declarations.
//!
//! This module contains the parsing rules, organized by category:
//! - `pou`: Program Organization Units and methods
//! - `declarations`: Variable sections and type references
//! - `association`: Docstring to unit association

mod association;
mod declarations;
mod pou;

pub(crate) use association::associate_docstrings;
