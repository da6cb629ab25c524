//! Caller-owned parse cache.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use stmig_syntax::{parse_with_options, ParseOptions, Pou};
use tracing::debug;

use crate::analysis::SourceFile;

/// Parsed units per project, keyed by a caller-chosen project identity.
///
/// Entries live until the caller invalidates them; nothing is invalidated
/// when the files change.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: FxHashMap<SmolStr, Vec<Pou>>,
}

impl ParseCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached units of a project.
    #[must_use]
    pub fn get(&self, project: &str) -> Option<&[Pou]> {
        self.entries.get(project).map(Vec::as_slice)
    }

    /// Returns the cached units of a project, parsing `files` on a miss.
    pub fn get_or_parse(&mut self, project: &str, files: &[SourceFile], options: &ParseOptions) -> &[Pou] {
        self.entries
            .entry(SmolStr::new(project))
            .or_insert_with(|| {
                let pous: Vec<Pou> = files
                    .par_iter()
                    .map(|file| parse_with_options(&file.content, &file.path, options).pous)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .flatten()
                    .collect();
                debug!(project, files = files.len(), pous = pous.len(), "parse cache miss");
                pous
            })
            .as_slice()
    }

    /// Drops one project. Returns true if it was cached.
    pub fn invalidate(&mut self, project: &str) -> bool {
        self.entries.remove(project).is_some()
    }

    /// Drops every project.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
