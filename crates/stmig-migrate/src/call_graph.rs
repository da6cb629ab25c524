//! Unit-level dependency graph.
//!
//! A unit depends on another when it declares an instance of it or calls it
//! by name in its body. Only names of known units count; standard function
//! blocks (`TON`, `R_TRIG`, ...) and library calls are not edges.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_extract::MaskedSource;
use stmig_syntax::Pou;

/// Outgoing dependencies per unit name, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraph {
    edges: IndexMap<SmolStr, IndexSet<SmolStr>>,
}

static CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])([A-Za-z_]\w*)\s*\(")
        .unwrap_or_else(|err| panic!("invalid call pattern: {err}"))
});

impl CallGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `caller` depends on `callee`. Self-edges are ignored.
    pub fn add_dependency(&mut self, caller: &str, callee: &str) {
        let entry = self.edges.entry(SmolStr::new(caller)).or_default();
        if !caller.eq_ignore_ascii_case(callee) {
            entry.insert(SmolStr::new(callee));
        }
    }

    /// Returns the dependencies of a unit.
    pub fn dependencies<'a>(&'a self, unit: &str) -> impl Iterator<Item = &'a SmolStr> + 'a {
        self.edges
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(unit))
            .into_iter()
            .flat_map(|(_, callees)| callees.iter())
    }

    /// Returns the number of distinct dependencies of a unit.
    #[must_use]
    pub fn outgoing_count(&self, unit: &str) -> usize {
        self.dependencies(unit).count()
    }

    /// Returns the number of units with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if no unit has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Builds the graph from parsed units and the sources they came from.
    ///
    /// `sources` pairs a file path with its content; units whose file is not
    /// listed only contribute their declared instances.
    #[must_use]
    pub fn build(pous: &[Pou], sources: &[(&str, &str)]) -> Self {
        let known: IndexMap<String, SmolStr> = pous
            .iter()
            .map(|pou| (pou.name.to_ascii_lowercase(), pou.name.clone()))
            .collect();
        let masked: Vec<(&str, MaskedSource<'_>)> = sources
            .iter()
            .map(|(file, content)| (*file, MaskedSource::new(content)))
            .collect();

        let mut graph = Self::new();
        for pou in pous {
            graph.edges.entry(pou.name.clone()).or_default();
            let instances = pou
                .variables
                .iter()
                .chain(pou.methods.iter().flat_map(|method| method.variables.iter()))
                .filter_map(|var| known.get(&var.data_type.trim().to_ascii_lowercase()));
            for callee in instances {
                graph.add_dependency(&pou.name, callee);
            }

            let Some((_, source)) = masked.iter().find(|(file, _)| pou.location.file.as_str() == *file) else {
                continue;
            };
            let (first, last) = pou.line_span();
            let start = source.line_range(pou.body_start_line.max(first)).start;
            let end = source.line_range(last.min(source.line_count())).end;
            if start >= end {
                continue;
            }
            for captures in CALL.captures_iter(&source.masked()[start..end]) {
                if let Some(callee) = captures.get(1).and_then(|name| known.get(&name.as_str().to_ascii_lowercase())) {
                    graph.add_dependency(&pou.name, callee);
                }
            }
        }
        graph
    }
}
