//! Variable declarations from `VAR ... END_VAR` sections.
//!
//! Works without the parser: section headers and declarations are matched
//! with regexes over the masked text, so a declaration the parser would
//! reject (or a whole unit it could not close) still produces records.

use std::collections::BTreeMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_patterns::is_safety_critical_name;
use stmig_syntax::model::make_id;
use stmig_syntax::{VarSection, Variable};
use tracing::debug;

use crate::masked::MaskedSource;

/// Declaration counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSummary {
    /// Number of declared variables.
    pub total: usize,
    /// Number of variables per section keyword.
    pub by_section: BTreeMap<String, usize>,
    /// Variables whose names mark them safety-critical.
    pub safety_critical: usize,
    /// Variables with a trailing comment.
    pub with_comments: usize,
    /// Variables with an `AT` binding.
    pub io_mapped: usize,
}

/// Result of [`extract_variables`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableExtraction {
    /// Declarations in source order.
    pub variables: Vec<Variable>,
    /// Counts.
    pub summary: VariableSummary,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid declaration pattern {pattern:?}: {err}"))
}

static SECTION_START: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)\b(VAR_INPUT|VAR_OUTPUT|VAR_IN_OUT|VAR_GLOBAL|VAR_TEMP|VAR_EXTERNAL|VAR_STAT|VAR)\b((?:\s+(?:CONSTANT|RETAIN|NON_RETAIN|PERSISTENT))*)")
});
static SECTION_END: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\bEND_VAR\b"));
static UNIT_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)\b(?:END_)?(?:FUNCTION_BLOCK|FUNCTION|PROGRAM|CLASS|INTERFACE|METHOD|PROPERTY|ACTION)\b")
});
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)([A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)\s*(?:\bAT\s+(%[A-Za-z]+[0-9.*]*))?\s*:\s*([^:;=]+?)\s*(?::=\s*([^;]+?))?\s*;")
});
static ARRAY_BOUNDS: Lazy<Regex> = Lazy::new(|| regex(r"(?i)^ARRAY\s*\[([^\]]*)\]"));

/// Extracts every variable declaration of a source text.
#[must_use]
pub fn extract_variables(source: &str, file: &str) -> VariableExtraction {
    let masked = MaskedSource::new(source);
    let variables = scan_variables(&masked, file);
    debug!(file, variables = variables.len(), "extracted variables");
    VariableExtraction {
        summary: summarize(&variables),
        variables,
    }
}

/// A section body found in the masked text.
pub(crate) struct SectionSpan {
    pub(crate) section: VarSection,
    /// Byte range from the section keyword through `END_VAR` (or the point
    /// where an unterminated section was cut off).
    pub(crate) range: Range<usize>,
    body: Range<usize>,
}

pub(crate) fn section_spans(masked: &MaskedSource<'_>) -> Vec<SectionSpan> {
    let text = masked.masked();
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(captures) = SECTION_START.captures_at(text, cursor) {
        let (Some(whole), Some(keyword)) = (captures.get(0), captures.get(1)) else {
            break;
        };
        let modifiers = captures.get(2).map_or("", |m| m.as_str()).to_ascii_uppercase();
        let mut section = VarSection::from_keyword(keyword.as_str()).unwrap_or(VarSection::Var);
        if section == VarSection::Var && modifiers.contains("CONSTANT") {
            section = VarSection::VarConstant;
        }

        let body_start = whole.end();
        let (body_end, range_end) = match SECTION_END.find_at(text, body_start) {
            Some(end) => {
                let cut = cut_off(text, body_start).filter(|cut| *cut < end.start());
                cut.map_or((end.start(), end.end()), |cut| (cut, cut))
            }
            None => {
                let cut = cut_off(text, body_start).unwrap_or(text.len());
                (cut, cut)
            }
        };
        spans.push(SectionSpan {
            section,
            range: whole.start()..range_end,
            body: body_start..body_end,
        });
        cursor = range_end.max(body_start);
    }
    spans
}

/// Where a section missing its `END_VAR` stops: the next section header or
/// unit boundary.
fn cut_off(text: &str, from: usize) -> Option<usize> {
    let next_section = SECTION_START.find_at(text, from).map(|m| m.start());
    let next_unit = UNIT_BOUNDARY.find_at(text, from).map(|m| m.start());
    match (next_section, next_unit) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

pub(crate) fn scan_variables(masked: &MaskedSource<'_>, file: &str) -> Vec<Variable> {
    let text = masked.masked();
    let original = masked.original();
    let mut variables = Vec::new();

    for span in section_spans(masked) {
        let body = &text[span.body.clone()];
        for captures in DECLARATION.captures_iter(body) {
            let (Some(whole), Some(names), Some(data_type)) =
                (captures.get(0), captures.get(1), captures.get(3))
            else {
                continue;
            };
            let base = span.body.start;
            let data_type = normalize(&original[base + data_type.start()..base + data_type.end()]);
            let initial_value = captures
                .get(4)
                .map(|init| normalize(&original[base + init.start()..base + init.end()]))
                .filter(|init| !init.is_empty());
            let io_address = captures.get(2).map(|m| SmolStr::new(m.as_str()));
            let array_bounds = ARRAY_BOUNDS
                .captures(&data_type)
                .and_then(|c| c.get(1))
                .map(|m| normalize(m.as_str()));
            let is_array = data_type.to_ascii_uppercase().starts_with("ARRAY");

            let end = base + whole.end();
            let end_line = masked.line_of(end.saturating_sub(1));
            let comment = masked
                .comment_after(end_line, end)
                .map(|comment| comment.body.clone())
                .filter(|body| !body.is_empty());

            let mut offset = base + names.start();
            for name in names.as_str().split(',') {
                let leading = name.len() - name.trim_start().len();
                let name = name.trim();
                let name_offset = offset + leading;
                offset += name.len() + leading + 1;
                if name.is_empty() {
                    continue;
                }
                let location = masked.location(file, name_offset);
                variables.push(Variable {
                    id: make_id("var", file, location.line, name),
                    name: SmolStr::new(name),
                    data_type: SmolStr::new(&data_type),
                    section: span.section,
                    initial_value: initial_value.clone(),
                    comment: comment.clone(),
                    is_array,
                    array_bounds: array_bounds.clone(),
                    is_safety_critical: is_safety_critical_name(name),
                    io_address: io_address.clone(),
                    location,
                });
            }
        }
    }
    variables
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn summarize(variables: &[Variable]) -> VariableSummary {
    let mut summary = VariableSummary {
        total: variables.len(),
        ..VariableSummary::default()
    };
    for var in variables {
        *summary.by_section.entry(var.section.as_str().to_string()).or_insert(0) += 1;
        summary.safety_critical += usize::from(var.is_safety_critical);
        summary.with_comments += usize::from(var.is_documented());
        summary.io_mapped += usize::from(var.io_address.is_some());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_with_bindings_initializers_and_comments() {
        let source = "PROGRAM P\nVAR_INPUT\n  bStart AT %IX0.0 : BOOL; // start button\n  nLimit : INT := 10;\nEND_VAR\nVAR CONSTANT\n  sName : STRING(20) := 'Line; 1';\nEND_VAR\nEND_PROGRAM";
        let result = extract_variables(source, "p.st");
        let vars = &result.variables;
        assert_eq!(vars.len(), 3);
        assert_eq!(vars[0].io_address.as_deref(), Some("%IX0.0"));
        assert_eq!(vars[0].comment.as_deref(), Some("start button"));
        assert_eq!(vars[0].location.line, 3);
        assert_eq!(vars[0].location.column, 3);
        assert_eq!(vars[1].initial_value.as_deref(), Some("10"));
        assert_eq!(vars[2].section, VarSection::VarConstant);
        assert_eq!(vars[2].data_type, "STRING(20)");
        assert_eq!(vars[2].initial_value.as_deref(), Some("'Line; 1'"));
        assert_eq!(result.summary.by_section.get("VAR_INPUT"), Some(&2));
        assert_eq!(result.summary.io_mapped, 1);
        assert_eq!(result.summary.with_comments, 1);
    }

    #[test]
    fn comma_lists_arrays_and_one_line_sections() {
        let source = "VAR a, b : ARRAY [1..4] OF REAL; END_VAR VAR_OUTPUT q : BOOL; END_VAR";
        let result = extract_variables(source, "x.st");
        let names: Vec<&str> = result.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "q"]);
        assert_eq!(result.variables[1].location.column, 8);
        assert!(result.variables[0].is_array);
        assert_eq!(result.variables[0].array_bounds.as_deref(), Some("1..4"));
        assert_eq!(result.variables[2].section, VarSection::VarOutput);
    }

    #[test]
    fn safety_names_are_flagged() {
        let source = "VAR\n bIL_DoorClosed : BOOL;\n bDbg_SkipIL : BOOL;\n nCount : INT;\nEND_VAR";
        let result = extract_variables(source, "s.st");
        let flags: Vec<bool> = result.variables.iter().map(|v| v.is_safety_critical).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(result.summary.safety_critical, 2);
    }

    #[test]
    fn unterminated_section_stops_at_the_next_unit() {
        let source = "FUNCTION_BLOCK A\nVAR\n x : INT;\nEND_FUNCTION_BLOCK\nPROGRAM B\nIdle: y := 1;\nEND_PROGRAM";
        let result = extract_variables(source, "u.st");
        assert_eq!(result.variables.len(), 1);
        assert_eq!(result.variables[0].name, "x");
    }

    #[test]
    fn commented_declarations_are_ignored() {
        let result = extract_variables("VAR\n// old : INT;\n(* gone : BOOL; *)\nEND_VAR", "c.st");
        assert!(result.variables.is_empty());
    }
}
