//! Shared helpers for parser snapshot tests.
#![allow(dead_code, unused_imports)]

use std::fmt::Write;

pub use stmig_syntax::{parse, ParseResult, Variable};

/// Formats a parse result as a compact outline for snapshot testing.
pub fn snapshot_parse(source: &str) -> String {
    let result = parse(source, "test.st");
    let mut out = String::new();

    for pou in &result.pous {
        let _ = writeln!(
            out,
            "{} {} lines {}..{} body {}..{}",
            pou.pou_type,
            pou.name,
            pou.location.line,
            pou.location.last_line(),
            pou.body_start_line,
            pou.body_end_line
        );
        if let Some(base) = &pou.extends {
            let _ = writeln!(out, "  extends {base}");
        }
        if !pou.implements.is_empty() {
            let names: Vec<&str> = pou.implements.iter().map(|name| name.as_str()).collect();
            let _ = writeln!(out, "  implements {}", names.join(", "));
        }
        if let Some(doc) = &pou.documentation {
            let _ = writeln!(out, "  doc {:?}", doc.summary);
        }
        for var in &pou.variables {
            format_variable(&mut out, var, 1);
        }
        for method in &pou.methods {
            let _ = writeln!(
                out,
                "  METHOD {} lines {}..{}",
                method.name,
                method.location.line,
                method.location.last_line()
            );
            if let Some(doc) = &method.documentation {
                let _ = writeln!(out, "    doc {:?}", doc.summary);
            }
            for var in &method.variables {
                format_variable(&mut out, var, 2);
            }
        }
    }
    for var in &result.global_variables {
        out.push_str("GLOBAL\n");
        format_variable(&mut out, var, 1);
    }
    for error in &result.errors {
        let _ = writeln!(
            out,
            "error {} {}:{}{}",
            error.code,
            error.line,
            error.column,
            if error.recoverable { "" } else { " fatal" }
        );
    }
    for warning in &result.warnings {
        let _ = writeln!(out, "warning {} {}:{}", warning.code, warning.line, warning.column);
    }
    out
}

fn format_variable(out: &mut String, var: &Variable, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}{} {} : {}", var.section, var.name, var.data_type);
    if let Some(address) = &var.io_address {
        let _ = write!(out, " AT {address}");
    }
    if let Some(init) = &var.initial_value {
        let _ = write!(out, " := {init}");
    }
    if let Some(comment) = &var.comment {
        let _ = write!(out, " // {comment}");
    }
    if var.is_safety_critical {
        out.push_str(" [safety]");
    }
    out.push('\n');
}
