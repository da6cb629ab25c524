//! Docstring to unit association.
//!
//! A docstring documents the nearest following POU or method whose header
//! starts within the adjacency tolerance after the docstring ends. Failing
//! that, a docstring placed right under a unit header, before the unit's first
//! declaration, documents that unit. Each unit takes at most one docstring.

use crate::model::{Docstring, Pou};

struct Unit {
    pou: usize,
    method: Option<usize>,
    line: u32,
    column: u32,
    first_member_line: u32,
    claimed: bool,
}

fn collect_units(pous: &[Pou]) -> Vec<Unit> {
    let mut units = Vec::new();
    for (pou_index, pou) in pous.iter().enumerate() {
        let first_member_line = pou
            .variables
            .iter()
            .map(|var| var.location.line)
            .chain(pou.methods.iter().map(|method| method.location.line))
            .chain(std::iter::once(pou.body_start_line))
            .min()
            .unwrap_or(pou.body_start_line);
        units.push(Unit {
            pou: pou_index,
            method: None,
            line: pou.location.line,
            column: pou.location.column,
            first_member_line,
            claimed: pou.documentation.is_some(),
        });
        for (method_index, method) in pou.methods.iter().enumerate() {
            let first_member_line = method
                .variables
                .iter()
                .map(|var| var.location.line)
                .chain(std::iter::once(method.body_start_line))
                .min()
                .unwrap_or(method.body_start_line);
            units.push(Unit {
                pou: pou_index,
                method: Some(method_index),
                line: method.location.line,
                column: method.location.column,
                first_member_line,
                claimed: method.documentation.is_some(),
            });
        }
    }
    units
}

/// Attaches docstrings to the units they document.
pub(crate) fn associate_docstrings(docstrings: &mut [Docstring], pous: &mut [Pou], tolerance: u32) {
    let mut units = collect_units(pous);

    for doc in docstrings.iter_mut() {
        let start_line = doc.location.line;
        let end_line = doc.location.last_line();
        let end_column = doc.location.end_column.unwrap_or(doc.location.column);

        let following = units
            .iter()
            .enumerate()
            .filter(|(_, unit)| !unit.claimed)
            .filter(|(_, unit)| {
                (unit.line > end_line || (unit.line == end_line && unit.column >= end_column))
                    && unit.line - end_line <= tolerance
            })
            .min_by_key(|(_, unit)| (unit.line, unit.column))
            .map(|(index, _)| index);

        let chosen = following.or_else(|| {
            units
                .iter()
                .enumerate()
                .filter(|(_, unit)| !unit.claimed)
                .filter(|(_, unit)| {
                    start_line > unit.line
                        && start_line - unit.line <= tolerance
                        && end_line < unit.first_member_line
                })
                .max_by_key(|(_, unit)| (unit.line, unit.column))
                .map(|(index, _)| index)
        });

        let Some(index) = chosen else {
            continue;
        };
        let unit = &mut units[index];
        unit.claimed = true;

        let pou = &mut pous[unit.pou];
        match unit.method {
            Some(method_index) => {
                let method = &mut pou.methods[method_index];
                doc.associated_block = Some(method.name.clone());
                doc.associated_block_type = Some("METHOD".into());
                method.documentation = Some(doc.clone());
            }
            None => {
                doc.associated_block = Some(pou.name.clone());
                doc.associated_block_type = Some(pou.pou_type.as_str().into());
                pou.documentation = Some(doc.clone());
            }
        }
    }
}
