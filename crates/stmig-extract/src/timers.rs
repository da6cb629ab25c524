//! Timer and counter instances.
//!
//! Instances are declarations of the standard timer (`TON`, `TOF`, `TP`,
//! `TONR`) and counter (`CTU`, `CTD`, `CTUD`) function blocks, possibly
//! library-qualified (`Tc2_Standard.TON`). Presets are read from the
//! declaration initializer, from call arguments (`tonDelay(PT := T#5S)`) and
//! from field assignments (`tonDelay.PT := T#5S;`); the first one found wins.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_syntax::{SourceLocation, Variable};
use tracing::debug;

use crate::masked::MaskedSource;
use crate::variables::scan_variables;

/// Standard timer function blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimerType {
    /// On-delay.
    Ton,
    /// Off-delay.
    Tof,
    /// Pulse.
    Tp,
    /// Retentive on-delay.
    Tonr,
}

impl TimerType {
    /// Returns the block type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ton => "TON",
            Self::Tof => "TOF",
            Self::Tp => "TP",
            Self::Tonr => "TONR",
        }
    }
}

/// Standard counter function blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterType {
    /// Up counter.
    Ctu,
    /// Down counter.
    Ctd,
    /// Up/down counter.
    Ctud,
}

impl CounterType {
    /// Returns the block type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ctu => "CTU",
            Self::Ctd => "CTD",
            Self::Ctud => "CTUD",
        }
    }
}

/// A timer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    /// Instance name.
    pub name: SmolStr,
    /// Timer block type.
    pub timer_type: TimerType,
    /// Preset source text (`T#5S`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Preset in milliseconds when it is a time literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_ms: Option<u64>,
    /// Declaration location.
    pub location: SourceLocation,
}

/// A counter instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    /// Instance name.
    pub name: SmolStr,
    /// Counter block type.
    pub counter_type: CounterType,
    /// Preset value source text (`PV`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Declaration location.
    pub location: SourceLocation,
}

/// Timer and counter counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSummary {
    /// Number of timers.
    pub timers: usize,
    /// Number of counters.
    pub counters: usize,
    /// Instances per block type.
    pub by_type: BTreeMap<String, usize>,
    /// Instances with a known preset.
    pub with_preset: usize,
}

/// Result of [`extract_timers`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerExtraction {
    /// Timer instances in declaration order.
    pub timers: Vec<Timer>,
    /// Counter instances in declaration order.
    pub counters: Vec<Counter>,
    /// Counts.
    pub summary: TimerSummary,
}

static TIME_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:T|TIME|LT|LTIME)#(-)?([0-9a-z_.]+)$")
        .unwrap_or_else(|err| panic!("time literal regex: {err}"))
});

static TIME_COMPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)(ms|us|ns|d|h|m|s)")
        .unwrap_or_else(|err| panic!("time component regex: {err}"))
});

/// Converts a time literal (`T#1h30m`, `TIME#500ms`, `T#1.5s`) to milliseconds.
///
/// Returns `None` for anything that is not a well-formed, non-negative literal.
#[must_use]
pub fn time_literal_ms(literal: &str) -> Option<u64> {
    let caps = TIME_LITERAL.captures(literal.trim())?;
    if caps.get(1).is_some() {
        return None;
    }
    let body = caps.get(2)?.as_str().replace('_', "");
    let mut total = 0.0_f64;
    let mut consumed = 0;
    for component in TIME_COMPONENT.captures_iter(&body) {
        let whole = component.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();
        let value: f64 = component[1].parse().ok()?;
        let scale = match component[2].to_ascii_lowercase().as_str() {
            "d" => 86_400_000.0,
            "h" => 3_600_000.0,
            "m" => 60_000.0,
            "s" => 1_000.0,
            "ms" => 1.0,
            "us" => 0.001,
            _ => 0.000_001,
        };
        total += value * scale;
    }
    if consumed == 0 || consumed != body.len() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = total.round() as u64;
    Some(millis)
}

fn base_type(data_type: &str) -> String {
    data_type
        .rsplit('.')
        .next()
        .unwrap_or(data_type)
        .trim()
        .to_ascii_uppercase()
}

fn timer_type(data_type: &str) -> Option<TimerType> {
    Some(match base_type(data_type).as_str() {
        "TON" => TimerType::Ton,
        "TOF" => TimerType::Tof,
        "TP" => TimerType::Tp,
        "TONR" => TimerType::Tonr,
        _ => return None,
    })
}

fn counter_type(data_type: &str) -> Option<CounterType> {
    Some(match base_type(data_type).as_str() {
        "CTU" => CounterType::Ctu,
        "CTD" => CounterType::Ctd,
        "CTUD" => CounterType::Ctud,
        _ => return None,
    })
}

/// Finds the preset argument (`PT` or `PV`) of an instance.
fn find_preset(masked: &MaskedSource<'_>, var: &Variable, parameter: &str) -> Option<String> {
    let name = regex::escape(&var.name);
    let argument = Regex::new(&format!(r"(?i)\b{parameter}\s*:=\s*([^,)]+)")).ok()?;

    if let Some(init) = &var.initial_value {
        if let Some(value) = argument.captures(init).and_then(|c| c.get(1)) {
            return Some(value.as_str().trim().to_string());
        }
    }

    let text = masked.masked();
    let call = Regex::new(&format!(r"(?i)(?:^|[^\w.]){name}\s*\(([^;]*)\)")).ok()?;
    let field = Regex::new(&format!(r"(?i)(?:^|[^\w.]){name}\.{parameter}\s*:=\s*([^;]+);")).ok()?;

    let from_call = call.captures_iter(text).find_map(|caps| {
        let args = caps.get(1)?;
        let value = argument.captures(args.as_str())?.get(1)?;
        let start = args.start() + value.start();
        Some((start, masked.code_text(start..args.start() + value.end())))
    });
    let from_field = field.captures(text).and_then(|caps| {
        let value = caps.get(1)?;
        Some((value.start(), masked.code_text(value.range())))
    });

    [from_call, from_field]
        .into_iter()
        .flatten()
        .min_by_key(|(offset, _)| *offset)
        .map(|(_, value)| value.trim().to_string())
}

/// Extracts timer and counter instances of a source text.
#[must_use]
pub fn extract_timers(source: &str, file: &str) -> TimerExtraction {
    let masked = MaskedSource::new(source);
    let mut timers = Vec::new();
    let mut counters = Vec::new();

    for var in scan_variables(&masked, file) {
        if let Some(timer_type) = timer_type(&var.data_type) {
            let preset = find_preset(&masked, &var, "PT");
            timers.push(Timer {
                preset_ms: preset.as_deref().and_then(time_literal_ms),
                preset,
                name: var.name,
                timer_type,
                location: var.location,
            });
        } else if let Some(counter_type) = counter_type(&var.data_type) {
            counters.push(Counter {
                preset: find_preset(&masked, &var, "PV"),
                name: var.name,
                counter_type,
                location: var.location,
            });
        }
    }

    debug!(file, timers = timers.len(), counters = counters.len(), "extracted timers");
    let summary = summarize(&timers, &counters);
    TimerExtraction {
        timers,
        counters,
        summary,
    }
}

fn summarize(timers: &[Timer], counters: &[Counter]) -> TimerSummary {
    let mut by_type = BTreeMap::new();
    let kinds = timers
        .iter()
        .map(|timer| timer.timer_type.as_str())
        .chain(counters.iter().map(|counter| counter.counter_type.as_str()));
    for kind in kinds {
        *by_type.entry(kind.to_string()).or_insert(0) += 1;
    }
    TimerSummary {
        timers: timers.len(),
        counters: counters.len(),
        by_type,
        with_preset: timers.iter().filter(|t| t.preset.is_some()).count()
            + counters.iter().filter(|c| c.preset.is_some()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_literals_convert_to_milliseconds() {
        assert_eq!(time_literal_ms("T#5S"), Some(5_000));
        assert_eq!(time_literal_ms("t#1h30m"), Some(5_400_000));
        assert_eq!(time_literal_ms("TIME#500ms"), Some(500));
        assert_eq!(time_literal_ms("T#1.5s"), Some(1_500));
        assert_eq!(time_literal_ms("T#1d_2h"), Some(93_600_000));
        assert_eq!(time_literal_ms("LTIME#250us"), Some(0));
        assert_eq!(time_literal_ms("T#-5s"), None);
        assert_eq!(time_literal_ms("tPreset"), None);
        assert_eq!(time_literal_ms("T#5x"), None);
    }

    #[test]
    fn presets_from_init_call_and_field() {
        let source = "PROGRAM P\nVAR\n  tonStart : TON := (PT := T#2S);\n  tofStop : Tc2_Standard.TOF;\n  tpPulse : TP;\n  ctuParts : CTU;\n  tonFree : TON;\nEND_VAR\ntofStop(IN := bRun, PT := T#500MS);\ntpPulse.PT := tPulse;\nctuParts(CU := bPart, PV := 100);\nEND_PROGRAM";
        let result = extract_timers(source, "p.st");
        let presets: Vec<(&str, Option<&str>, Option<u64>)> = result
            .timers
            .iter()
            .map(|t| (t.name.as_str(), t.preset.as_deref(), t.preset_ms))
            .collect();
        assert_eq!(
            presets,
            vec![
                ("tonStart", Some("T#2S"), Some(2_000)),
                ("tofStop", Some("T#500MS"), Some(500)),
                ("tpPulse", Some("tPulse"), None),
                ("tonFree", None, None),
            ]
        );
        assert_eq!(result.timers[1].timer_type, TimerType::Tof);
        assert_eq!(result.counters.len(), 1);
        assert_eq!(result.counters[0].preset.as_deref(), Some("100"));
        assert_eq!(result.summary.by_type.get("TON"), Some(&2));
        assert_eq!(result.summary.with_preset, 4);
    }

    #[test]
    fn serialized_types_are_upper_case() {
        let json = serde_json::to_value(TimerType::Tonr).unwrap_or_default();
        assert_eq!(json, "TONR");
        let json = serde_json::to_value(CounterType::Ctud).unwrap_or_default();
        assert_eq!(json, CounterType::Ctud.as_str());
    }
}
