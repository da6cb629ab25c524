//! Tool vendor detection.

use serde::{Deserialize, Serialize};

/// PLC tool vendor a source file was most likely written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vendor {
    /// Beckhoff TwinCAT.
    Twincat,
    /// CODESYS.
    Codesys,
    /// Siemens TIA Portal / SCL.
    Siemens,
    /// Rockwell Studio 5000.
    Rockwell,
    /// Schneider EcoStruxure / Unity.
    Schneider,
    /// Omron Sysmac.
    Omron,
    /// B&R Automation Studio.
    BrAutomation,
    /// No vendor marker found.
    GenericSt,
}

/// Checked in order; the first marker found wins.
const MARKERS: &[(&str, Vendor)] = &[
    ("twincat", Vendor::Twincat),
    ("codesys", Vendor::Codesys),
    ("siemens", Vendor::Siemens),
    ("rockwell", Vendor::Rockwell),
    ("schneider", Vendor::Schneider),
    ("omron", Vendor::Omron),
    ("br-automation", Vendor::BrAutomation),
];

impl Vendor {
    /// Returns the vendor tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Twincat => "twincat",
            Self::Codesys => "codesys",
            Self::Siemens => "siemens",
            Self::Rockwell => "rockwell",
            Self::Schneider => "schneider",
            Self::Omron => "omron",
            Self::BrAutomation => "br-automation",
            Self::GenericSt => "generic-st",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the vendor by case-insensitive substring checks over the source.
#[must_use]
pub fn detect_vendor(source: &str) -> Vendor {
    let lowered = source.to_ascii_lowercase();
    MARKERS
        .iter()
        .find(|(marker, _)| lowered.contains(marker))
        .map_or(Vendor::GenericSt, |(_, vendor)| *vendor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_marker_wins() {
        assert_eq!(detect_vendor("(* CODESYS project, TwinCAT 3 *)"), Vendor::Twincat);
        assert_eq!(detect_vendor("// exported from Siemens TIA"), Vendor::Siemens);
        assert_eq!(detect_vendor("PROGRAM Main END_PROGRAM"), Vendor::GenericSt);
    }

    #[test]
    fn tags_are_kebab_case() {
        assert_eq!(Vendor::BrAutomation.to_string(), "br-automation");
        assert_eq!(Vendor::GenericSt.as_str(), "generic-st");
    }
}
