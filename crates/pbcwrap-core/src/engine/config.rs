use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_SELECTION: &str = "all";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unknown value '{value}' for {parameter} (accepted: {accepted})")]
    UnknownValue {
        parameter: &'static str,
        value: String,
        accepted: &'static str,
    },

    #[error("Selection text for {0} must not be empty")]
    EmptySelectionText(&'static str),

    #[error("The center option is not supported when unwrapping")]
    CenterWithUnwrap,

    #[error("{0} mode must process frames sequentially")]
    SequentialOnly(Mode),
}

/// Whether molecules are folded into the primary cell or made continuous over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Wrap,
    Unwrap,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Wrap => write!(f, "wrap"),
            Mode::Unwrap => write!(f, "unwrap"),
        }
    }
}

/// The per-atom attribute that groups selected atoms into rigid blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum Compound {
    /// Every atom is its own block.
    #[serde(rename = "none")]
    None,
    /// Consecutive atoms of the same residue.
    #[default]
    #[serde(rename = "res", alias = "residue")]
    Residue,
    /// Consecutive atoms sharing the integer part of their beta value.
    #[serde(rename = "beta")]
    Beta,
    /// Consecutive atoms of the same bonded fragment.
    #[serde(rename = "fragment")]
    Fragment,
}

impl FromStr for Compound {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compound::None),
            "res" | "residue" => Ok(Compound::Residue),
            "beta" => Ok(Compound::Beta),
            "fragment" | "frag" => Ok(Compound::Fragment),
            _ => Err(ConfigError::UnknownValue {
                parameter: "compound",
                value: s.to_string(),
                accepted: "none, res, beta, fragment",
            }),
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Compound::None => "none",
            Compound::Residue => "res",
            Compound::Beta => "beta",
            Compound::Fragment => "fragment",
        };
        f.write_str(s)
    }
}

/// Which atoms of a block contribute to its reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ReferenceAtoms {
    /// Every atom of the block.
    #[default]
    #[serde(rename = "none")]
    All,
    /// Only atoms whose occupancy truncates to a non-zero integer.
    #[serde(rename = "occ", alias = "occupancy")]
    Occupancy,
}

impl FromStr for ReferenceAtoms {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ReferenceAtoms::All),
            "occ" | "occupancy" => Ok(ReferenceAtoms::Occupancy),
            _ => Err(ConfigError::UnknownValue {
                parameter: "refatoms",
                value: s.to_string(),
                accepted: "none, occ",
            }),
        }
    }
}

impl fmt::Display for ReferenceAtoms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceAtoms::All => f.write_str("none"),
            ReferenceAtoms::Occupancy => f.write_str("occ"),
        }
    }
}

/// Inclusive frame range; `last: None` means the last available frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRange {
    pub first: usize,
    pub last: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrapConfig {
    pub mode: Mode,
    pub compound: Compound,
    pub reference_atoms: ReferenceAtoms,
    pub selection: String,
    pub center: Option<String>,
    pub frames: FrameRange,
}

#[derive(Default)]
pub struct WrapConfigBuilder {
    mode: Option<Mode>,
    compound: Option<Compound>,
    reference_atoms: Option<ReferenceAtoms>,
    selection: Option<String>,
    center: Option<String>,
    first_frame: Option<usize>,
    last_frame: Option<usize>,
}

impl WrapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn compound(mut self, compound: Compound) -> Self {
        self.compound = Some(compound);
        self
    }
    pub fn reference_atoms(mut self, reference_atoms: ReferenceAtoms) -> Self {
        self.reference_atoms = Some(reference_atoms);
        self
    }
    pub fn selection(mut self, text: impl Into<String>) -> Self {
        self.selection = Some(text.into());
        self
    }
    pub fn center(mut self, text: Option<String>) -> Self {
        self.center = text;
        self
    }
    pub fn first_frame(mut self, frame: usize) -> Self {
        self.first_frame = Some(frame);
        self
    }
    pub fn last_frame(mut self, frame: Option<usize>) -> Self {
        self.last_frame = frame;
        self
    }

    pub fn build(self) -> Result<WrapConfig, ConfigError> {
        let mode = self.mode.ok_or(ConfigError::MissingParameter("mode"))?;

        let selection = self
            .selection
            .unwrap_or_else(|| DEFAULT_SELECTION.to_string());
        if selection.trim().is_empty() {
            return Err(ConfigError::EmptySelectionText("sel"));
        }

        if let Some(center) = &self.center {
            if mode == Mode::Unwrap {
                return Err(ConfigError::CenterWithUnwrap);
            }
            if center.trim().is_empty() {
                return Err(ConfigError::EmptySelectionText("center"));
            }
        }

        Ok(WrapConfig {
            mode,
            compound: self.compound.unwrap_or_default(),
            reference_atoms: self.reference_atoms.unwrap_or_default(),
            selection,
            center: self.center,
            frames: FrameRange {
                first: self.first_frame.unwrap_or(0),
                last: self.last_frame,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = WrapConfigBuilder::new().mode(Mode::Wrap).build().unwrap();
        assert_eq!(config.compound, Compound::Residue);
        assert_eq!(config.reference_atoms, ReferenceAtoms::All);
        assert_eq!(config.selection, "all");
        assert_eq!(config.center, None);
        assert_eq!(config.frames, FrameRange { first: 0, last: None });
    }

    #[test]
    fn builder_requires_mode() {
        assert_eq!(
            WrapConfigBuilder::new().build(),
            Err(ConfigError::MissingParameter("mode"))
        );
    }

    #[test]
    fn center_is_rejected_for_unwrap() {
        let result = WrapConfigBuilder::new()
            .mode(Mode::Unwrap)
            .center(Some("protein".into()))
            .build();
        assert_eq!(result, Err(ConfigError::CenterWithUnwrap));
    }

    #[test]
    fn blank_selection_text_is_rejected() {
        let result = WrapConfigBuilder::new()
            .mode(Mode::Wrap)
            .selection("  ")
            .build();
        assert_eq!(result, Err(ConfigError::EmptySelectionText("sel")));

        let result = WrapConfigBuilder::new()
            .mode(Mode::Wrap)
            .center(Some(String::new()))
            .build();
        assert_eq!(result, Err(ConfigError::EmptySelectionText("center")));
    }

    #[test]
    fn keywords_parse_case_insensitively() {
        assert_eq!("RES".parse::<Compound>().unwrap(), Compound::Residue);
        assert_eq!("fragment".parse::<Compound>().unwrap(), Compound::Fragment);
        assert_eq!("none".parse::<Compound>().unwrap(), Compound::None);
        assert_eq!("occ".parse::<ReferenceAtoms>().unwrap(), ReferenceAtoms::Occupancy);
        assert!(matches!(
            "chain".parse::<Compound>(),
            Err(ConfigError::UnknownValue { parameter: "compound", .. })
        ));
        assert!("all".parse::<ReferenceAtoms>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for c in [Compound::None, Compound::Residue, Compound::Beta, Compound::Fragment] {
            assert_eq!(c.to_string().parse::<Compound>().unwrap(), c);
        }
        for r in [ReferenceAtoms::All, ReferenceAtoms::Occupancy] {
            assert_eq!(r.to_string().parse::<ReferenceAtoms>().unwrap(), r);
        }
    }
}
