use super::Format;
use crate::model::molecule::MoleculeError;
use crate::model::types::{ParseBondKindError, ParseElementError, ParseGlyphError, ParseMechanismError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at {location})")]
    Parse {
        format: Format,
        location: String,
        details: String,
    },

    #[error("puzzle file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported solution format version {0} (expected {expected})", expected = super::SOLUTION_VERSION)]
    UnsupportedVersion(i32),

    #[error("value out of range for the solution format: {0}")]
    OutOfRange(String),
}

impl From<ParseElementError> for Error {
    fn from(e: ParseElementError) -> Self {
        Error::parse(Format::Puzzle, "element", e.to_string())
    }
}

impl From<ParseBondKindError> for Error {
    fn from(e: ParseBondKindError) -> Self {
        Error::parse(Format::Puzzle, "bond", e.to_string())
    }
}

impl From<ParseGlyphError> for Error {
    fn from(e: ParseGlyphError) -> Self {
        Error::parse(Format::Puzzle, "allowed_glyphs", e.to_string())
    }
}

impl From<ParseMechanismError> for Error {
    fn from(e: ParseMechanismError) -> Self {
        Error::parse(Format::Puzzle, "allowed_mechanisms", e.to_string())
    }
}

impl Error {
    pub fn parse(format: Format, location: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            location: location.into(),
            details: details.into(),
        }
    }

    pub(crate) fn molecule(location: impl Into<String>, e: MoleculeError) -> Self {
        Self::parse(Format::Puzzle, location, e.to_string())
    }
}
