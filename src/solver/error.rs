//! Error types for puzzle solving.
//!
//! Every failure aborts the whole solve; no partial solution is returned.
//! Errors are categorized by the stage that detects them: structural
//! preconditions, chemistry resolution, missing capabilities, and physical
//! layout or scheduling.

use thiserror::Error;

use crate::model::types::{Element, GlyphKind, MechanismKind};

/// Errors that can occur while solving a puzzle.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse solver configuration TOML.
    #[error("failed to parse solver configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// The puzzle is structurally outside what the solver can build.
    ///
    /// Raised before any synthesis, e.g. for triplex bonds on atoms that
    /// are not fire.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A request for an element had no reachable candidate.
    #[error("cannot resolve a request for {requested}: {detail}")]
    Resolution {
        /// The candidate elements, rendered for display.
        requested: String,
        /// Description of why no candidate was reachable.
        detail: String,
    },

    /// The puzzle disallows a glyph the solution needs.
    #[error("glyph '{glyph}' is required but not allowed: {detail}")]
    MissingGlyph {
        glyph: GlyphKind,
        /// Which stage needed the glyph.
        detail: String,
    },

    /// The puzzle disallows a mechanism the solution needs.
    #[error("mechanism '{mechanism}' is required but not allowed: {detail}")]
    MissingMechanism {
        mechanism: MechanismKind,
        /// Which stage needed the mechanism.
        detail: String,
    },

    /// A bonder layout or assembly plan cannot be realized.
    ///
    /// Occurs when a bonding edge would be shared by atom pairs that
    /// disagree about the bond, or a component is beyond carrier reach.
    #[error("assembly of {molecule} is not possible: {detail}")]
    Assembly {
        /// Which molecule was being built or taken apart.
        molecule: String,
        /// Description of the conflict.
        detail: String,
    },

    /// A planned motion would sweep atoms through occupied cells.
    #[error("collision while {0}")]
    Collision(String),

    /// The replayed command sequence is inconsistent with station state.
    #[error("internal scheduling error: {0}")]
    Scheduling(String),
}

impl Error {
    /// Creates a [`Resolution`](Error::Resolution) error.
    ///
    /// # Arguments
    ///
    /// * `candidates` — The elements that were acceptable
    /// * `details` — Why none of them could be produced
    ///
    /// # Returns
    ///
    /// A [`Resolution`](Error::Resolution) error variant.
    pub fn resolution(candidates: &[Element], details: impl Into<String>) -> Self {
        let requested = if candidates.is_empty() {
            "nothing".to_string()
        } else {
            candidates
                .iter()
                .map(Element::to_string)
                .collect::<Vec<_>>()
                .join(" | ")
        };
        Self::Resolution {
            requested,
            detail: details.into(),
        }
    }

    /// Creates a [`MissingGlyph`](Error::MissingGlyph) error.
    ///
    /// # Arguments
    ///
    /// * `glyph` — The disallowed glyph
    /// * `details` — Which stage needed it
    ///
    /// # Returns
    ///
    /// A [`MissingGlyph`](Error::MissingGlyph) error variant.
    pub fn missing_glyph(glyph: GlyphKind, details: impl Into<String>) -> Self {
        Self::MissingGlyph {
            glyph,
            detail: details.into(),
        }
    }

    /// Creates a [`MissingMechanism`](Error::MissingMechanism) error.
    ///
    /// # Arguments
    ///
    /// * `mechanism` — The disallowed mechanism
    /// * `details` — Which stage needed it
    ///
    /// # Returns
    ///
    /// A [`MissingMechanism`](Error::MissingMechanism) error variant.
    pub fn missing_mechanism(mechanism: MechanismKind, details: impl Into<String>) -> Self {
        Self::MissingMechanism {
            mechanism,
            detail: details.into(),
        }
    }

    /// Creates an [`Assembly`](Error::Assembly) error.
    ///
    /// # Arguments
    ///
    /// * `molecule` — Label of the molecule being built or taken apart
    /// * `details` — Description of the conflict
    ///
    /// # Returns
    ///
    /// An [`Assembly`](Error::Assembly) error variant.
    pub fn assembly(molecule: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Assembly {
            molecule: molecule.into(),
            detail: details.into(),
        }
    }

    /// Whether the error means a capability the puzzle withholds.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            Error::MissingGlyph { .. } | Error::MissingMechanism { .. } | Error::Assembly { .. }
        )
    }
}
