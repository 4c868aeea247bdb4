//! Configuration for the puzzle solver.
//!
//! Every field has a default, so an empty TOML document yields
//! [`SolverConfig::default`]. The command-line front end layers its flags
//! on top of a file-provided configuration.
//!
//! # Overview
//!
//! - [`SolverConfig`] — Main configuration struct
//! - [`MetalStrategy`] — How higher metals are produced

use serde::Deserialize;

use super::error::Error;

/// How the metal stage turns lower metals into higher ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetalStrategy {
    /// Projection when quicksilver is available and the glyph is allowed,
    /// otherwise purification.
    #[default]
    Auto,

    /// A single projection glyph fed one quicksilver per rank step.
    Projection,

    /// One purification glyph per rank step, each fed two lower metals.
    Purification,
}

/// Main configuration for [`solve`](super::solve).
///
/// # Examples
///
/// ```
/// use magnum_forge::{MetalStrategy, SolverConfig};
///
/// let config = SolverConfig::from_toml("metal_strategy = \"purification\"").unwrap();
/// assert_eq!(config.metal_strategy, MetalStrategy::Purification);
/// assert_eq!(config.replication, 18);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Strategy for producing metals no reagent supplies.
    pub metal_strategy: MetalStrategy,

    /// Rounds each non-repeating product is built when some, but not all,
    /// products repeat. Must be at least one.
    pub replication: u32,

    /// Whether planned motions are checked against the occupancy grid.
    pub collision_check: bool,

    /// Largest number of single-atom products served by one output carrier.
    pub single_output_limit: usize,

    /// Whether unused glyphs are pruned and tracks trimmed after synthesis.
    pub optimize_parts: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            metal_strategy: MetalStrategy::Auto,
            replication: 18,
            collision_check: true,
            single_output_limit: 4,
            optimize_parts: true,
        }
    }
}

impl SolverConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed TOML or unknown values,
    /// and [`Error::InvalidConfig`] as [`validate`](Self::validate) does.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no solve can honor.
    pub fn validate(&self) -> Result<(), Error> {
        if self.replication == 0 {
            return Err(Error::InvalidConfig(
                "replication must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = SolverConfig::default();
        assert_eq!(config.metal_strategy, MetalStrategy::Auto);
        assert_eq!(config.replication, 18);
        assert!(config.collision_check);
        assert_eq!(config.single_output_limit, 4);
        assert!(config.optimize_parts);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(SolverConfig::from_toml("").unwrap(), SolverConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = SolverConfig::from_toml(
            "metal_strategy = \"projection\"\ncollision_check = false\nreplication = 6\n",
        )
        .unwrap();
        assert_eq!(config.metal_strategy, MetalStrategy::Projection);
        assert!(!config.collision_check);
        assert_eq!(config.replication, 6);
        assert!(config.optimize_parts);
    }

    #[test]
    fn zero_replication_is_rejected() {
        let err = SolverConfig::from_toml("replication = 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let config = SolverConfig {
            replication: 0,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = SolverConfig::from_toml("metal_strategy = \"alchemy\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
