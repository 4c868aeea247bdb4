//! Reading puzzles and writing solutions.
//!
//! Puzzles are described in TOML (see [`read_puzzle`]); solutions are
//! written in the binary format version [`SOLUTION_VERSION`] that
//! downstream tooling loads, and can be read back for inspection.

use std::fmt;

pub mod error;

mod puzzle {
    pub mod reader;
}

mod solution {
    pub mod reader;
    pub mod writer;
}

pub use error::Error;
pub use puzzle::reader::{parse_puzzle, read_puzzle};
pub use solution::reader::{ObjectRecord, SolutionRecord, read_solution};
pub use solution::writer::{Metric, Metrics, write_solution};

/// Format version written by [`write_solution`].
pub const SOLUTION_VERSION: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Puzzle,
    Solution,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Puzzle => write!(f, "puzzle TOML"),
            Format::Solution => write!(f, "solution"),
        }
    }
}
