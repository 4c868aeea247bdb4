//! A pure Rust compiler from hex-lattice alchemy puzzles to machines that solve them.
//! It resolves the chemistry a puzzle needs, lays out one station per processing step
//! along a conveyor, and schedules every arm into a synchronized, collision-checked program.
//!
//! # Features
//!
//! - **Chemistry resolution** — Works backwards from the products to a pipeline of
//!   element transformations (calcification, Van Berlo duplication, metal
//!   projection or purification, quintessence unification) and a balanced
//!   sequence of generate and consume commands
//! - **Physical synthesis** — Reagent disassembly, buffering, transmutation
//!   stations, and row-by-row product assembly with a minimal bonder layout
//! - **Scheduling** — Per-arm instruction streams packed without cycle overlap,
//!   with swept-motion collision checks on the lattice
//! - **I/O** — Puzzle descriptions in TOML and the binary solution format
//!   (version 7) read by downstream tooling
//!
//! # Quick Start
//!
//! The main entry point is the [`solve`] function, which takes a [`Puzzle`] and
//! a [`SolverConfig`] and produces a [`PuzzleSolution`]:
//!
//! ```
//! use magnum_forge::{BondKind, Element, HexPos, Molecule, Puzzle};
//! use magnum_forge::{SolveError, SolverConfig, solve};
//!
//! // One fire atom in, a salt pair out
//! let fire = Molecule::from_elements(&[(Element::Fire, HexPos::ORIGIN)]).unwrap();
//! let mut pair = Molecule::from_elements(&[
//!     (Element::Salt, HexPos::new(0, 0)),
//!     (Element::Salt, HexPos::new(1, 0)),
//! ])
//! .unwrap();
//! pair.add_bond(HexPos::new(0, 0), HexPos::new(1, 0), BondKind::Single).unwrap();
//!
//! let puzzle = Puzzle::new("Salt Pair", vec![fire], vec![pair]);
//! let solution = solve(&puzzle, &SolverConfig::default())?;
//!
//! // Every generated atom is consumed
//! assert!(solution.commands.is_balanced());
//!
//! // Arms, glyphs, and markers were placed and programmed
//! assert!(solution.arm_count() >= 3);
//! assert!(solution.program.instruction_count() > 0);
//! assert!(solution.estimate().cost > 0);
//! # Ok::<(), SolveError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`io`] — Puzzle TOML reader and the binary solution writer/reader
//! - [`solve`] — Main compiler entry point
//! - [`SolverConfig`] — Metal strategy, replication, and synthesis toggles
//!
//! # Data Types
//!
//! ## Input Structures
//!
//! - [`Puzzle`] — Reagents, products, and the parts a puzzle permits
//! - [`Molecule`] — Atoms on the lattice with reciprocal bonds
//! - [`Atom`] — Element, position, and six directional bond slots
//! - [`Element`] — Cardinals, salt, quicksilver, metals, vitae, mors, quintessence
//! - [`BondKind`] — None, single, or triplex
//! - [`HexPos`], [`Rotation`], [`Pose`] — Axial coordinates and orientations
//!
//! ## Output Structures
//!
//! - [`PuzzleSolution`] — Object tree, program, and the command sequence behind them
//! - [`ObjectTree`] — Arena of placed parts ([`NodeKind`]) with parent-relative poses
//! - [`Program`] — Per-arm [`Instruction`] streams keyed by cycle
//! - [`Estimate`] — Cost, instruction count, and footprint without simulation
//!
//! ## Chemistry
//!
//! - [`Pipeline`] — The element generator chain from reagents to products
//! - [`CommandSequence`] — Generate, consume, and buffer-preparation commands

mod model;
mod solver;

pub mod io;

pub use model::hex::{HexPos, Pose, Rotation};
pub use model::molecule::{Atom, Molecule, MoleculeError};
pub use model::program::{Instruction, Program};
pub use model::puzzle::Puzzle;
pub use model::tree::{ArmId, Node, NodeId, NodeKind, ObjectTree};
pub use model::types::{
    BondKind, Element, GlyphKind, MechanismKind, ParseBondKindError, ParseElementError,
    ParseGlyphError, ParseMechanismError,
};

pub use solver::{
    Command, CommandKind, CommandSequence, ElementNode, ElementSet, Estimate, FeedShape,
    GeneratorId, MetalStrategy, PartsReport, Pipeline, ProductPlan, PuzzleSolution, SolverConfig,
    Stage, check_preconditions, normalize_puzzle, solve,
};

pub use solver::Error as SolveError;
