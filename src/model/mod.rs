//! Core data structures describing puzzles and the machines that solve them.
//!
//! - [`hex`] – Axial lattice coordinates, the six-fold rotation group, and poses.
//! - [`types`] – Elements, bond kinds, glyph kinds, and mechanism kinds.
//! - [`molecule`] – Atoms with directional bond slots and normalized molecules.
//! - [`puzzle`] – Reagents, products, and the parts a puzzle permits.
//! - [`tree`] – The arena of placed arms, tracks, glyphs, and markers.
//! - [`program`] – Primitive instructions and per-arm instruction streams.
//!
//! A [`Puzzle`](puzzle::Puzzle) is read-only input; the solver turns it into an
//! [`ObjectTree`](tree::ObjectTree) plus a [`Program`](program::Program).

pub mod hex;
pub mod molecule;
pub mod program;
pub mod puzzle;
pub mod tree;
pub mod types;
