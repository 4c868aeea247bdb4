//! The two-phase puzzle compiler.
//!
//! Chemistry resolution first decides which atoms are generated and
//! consumed, and in what order, as a [`CommandSequence`]. Physical
//! synthesis then lays out one station per pipeline stage and replays the
//! sequence as carrier motion through the [`ProgramWriter`].
//!
//! # Overview
//!
//! - [`solve`] — Runs the whole compiler on a [`Puzzle`]
//! - [`SolverConfig`] — Strategy choices and toggles
//! - [`PuzzleSolution`] — Object tree, program, and the commands behind them
//! - [`Error`] — Everything that can make a solve fail

mod collision;
mod commands;
mod config;
mod elements;
mod error;
mod normalize;
mod optimize;
mod physical;
mod writer;

use std::collections::BTreeSet;

use log::info;

pub use commands::{Command, CommandKind, CommandSequence, GeneratorId};
pub use config::{MetalStrategy, SolverConfig};
pub use elements::{ElementNode, ElementSet, Pipeline, ProductPlan, Stage};
pub use error::Error;
pub use normalize::{check_preconditions, normalize_puzzle};
pub use optimize::PartsReport;
pub use physical::FeedShape;

use crate::model::hex::HexPos;
use crate::model::program::Program;
use crate::model::puzzle::Puzzle;
use crate::model::tree::{NodeKind, ObjectTree};
use crate::model::types::MechanismKind;
use physical::{Layout, SynthesisContext};

/// A synthesized machine for one puzzle.
#[derive(Debug, Clone)]
pub struct PuzzleSolution {
    /// Name of the puzzle the solution was built for.
    pub name: String,
    pub tree: ObjectTree,
    pub program: Program,
    /// The chemistry the program carries out.
    pub commands: CommandSequence,
    pub parts: PartsReport,
}

/// Figures that follow from the layout and program without simulating
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub cost: u32,
    pub instructions: usize,
    pub last_cycle: Option<u32>,
    /// Lattice cells covered by arm bases, tracks, and glyphs.
    pub cells: usize,
}

impl PuzzleSolution {
    pub fn estimate(&self) -> Estimate {
        let mut cost = 0;
        let mut cells: BTreeSet<HexPos> = BTreeSet::new();
        for (id, node) in self.tree.iter() {
            let Some(pose) = self.tree.world_pose(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Arm { kind, .. } => {
                    cost += kind.cost();
                    cells.insert(pose.position);
                }
                NodeKind::Track { path } => {
                    cost += MechanismKind::Track.cost() * path.len() as u32;
                    cells.extend(path.iter().map(|&p| pose.apply(p)));
                }
                NodeKind::Glyph { kind } => {
                    cost += kind.cost();
                    cells.extend(kind.footprint().iter().map(|&p| pose.apply(p)));
                }
                NodeKind::Frame | NodeKind::Reagent { .. } | NodeKind::Product { .. } => {}
            }
        }
        Estimate {
            cost,
            instructions: self.program.instruction_count(),
            last_cycle: self.program.last_cycle(),
            cells: cells.len(),
        }
    }

    pub fn arm_count(&self) -> usize {
        self.tree.count(|k| matches!(k, NodeKind::Arm { .. }))
    }
}

/// Compiles `puzzle` into a layout of parts and a synchronized program.
///
/// The puzzle is checked, its molecules normalized, and the chemistry
/// resolved before any part is placed. Synthesis then builds the stations
/// and replays every command; finally unused parts are pruned (unless
/// [`SolverConfig::optimize_parts`] is off) and the remaining bonders are
/// checked against the puzzle.
///
/// # Errors
///
/// Any failure aborts the solve; no partial solution is returned. See
/// [`Error`] for the categories.
pub fn solve(puzzle: &Puzzle, config: &SolverConfig) -> Result<PuzzleSolution, Error> {
    info!(
        "solving '{}': {} reagent(s), {} product(s)",
        puzzle.name,
        puzzle.reagents.len(),
        puzzle.products.len()
    );
    config.validate()?;
    check_preconditions(puzzle)?;
    let (normalized, repeating) = normalize_puzzle(puzzle)?;

    let mut pipeline = Pipeline::build(&normalized, &repeating, config)?;
    let commands = pipeline.run()?;
    if !commands.is_balanced() {
        return Err(Error::Scheduling(format!(
            "command sequence is unbalanced: {:?}",
            commands.balance()
        )));
    }

    let mut ctx = SynthesisContext::new(&normalized, config);
    let mut layout = Layout::build(&mut ctx, &pipeline)?;
    layout.replay(&mut ctx, &commands)?;
    info!(
        "placed {} station(s); replayed {} command(s) in {} fragment(s)",
        layout.stations().len(),
        commands.len(),
        ctx.writer.fragments()
    );

    let used = ctx.used_glyphs().clone();
    let SynthesisContext {
        mut tree, writer, ..
    } = ctx;
    let program = writer.finish()?;
    let parts = if config.optimize_parts {
        optimize::optimize_parts(&mut tree, &used, &layout.track_reach())
    } else {
        PartsReport::default()
    };
    optimize::check_bonders(&tree, &normalized, &used)?;

    info!(
        "solved '{}': {} part(s), {} instruction(s)",
        puzzle.name,
        tree.len(),
        program.instruction_count()
    );
    Ok(PuzzleSolution {
        name: puzzle.name.clone(),
        tree,
        program,
        commands,
        parts,
    })
}
