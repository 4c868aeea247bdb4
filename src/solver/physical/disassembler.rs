//! Reagent feeders: take a reagent apart one atom at a time.
//!
//! How a reagent is taken apart depends on its shape:
//!
//! - **Single** atoms are fetched straight off the marker.
//! - **Linear** chains are dragged right over one unbonder, shedding the
//!   right-most atom each time.
//! - **Bent** molecules, one row or small two-row clusters, sit on an
//!   unbonder for every bond, so each atom is already free.
//! - **Universal** molecules are lowered a row at a time onto a band of
//!   unbonders and extracted left to right.
//!
//! Atoms always leave in [`input_order`], the order the chemistry pipeline
//! assumed when it replayed the reagent.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::bonds::{Edge, band_edges, edge};
use super::carrier::{Carrier, Motion, fetch, lower, shift_out};
use super::workpiece::Workpiece;
use super::{AtomStation, SynthesisContext};
use crate::model::hex::{HexPos, Pose, Rotation};
use crate::model::molecule::Molecule;
use crate::model::tree::{NodeId, NodeKind};
use crate::model::types::{Element, GlyphKind};
use crate::solver::commands::Command;
use crate::solver::elements::input_order;
use crate::solver::error::Error;
use crate::solver::writer::ResumableSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedShape {
    Single,
    Linear,
    Bent,
    Universal,
}

impl FeedShape {
    pub fn classify(molecule: &Molecule) -> Self {
        let atoms = molecule.atom_count();
        if atoms <= 1 {
            FeedShape::Single
        } else if molecule.is_contiguous_row() && is_chain(molecule) {
            FeedShape::Linear
        } else if molecule.height() == 1 || (molecule.height() == 2 && atoms <= 4) {
            FeedShape::Bent
        } else {
            FeedShape::Universal
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeedShape::Single => "single",
            FeedShape::Linear => "linear",
            FeedShape::Bent => "bent",
            FeedShape::Universal => "universal",
        }
    }
}

/// Whether every neighboring pair of a one-row molecule is bonded.
fn is_chain(molecule: &Molecule) -> bool {
    (0..molecule.width() - 1).all(|q| {
        molecule
            .bond(HexPos::new(q, 0), Rotation::ZERO)
            .is_bond()
    })
}

/// One atom leaving the feeder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStep {
    pub element: Element,
    /// Carrier motions, in order; the last one leaves the atom on the
    /// output cell.
    pub motions: Vec<Motion>,
    /// Unbonder edges that break a bond during this step.
    pub cut: Vec<Edge>,
}

/// Everything a feeder layout decides ahead of time.
#[derive(Debug)]
struct FeedPlan {
    marker: HexPos,
    steps: Vec<FeedStep>,
    unbonders: BTreeSet<Edge>,
}

#[derive(Debug, Clone)]
pub struct Feeder {
    index: usize,
    shape: FeedShape,
    carrier: Carrier,
    steps: ResumableSequence<FeedStep>,
    /// Station cells a fresh copy of the reagent covers.
    cells: Vec<HexPos>,
    unbonders: BTreeMap<Edge, NodeId>,
}

impl Feeder {
    /// Lays out the feeder for reagent `index` starting at `origin`.
    ///
    /// # Errors
    ///
    /// Fails when the carrier or its track is not allowed, or when a
    /// universal reagent cannot be lowered onto the unbonders row by row.
    pub fn new(
        ctx: &mut SynthesisContext<'_>,
        origin: HexPos,
        index: usize,
        molecule: &Molecule,
    ) -> Result<Self, Error> {
        let shape = FeedShape::classify(molecule);
        let width = match shape {
            FeedShape::Single => 1,
            _ => molecule.width(),
        };
        let label = format!("reagent {}", index);
        let plan = match shape {
            FeedShape::Single => single_plan(molecule),
            FeedShape::Linear => linear_plan(molecule, width),
            FeedShape::Bent => bent_plan(molecule, width),
            FeedShape::Universal => {
                universal_plan(molecule, width, ctx.config.collision_check, &label)?
            }
        };

        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, width)?;
        ctx.tree.add(
            Some(frame),
            Pose::at(plan.marker).compose(molecule.placement()),
            NodeKind::Reagent { index },
        );
        let mut unbonders = BTreeMap::new();
        for (a, b) in plan.unbonders {
            let direction = a.direction_to(b).unwrap_or_default();
            let glyph = ctx.add_glyph(frame, Pose::new(a, direction), GlyphKind::Unbonding)?;
            unbonders.insert((a, b), glyph);
        }
        let cells = molecule
            .atoms()
            .iter()
            .map(|atom| plan.marker + atom.position)
            .collect();
        debug!(
            "{}: {} feeder, {} step(s), {} unbonder(s)",
            label,
            shape.name(),
            plan.steps.len(),
            unbonders.len()
        );
        Ok(Self {
            index,
            shape,
            carrier,
            steps: ResumableSequence::new(plan.steps),
            cells,
            unbonders,
        })
    }

    pub fn shape(&self) -> FeedShape {
        self.shape
    }

    /// Atoms released per copy of the reagent.
    pub fn steps_per_round(&self) -> usize {
        self.steps.len()
    }
}

impl AtomStation for Feeder {
    fn name(&self) -> String {
        format!("reagent {} ({})", self.index, self.shape.name())
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn generate(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        let index = self.index;
        if self.steps.position() == 0 {
            self.carrier.settle(self.cells.iter().copied());
        }
        let step = self
            .steps
            .resume()
            .ok_or_else(|| Error::Scheduling(format!("reagent {} has no atoms", index)))?;
        if step.element != command.element {
            return Err(Error::Scheduling(format!(
                "reagent {} releases {} next, not '{}'",
                index, step.element, command
            )));
        }
        for motion in &step.motions {
            self.carrier.run_motion(ctx, motion)?;
        }
        self.carrier.hand_off(ctx);
        for e in &step.cut {
            if let Some(&glyph) = self.unbonders.get(e) {
                ctx.mark_used(glyph);
            }
        }
        Ok(())
    }
}

fn single_plan(molecule: &Molecule) -> FeedPlan {
    FeedPlan {
        marker: HexPos::new(1, 1),
        steps: molecule
            .atoms()
            .iter()
            .map(|atom| FeedStep {
                element: atom.element,
                motions: vec![fetch(1, 1, 1).into()],
                cut: Vec::new(),
            })
            .collect(),
        unbonders: BTreeSet::new(),
    }
}

/// Row two, unbonded at its right end.
///
/// Before step `k > 0` the rest of the chain covers columns `k` to
/// `width - 1`; the drag pulls all but the gripped atom one column on.
fn linear_plan(molecule: &Molecule, width: i32) -> FeedPlan {
    let unbonder = edge(HexPos::new(width - 1, 2), HexPos::new(width, 2));
    let last = molecule.atom_count().saturating_sub(1);
    let steps = input_order(molecule)
        .into_iter()
        .enumerate()
        .map(|(k, i)| {
            let motion = if k == 0 {
                fetch(width, 2, width).into()
            } else {
                let trailing = (k as i32..width - 1).map(|q| HexPos::new(q, 2)).collect();
                Motion::dragging(shift_out(width - 1, 2, width), trailing)
            };
            FeedStep {
                element: molecule.atoms()[i].element,
                motions: vec![motion],
                cut: if k < last { vec![unbonder] } else { Vec::new() },
            }
        })
        .collect();
    FeedPlan {
        marker: HexPos::new(1, 2),
        steps,
        unbonders: BTreeSet::from([unbonder]),
    }
}

/// Rows one and two with every bond on an unbonder.
fn bent_plan(molecule: &Molecule, width: i32) -> FeedPlan {
    let offset = HexPos::new(1, 1);
    let unbonders: BTreeSet<Edge> = molecule
        .bonds()
        .into_iter()
        .map(|(a, b, _)| edge(a + offset, b + offset))
        .collect();
    // Every bond breaks as soon as the reagent appears.
    let steps = input_order(molecule)
        .into_iter()
        .enumerate()
        .map(|(k, i)| {
            let cell = molecule.atoms()[i].position + offset;
            FeedStep {
                element: molecule.atoms()[i].element,
                motions: vec![fetch(cell.q, cell.r, width).into()],
                cut: if k == 0 {
                    unbonders.iter().copied().collect()
                } else {
                    Vec::new()
                },
            }
        })
        .collect();
    FeedPlan {
        marker: offset,
        steps,
        unbonders,
    }
}

/// Simulates lowering the reagent through the band one row at a time.
fn universal_plan(
    molecule: &Molecule,
    width: i32,
    collision_check: bool,
    label: &str,
) -> Result<FeedPlan, Error> {
    let marker = HexPos::new(1, 2);
    let down = HexPos::new(0, -1);
    let band = band_edges(width);
    let mut workpiece = Workpiece::assembled(molecule, marker);
    let mut cut: BTreeSet<Edge> = BTreeSet::new();
    let mut steps = Vec::with_capacity(molecule.atom_count());

    for (r, row) in molecule.rows() {
        let mut lowering = Vec::new();
        let mut fired = Vec::new();
        let mut pending: Vec<Vec<usize>> = workpiece
            .components()
            .into_iter()
            .filter(|group| {
                group
                    .iter()
                    .any(|&a| workpiece.cell(a).is_some_and(|c| c.r == 2))
            })
            .collect();
        while !pending.is_empty() {
            let next = workpiece
                .next_clear_move(&pending, down, collision_check)
                .ok_or_else(|| {
                    Error::Collision(format!("lowering row {} of {} onto the unbonders", r, label))
                })?;
            let group = pending.remove(next);
            let grip = group
                .iter()
                .filter_map(|&a| workpiece.cell(a))
                .filter(|c| c.r == 2)
                .map(|c| c.q)
                .min()
                .unwrap_or(1);
            let cells = group.iter().filter_map(|&a| workpiece.cell(a)).collect();
            lowering.push(Motion::carrying(lower(grip), cells));
            workpiece.shift(&group, down);
            fired.extend(unbond_band(&mut workpiece, &band));
        }
        cut.extend(fired.iter().copied());

        let mut landed: Vec<usize> = workpiece
            .present()
            .filter(|(_, c)| c.r == 1)
            .map(|(a, _)| a)
            .collect();
        landed.sort_unstable();
        let mut expected = row.clone();
        expected.sort_unstable();
        if landed != expected {
            return Err(Error::assembly(
                label,
                format!("row {} does not reach the unbonders on its own", r),
            ));
        }

        for atom in row {
            let cell = workpiece.take(atom).unwrap_or(HexPos::new(1, 1));
            let mut motions = std::mem::take(&mut lowering);
            motions.push(fetch(cell.q, 1, width).into());
            steps.push(FeedStep {
                element: workpiece.element(atom),
                motions,
                cut: std::mem::take(&mut fired),
            });
        }
    }

    Ok(FeedPlan {
        marker,
        steps,
        unbonders: cut,
    })
}

/// Breaks every formed bond lying on a band edge, returning the edges.
fn unbond_band(workpiece: &mut Workpiece<'_>, band: &BTreeSet<Edge>) -> Vec<Edge> {
    let mut cut = Vec::new();
    for (a, b) in workpiece.adjacent_pairs() {
        let (Some(ca), Some(cb)) = (workpiece.cell(a), workpiece.cell(b)) else {
            continue;
        };
        let e = edge(ca, cb);
        if band.contains(&e) && workpiece.unbond(a, b) {
            cut.push(e);
        }
    }
    cut
}
