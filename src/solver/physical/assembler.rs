//! Output stations: build products and hand them to their markers.
//!
//! Single-atom products share one carrier that drops each atom on its own
//! marker. Every other product gets a row assembler: rows are built on
//! row one from the top row down, and after each row every partial
//! molecule is lifted one row so the next row can bond underneath it.
//!
//! Bonders never move, so a row may first slide the molecule above it to
//! the right. The row then lands on columns where every pair it forms
//! agrees with what earlier rows left on those bonders.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use log::debug;

use super::bonds::{BondProgrammer, Edge, edge};
use super::carrier::{Carrier, Motion, deliver, drag, lift};
use super::workpiece::Workpiece;
use super::{AtomStation, SynthesisContext};
use crate::model::hex::{HexPos, Pose, Rotation};
use crate::model::molecule::Molecule;
use crate::model::tree::{NodeId, NodeKind};
use crate::model::types::{Element, GlyphKind};
use crate::solver::commands::Command;
use crate::solver::elements::ProductPlan;
use crate::solver::error::Error;
use crate::solver::writer::ResumableSequence;

/// One carrier dropping single-atom products onto markers along row one.
#[derive(Debug, Clone)]
pub struct SingleOutput {
    carrier: Carrier,
    /// Product index, marker column, and element.
    columns: Vec<(usize, i32, Element)>,
}

impl SingleOutput {
    pub fn new(
        ctx: &mut SynthesisContext<'_>,
        origin: HexPos,
        plans: &[ProductPlan],
    ) -> Result<Self, Error> {
        let puzzle = ctx.puzzle;
        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, (plans.len() as i32).max(1))?;
        let mut columns = Vec::with_capacity(plans.len());
        for (j, plan) in plans.iter().enumerate() {
            let molecule = puzzle.products.get(plan.index).ok_or_else(|| {
                Error::Scheduling(format!("no product {} to deliver", plan.index))
            })?;
            let element = plan
                .order
                .first()
                .copied()
                .ok_or_else(|| Error::assembly(format!("product {}", plan.index), "no atoms"))?;
            let x = j as i32 + 1;
            ctx.tree.add(
                Some(frame),
                Pose::at(HexPos::new(x, 1)).compose(molecule.placement()),
                NodeKind::Product {
                    index: plan.index,
                    repeating: plan.repeating,
                },
            );
            columns.push((plan.index, x, element));
        }
        Ok(Self { carrier, columns })
    }
}

impl AtomStation for SingleOutput {
    fn name(&self) -> String {
        format!("output ({} single-atom product(s))", self.columns.len())
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        let &(_, x, element) = self
            .columns
            .iter()
            .find(|(index, _, _)| Some(*index) == command.group)
            .ok_or_else(|| Error::Scheduling(format!("'{}' names no product here", command)))?;
        if element != command.element {
            return Err(Error::Scheduling(format!(
                "'{}' does not match the {} product",
                command, element
            )));
        }
        self.carrier.run(ctx, &deliver(x, 1))?;
        // The marker takes the atom as soon as it lands.
        self.carrier.vacate([HexPos::new(x, 1)]);
        Ok(())
    }
}

/// A partial molecule moved by its grip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMove {
    /// Column the carrier grips.
    pub x: i32,
    /// Cells the group covers before the move.
    pub cells: Vec<HexPos>,
}

/// One atom placed on the assembly row, with the moves around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyStep {
    pub element: Element,
    /// Partial molecules slid right, gripped on row two, before the atom
    /// is dropped.
    pub slides: Vec<GroupMove>,
    /// Columns each slid group travels.
    pub slide: i32,
    /// Column on row one the atom is dropped in.
    pub x: i32,
    /// Partial molecules raised after this atom, gripped on row one.
    pub lifts: Vec<GroupMove>,
    /// Bonder edges a new bond forms on during this step.
    pub bonded: Vec<Edge>,
}

/// Simulated assembly of one product.
#[derive(Debug, Clone)]
struct RowPlan {
    steps: Vec<AssemblyStep>,
    programmer: BondProgrammer,
    /// Where the finished product's origin sits.
    marker: HexPos,
    /// Right-most column any atom reaches.
    width: i32,
    /// Cells the finished product covers.
    finished: Vec<HexPos>,
}

/// Everything a row hands to the next one.
#[derive(Debug, Clone)]
struct Progress<'m> {
    workpiece: Workpiece<'m>,
    programmer: BondProgrammer,
    /// Columns the product has slid right so far.
    offset: i32,
    width: i32,
}

/// Builds one product row by row over a band of bonders.
#[derive(Debug, Clone)]
pub struct RowAssembler {
    index: usize,
    carrier: Carrier,
    steps: ResumableSequence<AssemblyStep>,
    /// Bonders covering each band edge.
    glyphs: BTreeMap<Edge, Vec<NodeId>>,
    finished: Vec<HexPos>,
}

impl RowAssembler {
    /// Simulates the assembly, then lays out the carrier, the product
    /// marker, and the bonders the simulation asked for.
    ///
    /// # Errors
    ///
    /// Fails when a row leaves part of the product without support, when
    /// no lift order avoids a collision, or when no slide lets a row pass
    /// the bonders without bonding atoms the product keeps apart.
    pub fn new(
        ctx: &mut SynthesisContext<'_>,
        origin: HexPos,
        plan: &ProductPlan,
        molecule: &Molecule,
    ) -> Result<Self, Error> {
        let label = format!("product {}", plan.index);
        let RowPlan {
            steps,
            programmer,
            marker,
            width,
            finished,
        } = plan_rows(molecule, ctx.config.collision_check, &label)?;
        let order: Vec<Element> = steps.iter().map(|s| s.element).collect();
        if order != plan.order {
            return Err(Error::Scheduling(format!(
                "{} is assembled in a different order than it is requested",
                label
            )));
        }
        let layout = programmer.finish(width, &label)?;

        let frame = ctx.add_frame(origin);
        let carrier = Carrier::install(ctx, frame, origin, width)?;
        ctx.tree.add(
            Some(frame),
            Pose::at(marker).compose(molecule.placement()),
            NodeKind::Product {
                index: plan.index,
                repeating: plan.repeating,
            },
        );
        let mut glyphs: BTreeMap<Edge, Vec<NodeId>> = BTreeMap::new();
        for &(cell, direction) in &layout.bonders {
            let glyph = ctx.add_glyph(frame, Pose::new(cell, direction), GlyphKind::Bonding)?;
            glyphs
                .entry(edge(cell, cell + direction.unit()))
                .or_default()
                .push(glyph);
        }
        for &(corner, rotation) in &layout.triplex {
            let glyph = ctx.add_glyph(
                frame,
                Pose::new(corner, rotation),
                GlyphKind::TriplexBonding,
            )?;
            let cells = [
                corner,
                corner + rotation.unit(),
                corner + (rotation + Rotation::COUNTERCLOCKWISE).unit(),
            ];
            for (i, &a) in cells.iter().enumerate() {
                for &b in &cells[i + 1..] {
                    glyphs.entry(edge(a, b)).or_default().push(glyph);
                }
            }
        }
        debug!(
            "{}: {} step(s), {} bonder(s), {} column(s)",
            label,
            steps.len(),
            layout.bonders.len() + layout.triplex.len(),
            width
        );
        Ok(Self {
            index: plan.index,
            carrier,
            steps: ResumableSequence::new(steps),
            glyphs,
            finished,
        })
    }
}

impl AtomStation for RowAssembler {
    fn name(&self) -> String {
        format!("assembler for product {}", self.index)
    }

    fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn carrier_mut(&mut self) -> &mut Carrier {
        &mut self.carrier
    }

    fn consume(&mut self, ctx: &mut SynthesisContext<'_>, command: &Command) -> Result<(), Error> {
        let index = self.index;
        let step = self
            .steps
            .resume()
            .ok_or_else(|| Error::Scheduling(format!("product {} has no atoms", index)))?;
        if step.element != command.element {
            return Err(Error::Scheduling(format!(
                "product {} needs {} next, not '{}'",
                index, step.element, command
            )));
        }
        for group in &step.slides {
            let motion = Motion::carrying(drag(group.x, 2, step.slide), group.cells.clone());
            self.carrier.run_motion(ctx, &motion)?;
        }
        self.carrier.run(ctx, &deliver(step.x, 1))?;
        for group in &step.lifts {
            self.carrier
                .run_motion(ctx, &Motion::carrying(lift(group.x), group.cells.clone()))?;
        }
        for e in &step.bonded {
            for &glyph in self.glyphs.get(e).into_iter().flatten() {
                ctx.mark_used(glyph);
            }
        }
        if self.steps.position() == 0 {
            self.carrier.vacate(self.finished.iter().copied());
        }
        Ok(())
    }
}

/// Places the product's rows top down, recording every stable state with
/// a programmer.
///
/// Each row tries sliding the molecule above it 0, 1, 2, ... columns
/// right and keeps the first slide the programmer accepts. A slide of the
/// full product width puts the row on columns no earlier row touched.
fn plan_rows(molecule: &Molecule, collision_check: bool, label: &str) -> Result<RowPlan, Error> {
    let mut progress = Progress {
        workpiece: Workpiece::empty(molecule),
        programmer: BondProgrammer::new(),
        offset: 0,
        width: 1,
    };
    let mut steps: Vec<AssemblyStep> = Vec::with_capacity(molecule.atom_count());

    for (r, row) in molecule.rows().into_iter().rev() {
        let mut first_error = None;
        let mut placed = None;
        for slide in 0..=molecule.width() {
            let mut trial = progress.clone();
            let outcome = place_row(&mut trial, r, &row, slide, collision_check, label)
                .and_then(|row_steps| trial.programmer.check(label).map(|()| row_steps));
            match outcome {
                Ok(row_steps) => {
                    placed = Some((trial, row_steps));
                    break;
                }
                Err(err) => {
                    first_error = first_error.or(Some(err));
                }
            }
        }
        let Some((next, row_steps)) = placed else {
            return Err(first_error.unwrap_or_else(|| {
                Error::assembly(label, format!("row {} has nowhere to go", r))
            }));
        };
        if next.offset > progress.offset {
            debug!(
                "{}: row {} placed after a slide of {}",
                label,
                r,
                next.offset - progress.offset
            );
        }
        progress = next;
        steps.extend(row_steps);
    }

    let Progress {
        workpiece,
        programmer,
        offset,
        width,
    } = progress;
    let wanted = molecule.bonds().len();
    if workpiece.bond_count() != wanted {
        return Err(Error::assembly(
            label,
            format!("only {} of {} bonds can be formed", workpiece.bond_count(), wanted),
        ));
    }
    Ok(RowPlan {
        steps,
        programmer,
        marker: HexPos::new(1 + offset, 2),
        width,
        finished: workpiece.present().map(|(_, cell)| cell).collect(),
    })
}

/// Slides everything placed so far `slide` columns right, drops `row`
/// under it, and lifts the lot by one row.
fn place_row(
    progress: &mut Progress<'_>,
    r: i32,
    row: &[usize],
    slide: i32,
    collision_check: bool,
    label: &str,
) -> Result<Vec<AssemblyStep>, Error> {
    let Progress {
        workpiece,
        programmer,
        offset,
        width,
    } = progress;
    let right = HexPos::new(slide, 0);
    let up = HexPos::new(0, 1);

    let mut slides = Vec::new();
    let mut fired = Vec::new();
    if slide > 0 {
        let mut pending = workpiece.components();
        while !pending.is_empty() {
            let next = workpiece
                .next_clear_move(&pending, right, collision_check)
                .ok_or_else(|| Error::Collision(format!("sliding the rows above row {} of {}", r, label)))?;
            let group = pending.remove(next);
            slides.push(grip(workpiece, &group, 2, label)?);
            workpiece.shift(&group, right);
            fired.extend(programmer.record(workpiece));
        }
        *offset += slide;
        *width = (*width).max(rightmost(workpiece));
    }

    let mut steps = Vec::with_capacity(row.len());
    for &atom in row {
        let x = 1 + *offset + workpiece.molecule().atoms()[atom].position.q;
        workpiece.place(atom, HexPos::new(x, 1));
        fired.extend(programmer.record(workpiece));
        steps.push(AssemblyStep {
            element: workpiece.element(atom),
            slides: std::mem::take(&mut slides),
            slide,
            x,
            lifts: Vec::new(),
            bonded: std::mem::take(&mut fired),
        });
    }
    *width = (*width).max(rightmost(workpiece));

    let top = |group: &Vec<usize>| {
        group
            .iter()
            .filter_map(|&a| workpiece.cell(a))
            .map(|c| c.r)
            .max()
            .unwrap_or(0)
    };
    let mut pending = workpiece.components();
    if pending
        .iter()
        .any(|group| !group.iter().any(|&a| workpiece.cell(a).is_some_and(|c| c.r == 1)))
    {
        return Err(Error::assembly(
            label,
            format!("row {} leaves part of the product unsupported", r),
        ));
    }
    pending.sort_by_key(|group| Reverse(top(group)));

    let mut lifts = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let next = workpiece
            .next_clear_move(&pending, up, collision_check)
            .ok_or_else(|| Error::Collision(format!("lifting row {} of {}", r, label)))?;
        let group = pending.remove(next);
        lifts.push(grip(workpiece, &group, 1, label)?);
        workpiece.shift(&group, up);
        fired.extend(programmer.record(workpiece));
    }
    if let Some(last) = steps.last_mut() {
        last.lifts = lifts;
        last.bonded.append(&mut fired);
    }
    Ok(steps)
}

/// Left-most grip for `group` on `row`, with the cells it covers.
fn grip(workpiece: &Workpiece<'_>, group: &[usize], row: i32, label: &str) -> Result<GroupMove, Error> {
    let cells: Vec<HexPos> = group.iter().filter_map(|&a| workpiece.cell(a)).collect();
    let x = cells
        .iter()
        .filter(|c| c.r == row)
        .map(|c| c.q)
        .min()
        .ok_or_else(|| Error::assembly(label, format!("part of the product has no atom on row {}", row)))?;
    Ok(GroupMove { x, cells })
}

fn rightmost(workpiece: &Workpiece<'_>) -> i32 {
    workpiece.present().map(|(_, c)| c.q).max().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::puzzle::Puzzle;
    use crate::model::types::BondKind;
    use crate::solver::commands::{CommandKind, GeneratorId};
    use crate::solver::config::SolverConfig;

    fn molecule(
        cells: &[(Element, (i32, i32))],
        bonds: &[((i32, i32), (i32, i32), BondKind)],
    ) -> Molecule {
        let cells: Vec<_> = cells
            .iter()
            .map(|&(e, (q, r))| (e, HexPos::new(q, r)))
            .collect();
        let mut m = Molecule::from_elements(&cells).unwrap();
        for &((aq, ar), (bq, br), kind) in bonds {
            m.add_bond(HexPos::new(aq, ar), HexPos::new(bq, br), kind)
                .unwrap();
        }
        m
    }

    fn corner() -> Molecule {
        molecule(
            &[
                (Element::Salt, (0, 0)),
                (Element::Water, (1, 0)),
                (Element::Air, (0, 1)),
            ],
            &[
                ((0, 0), (1, 0), BondKind::Single),
                ((0, 0), (0, 1), BondKind::Single),
            ],
        )
    }

    fn plan_for(m: &Molecule, index: usize) -> ProductPlan {
        ProductPlan {
            index,
            order: m.top_down_order().into_iter().map(|i| m.atoms()[i].element).collect(),
            rounds: 1,
            repeating: false,
        }
    }

    fn consume(element: Element, group: usize) -> Command {
        Command {
            kind: CommandKind::Consume,
            element,
            generator: GeneratorId(9),
            group: Some(group),
        }
    }

    fn columns(moves: &[GroupMove]) -> Vec<i32> {
        moves.iter().map(|m| m.x).collect()
    }

    #[test]
    fn pair_is_bonded_then_lifted() {
        let m = molecule(
            &[(Element::Salt, (0, 0)), (Element::Water, (1, 0))],
            &[((0, 0), (1, 0), BondKind::Single)],
        );
        let plan = plan_rows(&m, true, "product 0").unwrap();
        let bond = edge(HexPos::new(1, 1), HexPos::new(2, 1));
        assert_eq!(
            plan.steps,
            vec![
                AssemblyStep {
                    element: Element::Salt,
                    slides: vec![],
                    slide: 0,
                    x: 1,
                    lifts: vec![],
                    bonded: vec![],
                },
                AssemblyStep {
                    element: Element::Water,
                    slides: vec![],
                    slide: 0,
                    x: 2,
                    lifts: vec![GroupMove {
                        x: 1,
                        cells: vec![HexPos::new(1, 1), HexPos::new(2, 1)],
                    }],
                    bonded: vec![bond],
                },
            ]
        );
        assert_eq!(plan.marker, HexPos::new(1, 2));
        assert_eq!(plan.width, 2);
        let layout = plan.programmer.finish(plan.width, "product 0").unwrap();
        assert_eq!(layout.bonders, vec![(HexPos::new(1, 1), Rotation::ZERO)]);
    }

    #[test]
    fn upper_rows_are_built_first() {
        let m = corner();
        let plan = plan_rows(&m, true, "product 0").unwrap();
        let elements: Vec<_> = plan.steps.iter().map(|s| s.element).collect();
        assert_eq!(elements, vec![Element::Air, Element::Salt, Element::Water]);
        assert_eq!(columns(&plan.steps[0].lifts), vec![1]);
        assert!(plan.steps[1].lifts.is_empty());
        assert_eq!(columns(&plan.steps[2].lifts), vec![1]);
        assert!(plan.steps.iter().all(|s| s.slide == 0));
        // Salt bonds up to the air above it, water bonds across to salt.
        assert_eq!(
            plan.steps[1].bonded,
            vec![edge(HexPos::new(1, 1), HexPos::new(1, 2))]
        );
        assert_eq!(
            plan.steps[2].bonded,
            vec![edge(HexPos::new(1, 1), HexPos::new(2, 1))]
        );

        let mut bonders = plan.programmer.finish(plan.width, "product 0").unwrap().bonders;
        bonders.sort();
        assert_eq!(
            bonders,
            vec![
                (HexPos::new(1, 1), Rotation::ZERO),
                (HexPos::new(1, 1), Rotation::COUNTERCLOCKWISE),
            ]
        );
    }

    #[test]
    fn unsupported_rows_are_rejected() {
        let m = molecule(
            &[
                (Element::Air, (0, 1)),
                (Element::Fire, (1, 1)),
                (Element::Salt, (0, 0)),
                (Element::Water, (1, 0)),
            ],
            &[((0, 0), (1, 0), BondKind::Single)],
        );
        let err = plan_rows(&m, true, "product 0").unwrap_err();
        assert!(matches!(err, Error::Assembly { .. }));
    }

    /// Two columns where a diagonal pair is bonded in one row and left
    /// apart in the next, both on the same band edge at column zero.
    fn zigzag() -> Molecule {
        molecule(
            &[
                (Element::Salt, (0, 0)),
                (Element::Salt, (1, 0)),
                (Element::Salt, (0, 1)),
                (Element::Salt, (1, 1)),
                (Element::Salt, (0, 2)),
            ],
            &[
                ((0, 0), (0, 1), BondKind::Single),
                ((0, 1), (0, 2), BondKind::Single),
                ((1, 0), (1, 1), BondKind::Single),
                ((1, 1), (0, 2), BondKind::Single),
            ],
        )
    }

    #[test]
    fn conflicting_rows_slide_onto_fresh_columns() {
        let m = zigzag();
        let plan = plan_rows(&m, true, "product 0").unwrap();
        let bottom = &plan.steps[3];
        assert_eq!(bottom.slide, 1);
        assert_eq!(columns(&bottom.slides), vec![1]);
        assert_eq!(bottom.slides[0].cells.len(), 3);
        assert_eq!(bottom.x, 2);
        assert_eq!(plan.steps[4].x, 3);
        assert!(plan.steps[..3].iter().all(|s| s.slide == 0));
        assert_eq!(plan.marker, HexPos::new(2, 2));
        assert_eq!(plan.width, 3);

        let layout = plan.programmer.finish(plan.width, "product 0").unwrap();
        // No bonder sits where the bottom row keeps its diagonal apart.
        let apart = edge(HexPos::new(3, 1), HexPos::new(2, 2));
        assert!(
            layout
                .bonders
                .iter()
                .all(|&(cell, d)| edge(cell, cell + d.unit()) != apart)
        );
        let bonded: usize = plan.steps.iter().map(|s| s.bonded.len()).sum();
        assert_eq!(bonded, 4);
    }

    #[test]
    fn flower_needs_slides_for_its_lower_rows() {
        // A center bonded only to its six neighbors.
        let ring = [(2, 1), (1, 2), (0, 2), (0, 1), (1, 0), (2, 0)];
        let mut cells = vec![(Element::Salt, (1, 1))];
        cells.extend(ring.iter().map(|&c| (Element::Salt, c)));
        let bonds: Vec<_> = ring
            .iter()
            .map(|&c| ((1, 1), c, BondKind::Single))
            .collect();
        let m = molecule(&cells, &bonds);
        let plan = plan_rows(&m, true, "product 0").unwrap();
        assert_eq!(plan.steps.len(), 7);
        assert!(plan.steps.iter().any(|s| s.slide > 0));
        let bonded: usize = plan.steps.iter().map(|s| s.bonded.len()).sum();
        assert_eq!(bonded, 6);
        assert_eq!(plan.finished.len(), 7);
        assert!(plan.programmer.finish(plan.width, "product 0").is_ok());
    }

    #[test]
    fn assembler_places_marker_and_bonders() {
        let m = corner();
        let puzzle = Puzzle::new("assembly", vec![m.clone()], vec![m.clone()]);
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&puzzle, &config);
        let mut station = RowAssembler::new(&mut ctx, HexPos::ORIGIN, &plan_for(&m, 0), &m).unwrap();
        assert_eq!(ctx.tree.count(|k| matches!(k, NodeKind::Product { .. })), 1);
        assert_eq!(
            ctx.tree
                .count(|k| *k == NodeKind::Glyph { kind: GlyphKind::Bonding }),
            2
        );

        for element in [Element::Air, Element::Salt, Element::Water] {
            station.consume(&mut ctx, &consume(element, 0)).unwrap();
        }
        assert_eq!(ctx.used_glyphs().len(), 2);
        // The next copy starts again from the top row.
        assert!(station.consume(&mut ctx, &consume(Element::Salt, 0)).is_err());
    }

    #[test]
    fn single_output_routes_by_product() {
        let fire = molecule(&[(Element::Fire, (0, 0))], &[]);
        let salt = molecule(&[(Element::Salt, (0, 0))], &[]);
        let puzzle = Puzzle::new("singles", vec![fire.clone()], vec![fire.clone(), salt.clone()]);
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&puzzle, &config);
        let plans = [plan_for(&fire, 0), plan_for(&salt, 1)];
        let mut station = SingleOutput::new(&mut ctx, HexPos::new(3, 0), &plans).unwrap();
        assert_eq!(station.carrier().width(), 2);
        assert_eq!(ctx.tree.count(|k| matches!(k, NodeKind::Product { .. })), 2);

        station.consume(&mut ctx, &consume(Element::Salt, 1)).unwrap();
        station.consume(&mut ctx, &consume(Element::Fire, 0)).unwrap();
        assert!(station.consume(&mut ctx, &consume(Element::Fire, 1)).is_err());
        assert!(station.consume(&mut ctx, &consume(Element::Fire, 2)).is_err());
    }
}
