//! The piston every station uses to move atoms.
//!
//! A carrier is mounted at local `(1, -1)`, riding a track along row
//! `r = -1` when its station is wider than one cell. At rest it faces the
//! station's input cell `(0, 0)` with extension one. A single clockwise
//! turn points it straight up; from there each extension reaches one row
//! higher and each step forward one column further right.
//!
//! A carrier remembers which cells of its station hold resting atoms.
//! Every routine is replayed against them before it is written, and a
//! routine that would sweep a carried atom through a resting one is
//! refused.

use super::SynthesisContext;
use crate::model::hex::{HexPos, Pose, Rotation, RotationSense};
use crate::model::program::Instruction;
use crate::model::tree::{ArmId, NodeId, NodeKind};
use crate::model::types::MechanismKind;
use crate::solver::collision::GridState;
use crate::solver::error::Error;
use crate::solver::writer::ArmPose;

use Instruction::{
    Drop as Release, Extend, Grab, MoveBack, MoveForward, Reset, Retract, RotateClockwise,
    RotateCounterclockwise,
};

/// Carrier base in station coordinates.
pub const BASE: HexPos = HexPos::new(1, -1);

/// Direction the carrier faces at rest.
const REST_DIRECTION: i32 = 2;

/// Largest extension a piston supports.
pub const MAX_EXTENSION: i32 = 3;

/// A routine together with the resting atoms its grip moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Motion {
    pub routine: Vec<Instruction>,
    /// Atoms bonded to the gripped one; they follow it until released.
    pub carried: Vec<HexPos>,
    /// Atoms the first step forward drags along and then leaves behind.
    pub trailing: Vec<HexPos>,
}

impl Motion {
    pub fn carrying(routine: Vec<Instruction>, carried: Vec<HexPos>) -> Self {
        Self {
            routine,
            carried,
            trailing: Vec::new(),
        }
    }

    pub fn dragging(routine: Vec<Instruction>, trailing: Vec<HexPos>) -> Self {
        Self {
            routine,
            carried: Vec::new(),
            trailing,
        }
    }
}

impl From<Vec<Instruction>> for Motion {
    fn from(routine: Vec<Instruction>) -> Self {
        Self::carrying(routine, Vec::new())
    }
}

/// One leg of carrier motion.
#[derive(Debug, Clone, Copy)]
enum Sweep {
    Slide(HexPos),
    Turn(HexPos, RotationSense),
}

impl Sweep {
    fn of(instruction: Instruction, pose: &ArmPose) -> Option<Self> {
        let pivot = BASE + HexPos::new(pose.track, 0);
        let facing = Rotation::new(REST_DIRECTION + pose.rotation).unit();
        match instruction {
            Extend => Some(Sweep::Slide(facing)),
            Retract => Some(Sweep::Slide(-facing)),
            MoveForward => Some(Sweep::Slide(HexPos::new(1, 0))),
            MoveBack => Some(Sweep::Slide(HexPos::new(-1, 0))),
            RotateClockwise => Some(Sweep::Turn(pivot, RotationSense::Clockwise)),
            RotateCounterclockwise => Some(Sweep::Turn(pivot, RotationSense::Counterclockwise)),
            _ => None,
        }
    }

    fn blocked(self, resting: &GridState, cells: &[HexPos]) -> bool {
        match self {
            Sweep::Slide(delta) => resting.will_atoms_collide(
                cells,
                Pose::IDENTITY,
                Pose::at(delta),
                RotationSense::Clockwise,
            ),
            Sweep::Turn(pivot, sense) => {
                let offsets: Vec<HexPos> = cells.iter().map(|&c| c - pivot).collect();
                resting.will_atoms_collide(
                    &offsets,
                    Pose::at(pivot),
                    Pose::new(pivot, sense.step()),
                    sense,
                )
            }
        }
    }

    fn apply(self, cell: HexPos) -> HexPos {
        match self {
            Sweep::Slide(delta) => cell + delta,
            Sweep::Turn(pivot, sense) => cell.rotate_around(sense.step(), pivot),
        }
    }
}

/// Cell the carrier's grip is over in `pose`.
fn gripper(pose: &ArmPose) -> HexPos {
    let facing = Rotation::new(REST_DIRECTION + pose.rotation).unit();
    BASE + HexPos::new(pose.track, 0) + facing * (1 + pose.extension)
}

#[derive(Debug, Clone)]
pub struct Carrier {
    arm: ArmId,
    node: NodeId,
    track: Option<NodeId>,
    origin: HexPos,
    width: i32,
    pose: ArmPose,
    reach: i32,
    resting: GridState,
    held: Vec<HexPos>,
}

impl Carrier {
    /// Places a carrier, and its track when needed, under `frame`.
    ///
    /// # Errors
    ///
    /// Returns a capability error when the puzzle withholds pistons, or
    /// tracks for a station wider than one cell. A fixed-length arm
    /// cannot stand in: reaching both the conveyor and the rows above it
    /// takes an arm that extends.
    pub fn install(
        ctx: &mut SynthesisContext<'_>,
        frame: NodeId,
        origin: HexPos,
        width: i32,
    ) -> Result<Self, Error> {
        ctx.require_mechanism(
            MechanismKind::Piston,
            "station carriers must extend from the conveyor into rows one and two",
        )?;
        let track = if width > 1 {
            ctx.require_mechanism(MechanismKind::Track, "carriers travel along a track")?;
            let path = (0..width).map(|q| HexPos::new(q, 0)).collect();
            Some(ctx.tree.add(Some(frame), Pose::at(BASE), NodeKind::Track { path }))
        } else {
            None
        };
        let arm = ctx.next_arm();
        let node = ctx.tree.add(
            Some(frame),
            Pose::new(BASE, Rotation::new(REST_DIRECTION)),
            NodeKind::Arm {
                kind: MechanismKind::Piston,
                extension: 1,
                id: arm,
            },
        );
        Ok(Self {
            arm,
            node,
            track,
            origin,
            width,
            pose: ArmPose::default(),
            reach: 0,
            resting: GridState::new(),
            held: Vec::new(),
        })
    }

    pub fn arm(&self) -> ArmId {
        self.arm
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn track(&self) -> Option<NodeId> {
        self.track
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    /// Furthest track position the carrier ever moved to.
    pub fn reach(&self) -> i32 {
        self.reach
    }

    /// World cell where atoms are handed to the next station.
    pub fn output_cell(&self) -> HexPos {
        self.origin + HexPos::new(self.width, 0)
    }

    /// Whether an atom rests on station cell `cell`.
    #[cfg(test)]
    pub fn is_resting(&self, cell: HexPos) -> bool {
        self.resting.is_occupied(cell)
    }

    /// Atoms that appeared in the station without the carrier, such as a
    /// reagent or a glyph's product.
    pub fn settle(&mut self, cells: impl IntoIterator<Item = HexPos>) {
        for cell in cells {
            self.resting.occupy(cell);
        }
    }

    /// Atoms that left the station without the carrier, consumed by a
    /// glyph or a product marker.
    pub fn vacate(&mut self, cells: impl IntoIterator<Item = HexPos>) {
        for cell in cells {
            self.resting.release(cell);
        }
    }

    /// Writes a routine that moves nothing but the atom it grips.
    ///
    /// # Errors
    ///
    /// See [`run_motion`](Self::run_motion).
    pub fn run(&mut self, ctx: &mut SynthesisContext<'_>, routine: &[Instruction]) -> Result<(), Error> {
        self.execute(ctx, routine, &[], &[])
    }

    /// Writes a routine after replaying it against the resting atoms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collision`] when collision checks are on and a
    /// carried atom would sweep through a resting one; nothing is written
    /// in that case.
    pub fn run_motion(&mut self, ctx: &mut SynthesisContext<'_>, motion: &Motion) -> Result<(), Error> {
        self.execute(ctx, &motion.routine, &motion.carried, &motion.trailing)
    }

    fn execute(
        &mut self,
        ctx: &mut SynthesisContext<'_>,
        routine: &[Instruction],
        carried: &[HexPos],
        trailing: &[HexPos],
    ) -> Result<(), Error> {
        let (resting, held) = self.replay(routine, carried, trailing, ctx.config.collision_check)?;
        self.resting = resting;
        self.held = held;

        let mut pose = self.pose;
        for &instruction in routine {
            pose.apply(instruction);
            self.reach = self.reach.max(pose.track);
        }
        match routine {
            [Grab, actions @ .., Release, Reset] if !actions.contains(&Release) => {
                ctx.writer.write_grab_reset(self.arm, &mut self.pose, actions)
            }
            _ => ctx.writer.write_all(self.arm, &mut self.pose, routine),
        }
        Ok(())
    }

    /// Resting and held cells after `routine`, without writing anything.
    fn replay(
        &self,
        routine: &[Instruction],
        carried: &[HexPos],
        trailing: &[HexPos],
        check: bool,
    ) -> Result<(GridState, Vec<HexPos>), Error> {
        let output = HexPos::new(self.width, 0);
        let mut resting = self.resting.clone();
        let mut held = self.held.clone();
        let mut trailing = trailing.to_vec();
        let mut pose = self.pose;
        for &instruction in routine {
            match instruction {
                Grab => {
                    let grip = gripper(&pose);
                    held = std::iter::once(grip)
                        .chain(carried.iter().copied().filter(|&c| c != grip))
                        .collect();
                    for cell in &held {
                        resting.release(*cell);
                    }
                }
                Release => {
                    for cell in held.drain(..) {
                        if cell != output {
                            resting.occupy(cell);
                        }
                    }
                }
                _ if !held.is_empty() => {
                    let Some(sweep) = Sweep::of(instruction, &pose) else {
                        pose.apply(instruction);
                        continue;
                    };
                    let dragged = if instruction == MoveForward {
                        std::mem::take(&mut trailing)
                    } else {
                        Vec::new()
                    };
                    for cell in &dragged {
                        resting.release(*cell);
                    }
                    let moving: Vec<HexPos> = held.iter().chain(&dragged).copied().collect();
                    if check && sweep.blocked(&resting, &moving) {
                        return Err(Error::Collision(format!(
                            "the carrier at {} moved an atom from {} into another on '{}'",
                            self.origin, held[0], instruction
                        )));
                    }
                    for cell in held.iter_mut() {
                        *cell = sweep.apply(*cell);
                    }
                    for cell in dragged {
                        resting.occupy(sweep.apply(cell));
                    }
                }
                _ => {}
            }
            pose.apply(instruction);
        }
        Ok((resting, held))
    }

    /// Resets alongside `other`, both arms coming free on the same cycle.
    pub fn reset_with(&mut self, ctx: &mut SynthesisContext<'_>, other: ArmId, pose: &mut ArmPose) {
        ctx.writer.write_sync(&mut [
            (self.arm, &mut self.pose, vec![Reset]),
            (other, pose, vec![Reset]),
        ]);
    }

    /// Lets the next station pick up the atom just dropped on the output
    /// cell while this carrier is still resetting.
    pub fn hand_off(&self, ctx: &mut SynthesisContext<'_>) {
        ctx.writer.adjust_time(-1);
        ctx.writer.occupy(self.output_cell());
    }

    pub fn pass_through(&mut self, ctx: &mut SynthesisContext<'_>) -> Result<(), Error> {
        let routine = pass_through(self.width);
        self.run(ctx, &routine)?;
        self.hand_off(ctx);
        Ok(())
    }
}

fn steps(instruction: Instruction, count: i32) -> impl Iterator<Item = Instruction> {
    std::iter::repeat_n(instruction, count.max(0) as usize)
}

/// Input cell straight to the output cell.
pub fn pass_through(width: i32) -> Vec<Instruction> {
    let mut routine = vec![Grab, RotateClockwise];
    routine.extend(steps(MoveForward, width - 1));
    routine.extend([Release, Reset]);
    routine
}

/// Input cell to `(x, row)`.
pub fn deliver(x: i32, row: i32) -> Vec<Instruction> {
    let mut routine = vec![Grab, RotateClockwise];
    routine.extend(steps(MoveForward, x - 1));
    routine.extend(steps(Extend, row));
    routine.extend([Release, Reset]);
    routine
}

/// `(x, row)` down to row zero and along to the output cell.
pub fn fetch(x: i32, row: i32, width: i32) -> Vec<Instruction> {
    let mut routine = vec![RotateClockwise];
    routine.extend(steps(MoveForward, x - 1));
    routine.extend(steps(Extend, row));
    routine.push(Grab);
    routine.extend(steps(Retract, row));
    routine.extend(steps(MoveForward, width - x));
    routine.extend([Release, Reset]);
    routine
}

/// Like [`fetch`], but drags the gripped atom one column right before
/// lowering it, so whatever it is bonded to follows.
pub fn shift_out(x: i32, row: i32, width: i32) -> Vec<Instruction> {
    let mut routine = vec![RotateClockwise];
    routine.extend(steps(MoveForward, x - 1));
    routine.extend(steps(Extend, row));
    routine.extend([Grab, MoveForward]);
    routine.extend(steps(Retract, row));
    routine.extend(steps(MoveForward, width - x - 1));
    routine.extend([Release, Reset]);
    routine
}

/// Raises whatever is gripped at `(x, 1)` by one row.
pub fn lift(x: i32) -> Vec<Instruction> {
    let mut routine = vec![RotateClockwise];
    routine.extend(steps(MoveForward, x - 1));
    routine.extend([Extend, Grab, Extend, Release, Reset]);
    routine
}

/// Slides whatever is gripped at `(x, row)` right by `distance` columns.
pub fn drag(x: i32, row: i32, distance: i32) -> Vec<Instruction> {
    let mut routine = vec![RotateClockwise];
    routine.extend(steps(MoveForward, x - 1));
    routine.extend(steps(Extend, row));
    routine.push(Grab);
    routine.extend(steps(MoveForward, distance));
    routine.extend([Release, Reset]);
    routine
}

/// Lowers whatever is gripped at `(x, 2)` by one row.
pub fn lower(x: i32) -> Vec<Instruction> {
    let mut routine = vec![RotateClockwise];
    routine.extend(steps(MoveForward, x - 1));
    routine.extend([Extend, Extend, Grab, Retract, Release, Reset]);
    routine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::Molecule;
    use crate::model::puzzle::Puzzle;
    use crate::model::types::Element;
    use crate::solver::config::SolverConfig;

    fn puzzle() -> Puzzle {
        let fire = Molecule::from_elements(&[(Element::Fire, HexPos::ORIGIN)]).unwrap();
        Puzzle::new("carrier", vec![fire.clone()], vec![fire])
    }

    fn codes(routine: &[Instruction]) -> String {
        routine.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn routines_spell_expected_codes() {
        assert_eq!(codes(&pass_through(1)), "GRgX");
        assert_eq!(codes(&pass_through(3)), "GRAAgX");
        assert_eq!(codes(&deliver(2, 1)), "GRAEgX");
        assert_eq!(codes(&fetch(1, 1, 2)), "REGeAgX");
        assert_eq!(codes(&fetch(1, 2, 2)), "REEGeeAgX");
        assert_eq!(codes(&shift_out(2, 2, 3)), "RAEEGAeegX");
        assert_eq!(codes(&lift(2)), "RAEGEgX");
        assert_eq!(codes(&lower(1)), "REEGegX");
        assert_eq!(codes(&drag(2, 2, 1)), "RAEEGAgX");
    }

    #[test]
    fn routines_end_at_rest() {
        for routine in [
            pass_through(4),
            deliver(3, 2),
            fetch(2, 1, 4),
            shift_out(3, 2, 4),
            lift(3),
            lower(2),
            drag(1, 2, 3),
        ] {
            let mut pose = ArmPose::default();
            let mut deepest = 0;
            for instruction in &routine {
                pose.apply(*instruction);
                deepest = deepest.max(pose.extension);
            }
            assert!(pose.is_rest());
            assert!(deepest < MAX_EXTENSION);
        }
    }

    #[test]
    fn fetch_ends_on_the_output_column() {
        let mut pose = ArmPose::default();
        for instruction in fetch(2, 1, 4) {
            if instruction == Release {
                break;
            }
            pose.apply(instruction);
        }
        // Base steps from q = 1 to q = 4 while facing up with no extension.
        assert_eq!(pose.track, 3);
        assert_eq!(pose.extension, 0);
        assert_eq!(pose.rotation, -1);
    }

    #[test]
    fn carried_atoms_stop_at_resting_ones() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let frame = ctx.add_frame(HexPos::ORIGIN);
        let mut carrier = Carrier::install(&mut ctx, frame, HexPos::ORIGIN, 3).unwrap();
        carrier.settle([HexPos::new(2, 1)]);

        // Extending through (2, 1) on the way to row two.
        let err = carrier.run(&mut ctx, &deliver(2, 2)).unwrap_err();
        assert!(matches!(err, Error::Collision(_)));
        assert!(carrier.is_resting(HexPos::new(2, 1)));
        assert!(!carrier.is_resting(HexPos::new(2, 2)));

        carrier.run(&mut ctx, &deliver(1, 2)).unwrap();
        assert!(carrier.is_resting(HexPos::new(1, 2)));
        carrier.run(&mut ctx, &fetch(1, 2, 3)).unwrap();
        assert!(!carrier.is_resting(HexPos::new(1, 2)));
        // The output cell belongs to the next station.
        assert!(!carrier.is_resting(HexPos::new(3, 0)));
    }

    #[test]
    fn turns_and_track_moves_are_checked() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let frame = ctx.add_frame(HexPos::ORIGIN);
        let mut carrier = Carrier::install(&mut ctx, frame, HexPos::ORIGIN, 3).unwrap();

        // The first clockwise turn swings the input atom onto (1, 0).
        carrier.settle([HexPos::new(1, 0)]);
        assert!(matches!(
            carrier.run(&mut ctx, &pass_through(3)),
            Err(Error::Collision(_))
        ));
        carrier.vacate([HexPos::new(1, 0)]);

        carrier.settle([HexPos::new(2, 0)]);
        assert!(matches!(
            carrier.run(&mut ctx, &pass_through(3)),
            Err(Error::Collision(_))
        ));
        carrier.vacate([HexPos::new(2, 0)]);
        carrier.run(&mut ctx, &pass_through(3)).unwrap();
    }

    #[test]
    fn unchecked_carriers_move_through_anything() {
        let p = puzzle();
        let config = SolverConfig {
            collision_check: false,
            ..SolverConfig::default()
        };
        let mut ctx = SynthesisContext::new(&p, &config);
        let frame = ctx.add_frame(HexPos::ORIGIN);
        let mut carrier = Carrier::install(&mut ctx, frame, HexPos::ORIGIN, 3).unwrap();
        carrier.settle([HexPos::new(2, 1)]);
        carrier.run(&mut ctx, &deliver(2, 2)).unwrap();
        assert!(carrier.is_resting(HexPos::new(2, 2)));
    }

    #[test]
    fn groups_move_with_the_grip() {
        let p = puzzle();
        let config = SolverConfig::default();
        let mut ctx = SynthesisContext::new(&p, &config);
        let frame = ctx.add_frame(HexPos::ORIGIN);
        let mut carrier = Carrier::install(&mut ctx, frame, HexPos::ORIGIN, 3).unwrap();

        let pair = vec![HexPos::new(1, 1), HexPos::new(2, 1)];
        carrier.settle(pair.clone());
        carrier
            .run_motion(&mut ctx, &Motion::carrying(lift(1), pair))
            .unwrap();
        assert!(carrier.is_resting(HexPos::new(1, 2)));
        assert!(carrier.is_resting(HexPos::new(2, 2)));
        assert!(!carrier.is_resting(HexPos::new(1, 1)));

        // The grip sheds the right-most atom; its neighbor follows one step.
        carrier
            .run_motion(
                &mut ctx,
                &Motion::dragging(shift_out(2, 2, 3), vec![HexPos::new(1, 2)]),
            )
            .unwrap();
        assert!(carrier.is_resting(HexPos::new(2, 2)));
        assert!(!carrier.is_resting(HexPos::new(1, 2)));
        assert!(!carrier.is_resting(HexPos::new(3, 2)));
    }
}
