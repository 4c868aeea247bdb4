//! Cycle-accurate scheduling of many arms on one clock.
//!
//! Instructions are written into *fragments*. Inside a fragment, time is
//! local and starts at zero; each write lands at the later of the current
//! cursor and the cycle after that arm's previous instruction. When a
//! fragment closes it is shifted to the earliest global offset at which
//! none of its lanes (arms, or hand-off cells) overlaps an earlier
//! fragment, and its instructions are committed to the [`Program`].

use std::collections::HashMap;

use log::trace;

use super::error::Error;
use crate::model::hex::HexPos;
use crate::model::program::{Instruction, Program};
use crate::model::tree::ArmId;

/// A resource whose uses must not overlap across fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    Arm(ArmId),
    /// A lattice cell where atoms are handed from one arm to another.
    Cell(HexPos),
}

/// Displacement of an arm from its rest pose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmPose {
    /// Net counterclockwise rotation steps.
    pub rotation: i32,
    /// Net steps forward along the arm's track.
    pub track: i32,
    /// Net extension beyond the resting length.
    pub extension: i32,
}

impl ArmPose {
    pub fn apply(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::RotateClockwise | Instruction::PivotClockwise => self.rotation -= 1,
            Instruction::RotateCounterclockwise | Instruction::PivotCounterclockwise => {
                self.rotation += 1
            }
            Instruction::Extend => self.extension += 1,
            Instruction::Retract => self.extension -= 1,
            Instruction::MoveForward => self.track += 1,
            Instruction::MoveBack => self.track -= 1,
            Instruction::Reset => *self = ArmPose::default(),
            _ => {}
        }
    }

    /// Cycles a reset needs to undo this displacement, never less than one.
    pub fn reset_cycles(&self) -> i64 {
        let steps = self.rotation.abs() + self.track.abs() + self.extension.abs();
        i64::from(steps.max(1))
    }

    pub fn is_rest(&self) -> bool {
        *self == ArmPose::default()
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    first: i64,
    last: i64,
}

#[derive(Debug, Default)]
pub struct ProgramWriter {
    time: i64,
    offset: i64,
    lanes: HashMap<Lane, Span>,
    pending: Vec<(ArmId, i64, Instruction)>,
    global_last: HashMap<Lane, i64>,
    program: Program,
    fragments: usize,
}

impl ProgramWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    fn next_free(&self, lane: Lane) -> i64 {
        self.lanes.get(&lane).map(|s| s.last + 1).unwrap_or(0)
    }

    fn mark(&mut self, lane: Lane, from: i64, to: i64) {
        let span = self.lanes.entry(lane).or_insert(Span {
            first: from,
            last: to,
        });
        span.first = span.first.min(from);
        span.last = span.last.max(to);
    }

    /// Writes one instruction for `arm` and returns its local cycle.
    pub fn write(&mut self, arm: ArmId, instruction: Instruction) -> i64 {
        let cycle = self.time.max(self.next_free(Lane::Arm(arm)));
        self.mark(Lane::Arm(arm), cycle, cycle);
        if !instruction.is_wait() {
            self.pending.push((arm, cycle, instruction));
        }
        trace!("{} @ local {}: {}", arm, cycle, instruction);
        self.time = cycle + 1;
        cycle
    }

    /// Writes a routine for `arm`, tracking its displacement in `pose`.
    pub fn write_all(&mut self, arm: ArmId, pose: &mut ArmPose, instructions: &[Instruction]) {
        for &instruction in instructions {
            if instruction == Instruction::Reset {
                self.write_reset(arm, pose);
            } else {
                self.write(arm, instruction);
                pose.apply(instruction);
            }
        }
    }

    /// Writes a reset and reserves the cycles it takes to complete.
    pub fn write_reset(&mut self, arm: ArmId, pose: &mut ArmPose) -> i64 {
        let cycles = pose.reset_cycles();
        let cycle = self.write(arm, Instruction::Reset);
        self.mark(Lane::Arm(arm), cycle, cycle + cycles - 1);
        *pose = ArmPose::default();
        cycle
    }

    /// Grabs, runs `actions`, drops, then resets, as one unit.
    pub fn write_grab_reset(&mut self, arm: ArmId, pose: &mut ArmPose, actions: &[Instruction]) {
        self.write(arm, Instruction::Grab);
        self.write_all(arm, pose, actions);
        self.write(arm, Instruction::Drop);
        self.write_reset(arm, pose);
    }

    /// Writes one routine per arm starting on a common cycle and pads the
    /// shorter ones so every arm leaves the batch together. A reset in a
    /// routine holds its arm for the reset's full duration.
    pub fn write_sync(&mut self, batch: &mut [(ArmId, &mut ArmPose, Vec<Instruction>)]) {
        let start = batch
            .iter()
            .map(|(arm, _, _)| self.next_free(Lane::Arm(*arm)))
            .fold(self.time, i64::max);
        let mut end = start;
        for (arm, pose, routine) in batch.iter_mut() {
            self.time = start;
            for &instruction in routine.iter() {
                if instruction == Instruction::Reset {
                    let cycles = pose.reset_cycles();
                    let cycle = self.write_reset(*arm, pose);
                    end = end.max(cycle + cycles);
                } else {
                    let cycle = self.write(*arm, instruction);
                    pose.apply(instruction);
                    end = end.max(cycle + 1);
                }
            }
        }
        if end > start {
            for (arm, _, _) in batch.iter() {
                self.mark(Lane::Arm(*arm), start, end - 1);
            }
        }
        self.time = end;
    }

    /// Moves the cursor by `delta` cycles so the next write may overlap
    /// instructions already placed for other arms.
    pub fn adjust_time(&mut self, delta: i64) {
        self.time = (self.time + delta).max(0);
    }

    /// Records that an atom sits in `cell` at the current cycle.
    pub fn occupy(&mut self, cell: HexPos) {
        let now = (self.time - 1).max(0);
        self.mark(Lane::Cell(cell), now, self.time);
    }

    /// Closes the open fragment and starts a new one at local cycle zero.
    pub fn new_fragment(&mut self) -> Result<(), Error> {
        if self.lanes.is_empty() {
            self.time = 0;
            return Ok(());
        }
        let offset = self
            .lanes
            .iter()
            .filter_map(|(lane, span)| {
                self.global_last
                    .get(lane)
                    .map(|last| last + 1 - span.first)
            })
            .fold(self.offset, i64::max);
        for (arm, cycle, instruction) in self.pending.drain(..) {
            let global = cycle + offset;
            let slot = u32::try_from(global)
                .map_err(|_| Error::Scheduling(format!("cycle {} out of range", global)))?;
            if !self.program.insert(arm, slot, instruction) {
                return Err(Error::Scheduling(format!(
                    "{} already has an instruction at cycle {}",
                    arm, slot
                )));
            }
        }
        for (lane, span) in self.lanes.drain() {
            let last = self.global_last.entry(lane).or_insert(i64::MIN);
            *last = (*last).max(span.last + offset);
        }
        trace!("fragment {} committed at offset {}", self.fragments, offset);
        self.offset = offset;
        self.fragments += 1;
        self.time = 0;
        Ok(())
    }

    pub fn finish(mut self) -> Result<Program, Error> {
        self.new_fragment()?;
        Ok(self.program)
    }
}

/// A finite routine re-entered one step per trigger, looping forever.
///
/// Each [`resume`](ResumableSequence::resume) hands back the next step and
/// suspends; after the last step the routine restarts from the beginning.
#[derive(Debug, Clone)]
pub struct ResumableSequence<T> {
    steps: Vec<T>,
    cursor: usize,
    rounds: usize,
}

impl<T> ResumableSequence<T> {
    pub fn new(steps: Vec<T>) -> Self {
        Self {
            steps,
            cursor: 0,
            rounds: 0,
        }
    }

    pub fn resume(&mut self) -> Option<&T> {
        if self.steps.is_empty() {
            return None;
        }
        let index = self.cursor;
        self.cursor += 1;
        if self.cursor == self.steps.len() {
            self.cursor = 0;
            self.rounds += 1;
        }
        self.steps.get(index)
    }

    /// Index of the step the next resume will return.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn completed_rounds(&self) -> usize {
        self.rounds
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: ArmId = ArmId(1);
    const B: ArmId = ArmId(2);

    fn cycles(program: &Program, arm: ArmId) -> Vec<u32> {
        program
            .stream(arm)
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn sequential_writes_advance_per_arm() {
        let mut writer = ProgramWriter::new();
        writer.write(A, Instruction::Grab);
        writer.write(A, Instruction::RotateClockwise);
        writer.write(B, Instruction::Grab);
        let program = writer.finish().unwrap();
        assert_eq!(cycles(&program, A), vec![0, 1]);
        assert_eq!(cycles(&program, B), vec![2]);
    }

    #[test]
    fn adjust_time_lets_other_arms_overlap() {
        let mut writer = ProgramWriter::new();
        writer.write(A, Instruction::Grab);
        writer.write(A, Instruction::Drop);
        writer.adjust_time(-2);
        writer.write(B, Instruction::Grab);
        writer.write(A, Instruction::Reset);
        let program = writer.finish().unwrap();
        assert_eq!(cycles(&program, A), vec![0, 1, 2]);
        assert_eq!(cycles(&program, B), vec![0]);
    }

    #[test]
    fn reset_reserves_its_duration() {
        let mut writer = ProgramWriter::new();
        let mut pose = ArmPose::default();
        writer.write_grab_reset(
            A,
            &mut pose,
            &[
                Instruction::RotateClockwise,
                Instruction::MoveForward,
                Instruction::Extend,
            ],
        );
        assert!(pose.is_rest());
        writer.adjust_time(-10);
        writer.write(A, Instruction::Grab);
        let program = writer.finish().unwrap();
        // G R A E g at 0..=4, X at 5 taking three cycles, then G at 8.
        assert_eq!(cycles(&program, A), vec![0, 1, 2, 3, 4, 5, 8]);
    }

    #[test]
    fn sync_pads_to_common_end() {
        let mut writer = ProgramWriter::new();
        writer.write(B, Instruction::Grab);
        let (mut pa, mut pb) = (ArmPose::default(), ArmPose::default());
        writer.write_sync(&mut [
            (A, &mut pa, vec![Instruction::Extend]),
            (
                B,
                &mut pb,
                vec![Instruction::RotateClockwise, Instruction::RotateClockwise],
            ),
        ]);
        writer.write(A, Instruction::Retract);
        let program = writer.finish().unwrap();
        assert_eq!(cycles(&program, A), vec![1, 3]);
        assert_eq!(cycles(&program, B), vec![0, 1, 2]);
        assert_eq!(pb.rotation, -2);
    }

    #[test]
    fn sync_waits_for_the_longest_reset() {
        let mut writer = ProgramWriter::new();
        let mut pa = ArmPose {
            rotation: 2,
            ..ArmPose::default()
        };
        let mut pb = ArmPose::default();
        writer.write_sync(&mut [
            (A, &mut pa, vec![Instruction::Reset]),
            (B, &mut pb, vec![Instruction::Reset]),
        ]);
        assert!(pa.is_rest());
        writer.write(B, Instruction::Grab);
        let program = writer.finish().unwrap();
        assert_eq!(cycles(&program, A), vec![0]);
        assert_eq!(cycles(&program, B), vec![0, 2]);
    }

    #[test]
    fn fragments_follow_their_lanes() {
        let mut writer = ProgramWriter::new();
        writer.write(A, Instruction::Grab);
        writer.write(A, Instruction::Drop);
        writer.new_fragment().unwrap();
        writer.write(B, Instruction::Grab);
        writer.new_fragment().unwrap();
        writer.write(A, Instruction::Grab);
        let program = writer.finish().unwrap();
        assert_eq!(cycles(&program, A), vec![0, 1, 2]);
        // B shares no lane with the first fragment but never starts earlier.
        assert_eq!(cycles(&program, B), vec![0]);
    }

    #[test]
    fn cells_order_fragments() {
        let mut writer = ProgramWriter::new();
        writer.write(A, Instruction::Drop);
        writer.occupy(HexPos::new(3, 0));
        writer.new_fragment().unwrap();
        writer.write(B, Instruction::Grab);
        writer.occupy(HexPos::new(3, 0));
        let program = writer.finish().unwrap();
        assert_eq!(cycles(&program, B), vec![2]);
    }

    #[test]
    fn resumable_sequence_wraps() {
        let mut seq = ResumableSequence::new(vec!['a', 'b', 'c']);
        let drawn: Vec<char> = (0..7).filter_map(|_| seq.resume().copied()).collect();
        assert_eq!(drawn, vec!['a', 'b', 'c', 'a', 'b', 'c', 'a']);
        assert_eq!(seq.completed_rounds(), 2);
        assert_eq!(seq.position(), 1);
        assert!(ResumableSequence::<u8>::new(Vec::new()).resume().is_none());
    }

    proptest! {
        #[test]
        fn writes_never_collide(
            ops in proptest::collection::vec((0u32..3, 0u8..4, -3i64..2), 1..60)
        ) {
            let mut writer = ProgramWriter::new();
            let mut poses = [ArmPose::default(); 3];
            let mut last: HashMap<ArmId, i64> = HashMap::new();
            let mut writes = 0;
            for (arm, op, delta) in ops {
                let id = ArmId(arm);
                let cycle = match op {
                    0 => Some(writer.write(id, Instruction::Extend)),
                    1 => Some(writer.write_reset(id, &mut poses[arm as usize])),
                    2 => {
                        writer.adjust_time(delta);
                        None
                    }
                    _ => {
                        writer.new_fragment().unwrap();
                        last.clear();
                        None
                    }
                };
                if let Some(cycle) = cycle {
                    writes += 1;
                    if let Some(previous) = last.insert(id, cycle) {
                        prop_assert!(previous < cycle);
                    }
                }
            }
            let program = writer.finish().unwrap();
            prop_assert_eq!(program.instruction_count(), writes);
        }
    }
}
