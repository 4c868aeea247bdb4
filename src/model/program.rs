use std::collections::BTreeMap;
use std::fmt;

use super::tree::ArmId;

/// One primitive per-cycle arm operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    RotateClockwise,
    RotateCounterclockwise,
    Extend,
    Retract,
    Grab,
    Drop,
    PivotClockwise,
    PivotCounterclockwise,
    MoveForward,
    MoveBack,
    Repeat,
    Reset,
    Noop,
    /// Padding that keeps a cycle occupied without an opcode of its own.
    Wait,
}

impl Instruction {
    /// One-byte opcode used by the solution format. `Wait` has none.
    pub fn code(&self) -> Option<u8> {
        let c = match self {
            Instruction::RotateClockwise => b'R',
            Instruction::RotateCounterclockwise => b'r',
            Instruction::Extend => b'E',
            Instruction::Retract => b'e',
            Instruction::Grab => b'G',
            Instruction::Drop => b'g',
            Instruction::PivotClockwise => b'P',
            Instruction::PivotCounterclockwise => b'p',
            Instruction::MoveForward => b'A',
            Instruction::MoveBack => b'a',
            Instruction::Repeat => b'C',
            Instruction::Reset => b'X',
            Instruction::Noop => b'O',
            Instruction::Wait => return None,
        };
        Some(c)
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let instr = match code {
            b'R' => Instruction::RotateClockwise,
            b'r' => Instruction::RotateCounterclockwise,
            b'E' => Instruction::Extend,
            b'e' => Instruction::Retract,
            b'G' => Instruction::Grab,
            b'g' => Instruction::Drop,
            b'P' => Instruction::PivotClockwise,
            b'p' => Instruction::PivotCounterclockwise,
            b'A' => Instruction::MoveForward,
            b'a' => Instruction::MoveBack,
            b'C' => Instruction::Repeat,
            b'X' => Instruction::Reset,
            b'O' => Instruction::Noop,
            _ => return None,
        };
        Some(instr)
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Instruction::Wait)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(c) => write!(f, "{}", c as char),
            None => write!(f, "."),
        }
    }
}

/// Per-arm instruction streams keyed by absolute cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    arms: BTreeMap<ArmId, BTreeMap<u32, Instruction>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an instruction, refusing to overwrite an occupied cycle.
    pub fn insert(&mut self, arm: ArmId, cycle: u32, instruction: Instruction) -> bool {
        let stream = self.arms.entry(arm).or_default();
        if stream.contains_key(&cycle) {
            return false;
        }
        stream.insert(cycle, instruction);
        true
    }

    pub fn stream(&self, arm: ArmId) -> Option<&BTreeMap<u32, Instruction>> {
        self.arms.get(&arm)
    }

    pub fn arms(&self) -> impl Iterator<Item = (ArmId, &BTreeMap<u32, Instruction>)> {
        self.arms.iter().map(|(id, s)| (*id, s))
    }

    /// Number of instructions that carry an opcode.
    pub fn instruction_count(&self) -> usize {
        self.arms
            .values()
            .flat_map(|s| s.values())
            .filter(|i| !i.is_wait())
            .count()
    }

    pub fn last_cycle(&self) -> Option<u32> {
        self.arms
            .values()
            .filter_map(|s| s.keys().next_back().copied())
            .max()
    }
}
