//! Compiled ob1 programs.

use crate::cpu::decode::Instruction;
use serde::{Serialize, Deserialize};

/// Which way a tag search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    Forward,
    Backward,
}

/// An ordered, immutable sequence of instructions.
///
/// Programs are built whole by the assembler and replaced whole on reload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Instruction> {
        self.instructions.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Find the nearest `tag` with the given id, strictly after (or before)
    /// `from`. The instruction at `from` itself is never considered.
    pub fn find_tag(&self, from: usize, id: u8, direction: Search) -> Option<usize> {
        let target = Instruction::Tag { id };
        match direction {
            Search::Forward => (from.saturating_add(1)..self.len())
                .find(|&i| self.instructions[i] == target),
            Search::Backward => (0..from.min(self.len()))
                .rev()
                .find(|&i| self.instructions[i] == target),
        }
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
