//! Disassembler for ob1 programs.
//!
//! Converts compiled instructions back to the lowercase source form.

use crate::cpu::decode::Instruction;
use crate::cpu::program::Program;
use std::fmt;

/// Shown for positions outside the program.
pub const EMPTY_SLOT: &str = "#";

/// Disassemble a single instruction to text, e.g. `ifd0,sk` or `adv,3`.
pub fn disassemble_instruction(instr: &Instruction) -> String {
    let header = instr.header().mnemonic();
    match instr.operation() {
        Some(op) => format!("{},{}", header, op.mnemonic()),
        None => format!("{},{}", header, instr.operand()),
    }
}

/// Disassemble the instruction at `index`, or [`EMPTY_SLOT`] if there is none.
///
/// Negative indices are accepted so callers can render a window around the
/// program counter without bounds arithmetic.
pub fn format(program: &Program, index: isize) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|i| program.get(i))
        .map(|instr| disassemble_instruction(&instr))
        .unwrap_or_else(|| EMPTY_SLOT.to_string())
}

/// Disassemble a whole program, one numbered line per instruction.
pub fn listing(program: &Program) -> String {
    let mut output = String::new();
    for (addr, instr) in program.iter().enumerate() {
        output.push_str(&format!("{:03}: {}\n", addr, disassemble_instruction(instr)));
    }
    output
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&disassemble_instruction(self))
    }
}
