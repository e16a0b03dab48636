//! Assembler for ob1 programs.
//!
//! Syntax, one instruction per line:
//! ```text
//! # Comment
//! 000 @  exec,h    # anything up to '@' is a line label and is ignored
//!        tag,0
//!        ifd0,sk
//!        adv,1
//! ```
//!
//! Headers and operands are case-insensitive. Every operand is a 4-bit
//! value written either as an operation mnemonic (`r`, `sk`, `f1`, ...) or
//! as a decimal number 0-15, whatever the header.

use crate::cpu::decode::{Header, Instruction, Operation, MAX_OPERAND};
use crate::cpu::program::Program;
use thiserror::Error;

/// The outcome of compiling a source text.
///
/// Compilation stops at the first bad line, but the instructions produced
/// before it are kept in `program`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Instructions compiled so far, in source order.
    pub program: Program,
    /// Number of source lines read, including the failing one.
    pub lines_consumed: usize,
    /// The error that stopped compilation, if any.
    pub error: Option<CompileError>,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Discard the partial program on failure.
    pub fn into_result(self) -> Result<Program, CompileError> {
        match self.error {
            None => Ok(self.program),
            Some(e) => Err(e),
        }
    }
}

/// Compile source text to a program.
pub fn compile(source: &str) -> Compilation {
    compile_lines(source.lines())
}

/// Compile an already split sequence of source lines.
pub fn compile_lines<I, S>(lines: I) -> Compilation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut asm = Assembler::new();
    let error = asm.assemble(lines).err();
    Compilation {
        program: Program::new(asm.output),
        lines_consumed: asm.lines_consumed,
        error,
    }
}

/// The assembler state.
struct Assembler {
    /// Output instructions.
    output: Vec<Instruction>,
    /// Source lines read so far.
    lines_consumed: usize,
}

impl Assembler {
    fn new() -> Self {
        Self {
            output: Vec::new(),
            lines_consumed: 0,
        }
    }

    fn assemble<I, S>(&mut self, lines: I) -> Result<(), CompileError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (line_num, line) in lines.into_iter().enumerate() {
            self.lines_consumed = line_num + 1;
            self.process_line(line.as_ref(), line_num + 1)?;
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), CompileError> {
        let text = strip_decorations(line);
        if text.is_empty() {
            return Ok(());
        }

        let instr = parse_instruction(text, line_num)?;
        self.output.push(instr);
        Ok(())
    }
}

/// Remove the line label, the trailing comment and surrounding whitespace.
///
/// Everything up to the first `@` goes before the comment is looked for, so
/// an `@` inside a comment swallows the instruction in front of it.
fn strip_decorations(line: &str) -> &str {
    let line = match line.find('@') {
        Some(idx) => &line[idx + 1..],
        None => line,
    };
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    line.trim()
}

fn parse_instruction(text: &str, line_num: usize) -> Result<Instruction, CompileError> {
    let error = |kind| CompileError {
        kind,
        line: line_num,
        text: text.to_string(),
    };

    let (header, operand) = text
        .split_once(',')
        .ok_or_else(|| error(ErrorKind::MissingSeparator))?;

    let header = Header::from_mnemonic(header.trim())
        .ok_or_else(|| error(ErrorKind::UnknownHeader))?;
    let operand = parse_operand(operand.trim())
        .ok_or_else(|| error(ErrorKind::InvalidOperand))?;

    Instruction::from_parts(header, operand).ok_or_else(|| error(ErrorKind::InvalidOperand))
}

/// Resolve an operand to its 4-bit value: mnemonic first, then decimal.
fn parse_operand(operand: &str) -> Option<u8> {
    if let Some(op) = Operation::from_mnemonic(operand) {
        return Some(op.code());
    }

    match operand.parse::<i64>() {
        Ok(value) if (0..=MAX_OPERAND as i64).contains(&value) => Some(value as u8),
        _ => None,
    }
}

/// What went wrong on a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("unknown header")]
    UnknownHeader,

    #[error("missing ',' separator")]
    MissingSeparator,

    #[error("instruction or number 0-15 expected")]
    InvalidOperand,
}

/// A compile error and the 1-based line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} on line {line}: {text}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: usize,
    /// The offending line with label and comment removed.
    pub text: String,
}
