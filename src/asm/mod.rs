//! Assembler and disassembler for ob1 programs.
//!
//! This module provides:
//! - A single-pass assembler (text → [`Program`](crate::cpu::Program))
//! - A disassembler (instruction → `header,operand` text)

pub mod assembler;
pub mod disasm;

pub use assembler::{compile, compile_lines, Compilation, CompileError, ErrorKind};
pub use disasm::{disassemble_instruction, format, listing};
