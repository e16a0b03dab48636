//! # ob1 Emulator
//!
//! An emulator of the "one-bit machine", which runs the ob1 language.
//!
//! The machine is a 16×16 field of bits, one flag bit and a pointer into
//! the field. Programs are read like a reel of paper tape that can be
//! wound forward or backward to a labelled position; they are never stored
//! in the field itself.

pub mod cpu;
pub mod asm;

// Re-export commonly used types
pub use cpu::{BitField, Engine, FaultKind, Instruction, Mode, Operation, Pointer, Program, RunStatus};
pub use asm::{compile, CompileError, ErrorKind};
