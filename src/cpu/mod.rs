//! The ob1 one-bit machine.
//!
//! This module implements the complete machine:
//! - a 16×16 bit data field, a flag bit and a data pointer
//! - 8-bit instructions: 8 headers × 16 operands
//! - a tick-driven engine with tag-search control flow

pub mod field;
pub mod decode;
pub mod program;
pub mod execute;

pub use field::{BitField, Clamped, Direction, Pointer, FIELD_SIZE};
pub use decode::{DecodeError, Header, Instruction, Operation};
pub use program::{Program, Search};
pub use execute::{Engine, FaultKind, Mode, RunStatus};
