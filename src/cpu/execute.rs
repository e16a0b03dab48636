//! Execution engine for the ob1 machine.
//!
//! Implements the decode-dispatch cycle, tag searches and the
//! run/step/fault state machine.

use crate::asm::assembler::{compile, CompileError};
use crate::asm::disasm;
use crate::cpu::decode::{Instruction, Operation};
use crate::cpu::field::{BitField, Direction};
use crate::cpu::program::{Program, Search};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, trace};

/// How far a call to [`Engine::resume`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Keep ticking until something other than `Ok` happens.
    Run,
    /// Tick exactly once.
    Step,
}

/// Runtime conditions that stop execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FaultKind {
    #[error("data pointer out of range")]
    PointerOutOfRange,

    #[error("tag not found")]
    TagNotFound,

    #[error("no program loaded")]
    NoProgramLoaded,

    /// Reserved for undecodable instructions. A [`Program`] is built from
    /// typed [`Instruction`]s, so the engine never reports it.
    #[error("undefined opcode")]
    UndefinedOpcode,
}

/// The result of a run or step call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Still running. Only returned by [`Engine::run_limited`] when the
    /// tick budget runs out.
    Ok,
    /// A `x` operation executed; the counter is already on the next instruction.
    Halted,
    /// One step completed without anything else happening.
    Stepped,
    /// The counter ran off the end of the program.
    TerminatedNormally,
    /// Execution stopped on a fault; the faulting instruction is still current.
    Fault(FaultKind),
}

impl RunStatus {
    pub fn is_fault(&self) -> bool {
        matches!(self, RunStatus::Fault(_))
    }

    /// True for the statuses that end a run regardless of mode.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Halted | RunStatus::TerminatedNormally | RunStatus::Fault(_)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Ok => f.write_str("ok"),
            RunStatus::Halted => f.write_str("halt"),
            RunStatus::Stepped => f.write_str("step"),
            RunStatus::TerminatedNormally => f.write_str("program terminated normally"),
            RunStatus::Fault(kind) => write!(f, "{}", kind),
        }
    }
}

/// The ob1 machine: a data field plus the program driving it.
///
/// The field belongs to the machine for its whole life; loading a new
/// program never touches it.
#[derive(Clone, Serialize)]
pub struct Engine {
    /// The data field, flag and pointer.
    pub field: BitField,
    program: Program,
    /// `None` while no program is loaded.
    counter: Option<usize>,
    /// Outcome of the most recent call.
    status: RunStatus,
    /// Ticks executed since the program was loaded.
    ticks: u64,
}

impl Engine {
    /// Create a machine with a cleared field and no program.
    pub fn new() -> Self {
        Self::with_field(BitField::new())
    }

    /// Create a machine around an existing field.
    pub fn with_field(field: BitField) -> Self {
        Self {
            field,
            program: Program::default(),
            counter: None,
            status: RunStatus::Ok,
            ticks: 0,
        }
    }

    /// Compile `source` and install the result.
    ///
    /// Returns the number of lines read. On a compile error the
    /// instructions before the failing line are still installed and the
    /// error is returned; its `line` is the number of lines read.
    pub fn load_program(&mut self, source: &str) -> Result<usize, CompileError> {
        let compilation = compile(source);
        debug!(
            instructions = compilation.program.len(),
            lines = compilation.lines_consumed,
            error = ?compilation.error,
            "program compiled"
        );
        self.install(compilation.program);
        match compilation.error {
            None => Ok(compilation.lines_consumed),
            Some(e) => Err(e),
        }
    }

    /// Replace the current program. The field is left untouched.
    pub fn install(&mut self, program: Program) {
        self.counter = if program.is_empty() { None } else { Some(0) };
        self.program = program;
        self.status = RunStatus::Ok;
        self.ticks = 0;
    }

    /// Tick until halt, termination or fault.
    ///
    /// There is no iteration cap: a program that loops without halting
    /// never returns. Use [`Engine::run_limited`] when that matters.
    pub fn run(&mut self) -> RunStatus {
        self.resume(Mode::Run)
    }

    /// Perform exactly one tick.
    pub fn step(&mut self) -> RunStatus {
        self.resume(Mode::Step)
    }

    /// Drive the machine in the given mode.
    pub fn resume(&mut self, mode: Mode) -> RunStatus {
        self.drive(mode, None)
    }

    /// Run for at most `max_ticks` ticks.
    ///
    /// Returns `RunStatus::Ok` if the budget ran out first.
    pub fn run_limited(&mut self, max_ticks: u64) -> RunStatus {
        self.drive(Mode::Run, Some(max_ticks))
    }

    fn drive(&mut self, mode: Mode, budget: Option<u64>) -> RunStatus {
        let mut remaining = budget;
        let status = loop {
            if remaining == Some(0) {
                break RunStatus::Ok;
            }
            let status = self.tick(mode);
            if status != RunStatus::Ok {
                break status;
            }
            remaining = remaining.map(|n| n - 1);
        };

        match status {
            RunStatus::Fault(kind) => debug!(counter = self.counter(), %kind, "fault"),
            RunStatus::Halted | RunStatus::TerminatedNormally => {
                debug!(counter = self.counter(), ticks = self.ticks, %status, "stopped")
            }
            _ => {}
        }
        self.status = status;
        status
    }

    /// One decode-dispatch-epilogue cycle.
    fn tick(&mut self, mode: Mode) -> RunStatus {
        let len = self.program.len();
        let mut pc = match self.counter {
            Some(pc) if len > 0 => pc,
            _ => return RunStatus::Fault(FaultKind::NoProgramLoaded),
        };

        // Resume after a normal termination from the top.
        if pc >= len {
            pc = 0;
        }

        let instr = match self.program.get(pc) {
            Some(instr) => instr,
            None => return RunStatus::Fault(FaultKind::UndefinedOpcode),
        };
        trace!(counter = pc, %instr, "tick");
        self.ticks += 1;

        let mut next = pc + 1;
        let mut status = RunStatus::Ok;

        let guarded = match instr {
            Instruction::Tag { .. } => None,
            Instruction::Advance { id } => {
                self.seek(pc, id, Search::Forward, &mut next, &mut status);
                None
            }
            Instruction::Retreat { id } => {
                self.seek(pc, id, Search::Backward, &mut next, &mut status);
                None
            }
            Instruction::Execute { op } => Some(op),
            Instruction::IfDataZero { op } => (!self.field.data()).then_some(op),
            Instruction::IfDataOne { op } => self.field.data().then_some(op),
            Instruction::IfFlagZero { op } => (!self.field.flag()).then_some(op),
            Instruction::IfFlagOne { op } => self.field.flag().then_some(op),
        };

        if let Some(op) = guarded {
            status = self.perform(op, &mut next);
        }

        match status {
            RunStatus::Ok | RunStatus::Halted => {
                self.counter = Some(next);
                if next >= len {
                    status = RunStatus::TerminatedNormally;
                }
            }
            // A fault leaves the failing instruction current.
            _ => self.counter = Some(pc),
        }

        if mode == Mode::Step && status == RunStatus::Ok {
            status = RunStatus::Stepped;
        }
        status
    }

    fn seek(&self, pc: usize, id: u8, direction: Search, next: &mut usize, status: &mut RunStatus) {
        match self.program.find_tag(pc, id, direction) {
            Some(target) => *next = target,
            None => *status = RunStatus::Fault(FaultKind::TagNotFound),
        }
    }

    /// Carry out an operation whose guard passed.
    fn perform(&mut self, op: Operation, next: &mut usize) -> RunStatus {
        let field = &mut self.field;
        let direction = match op {
            Operation::MoveRight => Direction::Right,
            Operation::MoveLeft => Direction::Left,
            Operation::MoveUp => Direction::Up,
            Operation::MoveDown => Direction::Down,
            Operation::Home => {
                field.home();
                return RunStatus::Ok;
            }
            Operation::Halt => return RunStatus::Halted,
            Operation::Skip => {
                *next += 1;
                return RunStatus::Ok;
            }
            _ => {
                apply_bit_op(field, op);
                return RunStatus::Ok;
            }
        };

        match field.try_step(direction) {
            Ok(_) => RunStatus::Ok,
            Err(_) => RunStatus::Fault(FaultKind::PointerOutOfRange),
        }
    }

    /// The program counter, or -1 if no program is loaded.
    pub fn counter(&self) -> isize {
        self.counter.map_or(-1, |pc| pc as isize)
    }

    /// Disassemble the instruction at `index`, `"#"` if there is none.
    pub fn disassemble(&self, index: isize) -> String {
        disasm::format(&self.program, index)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn field(&self) -> &BitField {
        &self.field
    }

    /// Outcome of the most recent run or step.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Ticks executed since the current program was loaded.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// The data and flag operations. Pointer and control operations are
/// handled by the engine.
fn apply_bit_op(field: &mut BitField, op: Operation) {
    match op {
        Operation::ExchangeFlagData => field.exchange(),
        Operation::LoadDataFromFlag => field.set_data(field.flag()),
        Operation::ComplementData => field.set_data(!field.data()),
        Operation::ClearData => field.set_data(false),
        Operation::SetData => field.set_data(true),
        Operation::LoadFlagFromData => field.set_flag(field.data()),
        Operation::ComplementFlag => field.set_flag(!field.flag()),
        Operation::ClearFlag => field.set_flag(false),
        Operation::SetFlag => field.set_flag(true),
        Operation::MoveRight
        | Operation::MoveLeft
        | Operation::MoveUp
        | Operation::MoveDown
        | Operation::Home
        | Operation::Halt
        | Operation::Skip => {}
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("counter", &self.counter())
            .field("status", &self.status)
            .field("ticks", &self.ticks)
            .field("field", &self.field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::field::Pointer;

    fn engine_with(source: &str) -> Engine {
        let mut engine = Engine::new();
        engine.load_program(source).unwrap();
        engine
    }

    #[test]
    fn test_no_program() {
        let mut engine = Engine::new();
        assert_eq!(engine.counter(), -1);
        assert_eq!(engine.run(), RunStatus::Fault(FaultKind::NoProgramLoaded));
        assert_eq!(engine.step(), RunStatus::Fault(FaultKind::NoProgramLoaded));
        assert_eq!(engine.counter(), -1);
    }

    #[test]
    fn test_comment_only_program_counts_as_none() {
        let mut engine = engine_with("# nothing here\n\n");
        assert_eq!(engine.counter(), -1);
        assert_eq!(engine.run(), RunStatus::Fault(FaultKind::NoProgramLoaded));
    }

    #[test]
    fn test_run_to_end() {
        let mut engine = engine_with("exec,d1\nexec,r\nexec,f1");

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert_eq!(engine.counter(), 3);
        assert!(engine.field.get_bit(0, 0));
        assert!(engine.field.flag());
        assert_eq!(engine.field.pointer(), Pointer::new(1, 0));
        assert_eq!(engine.ticks(), 3);
    }

    #[test]
    fn test_restart_after_termination() {
        let mut engine = engine_with("exec,dc");

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(engine.field.get_bit(0, 0));

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(!engine.field.get_bit(0, 0));
    }

    #[test]
    fn test_step_reports_stepped() {
        let mut engine = engine_with("exec,f1\nexec,fc\nexec,fc");

        assert_eq!(engine.step(), RunStatus::Stepped);
        assert_eq!(engine.counter(), 1);
        assert!(engine.field.flag());

        assert_eq!(engine.step(), RunStatus::Stepped);
        assert!(!engine.field.flag());

        assert_eq!(engine.step(), RunStatus::TerminatedNormally);
        assert!(engine.field.flag());
    }

    #[test]
    fn test_halt_advances_counter() {
        let mut engine = engine_with("exec,x\nexec,d1\nexec,x\nexec,f1");

        assert_eq!(engine.run(), RunStatus::Halted);
        assert_eq!(engine.counter(), 1);
        assert!(!engine.field.get_bit(0, 0));

        assert_eq!(engine.step(), RunStatus::Stepped);
        assert!(engine.field.get_bit(0, 0));

        assert_eq!(engine.run(), RunStatus::Halted);
        assert_eq!(engine.counter(), 3);
    }

    #[test]
    fn test_halt_on_last_instruction_terminates() {
        let mut engine = engine_with("exec,x");
        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
    }

    #[test]
    fn test_skip_bypasses_next() {
        let mut engine = engine_with("exec,sk\nexec,d1\nexec,f1");

        assert_eq!(engine.step(), RunStatus::Stepped);
        assert_eq!(engine.counter(), 2);

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(!engine.field.get_bit(0, 0));
        assert!(engine.field.flag());
    }

    #[test]
    fn test_skip_past_end_terminates() {
        let mut engine = engine_with("exec,f1\nexec,sk");
        assert_eq!(engine.run(), RunStatus::TerminatedNormally);

        // the next run starts over from the top
        assert_eq!(engine.step(), RunStatus::Stepped);
        assert_eq!(engine.counter(), 1);
    }

    #[test]
    fn test_conditionals() {
        let mut engine = engine_with("ifd1,f1\nifd0,d1\niff1,x\niff0,r");

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(!engine.field.flag());
        assert!(engine.field.get_bit(0, 0));
        assert_eq!(engine.field.pointer(), Pointer::new(1, 0));
    }

    #[test]
    fn test_true_guards_execute() {
        let mut engine = engine_with("exec,d1\nifd1,f1\niff1,r\niff1,d1");

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(engine.field.flag());
        assert!(engine.field.get_bit(0, 0));
        assert!(engine.field.get_bit(1, 0));
        assert_eq!(engine.field.pointer(), Pointer::new(1, 0));
    }

    #[test]
    fn test_false_guard_still_advances() {
        let mut engine = engine_with("iff1,x\nexec,d1");
        assert_eq!(engine.step(), RunStatus::Stepped);
        assert_eq!(engine.counter(), 1);
    }

    #[test]
    fn test_data_operations() {
        let mut engine = engine_with("exec,f1\nexec,df\nexec,r\nexec,ex\nexec,fd\nexec,h\nexec,d0");

        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(!engine.field.get_bit(0, 0));
        assert!(engine.field.get_bit(1, 0));
        assert!(engine.field.flag());
    }

    #[test]
    fn test_pointer_fault_keeps_counter() {
        let mut engine = engine_with("exec,d1\nexec,l\nexec,f1");

        assert_eq!(engine.run(), RunStatus::Fault(FaultKind::PointerOutOfRange));
        assert_eq!(engine.counter(), 1);
        assert_eq!(engine.field.pointer(), Pointer::HOME);

        // retried verbatim
        assert_eq!(engine.step(), RunStatus::Fault(FaultKind::PointerOutOfRange));
        assert_eq!(engine.counter(), 1);
        assert!(!engine.field.flag());
    }

    #[test]
    fn test_advance_and_retreat() {
        let mut engine = engine_with("adv,3\nexec,d1\ntag,3\nexec,f1");
        assert_eq!(engine.step(), RunStatus::Stepped);
        assert_eq!(engine.counter(), 2);
        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(!engine.field.get_bit(0, 0));

        let mut engine = engine_with("tag,0\nexec,x\nret,0");
        assert_eq!(engine.run(), RunStatus::Halted);
        assert_eq!(engine.step(), RunStatus::Stepped);
        assert_eq!(engine.counter(), 0);
    }

    #[test]
    fn test_tag_not_found() {
        let mut engine = engine_with("tag,1\nexec,f1\nadv,1");

        assert_eq!(engine.run(), RunStatus::Fault(FaultKind::TagNotFound));
        assert_eq!(engine.counter(), 2);
        assert_eq!(engine.disassemble(engine.counter()), "adv,1");

        assert_eq!(engine.run(), RunStatus::Fault(FaultKind::TagNotFound));
        assert_eq!(engine.counter(), 2);
    }

    #[test]
    fn test_run_limited() {
        let mut engine = engine_with("tag,0\nret,0");
        assert_eq!(engine.run_limited(10), RunStatus::Ok);
        assert_eq!(engine.ticks(), 10);
        assert_eq!(engine.status(), RunStatus::Ok);
    }

    #[test]
    fn test_reload_keeps_field() {
        let mut engine = engine_with("exec,d1\nexec,f1\nexec,u");
        engine.run();

        engine.load_program("exec,h").unwrap();
        assert_eq!(engine.counter(), 0);
        assert!(engine.field.get_bit(0, 0));
        assert!(engine.field.flag());
        assert_eq!(engine.field.pointer(), Pointer::new(0, 1));
    }

    #[test]
    fn test_failed_load_keeps_partial_program() {
        let mut engine = Engine::new();
        let err = engine.load_program("exec,d1\nexec,zz\nexec,f1").unwrap_err();

        assert_eq!(err.line, 2);
        assert_eq!(engine.program().len(), 1);
        assert_eq!(engine.counter(), 0);
        assert_eq!(engine.run(), RunStatus::TerminatedNormally);
        assert!(engine.field.get_bit(0, 0));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::Fault(FaultKind::TagNotFound).to_string(), "tag not found");
        assert_eq!(RunStatus::TerminatedNormally.to_string(), "program terminated normally");
    }
}
