// Property tests for the field, the assembler and the engine

use ob1::asm::disassemble_instruction;
use ob1::cpu::{Header, FIELD_SIZE};
use ob1::{compile, BitField, Engine, Instruction, Program};
use proptest::prelude::*;

fn instruction() -> impl Strategy<Value = Instruction> {
    (0usize..8, 0u8..16).prop_map(|(h, operand)| {
        Instruction::from_parts(Header::ALL[h], operand).expect("nibble operand")
    })
}

proptest! {
    #[test]
    fn set_then_get_returns_value(x in 0..FIELD_SIZE, y in 0..FIELD_SIZE, value in any::<bool>()) {
        let mut field = BitField::new();
        field.set_bit(x, y, value);
        prop_assert_eq!(field.get_bit(x, y), value);
    }

    #[test]
    fn set_bit_touches_only_its_cell(x in 0..FIELD_SIZE, y in 0..FIELD_SIZE) {
        let mut field = BitField::new();
        field.set_bit(x, y, true);
        prop_assert_eq!(field.count_ones(), 1);
    }

    #[test]
    fn disassembly_compiles_back(instr in instruction()) {
        let text = disassemble_instruction(&instr);
        let result = compile(&text);
        prop_assert!(result.is_ok());
        prop_assert_eq!(result.program.get(0), Some(instr));

        let shouted = compile(&text.to_uppercase());
        prop_assert_eq!(shouted.program.get(0), Some(instr));
    }

    #[test]
    fn encoding_roundtrips(instr in instruction()) {
        prop_assert_eq!(Instruction::decode(instr.encode()), Ok(instr));
    }

    #[test]
    fn random_programs_never_panic(
        instrs in prop::collection::vec(instruction(), 1..64),
        bits in prop::collection::vec((0..FIELD_SIZE, 0..FIELD_SIZE), 0..32),
        limit in 1u64..2000
    ) {
        let program = Program::new(instrs);
        let len = program.len() as isize;

        let mut engine = Engine::new();
        for (x, y) in bits {
            engine.field.set_bit(x, y, true);
        }
        engine.install(program);

        engine.run_limited(limit);
        prop_assert!(engine.ticks() <= limit);
        prop_assert!(engine.counter() >= 0 && engine.counter() <= len + 1);

        let ptr = engine.field.pointer();
        prop_assert!(ptr.x < FIELD_SIZE && ptr.y < FIELD_SIZE);
    }

    #[test]
    fn step_runs_at_most_one_tick(instrs in prop::collection::vec(instruction(), 1..32)) {
        let mut engine = Engine::new();
        engine.install(Program::new(instrs));

        engine.step();
        prop_assert!(engine.ticks() <= 1);
    }
}
