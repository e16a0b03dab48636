//! Instruction set of the ob1 machine.
//!
//! Every instruction is eight bits: a header in the high nibble and an
//! operand in the low nibble. Only headers 8-15 are defined:
//!
//! ```text
//! 1000,bbbb  tag     1100,bbbb  ifd0
//! 1001,bbbb  adv     1101,bbbb  ifd1
//! 1010,bbbb  ret     1110,bbbb  iff0
//! 1011,bbbb  exec    1111,bbbb  iff1
//! ```
//!
//! For `tag`, `adv` and `ret` the operand is a tag id; for the other five
//! headers it selects one of the sixteen [`Operation`]s.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The instruction class selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Header {
    Tag,
    Advance,
    Retreat,
    Execute,
    IfDataZero,
    IfDataOne,
    IfFlagZero,
    IfFlagOne,
}

impl Header {
    /// All headers in encoding order.
    pub const ALL: [Header; 8] = [
        Header::Tag,
        Header::Advance,
        Header::Retreat,
        Header::Execute,
        Header::IfDataZero,
        Header::IfDataOne,
        Header::IfFlagZero,
        Header::IfFlagOne,
    ];

    /// Lowercase assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Header::Tag => "tag",
            Header::Advance => "adv",
            Header::Retreat => "ret",
            Header::Execute => "exec",
            Header::IfDataZero => "ifd0",
            Header::IfDataOne => "ifd1",
            Header::IfFlagZero => "iff0",
            Header::IfFlagOne => "iff1",
        }
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|h| h.mnemonic().eq_ignore_ascii_case(text))
    }

    /// The 4-bit header code (8-15).
    pub const fn code(self) -> u8 {
        match self {
            Header::Tag => 8,
            Header::Advance => 9,
            Header::Retreat => 10,
            Header::Execute => 11,
            Header::IfDataZero => 12,
            Header::IfDataOne => 13,
            Header::IfFlagZero => 14,
            Header::IfFlagOne => 15,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.code() == code)
    }
}

/// One of the sixteen operations an `exec`/`if*` instruction can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// r: pointer one cell right
    MoveRight,
    /// l: pointer one cell left
    MoveLeft,
    /// u: pointer one cell up
    MoveUp,
    /// d: pointer one cell down
    MoveDown,
    /// h: pointer to HOME
    Home,
    /// x: stop and give control back to the caller
    Halt,
    /// sk: skip the next instruction
    Skip,
    /// ex: swap data bit and flag
    ExchangeFlagData,
    /// df: data := flag
    LoadDataFromFlag,
    /// dc: data := !data
    ComplementData,
    /// d0
    ClearData,
    /// d1
    SetData,
    /// fd: flag := data
    LoadFlagFromData,
    /// fc: flag := !flag
    ComplementFlag,
    /// f0
    ClearFlag,
    /// f1
    SetFlag,
}

impl Operation {
    /// All operations, indexed by their 4-bit code.
    pub const ALL: [Operation; 16] = [
        Operation::MoveRight,
        Operation::MoveLeft,
        Operation::MoveUp,
        Operation::MoveDown,
        Operation::Home,
        Operation::Halt,
        Operation::Skip,
        Operation::ExchangeFlagData,
        Operation::LoadDataFromFlag,
        Operation::ComplementData,
        Operation::ClearData,
        Operation::SetData,
        Operation::LoadFlagFromData,
        Operation::ComplementFlag,
        Operation::ClearFlag,
        Operation::SetFlag,
    ];

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Operation::MoveRight => "r",
            Operation::MoveLeft => "l",
            Operation::MoveUp => "u",
            Operation::MoveDown => "d",
            Operation::Home => "h",
            Operation::Halt => "x",
            Operation::Skip => "sk",
            Operation::ExchangeFlagData => "ex",
            Operation::LoadDataFromFlag => "df",
            Operation::ComplementData => "dc",
            Operation::ClearData => "d0",
            Operation::SetData => "d1",
            Operation::LoadFlagFromData => "fd",
            Operation::ComplementFlag => "fc",
            Operation::ClearFlag => "f0",
            Operation::SetFlag => "f1",
        }
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(text))
    }

    /// The 4-bit operation code (0-15).
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Marks a position that `adv`/`ret` can find. Does nothing when executed.
    Tag { id: u8 },
    /// Continue at the next `tag` with the same id.
    Advance { id: u8 },
    /// Continue at the previous `tag` with the same id.
    Retreat { id: u8 },
    /// Always perform `op`.
    Execute { op: Operation },
    /// Perform `op` if the bit under the pointer is 0.
    IfDataZero { op: Operation },
    /// Perform `op` if the bit under the pointer is 1.
    IfDataOne { op: Operation },
    /// Perform `op` if the flag is 0.
    IfFlagZero { op: Operation },
    /// Perform `op` if the flag is 1.
    IfFlagOne { op: Operation },
}

/// Largest operand value a nibble can hold.
pub const MAX_OPERAND: u8 = 15;

impl Instruction {
    /// Build an instruction from a header and a raw 4-bit operand.
    ///
    /// Returns `None` if the operand does not fit in four bits.
    pub fn from_parts(header: Header, operand: u8) -> Option<Self> {
        if operand > MAX_OPERAND {
            return None;
        }
        let instr = match header {
            Header::Tag => Instruction::Tag { id: operand },
            Header::Advance => Instruction::Advance { id: operand },
            Header::Retreat => Instruction::Retreat { id: operand },
            _ => {
                let op = Operation::from_code(operand)?;
                match header {
                    Header::Execute => Instruction::Execute { op },
                    Header::IfDataZero => Instruction::IfDataZero { op },
                    Header::IfDataOne => Instruction::IfDataOne { op },
                    Header::IfFlagZero => Instruction::IfFlagZero { op },
                    _ => Instruction::IfFlagOne { op },
                }
            }
        };
        Some(instr)
    }

    pub fn header(&self) -> Header {
        match self {
            Instruction::Tag { .. } => Header::Tag,
            Instruction::Advance { .. } => Header::Advance,
            Instruction::Retreat { .. } => Header::Retreat,
            Instruction::Execute { .. } => Header::Execute,
            Instruction::IfDataZero { .. } => Header::IfDataZero,
            Instruction::IfDataOne { .. } => Header::IfDataOne,
            Instruction::IfFlagZero { .. } => Header::IfFlagZero,
            Instruction::IfFlagOne { .. } => Header::IfFlagOne,
        }
    }

    /// The raw 4-bit operand.
    pub fn operand(&self) -> u8 {
        match *self {
            Instruction::Tag { id }
            | Instruction::Advance { id }
            | Instruction::Retreat { id } => id,
            Instruction::Execute { op }
            | Instruction::IfDataZero { op }
            | Instruction::IfDataOne { op }
            | Instruction::IfFlagZero { op }
            | Instruction::IfFlagOne { op } => op.code(),
        }
    }

    /// The operation performed, or `None` for `tag`, `adv` and `ret`.
    pub fn operation(&self) -> Option<Operation> {
        match *self {
            Instruction::Tag { .. }
            | Instruction::Advance { .. }
            | Instruction::Retreat { .. } => None,
            Instruction::Execute { op }
            | Instruction::IfDataZero { op }
            | Instruction::IfDataOne { op }
            | Instruction::IfFlagZero { op }
            | Instruction::IfFlagOne { op } => Some(op),
        }
    }

    /// Pack into the 8-bit machine form: header code high, operand low.
    pub fn encode(&self) -> u8 {
        (self.header().code() << 4) | (self.operand() & 0x0F)
    }

    /// Unpack an 8-bit instruction.
    pub fn decode(byte: u8) -> Result<Self, DecodeError> {
        let header = Header::from_code(byte >> 4)
            .ok_or(DecodeError::UndefinedHeader(byte))?;
        // Any nibble is a valid operand, so this cannot fail.
        Self::from_parts(header, byte & 0x0F).ok_or(DecodeError::UndefinedHeader(byte))
    }
}

/// Errors that can occur when decoding a raw instruction byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("undefined header in instruction byte {0:#04x}")]
    UndefinedHeader(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_codes_match_table() {
        for (code, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(op.code() as usize, code);
            assert_eq!(Operation::from_code(code as u8), Some(*op));
        }
        assert_eq!(Operation::from_code(16), None);
    }

    #[test]
    fn test_mnemonic_lookup_ignores_case() {
        assert_eq!(Header::from_mnemonic("EXEC"), Some(Header::Execute));
        assert_eq!(Header::from_mnemonic("Ifd1"), Some(Header::IfDataOne));
        assert_eq!(Header::from_mnemonic("jmp"), None);

        assert_eq!(Operation::from_mnemonic("SK"), Some(Operation::Skip));
        assert_eq!(Operation::from_mnemonic("f1"), Some(Operation::SetFlag));
        assert_eq!(Operation::from_mnemonic("zz"), None);
    }

    #[test]
    fn test_encode_known_values() {
        assert_eq!(Instruction::Tag { id: 0 }.encode(), 0x80);
        assert_eq!(Instruction::Advance { id: 1 }.encode(), 0x91);
        assert_eq!(Instruction::Execute { op: Operation::MoveRight }.encode(), 0xB0);
        assert_eq!(Instruction::IfDataZero { op: Operation::Skip }.encode(), 0xC6);
        assert_eq!(Instruction::IfFlagOne { op: Operation::SetFlag }.encode(), 0xFF);
    }

    #[test]
    fn test_decode_rejects_low_headers() {
        assert_eq!(Instruction::decode(0x00), Err(DecodeError::UndefinedHeader(0x00)));
        assert_eq!(Instruction::decode(0x7F), Err(DecodeError::UndefinedHeader(0x7F)));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for byte in 0x80..=0xFFu8 {
            let instr = Instruction::decode(byte).unwrap();
            assert_eq!(instr.encode(), byte);
        }
    }

    #[test]
    fn test_from_parts_rejects_wide_operand() {
        assert_eq!(Instruction::from_parts(Header::Tag, 16), None);
        assert_eq!(
            Instruction::from_parts(Header::IfFlagZero, 13),
            Some(Instruction::IfFlagZero { op: Operation::ComplementFlag })
        );
    }
}
