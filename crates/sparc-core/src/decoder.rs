//! Instruction decoder for the SPARC V8 integer unit.
//!
//! Splits a 32-bit word into its format fields and resolves the opcode,
//! rejecting encodings the integer unit does not implement.

#![allow(missing_docs)]

use thiserror::Error;

use crate::encoding::{
    classify_arithmetic, classify_memory, Condition, Opcode, OP2_BICC, OP2_CBCCC, OP2_FBFCC,
    OP2_SETHI, OP2_UNIMP, OP3_RDASR, OP3_TICC, OP3_WRASR, OP_ARITHMETIC, OP_BRANCH_SETHI,
    OP_CALL, STBAR_ASR,
};

/// Operand layout of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionFormat {
    /// Format 1: 30-bit word displacement.
    Call,
    /// Format 2 `SETHI`/`UNIMP`: 22-bit immediate.
    Sethi,
    /// Format 2 branch: condition, annul bit and 22-bit word displacement.
    Branch,
    /// Format 3 with `i = 0`: second operand is `rs2`.
    Register,
    /// Format 3 with `i = 1`: second operand is `simm13`.
    Immediate,
}

/// Second source operand of a format 3 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand2 {
    Register(u8),
    Immediate(i32),
}

/// Fully decoded instruction record.
///
/// Fields that a format does not define are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecodedInstruction {
    pub opcode: Opcode,
    pub format: InstructionFormat,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    /// Sign-extended 13-bit immediate.
    pub simm13: i32,
    /// Unshifted 22-bit `SETHI`/`UNIMP` immediate.
    pub imm22: u32,
    /// Sign-extended 22- or 30-bit word displacement.
    pub disp: i32,
    pub annul: bool,
    /// Address space identifier of alternate-space register forms.
    pub asi: u8,
    pub raw: u32,
}

impl DecodedInstruction {
    /// Returns the second source operand of a format 3 instruction.
    #[must_use]
    pub const fn operand2(&self) -> Operand2 {
        match self.format {
            InstructionFormat::Immediate => Operand2::Immediate(self.simm13),
            _ => Operand2::Register(self.rs2),
        }
    }

    /// Byte displacement of `CALL` and branches (`disp * 4`).
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn byte_displacement(&self) -> u32 {
        (self.disp as u32).wrapping_shl(2)
    }

    /// Branch or trap condition, if this instruction carries one.
    #[must_use]
    pub const fn condition(&self) -> Option<Condition> {
        match self.opcode {
            Opcode::Bicc(cond) | Opcode::Ticc(cond) => Some(cond),
            _ => None,
        }
    }
}

/// Decoder rejection of a reserved encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeError {
    #[error("invalid instruction word {word:#010x}")]
    Invalid { word: u32 },
}

/// Sign-extends the low `bits` bits of `value` from the field's MSB.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Stateless instruction decoder.
pub struct Decoder;

impl Decoder {
    /// Decodes one 32-bit instruction word.
    ///
    /// Decoding is pure: it never touches CPU state and yields identical
    /// results for identical words.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Invalid`] for reserved encodings; the dispatcher
    /// turns this into an illegal-instruction trap.
    pub fn decode(word: u32) -> Result<DecodedInstruction, DecodeError> {
        match word >> 30 {
            OP_CALL => Ok(DecodedInstruction {
                opcode: Opcode::Call,
                format: InstructionFormat::Call,
                disp: sign_extend(word, 30),
                ..blank(word)
            }),
            OP_BRANCH_SETHI => Self::decode_format2(word),
            op => Self::decode_format3(word, op),
        }
    }

    fn decode_format2(word: u32) -> Result<DecodedInstruction, DecodeError> {
        let imm22 = word & 0x003F_FFFF;
        let sethi = |opcode| DecodedInstruction {
            opcode,
            format: InstructionFormat::Sethi,
            rd: field(word, 25, 0x1F),
            imm22,
            ..blank(word)
        };
        let branch = |opcode| DecodedInstruction {
            opcode,
            format: InstructionFormat::Branch,
            disp: sign_extend(imm22, 22),
            annul: word & (1 << 29) != 0,
            ..blank(word)
        };
        match (word >> 22) & 0x7 {
            OP2_UNIMP => Ok(sethi(Opcode::Unimp)),
            OP2_SETHI => Ok(sethi(Opcode::Sethi)),
            OP2_BICC => Ok(branch(Opcode::Bicc(Condition::from_u4(field(word, 25, 0xF))))),
            OP2_FBFCC => Ok(branch(Opcode::Fbfcc)),
            OP2_CBCCC => Ok(branch(Opcode::Cbccc)),
            _ => Err(DecodeError::Invalid { word }),
        }
    }

    fn decode_format3(word: u32, op: u32) -> Result<DecodedInstruction, DecodeError> {
        let op3 = field(word, 19, 0x3F);
        let rd = field(word, 25, 0x1F);
        let rs1 = field(word, 14, 0x1F);
        let immediate = word & (1 << 13) != 0;

        let classified = if op == OP_ARITHMETIC {
            match op3 {
                OP3_TICC => Some(Opcode::Ticc(Condition::from_u4(rd))),
                OP3_RDASR => Some(match rs1 {
                    0 => Opcode::Rdy,
                    STBAR_ASR if rd == 0 => Opcode::Stbar,
                    _ => Opcode::Rdasr,
                }),
                OP3_WRASR => Some(if rd == 0 { Opcode::Wry } else { Opcode::Wrasr }),
                _ => classify_arithmetic(op3),
            }
        } else {
            classify_memory(op3)
        };
        let opcode = classified.ok_or(DecodeError::Invalid { word })?;

        let (format, rs2, simm13, asi) = if immediate {
            (InstructionFormat::Immediate, 0, sign_extend(word, 13), 0)
        } else {
            (
                InstructionFormat::Register,
                field(word, 0, 0x1F),
                0,
                field(word, 5, 0xFF),
            )
        };

        Ok(DecodedInstruction {
            opcode,
            format,
            rd: if matches!(opcode, Opcode::Ticc(_)) { 0 } else { rd },
            rs1,
            rs2,
            simm13,
            asi,
            ..blank(word)
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn field(word: u32, shift: u32, mask: u32) -> u8 {
    ((word >> shift) & mask) as u8
}

const fn blank(raw: u32) -> DecodedInstruction {
    DecodedInstruction {
        opcode: Opcode::Unimp,
        format: InstructionFormat::Sethi,
        rd: 0,
        rs1: 0,
        rs2: 0,
        simm13: 0,
        imm22: 0,
        disp: 0,
        annul: false,
        asi: 0,
        raw,
    }
}
