//! Instruction disassembly in SPARC assembler syntax.
//!
//! Instructions are fixed-width, so a window around a PC is a plain range of
//! aligned words. Words the decoder rejects are shown as `.word`.

use std::fmt;

use crate::decoder::{DecodedInstruction, Decoder, InstructionFormat, Operand2};
use crate::encoding::Opcode;
use crate::Bus;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Assembler names of the 32 visible integer registers.
pub const REGISTER_NAMES: [&str; 32] = [
    "%g0", "%g1", "%g2", "%g3", "%g4", "%g5", "%g6", "%g7", //
    "%o0", "%o1", "%o2", "%o3", "%o4", "%o5", "%sp", "%o7", //
    "%l0", "%l1", "%l2", "%l3", "%l4", "%l5", "%l6", "%l7", //
    "%i0", "%i1", "%i2", "%i3", "%i4", "%i5", "%fp", "%i7",
];

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction.
    pub addr: u32,
    /// Raw instruction word.
    pub raw: u32,
    /// The instruction mnemonic (e.g. `add`, `bne,a`, `nop`).
    pub mnemonic: String,
    /// Formatted operands (e.g. `%g1, 0xff, %o0`).
    pub operands: String,
    /// Whether the word is a reserved encoding.
    pub is_illegal: bool,
}

/// Returns the assembler name of register `idx`.
#[must_use]
pub fn register_name(idx: u8) -> &'static str {
    REGISTER_NAMES[usize::from(idx & 0x1F)]
}

/// Disassembles `count` words starting `before` instructions ahead of `center`.
///
/// Rows stop at the first word the bus cannot read.
pub fn disassemble_window(
    bus: &mut dyn Bus,
    center: u32,
    before: u32,
    count: usize,
) -> Vec<DisassemblyRow> {
    let start = (center & !3).wrapping_sub(before.wrapping_mul(4));
    let mut rows = Vec::with_capacity(count);
    let mut addr = start;
    for _ in 0..count {
        let Ok(word) = bus.read32(addr) else {
            break;
        };
        rows.push(disassemble_one(addr, word));
        addr = addr.wrapping_add(4);
    }
    rows
}

/// Disassembles `word` as if it were fetched from `addr`.
#[must_use]
pub fn disassemble_one(addr: u32, word: u32) -> DisassemblyRow {
    match Decoder::decode(word) {
        Ok(instr) => DisassemblyRow {
            addr,
            raw: word,
            mnemonic: mnemonic(&instr),
            operands: format_operands(&instr, Some(addr)),
            is_illegal: false,
        },
        Err(_) => DisassemblyRow {
            addr,
            raw: word,
            mnemonic: ".word".to_string(),
            operands: format!("{word:#010x}"),
            is_illegal: true,
        },
    }
}

fn is_nop(instr: &DecodedInstruction) -> bool {
    instr.opcode == Opcode::Sethi && instr.rd == 0 && instr.imm22 == 0
}

fn mnemonic(instr: &DecodedInstruction) -> String {
    if is_nop(instr) {
        return "nop".to_string();
    }
    let base = instr.opcode.mnemonic();
    if instr.annul {
        format!("{base},a")
    } else {
        base.to_string()
    }
}

fn operand2(instr: &DecodedInstruction) -> String {
    match instr.operand2() {
        Operand2::Register(rs2) => register_name(rs2).to_string(),
        Operand2::Immediate(simm13) if simm13 < 0 => format!("-{:#x}", simm13.unsigned_abs()),
        Operand2::Immediate(simm13) => format!("{simm13:#x}"),
    }
}

/// `%rs1 + op2`, dropping a zero second operand.
fn address(instr: &DecodedInstruction) -> String {
    let base = register_name(instr.rs1);
    match instr.operand2() {
        Operand2::Register(0) | Operand2::Immediate(0) => base.to_string(),
        Operand2::Immediate(simm13) if simm13 < 0 => {
            format!("{base} - {:#x}", simm13.unsigned_abs())
        }
        _ => format!("{base} + {}", operand2(instr)),
    }
}

fn memory_operand(instr: &DecodedInstruction) -> String {
    if instr.opcode.is_alternate_space() && instr.format == InstructionFormat::Register {
        format!("[{}] {:#04x}", address(instr), instr.asi)
    } else {
        format!("[{}]", address(instr))
    }
}

#[allow(clippy::cast_possible_wrap)]
fn target(instr: &DecodedInstruction, pc: Option<u32>) -> String {
    let offset = instr.byte_displacement();
    pc.map_or_else(
        || format!(".{:+}", offset as i32),
        |pc| format!("{:#x}", pc.wrapping_add(offset)),
    )
}

fn format_operands(instr: &DecodedInstruction, pc: Option<u32>) -> String {
    let rd = register_name(instr.rd);
    let rs1 = register_name(instr.rs1);
    match instr.opcode {
        Opcode::Call | Opcode::Bicc(_) | Opcode::Fbfcc | Opcode::Cbccc => target(instr, pc),
        Opcode::Sethi if is_nop(instr) => String::new(),
        Opcode::Sethi => format!("%hi({:#x}), {rd}", instr.imm22 << 10),
        Opcode::Unimp => format!("{:#x}", instr.imm22),
        Opcode::Stbar | Opcode::Fpop | Opcode::Cpop => String::new(),
        Opcode::Rdy => format!("%y, {rd}"),
        Opcode::Rdasr => format!("%asr{}, {rd}", instr.rs1),
        Opcode::Rdpsr => format!("%psr, {rd}"),
        Opcode::Rdwim => format!("%wim, {rd}"),
        Opcode::Rdtbr => format!("%tbr, {rd}"),
        Opcode::Wry => format!("{rs1}, {}, %y", operand2(instr)),
        Opcode::Wrasr => format!("{rs1}, {}, %asr{}", operand2(instr), instr.rd),
        Opcode::Wrpsr => format!("{rs1}, {}, %psr", operand2(instr)),
        Opcode::Wrwim => format!("{rs1}, {}, %wim", operand2(instr)),
        Opcode::Wrtbr => format!("{rs1}, {}, %tbr", operand2(instr)),
        Opcode::Jmpl => format!("{}, {rd}", address(instr)),
        Opcode::Rett | Opcode::Ticc(_) | Opcode::Flush => address(instr),
        Opcode::FpMemory | Opcode::CpMemory => memory_operand(instr),
        opcode if opcode.is_store() => format!("{rd}, {}", memory_operand(instr)),
        Opcode::Ld
        | Opcode::Ldub
        | Opcode::Lduh
        | Opcode::Ldd
        | Opcode::Ldsb
        | Opcode::Ldsh
        | Opcode::Ldstub
        | Opcode::Swap
        | Opcode::Lda
        | Opcode::Lduba
        | Opcode::Lduha
        | Opcode::Ldda
        | Opcode::Ldsba
        | Opcode::Ldsha
        | Opcode::Ldstuba
        | Opcode::Swapa => format!("{}, {rd}", memory_operand(instr)),
        _ => format!("{rs1}, {}, {rd}", operand2(instr)),
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = format_operands(self, None);
        if operands.is_empty() {
            f.write_str(&mnemonic(self))
        } else {
            write!(f, "{} {operands}", mnemonic(self))
        }
    }
}
