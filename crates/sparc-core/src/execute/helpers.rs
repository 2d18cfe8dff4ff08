//! Operand and address helpers shared by the instruction handlers.

use crate::decoder::{DecodedInstruction, Operand2};
use crate::{ArchitecturalState, TrapType};

/// Value of the second source operand: `r[rs2]` or the sign-extended immediate.
pub fn operand2(arch: &ArchitecturalState, instr: &DecodedInstruction) -> u32 {
    match instr.operand2() {
        Operand2::Register(rs2) => arch.reg(rs2),
        Operand2::Immediate(simm13) => simm13 as u32,
    }
}

/// Both source operands of a format 3 instruction.
pub fn operands(arch: &ArchitecturalState, instr: &DecodedInstruction) -> (u32, u32) {
    (arch.reg(instr.rs1), operand2(arch, instr))
}

/// Effective address `r[rs1] + operand2`, wrapping modulo 2^32.
pub fn compute_effective_address(arch: &ArchitecturalState, instr: &DecodedInstruction) -> u32 {
    let (base, offset) = operands(arch, instr);
    base.wrapping_add(offset)
}

/// Fails with `PrivilegedInstruction` unless the processor is in supervisor mode.
pub const fn require_supervisor(arch: &ArchitecturalState) -> Result<(), TrapType> {
    if arch.supervisor() {
        Ok(())
    } else {
        Err(TrapType::PrivilegedInstruction)
    }
}
