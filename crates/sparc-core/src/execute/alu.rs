//! Integer arithmetic, logic, shift, multiply and divide handlers.

use super::flags;
use super::helpers::operands;
use super::ExecResult;
use crate::decoder::DecodedInstruction;
use crate::{ConditionCodes, CoreState, TrapType};

/// Two-operand ALU operation selected by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    AddCarry,
    Sub,
    SubCarry,
    And,
    AndNot,
    Or,
    OrNot,
    Xor,
    Xnor,
    Sll,
    Srl,
    Sra,
    TaggedAdd,
    TaggedSub,
}

impl AluOp {
    /// Computes the result and the condition codes a `cc` form would write.
    fn apply(self, left: u32, right: u32, carry: bool) -> (u32, ConditionCodes) {
        let carry = u32::from(carry);
        let shift = right & 0x1F;
        match self {
            Self::Add | Self::AddCarry => {
                let carry = if self == Self::AddCarry { carry } else { 0 };
                let result = left.wrapping_add(right).wrapping_add(carry);
                (result, flags::add(left, right, result))
            }
            Self::Sub | Self::SubCarry => {
                let borrow = if self == Self::SubCarry { carry } else { 0 };
                let result = left.wrapping_sub(right).wrapping_sub(borrow);
                (result, flags::sub(left, right, result))
            }
            Self::TaggedAdd => {
                let result = left.wrapping_add(right);
                (result, flags::tagged_add(left, right, result))
            }
            Self::TaggedSub => {
                let result = left.wrapping_sub(right);
                (result, flags::tagged_sub(left, right, result))
            }
            Self::And => logic(left & right),
            Self::AndNot => logic(left & !right),
            Self::Or => logic(left | right),
            Self::OrNot => logic(left | !right),
            Self::Xor => logic(left ^ right),
            Self::Xnor => logic(left ^ !right),
            Self::Sll => logic(left << shift),
            Self::Srl => logic(left >> shift),
            Self::Sra => logic(((left as i32) >> shift) as u32),
        }
    }
}

fn logic(result: u32) -> (u32, ConditionCodes) {
    (result, flags::logical(result))
}

/// Executes a two-operand ALU instruction.
///
/// With `trap_on_overflow` (the `TV` tagged forms) a set `V` raises
/// `TagOverflow` and leaves both `rd` and the condition codes untouched.
pub fn execute_alu(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    op: AluOp,
    set_cc: bool,
    trap_on_overflow: bool,
) -> ExecResult {
    let (left, right) = operands(&state.arch, instr);
    let (result, icc) = op.apply(left, right, state.arch.icc().c);
    if trap_on_overflow && icc.v {
        return Err(TrapType::TagOverflow.into());
    }
    state.arch.set_reg(instr.rd, result);
    if set_cc {
        state.arch.set_icc(icc);
    }
    Ok(())
}

/// `SETHI`: loads `imm22` into the upper 22 bits of `rd`, clearing the rest.
pub fn execute_sethi(state: &mut CoreState, instr: &DecodedInstruction) -> ExecResult {
    state.arch.set_reg(instr.rd, instr.imm22 << 10);
    Ok(())
}

/// `MULScc`: one step of the shift-and-add multiply using `Y` as multiplier.
pub fn execute_mulscc(state: &mut CoreState, instr: &DecodedInstruction) -> ExecResult {
    let (rs1, operand) = operands(&state.arch, instr);
    let icc = state.arch.icc();
    let y = state.arch.y();
    let left = (u32::from(icc.n ^ icc.v) << 31) | (rs1 >> 1);
    let right = if y & 1 == 0 { 0 } else { operand };
    let result = left.wrapping_add(right);
    state.arch.set_y((rs1 << 31) | (y >> 1));
    state.arch.set_reg(instr.rd, result);
    state.arch.set_icc(flags::add(left, right, result));
    Ok(())
}

/// `UMUL`/`SMUL`: 32x32 multiply, low word to `rd`, high word to `Y`.
pub fn execute_multiply(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    signed: bool,
    set_cc: bool,
) -> ExecResult {
    let (left, right) = operands(&state.arch, instr);
    let product = if signed {
        (i64::from(left as i32) * i64::from(right as i32)) as u64
    } else {
        u64::from(left) * u64::from(right)
    };
    let low = product as u32;
    state.arch.set_y((product >> 32) as u32);
    state.arch.set_reg(instr.rd, low);
    if set_cc {
        state.arch.set_icc(flags::logical(low));
    }
    Ok(())
}

/// `UDIV`/`SDIV`: divides the 64-bit `Y:rs1` by the 32-bit operand.
///
/// Quotients that do not fit are clamped and flagged through `V`. `Y` is
/// left unchanged.
pub fn execute_divide(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    signed: bool,
    set_cc: bool,
) -> ExecResult {
    let (left, right) = operands(&state.arch, instr);
    if right == 0 {
        return Err(TrapType::DivisionByZero.into());
    }
    let dividend = (u64::from(state.arch.y()) << 32) | u64::from(left);
    let (quotient, overflow) = if signed {
        let quotient = i128::from(dividend as i64) / i128::from(right as i32);
        if quotient > i128::from(i32::MAX) {
            (i32::MAX as u32, true)
        } else if quotient < i128::from(i32::MIN) {
            (i32::MIN as u32, true)
        } else {
            (quotient as u32, false)
        }
    } else {
        let quotient = dividend / u64::from(right);
        u32::try_from(quotient).map_or((u32::MAX, true), |quotient| (quotient, false))
    };
    state.arch.set_reg(instr.rd, quotient);
    if set_cc {
        state.arch.set_icc(flags::divide(quotient, overflow));
    }
    Ok(())
}
