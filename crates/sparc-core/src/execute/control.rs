//! Control-transfer handlers: `CALL`, `JMPL`, `RETT`, `Bicc` and `Ticc`.
//!
//! Every transfer is delayed: the handler only rewrites `nPC2`, so the
//! instruction at `nPC` (the delay slot) still executes unless annulled.

use super::helpers::{compute_effective_address, operands, require_supervisor};
use super::ExecResult;
use crate::decoder::DecodedInstruction;
use crate::encoding::Condition;
use crate::memory::{validate_alignment, AccessWidth};
use crate::state::registers::REG_O7;
use crate::{CoreState, TrapType};

/// `CALL`: `%o7 := PC`, then jump to `PC + disp30 * 4`.
pub fn execute_call(state: &mut CoreState, instr: &DecodedInstruction) -> ExecResult {
    let pc = state.arch.pc();
    state.arch.set_reg(REG_O7, pc);
    state
        .arch
        .schedule_jump(pc.wrapping_add(instr.byte_displacement()));
    Ok(())
}

/// `JMPL`: `rd := PC`, then jump to `r[rs1] + operand2`.
///
/// A misaligned target traps before `rd` is written.
pub fn execute_jmpl(state: &mut CoreState, instr: &DecodedInstruction) -> ExecResult {
    let target = compute_effective_address(&state.arch, instr);
    validate_alignment(target, AccessWidth::Word)?;
    let pc = state.arch.pc();
    state.arch.set_reg(instr.rd, pc);
    state.arch.schedule_jump(target);
    Ok(())
}

/// `RETT`: return from a trap handler.
///
/// Only legal in supervisor mode with traps disabled. The target is read in
/// the handler's window, then the window is restored, traps are re-enabled
/// and the previous privilege level comes back.
pub fn execute_rett(state: &mut CoreState, instr: &DecodedInstruction) -> ExecResult {
    if state.arch.traps_enabled() {
        return Err(if state.arch.supervisor() {
            TrapType::IllegalInstruction
        } else {
            TrapType::PrivilegedInstruction
        }
        .into());
    }
    require_supervisor(&state.arch)?;
    let target = compute_effective_address(&state.arch, instr);
    validate_alignment(target, AccessWidth::Word)?;
    state.arch.registers_mut().restore()?;
    state.arch.set_traps_enabled(true);
    let previous = state.arch.previous_supervisor();
    state.arch.set_supervisor(previous);
    state.arch.schedule_jump(target);
    Ok(())
}

/// `Bicc`: conditional delayed branch.
///
/// `BA,a` annuls its delay slot; any other branch with the annul bit set
/// annuls only when not taken.
pub fn execute_branch(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    cond: Condition,
) -> ExecResult {
    if cond.evaluate(state.arch.icc()) {
        let target = state.arch.pc().wrapping_add(instr.byte_displacement());
        state.arch.schedule_jump(target);
        state.annul = instr.annul && cond == Condition::Always;
    } else {
        state.annul = instr.annul;
    }
    Ok(())
}

/// `Ticc`: raises software trap `(r[rs1] + operand2) mod 128` when `cond` holds.
pub fn execute_ticc(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    cond: Condition,
) -> ExecResult {
    if !cond.evaluate(state.arch.icc()) {
        return Ok(());
    }
    let (left, right) = operands(&state.arch, instr);
    Err(TrapType::software(left.wrapping_add(right)).into())
}
