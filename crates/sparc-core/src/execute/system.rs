//! State-register access and register-window instructions.

use super::helpers::{operands, require_supervisor};
use super::ExecResult;
use crate::decoder::DecodedInstruction;
use crate::state::registers::PSR_CWP_MASK;
use crate::{CoreState, TrapType};

/// State register named by `RD*`/`WR*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRegister {
    Y,
    Asr,
    Psr,
    Wim,
    Tbr,
}

/// Reads a state register into `rd`.
///
/// Only `Y` is readable in user mode. For `RDASR` the register number is `rs1`.
pub fn execute_read(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    register: StateRegister,
) -> ExecResult {
    let arch = &state.arch;
    let value = match register {
        StateRegister::Y => arch.y(),
        StateRegister::Asr => {
            require_supervisor(arch)?;
            arch.asr(instr.rs1)
        }
        StateRegister::Psr => {
            require_supervisor(arch)?;
            arch.psr()
        }
        StateRegister::Wim => {
            require_supervisor(arch)?;
            arch.wim()
        }
        StateRegister::Tbr => {
            require_supervisor(arch)?;
            arch.tbr()
        }
    };
    state.arch.set_reg(instr.rd, value);
    Ok(())
}

/// Writes `r[rs1] ^ operand2` to a state register.
///
/// Only `Y` is writable in user mode. For `WRASR` the register number is `rd`.
/// Writes take effect immediately.
pub fn execute_write(
    state: &mut CoreState,
    instr: &DecodedInstruction,
    register: StateRegister,
) -> ExecResult {
    let (left, right) = operands(&state.arch, instr);
    let value = left ^ right;
    match register {
        StateRegister::Y => state.arch.set_y(value),
        StateRegister::Asr => {
            require_supervisor(&state.arch)?;
            state.arch.set_asr(instr.rd, value);
        }
        StateRegister::Psr => {
            require_supervisor(&state.arch)?;
            if value & PSR_CWP_MASK >= u32::from(state.arch.registers().nwindows()) {
                return Err(TrapType::IllegalInstruction.into());
            }
            state.arch.set_psr(value);
        }
        StateRegister::Wim => {
            require_supervisor(&state.arch)?;
            state.arch.set_wim(value);
        }
        StateRegister::Tbr => {
            require_supervisor(&state.arch)?;
            state.arch.set_tbr_base(value);
        }
    }
    Ok(())
}

/// `SAVE`/`RESTORE`: adds in the old window, moves `CWP`, writes `rd` in the new one.
///
/// On overflow or underflow nothing is written.
pub fn execute_window(state: &mut CoreState, instr: &DecodedInstruction, save: bool) -> ExecResult {
    let (left, right) = operands(&state.arch, instr);
    let registers = state.arch.registers_mut();
    let moved = if save {
        registers.save()
    } else {
        registers.restore()
    };
    if let Err(trap) = moved {
        tracing::debug!(%trap, cwp = registers.cwp(), "window trap");
        return Err(trap.into());
    }
    state.arch.set_reg(instr.rd, left.wrapping_add(right));
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{execute_read, execute_window, execute_write, StateRegister};
    use crate::encoding::{format3_immediate, format3_register, Opcode};
    use crate::{CoreConfig, CoreState, Decoder, TrapType};

    fn state_with(windows: u8) -> CoreState {
        CoreState::with_config(&CoreConfig { windows })
    }

    #[test]
    fn save_writes_destination_in_new_window() {
        let mut state = state_with(8);
        state.arch.set_reg(8, 40);
        let word = format3_immediate(Opcode::Save, 14, 8, 2).expect("save has op3");
        let instr = Decoder::decode(word).expect("valid");
        execute_window(&mut state, &instr, true).expect("window 7 is valid");
        assert_eq!(state.arch.cwp(), 7);
        assert_eq!(state.arch.reg(14), 42);
        assert_eq!(state.arch.reg(24), 40);
    }

    #[test]
    fn save_into_invalid_window_leaves_state_untouched() {
        let mut state = state_with(8);
        state.arch.set_wim(1 << 7);
        let word = format3_immediate(Opcode::Save, 14, 0, 5).expect("save has op3");
        let instr = Decoder::decode(word).expect("valid");
        let err = execute_window(&mut state, &instr, true).expect_err("overflow");
        assert_eq!(err.trap(), Some(TrapType::WindowOverflow));
        assert_eq!(state.arch.cwp(), 0);
        assert_eq!(state.arch.reg(14), 0);
    }

    #[rstest]
    #[case::y(Opcode::Rdy, 0, StateRegister::Y, None)]
    #[case::psr(Opcode::Rdpsr, 0, StateRegister::Psr, Some(TrapType::PrivilegedInstruction))]
    #[case::wim(Opcode::Rdwim, 0, StateRegister::Wim, Some(TrapType::PrivilegedInstruction))]
    #[case::tbr(Opcode::Rdtbr, 0, StateRegister::Tbr, Some(TrapType::PrivilegedInstruction))]
    #[case::asr1(Opcode::Rdasr, 1, StateRegister::Asr, Some(TrapType::PrivilegedInstruction))]
    #[case::asr15(Opcode::Rdasr, 15, StateRegister::Asr, Some(TrapType::PrivilegedInstruction))]
    #[case::asr16(Opcode::Rdasr, 16, StateRegister::Asr, Some(TrapType::PrivilegedInstruction))]
    fn user_mode_reads_only_y(
        #[case] opcode: Opcode,
        #[case] rs1: u8,
        #[case] register: StateRegister,
        #[case] expected: Option<TrapType>,
    ) {
        let mut state = state_with(8);
        let word = format3_register(opcode, 1, rs1, 0).expect("read has op3");
        let instr = Decoder::decode(word).expect("valid");
        match execute_read(&mut state, &instr, register) {
            Ok(()) => assert_eq!(expected, None),
            Err(err) => assert_eq!(err.trap(), expected),
        }
    }

    #[test]
    fn user_mode_rdasr_leaves_destination_untouched() {
        let mut state = state_with(8);
        state.arch.set_asr(5, 0xDEAD_BEEF);
        let word = format3_register(Opcode::Rdasr, 1, 5, 0).expect("rdasr has op3");
        let instr = Decoder::decode(word).expect("valid");
        let err = execute_read(&mut state, &instr, StateRegister::Asr).expect_err("user mode");
        assert_eq!(err.trap(), Some(TrapType::PrivilegedInstruction));
        assert_eq!(state.arch.reg(1), 0);

        state.arch.set_supervisor(true);
        execute_read(&mut state, &instr, StateRegister::Asr).expect("supervisor");
        assert_eq!(state.arch.reg(1), 0xDEAD_BEEF);
    }

    #[rstest]
    #[case::asr1(1)]
    #[case::asr15(15)]
    #[case::asr16(16)]
    fn user_mode_wrasr_traps(#[case] rd: u8) {
        let mut state = state_with(8);
        state.arch.set_reg(1, 0x1234);
        let word = format3_register(Opcode::Wrasr, rd, 1, 0).expect("wrasr has op3");
        let instr = Decoder::decode(word).expect("valid");
        let err = execute_write(&mut state, &instr, StateRegister::Asr).expect_err("user mode");
        assert_eq!(err.trap(), Some(TrapType::PrivilegedInstruction));
        assert_eq!(state.arch.asr(rd), 0);
    }

    #[test]
    fn wrpsr_rejects_unimplemented_window() {
        let mut state = state_with(8);
        state.arch.set_supervisor(true);
        state.arch.set_reg(1, 0x80 | 9);
        let word = format3_register(Opcode::Wrpsr, 0, 1, 0).expect("wrpsr has op3");
        let instr = Decoder::decode(word).expect("valid");
        let err = execute_write(&mut state, &instr, StateRegister::Psr).expect_err("cwp 9");
        assert_eq!(err.trap(), Some(TrapType::IllegalInstruction));
    }

    #[test]
    fn wry_writes_xor_of_operands() {
        let mut state = state_with(8);
        state.arch.set_reg(1, 0xFF00);
        let word = format3_immediate(Opcode::Wry, 0, 1, 0x0FF).expect("wry has op3");
        let instr = Decoder::decode(word).expect("valid");
        execute_write(&mut state, &instr, StateRegister::Y).expect("unprivileged");
        assert_eq!(state.arch.y(), 0xFFFF);
    }
}
