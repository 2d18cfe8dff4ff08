//! Instruction dispatcher for the SPARC V8 integer unit.
//!
//! Each handler follows the same commit order:
//! 1. Check privilege, encoding restrictions and alignment
//! 2. Read source operands in the current window
//! 3. Perform memory reads and writes
//! 4. Write the destination register
//! 5. Update the condition codes
//!
//! A handler that raises a trap returns before step 3, so trapping
//! instructions have no architectural side effects. Control transfers only
//! rewrite `nPC2`; the pipeline controller advances the PC triple.

#![allow(
    clippy::similar_names,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::needless_pass_by_value,
    missing_docs
)]

mod alu;
mod control;
mod flags;
mod helpers;
mod load_store;
mod system;

pub use helpers::compute_effective_address;

use alu::AluOp;
use load_store::LoadKind;
use system::StateRegister;

use crate::decoder::{DecodeError, DecodedInstruction};
use crate::encoding::Opcode;
use crate::memory::AccessWidth;
use crate::{AddressSpaces, BusError, CoreState, CpuError, TrapType};

/// Why a handler stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Architectural exception, delivered through the trap queue.
    Trap(TrapType),
    /// Host device failure, fatal to the step.
    Bus(BusError),
}

impl Fault {
    #[cfg(test)]
    const fn trap(self) -> Option<TrapType> {
        match self {
            Self::Trap(trap) => Some(trap),
            Self::Bus(_) => None,
        }
    }
}

impl From<TrapType> for Fault {
    fn from(trap: TrapType) -> Self {
        Self::Trap(trap)
    }
}

impl From<BusError> for Fault {
    fn from(err: BusError) -> Self {
        Self::Bus(err)
    }
}

type ExecResult = Result<(), Fault>;

/// Executes one decoded instruction against `state`.
///
/// Architectural exceptions are queued on `state.traps` and reported as
/// success; the pipeline controller delivers them after the instruction.
/// Decode failures become `IllegalInstruction`.
///
/// # Errors
///
/// Returns [`CpuError::Memory`] when a load or store hits a bus error. The
/// instruction has no further effect in that case.
pub fn execute_instruction(
    state: &mut CoreState,
    spaces: &mut AddressSpaces,
    decoded: Result<DecodedInstruction, DecodeError>,
) -> Result<(), CpuError> {
    let result = match decoded {
        Ok(instr) => dispatch(state, spaces, &instr),
        Err(_) => Err(Fault::Trap(TrapType::IllegalInstruction)),
    };
    match result {
        Ok(()) => Ok(()),
        Err(Fault::Trap(trap)) => {
            tracing::trace!(%trap, "instruction raised trap");
            state.raise(trap);
            Ok(())
        }
        Err(Fault::Bus(err)) => Err(CpuError::Memory(err)),
    }
}

fn dispatch(
    state: &mut CoreState,
    spaces: &mut AddressSpaces,
    instr: &DecodedInstruction,
) -> ExecResult {
    let cc = instr.opcode.sets_condition_codes();
    let arith = |state: &mut CoreState, op| alu::execute_alu(state, instr, op, cc, false);
    match instr.opcode {
        Opcode::Call => control::execute_call(state, instr),
        Opcode::Sethi => alu::execute_sethi(state, instr),
        Opcode::Bicc(cond) => control::execute_branch(state, instr, cond),
        Opcode::Unimp => Err(TrapType::IllegalInstruction.into()),
        Opcode::Fbfcc | Opcode::Fpop | Opcode::FpMemory => Err(TrapType::FpDisabled.into()),
        Opcode::Cbccc | Opcode::Cpop | Opcode::CpMemory => Err(TrapType::CpDisabled.into()),

        Opcode::Add | Opcode::Addcc => arith(state, AluOp::Add),
        Opcode::Addx | Opcode::Addxcc => arith(state, AluOp::AddCarry),
        Opcode::Sub | Opcode::Subcc => arith(state, AluOp::Sub),
        Opcode::Subx | Opcode::Subxcc => arith(state, AluOp::SubCarry),
        Opcode::And | Opcode::Andcc => arith(state, AluOp::And),
        Opcode::Andn | Opcode::Andncc => arith(state, AluOp::AndNot),
        Opcode::Or | Opcode::Orcc => arith(state, AluOp::Or),
        Opcode::Orn | Opcode::Orncc => arith(state, AluOp::OrNot),
        Opcode::Xor | Opcode::Xorcc => arith(state, AluOp::Xor),
        Opcode::Xnor | Opcode::Xnorcc => arith(state, AluOp::Xnor),
        Opcode::Sll => arith(state, AluOp::Sll),
        Opcode::Srl => arith(state, AluOp::Srl),
        Opcode::Sra => arith(state, AluOp::Sra),
        Opcode::Taddcc => arith(state, AluOp::TaggedAdd),
        Opcode::Tsubcc => arith(state, AluOp::TaggedSub),
        Opcode::TaddccTv => alu::execute_alu(state, instr, AluOp::TaggedAdd, true, true),
        Opcode::TsubccTv => alu::execute_alu(state, instr, AluOp::TaggedSub, true, true),
        Opcode::Mulscc => alu::execute_mulscc(state, instr),
        Opcode::Umul | Opcode::Umulcc => alu::execute_multiply(state, instr, false, cc),
        Opcode::Smul | Opcode::Smulcc => alu::execute_multiply(state, instr, true, cc),
        Opcode::Udiv | Opcode::Udivcc => alu::execute_divide(state, instr, false, cc),
        Opcode::Sdiv | Opcode::Sdivcc => alu::execute_divide(state, instr, true, cc),

        Opcode::Rdy => system::execute_read(state, instr, StateRegister::Y),
        Opcode::Rdasr => system::execute_read(state, instr, StateRegister::Asr),
        Opcode::Rdpsr => system::execute_read(state, instr, StateRegister::Psr),
        Opcode::Rdwim => system::execute_read(state, instr, StateRegister::Wim),
        Opcode::Rdtbr => system::execute_read(state, instr, StateRegister::Tbr),
        Opcode::Wry => system::execute_write(state, instr, StateRegister::Y),
        Opcode::Wrasr => system::execute_write(state, instr, StateRegister::Asr),
        Opcode::Wrpsr => system::execute_write(state, instr, StateRegister::Psr),
        Opcode::Wrwim => system::execute_write(state, instr, StateRegister::Wim),
        Opcode::Wrtbr => system::execute_write(state, instr, StateRegister::Tbr),
        Opcode::Stbar | Opcode::Flush => Ok(()),
        Opcode::Save => system::execute_window(state, instr, true),
        Opcode::Restore => system::execute_window(state, instr, false),

        Opcode::Jmpl => control::execute_jmpl(state, instr),
        Opcode::Rett => control::execute_rett(state, instr),
        Opcode::Ticc(cond) => control::execute_ticc(state, instr, cond),

        Opcode::Ldsb | Opcode::Ldsba => {
            load_store::execute_load(state, spaces, instr, LoadKind::SignedByte)
        }
        Opcode::Ldub | Opcode::Lduba => {
            load_store::execute_load(state, spaces, instr, LoadKind::UnsignedByte)
        }
        Opcode::Ldsh | Opcode::Ldsha => {
            load_store::execute_load(state, spaces, instr, LoadKind::SignedHalf)
        }
        Opcode::Lduh | Opcode::Lduha => {
            load_store::execute_load(state, spaces, instr, LoadKind::UnsignedHalf)
        }
        Opcode::Ld | Opcode::Lda => load_store::execute_load(state, spaces, instr, LoadKind::Word),
        Opcode::Ldd | Opcode::Ldda => {
            load_store::execute_load(state, spaces, instr, LoadKind::Double)
        }
        Opcode::Stb | Opcode::Stba => {
            load_store::execute_store(state, spaces, instr, AccessWidth::Byte)
        }
        Opcode::Sth | Opcode::Stha => {
            load_store::execute_store(state, spaces, instr, AccessWidth::Half)
        }
        Opcode::St | Opcode::Sta => {
            load_store::execute_store(state, spaces, instr, AccessWidth::Word)
        }
        Opcode::Std | Opcode::Stda => {
            load_store::execute_store(state, spaces, instr, AccessWidth::Double)
        }
        Opcode::Ldstub | Opcode::Ldstuba => load_store::execute_ldstub(state, spaces, instr),
        Opcode::Swap | Opcode::Swapa => load_store::execute_swap(state, spaces, instr),
    }
}

#[cfg(test)]
mod tests {
    use super::execute_instruction;
    use crate::decoder::DecodeError;
    use crate::encoding::{format3_immediate, format3_register, Opcode};
    use crate::{AddressSpaces, Bus, CoreState, CpuError, Decoder, Ram, TrapType};

    fn run(state: &mut CoreState, spaces: &mut AddressSpaces, word: u32) -> Result<(), CpuError> {
        execute_instruction(state, spaces, Decoder::decode(word))
    }

    fn fixture() -> (CoreState, AddressSpaces) {
        let mut state = CoreState::default();
        state.arch.set_supervisor(true);
        (state, AddressSpaces::new(Box::new(Ram::new(0x100))))
    }

    #[test]
    fn decode_failure_queues_illegal_instruction() {
        let (mut state, mut spaces) = fixture();
        execute_instruction(
            &mut state,
            &mut spaces,
            Err(DecodeError::Invalid { word: 0 }),
        )
        .expect("traps are not host errors");
        assert!(state.traps.is_pending(TrapType::IllegalInstruction));
    }

    #[test]
    fn misaligned_load_traps_without_writing_rd() {
        let (mut state, mut spaces) = fixture();
        state.arch.set_reg(3, 0xAAAA);
        let word = format3_immediate(Opcode::Ld, 3, 0, 0x22).expect("ld has op3");
        run(&mut state, &mut spaces, word).expect("trap, not host error");
        assert!(state.traps.is_pending(TrapType::MemAddressNotAligned));
        assert_eq!(state.arch.reg(3), 0xAAAA);
    }

    #[test]
    fn ldd_with_odd_rd_is_illegal() {
        let (mut state, mut spaces) = fixture();
        let word = format3_immediate(Opcode::Ldd, 3, 0, 0x20).expect("ldd has op3");
        run(&mut state, &mut spaces, word).expect("trap, not host error");
        assert!(state.traps.is_pending(TrapType::IllegalInstruction));
    }

    #[test]
    fn ldstub_sets_byte_and_returns_old_value() {
        let (mut state, mut spaces) = fixture();
        spaces.memory().write8(0x40, 0x12).expect("in range");
        let word = format3_immediate(Opcode::Ldstub, 4, 0, 0x40).expect("ldstub has op3");
        run(&mut state, &mut spaces, word).expect("in range");
        assert_eq!(state.arch.reg(4), 0x12);
        assert_eq!(spaces.memory().read8(0x40), Ok(0xFF));
    }

    #[test]
    fn swap_exchanges_register_and_memory() {
        let (mut state, mut spaces) = fixture();
        spaces.memory().write32(0x10, 0x1111_1111).expect("in range");
        state.arch.set_reg(5, 0x2222_2222);
        let word = format3_immediate(Opcode::Swap, 5, 0, 0x10).expect("swap has op3");
        run(&mut state, &mut spaces, word).expect("in range");
        assert_eq!(state.arch.reg(5), 0x1111_1111);
        assert_eq!(spaces.memory().read32(0x10), Ok(0x2222_2222));
    }

    #[test]
    fn signed_loads_extend() {
        let (mut state, mut spaces) = fixture();
        spaces.memory().write16(0x20, 0x8001).expect("in range");
        let word = format3_immediate(Opcode::Ldsh, 1, 0, 0x20).expect("ldsh has op3");
        run(&mut state, &mut spaces, word).expect("in range");
        assert_eq!(state.arch.reg(1), 0xFFFF_8001);
        let word = format3_immediate(Opcode::Ldub, 2, 0, 0x20).expect("ldub has op3");
        run(&mut state, &mut spaces, word).expect("in range");
        assert_eq!(state.arch.reg(2), 0x80);
    }

    #[test]
    fn store_double_writes_register_pair() {
        let (mut state, mut spaces) = fixture();
        state.arch.set_reg(2, 0xAAAA_0000);
        state.arch.set_reg(3, 0x0000_BBBB);
        let word = format3_immediate(Opcode::Std, 2, 0, 0x30).expect("std has op3");
        run(&mut state, &mut spaces, word).expect("in range");
        assert_eq!(spaces.memory().read32(0x30), Ok(0xAAAA_0000));
        assert_eq!(spaces.memory().read32(0x34), Ok(0x0000_BBBB));
    }

    #[test]
    fn out_of_range_store_is_a_host_error() {
        let (mut state, mut spaces) = fixture();
        let word = format3_immediate(Opcode::St, 1, 0, 0x400).expect("st has op3");
        assert!(matches!(
            run(&mut state, &mut spaces, word),
            Err(CpuError::Memory(_))
        ));
        assert!(state.traps.is_empty());
    }

    #[test]
    fn alternate_space_requires_privilege_and_register_form() {
        let (mut state, mut spaces) = fixture();
        let word = format3_immediate(Opcode::Lda, 1, 0, 0).expect("lda has op3");
        run(&mut state, &mut spaces, word).expect("trap, not host error");
        assert!(state.traps.is_pending(TrapType::IllegalInstruction));

        state.arch.set_supervisor(false);
        let word = format3_register(Opcode::Lda, 1, 0, 0).expect("lda has op3");
        run(&mut state, &mut spaces, word).expect("trap, not host error");
        assert!(state.traps.is_pending(TrapType::PrivilegedInstruction));
    }

    #[test]
    fn unregistered_alternate_space_is_a_host_error() {
        let (mut state, mut spaces) = fixture();
        let word = crate::encoding::format3_alternate(Opcode::Lda, 1, 0, 0, 0x20)
            .expect("lda has op3");
        assert!(matches!(
            run(&mut state, &mut spaces, word),
            Err(CpuError::Memory(crate::BusError::NoAddressSpace { asi: 0x20 }))
        ));
    }

    #[test]
    fn tagged_trap_form_leaves_rd_unwritten() {
        let (mut state, mut spaces) = fixture();
        state.arch.set_reg(1, 1);
        let word = format3_immediate(Opcode::TaddccTv, 2, 1, 4).expect("taddcctv has op3");
        run(&mut state, &mut spaces, word).expect("trap, not host error");
        assert!(state.traps.is_pending(TrapType::TagOverflow));
        assert_eq!(state.arch.reg(2), 0);
    }

    #[test]
    fn divide_by_zero_traps() {
        let (mut state, mut spaces) = fixture();
        let word = format3_register(Opcode::Udiv, 1, 0, 0).expect("udiv has op3");
        run(&mut state, &mut spaces, word).expect("trap, not host error");
        assert!(state.traps.is_pending(TrapType::DivisionByZero));
    }

    #[test]
    fn divide_clamps_and_flags_overflow() {
        let (mut state, mut spaces) = fixture();
        state.arch.set_y(1);
        state.arch.set_reg(1, 0);
        let word = format3_immediate(Opcode::Udivcc, 2, 1, 1).expect("udivcc has op3");
        run(&mut state, &mut spaces, word).expect("no trap");
        assert_eq!(state.arch.reg(2), 0xFFFF_FFFF);
        assert!(state.arch.icc().v);

        state.arch.set_y(0xFFFF_FFFF);
        state.arch.set_reg(1, (-12i32) as u32);
        let word = format3_immediate(Opcode::Sdivcc, 3, 1, 4).expect("sdivcc has op3");
        run(&mut state, &mut spaces, word).expect("no trap");
        assert_eq!(state.arch.reg(3), (-3i32) as u32);
        assert!(!state.arch.icc().v);
        assert!(state.arch.icc().n);
    }

    #[test]
    fn multiply_splits_product_between_rd_and_y() {
        let (mut state, mut spaces) = fixture();
        state.arch.set_reg(1, 0x1_0000);
        state.arch.set_reg(4, 0x3_0000);
        let word = format3_register(Opcode::Umul, 2, 1, 4).expect("umul has op3");
        run(&mut state, &mut spaces, word).expect("no trap");
        assert_eq!(state.arch.reg(2), 0);
        assert_eq!(state.arch.y(), 3);

        state.arch.set_reg(1, (-2i32) as u32);
        let word = format3_immediate(Opcode::Smul, 3, 1, 3).expect("smul has op3");
        run(&mut state, &mut spaces, word).expect("no trap");
        assert_eq!(state.arch.reg(3), (-6i32) as u32);
        assert_eq!(state.arch.y(), 0xFFFF_FFFF);
    }

    #[test]
    fn fpu_and_coprocessor_are_disabled() {
        let (mut state, mut spaces) = fixture();
        run(&mut state, &mut spaces, 0x8DA0_0000).expect("fpop traps");
        assert!(state.traps.is_pending(TrapType::FpDisabled));
    }
}
