//! Trap queueing, delivery, error mode and return-from-trap coverage.

use sparc_core::encoding::{format3_immediate, format3_register, nop, sethi};
use sparc_core::{
    Bus, Condition, CoreConfig, Cpu, CpuError, Opcode, Ram, RunState, StepOutcome, TrapType,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use serde_json as _;
use tempfile as _;
use thiserror as _;
use tracing as _;

const TRAP_BASE: u32 = 0x4000;
const PSR_S_ET: i32 = 0x80 | 0x20;

fn imm(opcode: Opcode, rd: u8, rs1: u8, simm13: i32) -> u32 {
    format3_immediate(opcode, rd, rs1, simm13).expect("format 3 opcode")
}

fn reg(opcode: Opcode, rd: u8, rs1: u8, rs2: u8) -> u32 {
    format3_register(opcode, rd, rs1, rs2).expect("format 3 opcode")
}

fn ticc(cond: Condition, number: i32) -> u32 {
    imm(Opcode::Ticc(cond), 0, 0, number)
}

fn cpu_with(segments: &[(u32, &[u32])]) -> Cpu {
    let mut ram = Ram::new(0x1_0000);
    for (base, words) in segments {
        for (index, word) in words.iter().enumerate() {
            let offset = u32::try_from(index * 4).expect("segment fits");
            ram.write32(base + offset, *word).expect("segment fits");
        }
    }
    let mut cpu = Cpu::new(CoreConfig::default(), Box::new(ram)).expect("default config");
    cpu.boot(0).expect("entry is fetchable");
    cpu
}

/// Prologue installing `TRAP_BASE` in `TBR` and enabling traps.
fn enable_traps() -> [u32; 3] {
    [
        sethi(1, TRAP_BASE >> 10),
        reg(Opcode::Wrtbr, 0, 1, 0),
        imm(Opcode::Wrpsr, 0, 0, PSR_S_ET),
    ]
}

fn retire(cpu: &mut Cpu, steps: usize) {
    for _ in 0..steps {
        assert_eq!(cpu.step(), Ok(StepOutcome::Retired));
    }
}

#[test]
fn software_trap_enters_handler_and_rett_resumes() {
    let mut main = enable_traps().to_vec();
    main.extend([ticc(Condition::Always, 5), nop(), nop()]);
    let vector = TRAP_BASE | (0x85 << 4);
    let handler = [
        imm(Opcode::Or, 1, 0, 0x77),
        imm(Opcode::Jmpl, 0, 18, 0),
        imm(Opcode::Rett, 0, 18, 4),
    ];
    let mut cpu = cpu_with(&[(0, main.as_slice()), (vector, handler.as_slice())]);

    retire(&mut cpu, 3);
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::Software(5)
        })
    );
    assert_eq!(cpu.pc(), vector);
    assert_eq!(cpu.npc(), vector + 4);
    assert_eq!(cpu.tbr(), vector);
    assert_eq!(cpu.arch().cwp(), 31);
    assert_eq!(cpu.reg(17), 12);
    assert_eq!(cpu.reg(18), 16);
    assert!(!cpu.arch().traps_enabled());
    assert!(cpu.arch().supervisor());
    assert!(cpu.arch().previous_supervisor());

    retire(&mut cpu, 3);
    assert_eq!(cpu.reg(1), 0x77);
    assert_eq!(cpu.arch().cwp(), 0);
    assert!(cpu.arch().traps_enabled());
    assert_eq!(cpu.pc(), 16);
    assert_eq!(cpu.npc(), 20);
}

#[test]
fn untaken_ticc_does_not_trap() {
    let mut main = enable_traps().to_vec();
    main.extend([ticc(Condition::Never, 1), nop()]);
    let mut cpu = cpu_with(&[(0, main.as_slice())]);
    retire(&mut cpu, 4);
    assert!(cpu.pending_traps().is_empty());
}

#[test]
fn highest_priority_trap_is_delivered_first() {
    let mut cpu = cpu_with(&[(0, [nop(), nop()].as_slice())]);
    cpu.state_mut().arch.set_traps_enabled(true);
    cpu.state_mut().raise(TrapType::MemAddressNotAligned);
    cpu.state_mut().raise(TrapType::WindowOverflow);

    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::WindowOverflow
        })
    );
    assert_eq!(cpu.arch().trap_type(), 0x05);
    assert!(cpu.pending_traps().is_pending(TrapType::MemAddressNotAligned));
    assert!(!cpu.pending_traps().is_pending(TrapType::WindowOverflow));
    assert_eq!(cpu.run_state(), RunState::TrapPending);
}

#[test]
fn save_into_invalid_window_traps_to_overflow_handler() {
    let mut main = vec![
        sethi(2, 0x8000_0000 >> 10),
        reg(Opcode::Wrwim, 0, 2, 0),
    ];
    main.extend(enable_traps());
    main.extend([imm(Opcode::Save, 14, 0, 64), nop()]);
    let mut cpu = cpu_with(&[(0, main.as_slice())]);

    retire(&mut cpu, 5);
    assert_eq!(cpu.wim(), 0x8000_0000);
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::WindowOverflow
        })
    );
    assert_eq!(cpu.pc(), TRAP_BASE | 0x50);
    assert_eq!(cpu.arch().cwp(), 31);
    assert_eq!(cpu.reg(17), 20);
}

#[test]
fn synchronous_trap_with_traps_disabled_halts_in_error_mode() {
    let mut cpu = cpu_with(&[(0, [imm(Opcode::Ld, 1, 0, 2), nop()].as_slice())]);
    assert_eq!(
        cpu.step(),
        Err(CpuError::ErrorMode {
            trap: TrapType::MemAddressNotAligned
        })
    );
    assert_eq!(
        cpu.run_state(),
        RunState::Error(TrapType::MemAddressNotAligned)
    );
    assert_eq!(cpu.reg(1), 0);
    assert!(cpu.step().is_err());
}

#[test]
fn interrupt_is_delivered_with_traps_disabled() {
    let mut cpu = cpu_with(&[(0, [nop(), nop()].as_slice())]);
    assert!(cpu.raise_interrupt(10));
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::Interrupt(10)
        })
    );
    assert_eq!(cpu.pc(), 0x1A0);
    assert_eq!(cpu.reg(17), 0);
    assert_eq!(cpu.reg(18), 4);
}

#[test]
fn privileged_instruction_in_user_mode_traps() {
    let mut main = enable_traps().to_vec();
    main.extend([
        imm(Opcode::Wrpsr, 0, 0, 0x20),
        reg(Opcode::Rdpsr, 1, 0, 0),
        nop(),
    ]);
    let mut cpu = cpu_with(&[(0, main.as_slice())]);
    retire(&mut cpu, 4);
    assert!(!cpu.arch().supervisor());
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::PrivilegedInstruction
        })
    );
    assert!(cpu.arch().supervisor());
    assert!(!cpu.arch().previous_supervisor());
}

#[test]
fn user_mode_rdasr_traps_without_writing_destination() {
    let mut main = enable_traps().to_vec();
    main.extend([
        imm(Opcode::Wrpsr, 0, 0, 0x20),
        reg(Opcode::Rdasr, 2, 5, 0),
        nop(),
    ]);
    let mut cpu = cpu_with(&[(0, main.as_slice())]);
    cpu.state_mut().arch.set_asr(5, 0xDEAD_BEEF);
    retire(&mut cpu, 4);
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::PrivilegedInstruction
        })
    );
    assert_eq!(cpu.reg(2), 0);
}

#[test]
fn reset_reboots_at_last_entry() {
    let mut cpu = cpu_with(&[(0, [imm(Opcode::Or, 1, 0, 9), nop(), nop()].as_slice())]);
    retire(&mut cpu, 2);
    cpu.request_reset();
    assert_eq!(cpu.step(), Ok(StepOutcome::Reset));
    assert_eq!(cpu.pc(), 0);
    assert_eq!(cpu.npc(), 4);
    assert_eq!(cpu.run_state(), RunState::Normal);
}

#[test]
fn trap_vector_outside_memory_is_a_host_error() {
    let main = [sethi(1, 0x10_0000 >> 10), reg(Opcode::Wrtbr, 0, 1, 0), nop()];
    let mut cpu = cpu_with(&[(0, main.as_slice())]);
    retire(&mut cpu, 2);
    assert!(cpu.raise_interrupt(1));
    assert!(matches!(
        cpu.step(),
        Err(CpuError::TrapVector {
            trap: TrapType::Interrupt(1),
            vector: 0x10_0110,
            ..
        })
    ));
}

#[test]
fn memory_is_untouched_by_trapping_store() {
    let mut main = enable_traps().to_vec();
    main.extend([imm(Opcode::Or, 1, 0, 0x5A), imm(Opcode::St, 1, 0, 0x802), nop()]);
    let mut cpu = cpu_with(&[(0, main.as_slice())]);
    retire(&mut cpu, 4);
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::TrapTaken {
            trap: TrapType::MemAddressNotAligned
        })
    );
    assert_eq!(cpu.memory().read32(0x800), Ok(0));
    assert_eq!(cpu.memory().read32(0x804), Ok(0));
}
