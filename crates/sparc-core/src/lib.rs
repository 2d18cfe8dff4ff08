//! Instruction-set simulator core for the SPARC V8 integer unit.
//!
//! The crate models a single 32-bit integer unit with overlapping register
//! windows, delayed control transfer with annulment, a prioritised trap queue
//! and big-endian memory reached through address space identifiers. Hosts
//! build a [`Cpu`] over a [`Bus`] implementation, [`Cpu::boot`] it at an entry
//! point and drive it with [`Cpu::step`].

/// Trap taxonomy, priorities and the pending trap queue.
pub mod trap;
pub use trap::{
    TrapClass, TrapQueue, TrapType, HARDWARE_TRAP_PRIORITY, INTERRUPT_PRIORITY_BASE,
    MAX_INTERRUPT_LEVEL, SOFTWARE_PRIORITY_BASE, SOFTWARE_TRAP_BASE_TT, TRAP_QUEUE_SLOTS,
};

/// Memory bus contract, RAM, region map and address space registry.
pub mod memory;
pub use memory::{
    validate_alignment, Access, AccessWidth, AddressSpaces, Bus, BusError, LoadError, MapError,
    MemoryMap, Permissions, Ram, ASI_SUPERVISOR_DATA, ASI_SUPERVISOR_INSTRUCTION, ASI_USER_DATA,
    ASI_USER_INSTRUCTION, MAX_REGIONS,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    physical_slot, ArchitecturalState, ConditionCodes, RegisterFile, RegisterSlot, RunState,
    MAX_WINDOWS, MIN_WINDOWS,
};

/// Opcode identities, condition codes and instruction word builders.
pub mod encoding;
pub use encoding::{Condition, Opcode, ARITHMETIC_OP3_TABLE, CONDITION_TABLE, MEMORY_OP3_TABLE};

/// Instruction word decoder.
pub mod decoder;
pub use decoder::{DecodeError, DecodedInstruction, Decoder, InstructionFormat, Operand2};

/// Host-level error taxonomy.
pub mod fault;
pub use fault::CpuError;

/// Core configuration and simulator-visible state.
pub mod api;
pub use api::{ConfigError, CoreConfig, CoreState, StepOutcome, DEFAULT_WINDOWS};

/// Instruction dispatcher.
pub mod execute;
pub use execute::execute_instruction;

/// Pipeline controller.
pub mod cpu;
pub use cpu::Cpu;

/// SPARC assembler syntax disassembly.
pub mod disasm;
pub use disasm::{disassemble_one, disassemble_window, register_name, DisassemblyRow};

#[cfg(test)]
use serde_json as _;
