//! Architectural trap taxonomy and the fixed hardware priority ladder.

/// Priority-indexed pending trap bitmap.
pub mod queue;

pub use queue::{TrapQueue, TRAP_QUEUE_SLOTS};

use thiserror::Error;

/// Trap classes used for delivery policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapClass {
    /// Processor reset request.
    Reset,
    /// Synchronous exception raised by the executing instruction.
    Exception,
    /// `Ticc` software trap.
    Software,
    /// Asynchronous external interrupt.
    Interrupt,
}

/// SPARC V8 trap taxonomy with stable trap-type (`tt`) codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapType {
    /// Processor reset.
    #[error("reset")]
    Reset,
    /// Instruction access exception.
    #[error("instruction access exception")]
    InstructionAccessException,
    /// Reserved or unimplemented instruction.
    #[error("illegal instruction")]
    IllegalInstruction,
    /// Privileged instruction executed in user mode.
    #[error("privileged instruction")]
    PrivilegedInstruction,
    /// Floating-point instruction with no enabled FPU.
    #[error("fp disabled")]
    FpDisabled,
    /// `SAVE` (or trap entry) into an invalid window.
    #[error("window overflow")]
    WindowOverflow,
    /// `RESTORE`/`RETT` into an invalid window.
    #[error("window underflow")]
    WindowUnderflow,
    /// Access address not aligned to its size.
    #[error("memory address not aligned")]
    MemAddressNotAligned,
    /// Floating-point exception.
    #[error("fp exception")]
    FpException,
    /// Data access exception.
    #[error("data access exception")]
    DataAccessException,
    /// Tagged arithmetic overflow.
    #[error("tag overflow")]
    TagOverflow,
    /// Watchpoint hit.
    #[error("watchpoint detected")]
    WatchpointDetected,
    /// Register file access error.
    #[error("register access error")]
    RegisterAccessError,
    /// Instruction access error.
    #[error("instruction access error")]
    InstructionAccessError,
    /// Coprocessor instruction with no enabled coprocessor.
    #[error("cp disabled")]
    CpDisabled,
    /// `FLUSH` not implemented by the memory system.
    #[error("unimplemented flush")]
    UnimplementedFlush,
    /// Coprocessor exception.
    #[error("cp exception")]
    CpException,
    /// Data access error.
    #[error("data access error")]
    DataAccessError,
    /// Integer division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Deferred data store error.
    #[error("data store error")]
    DataStoreError,
    /// Data access MMU miss.
    #[error("data access mmu miss")]
    DataAccessMmuMiss,
    /// Instruction access MMU miss.
    #[error("instruction access mmu miss")]
    InstructionAccessMmuMiss,
    /// External interrupt at level `1..=15`.
    #[error("interrupt level {0}")]
    Interrupt(u8),
    /// Software trap number `0..=127` (`tt = 0x80 + n`).
    #[error("software trap {0:#04x}")]
    Software(u8),
}

/// Hardware traps ordered from highest to lowest priority.
///
/// The index of a trap in this table is its queue slot. Software traps
/// follow at [`SOFTWARE_PRIORITY_BASE`] and interrupts at
/// [`INTERRUPT_PRIORITY_BASE`].
pub const HARDWARE_TRAP_PRIORITY: [TrapType; 22] = [
    TrapType::Reset,
    TrapType::DataStoreError,
    TrapType::InstructionAccessMmuMiss,
    TrapType::InstructionAccessError,
    TrapType::RegisterAccessError,
    TrapType::InstructionAccessException,
    TrapType::PrivilegedInstruction,
    TrapType::IllegalInstruction,
    TrapType::FpDisabled,
    TrapType::CpDisabled,
    TrapType::UnimplementedFlush,
    TrapType::WatchpointDetected,
    TrapType::WindowOverflow,
    TrapType::WindowUnderflow,
    TrapType::MemAddressNotAligned,
    TrapType::FpException,
    TrapType::CpException,
    TrapType::DataAccessError,
    TrapType::DataAccessMmuMiss,
    TrapType::DataAccessException,
    TrapType::TagOverflow,
    TrapType::DivisionByZero,
];

/// First queue slot used by software traps (`Software(0)`).
pub const SOFTWARE_PRIORITY_BASE: u8 = 0x20;
/// First queue slot used by interrupts (level 15).
pub const INTERRUPT_PRIORITY_BASE: u8 = 0xA0;
/// Highest external interrupt level.
pub const MAX_INTERRUPT_LEVEL: u8 = 15;
/// Trap type of the first software trap.
pub const SOFTWARE_TRAP_BASE_TT: u8 = 0x80;

impl TrapType {
    /// Builds an interrupt trap for `level`, rejecting levels outside `1..=15`.
    #[must_use]
    pub const fn interrupt(level: u8) -> Option<Self> {
        if level >= 1 && level <= MAX_INTERRUPT_LEVEL {
            Some(Self::Interrupt(level))
        } else {
            None
        }
    }

    /// Builds the software trap raised by `Ticc` for the computed trap number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn software(number: u32) -> Self {
        Self::Software((number & 0x7f) as u8)
    }

    /// Returns the 8-bit trap type written into `TBR.tt`.
    #[must_use]
    pub const fn tt(self) -> u8 {
        match self {
            Self::Reset => 0x00,
            Self::InstructionAccessException => 0x01,
            Self::IllegalInstruction => 0x02,
            Self::PrivilegedInstruction => 0x03,
            Self::FpDisabled => 0x04,
            Self::WindowOverflow => 0x05,
            Self::WindowUnderflow => 0x06,
            Self::MemAddressNotAligned => 0x07,
            Self::FpException => 0x08,
            Self::DataAccessException => 0x09,
            Self::TagOverflow => 0x0A,
            Self::WatchpointDetected => 0x0B,
            Self::RegisterAccessError => 0x20,
            Self::InstructionAccessError => 0x21,
            Self::CpDisabled => 0x24,
            Self::UnimplementedFlush => 0x25,
            Self::CpException => 0x28,
            Self::DataAccessError => 0x29,
            Self::DivisionByZero => 0x2A,
            Self::DataStoreError => 0x2B,
            Self::DataAccessMmuMiss => 0x2C,
            Self::InstructionAccessMmuMiss => 0x3C,
            Self::Interrupt(level) => 0x10 | (level & 0x0F),
            Self::Software(number) => SOFTWARE_TRAP_BASE_TT | (number & 0x7F),
        }
    }

    /// Converts a trap type code back into a trap, if it is defined.
    #[must_use]
    pub const fn from_tt(tt: u8) -> Option<Self> {
        match tt {
            0x00 => Some(Self::Reset),
            0x01 => Some(Self::InstructionAccessException),
            0x02 => Some(Self::IllegalInstruction),
            0x03 => Some(Self::PrivilegedInstruction),
            0x04 => Some(Self::FpDisabled),
            0x05 => Some(Self::WindowOverflow),
            0x06 => Some(Self::WindowUnderflow),
            0x07 => Some(Self::MemAddressNotAligned),
            0x08 => Some(Self::FpException),
            0x09 => Some(Self::DataAccessException),
            0x0A => Some(Self::TagOverflow),
            0x0B => Some(Self::WatchpointDetected),
            0x11..=0x1F => Some(Self::Interrupt(tt & 0x0F)),
            0x20 => Some(Self::RegisterAccessError),
            0x21 => Some(Self::InstructionAccessError),
            0x24 => Some(Self::CpDisabled),
            0x25 => Some(Self::UnimplementedFlush),
            0x28 => Some(Self::CpException),
            0x29 => Some(Self::DataAccessError),
            0x2A => Some(Self::DivisionByZero),
            0x2B => Some(Self::DataStoreError),
            0x2C => Some(Self::DataAccessMmuMiss),
            0x3C => Some(Self::InstructionAccessMmuMiss),
            0x80..=0xFF => Some(Self::Software(tt & 0x7F)),
            _ => None,
        }
    }

    /// Returns the delivery class of this trap.
    #[must_use]
    pub const fn class(self) -> TrapClass {
        match self {
            Self::Reset => TrapClass::Reset,
            Self::Interrupt(_) => TrapClass::Interrupt,
            Self::Software(_) => TrapClass::Software,
            _ => TrapClass::Exception,
        }
    }

    /// Returns `true` for asynchronous interrupts.
    #[must_use]
    pub const fn is_interrupt(self) -> bool {
        matches!(self, Self::Interrupt(_))
    }

    /// Returns the queue slot of this trap; lower slots are serviced first.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Software(number) => SOFTWARE_PRIORITY_BASE + (number & 0x7F),
            Self::Interrupt(level) => {
                INTERRUPT_PRIORITY_BASE + (MAX_INTERRUPT_LEVEL - (level & 0x0F))
            }
            hardware => HARDWARE_TRAP_PRIORITY
                .iter()
                .position(|&entry| entry == hardware)
                .and_then(|slot| u8::try_from(slot).ok())
                .unwrap_or(u8::MAX),
        }
    }

    /// Maps a queue slot back to its trap.
    #[must_use]
    pub fn from_priority(slot: u8) -> Option<Self> {
        let hardware_slots = HARDWARE_TRAP_PRIORITY.len();
        match slot {
            _ if usize::from(slot) < hardware_slots => {
                Some(HARDWARE_TRAP_PRIORITY[usize::from(slot)])
            }
            SOFTWARE_PRIORITY_BASE..INTERRUPT_PRIORITY_BASE => {
                Some(Self::Software(slot - SOFTWARE_PRIORITY_BASE))
            }
            INTERRUPT_PRIORITY_BASE..=0xAE => {
                Some(Self::Interrupt(MAX_INTERRUPT_LEVEL - (slot - INTERRUPT_PRIORITY_BASE)))
            }
            _ => None,
        }
    }
}
