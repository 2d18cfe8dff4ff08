//! Memory access facade: the device contract consumed by the core plus the
//! reference devices used to load and run flat program images.

/// Alignment policy helpers.
pub mod access;
/// Address space identifier registry.
pub mod asi;
/// RAM controller mapping devices at physical base addresses.
pub mod map;
/// Byte-backed RAM device.
pub mod ram;

use std::fmt;

use thiserror::Error;

pub use access::{validate_alignment, AccessWidth};
pub use asi::{
    AddressSpaces, ASI_SUPERVISOR_DATA, ASI_SUPERVISOR_INSTRUCTION, ASI_USER_DATA,
    ASI_USER_INSTRUCTION,
};
pub use map::{MapError, MemoryMap, MAX_REGIONS};
pub use ram::{LoadError, Ram};

/// Kind of bus transaction, used for permission checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Access {
    /// Data read.
    Read,
    /// Data write.
    Write,
    /// Instruction fetch.
    Fetch,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Fetch => "fetch",
        })
    }
}

/// Access rights of a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Permissions {
    /// Data reads allowed.
    pub read: bool,
    /// Data writes allowed.
    pub write: bool,
    /// Instruction fetches allowed.
    pub execute: bool,
}

impl Permissions {
    /// Read-only data.
    pub const R: Self = Self {
        read: true,
        write: false,
        execute: false,
    };
    /// Read/write data.
    pub const RW: Self = Self {
        read: true,
        write: true,
        execute: false,
    };
    /// Read/execute, the usual text mapping.
    pub const RX: Self = Self {
        read: true,
        write: false,
        execute: true,
    };
    /// Execute-only.
    pub const X: Self = Self {
        read: false,
        write: false,
        execute: true,
    };
    /// Full access, used for flat program images.
    pub const RWX: Self = Self {
        read: true,
        write: true,
        execute: true,
    };

    /// Returns `true` when `access` is permitted.
    #[must_use]
    pub const fn allows(self, access: Access) -> bool {
        match access {
            Access::Read => self.read,
            Access::Write => self.write,
            Access::Fetch => self.execute,
        }
    }
}

/// Host-level failure reported by a memory device.
///
/// These are never converted into architectural traps by the core; they abort
/// the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum BusError {
    /// No device backs the address.
    #[error("no device mapped at {addr:#010x}")]
    Unmapped {
        /// Faulting address.
        addr: u32,
    },
    /// The mapping forbids this kind of access.
    #[error("{access} access denied at {addr:#010x}")]
    PermissionDenied {
        /// Faulting address.
        addr: u32,
        /// Denied transaction kind.
        access: Access,
    },
    /// An alternate-space access named an ASI with no registered device.
    #[error("no device registered for address space {asi:#04x}")]
    NoAddressSpace {
        /// Requested address space identifier.
        asi: u8,
    },
}

/// Memory/device contract consumed by the core.
///
/// Multi-byte values cross this boundary as numbers decoded from big-endian
/// storage. Instruction fetches are distinguished from data reads so devices
/// can enforce execute-only permissions; by default a fetch is a read.
pub trait Bus {
    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the read.
    fn read8(&mut self, addr: u32) -> Result<u8, BusError>;

    /// Reads a big-endian halfword.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the read.
    fn read16(&mut self, addr: u32) -> Result<u16, BusError>;

    /// Reads a big-endian word.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the read.
    fn read32(&mut self, addr: u32) -> Result<u32, BusError>;

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the write.
    fn write8(&mut self, addr: u32, value: u8) -> Result<(), BusError>;

    /// Writes a big-endian halfword.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the write.
    fn write16(&mut self, addr: u32, value: u16) -> Result<(), BusError>;

    /// Writes a big-endian word.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the write.
    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BusError>;

    /// Fetches one instruction byte.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the fetch.
    fn fetch8(&mut self, addr: u32) -> Result<u8, BusError> {
        self.read8(addr)
    }

    /// Fetches a big-endian instruction halfword.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the fetch.
    fn fetch16(&mut self, addr: u32) -> Result<u16, BusError> {
        self.read16(addr)
    }

    /// Fetches a big-endian instruction word.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] when the device cannot complete the fetch.
    fn fetch32(&mut self, addr: u32) -> Result<u32, BusError> {
        self.read32(addr)
    }
}
