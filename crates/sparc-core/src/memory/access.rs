//! Alignment policy for data accesses and control-transfer targets.

use crate::TrapType;

/// Width of a data access in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AccessWidth {
    Byte = 1,
    Half = 2,
    Word = 4,
    Double = 8,
}

impl AccessWidth {
    /// Access size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        self as u32
    }
}

/// Validates that `addr` is aligned to `width`.
///
/// # Errors
///
/// Returns [`TrapType::MemAddressNotAligned`] when `addr` is not a multiple of
/// the access size.
pub const fn validate_alignment(addr: u32, width: AccessWidth) -> Result<(), TrapType> {
    if addr & (width.bytes() - 1) == 0 {
        Ok(())
    } else {
        Err(TrapType::MemAddressNotAligned)
    }
}
