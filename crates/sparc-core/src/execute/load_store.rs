//! Load, store and atomic memory handlers.
//!
//! All address checks happen before the first bus access, so a trapping
//! instruction leaves memory and registers untouched.

use super::helpers::{compute_effective_address, require_supervisor};
use super::{ExecResult, Fault};
use crate::decoder::{DecodedInstruction, InstructionFormat};
use crate::memory::{validate_alignment, AccessWidth};
use crate::{AddressSpaces, Bus, CoreState, TrapType};

/// Value width and extension of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    SignedByte,
    UnsignedByte,
    SignedHalf,
    UnsignedHalf,
    Word,
    Double,
}

impl LoadKind {
    const fn width(self) -> AccessWidth {
        match self {
            Self::SignedByte | Self::UnsignedByte => AccessWidth::Byte,
            Self::SignedHalf | Self::UnsignedHalf => AccessWidth::Half,
            Self::Word => AccessWidth::Word,
            Self::Double => AccessWidth::Double,
        }
    }
}

/// Resolves the device and address of a memory instruction.
///
/// Alternate-space forms are privileged and only exist with a register
/// second operand; ordinary forms use the data space of the current mode.
fn resolve<'a>(
    state: &CoreState,
    spaces: &'a mut AddressSpaces,
    instr: &DecodedInstruction,
    width: AccessWidth,
) -> Result<(&'a mut dyn Bus, u32), Fault> {
    let alternate = instr.opcode.is_alternate_space();
    if alternate {
        require_supervisor(&state.arch)?;
        if instr.format == InstructionFormat::Immediate {
            return Err(TrapType::IllegalInstruction.into());
        }
    }
    if width == AccessWidth::Double && instr.rd & 1 != 0 {
        return Err(TrapType::IllegalInstruction.into());
    }
    let addr = compute_effective_address(&state.arch, instr);
    validate_alignment(addr, width)?;
    let bus = if alternate {
        spaces.space(instr.asi)?
    } else {
        spaces.data(state.arch.supervisor())?
    };
    Ok((bus, addr))
}

pub fn execute_load(
    state: &mut CoreState,
    spaces: &mut AddressSpaces,
    instr: &DecodedInstruction,
    kind: LoadKind,
) -> ExecResult {
    let (bus, addr) = resolve(state, spaces, instr, kind.width())?;
    let value = match kind {
        LoadKind::SignedByte => bus.read8(addr)? as i8 as u32,
        LoadKind::UnsignedByte => u32::from(bus.read8(addr)?),
        LoadKind::SignedHalf => bus.read16(addr)? as i16 as u32,
        LoadKind::UnsignedHalf => u32::from(bus.read16(addr)?),
        LoadKind::Word => bus.read32(addr)?,
        LoadKind::Double => {
            let high = bus.read32(addr)?;
            let low = bus.read32(addr.wrapping_add(4))?;
            state.arch.set_reg(instr.rd | 1, low);
            high
        }
    };
    state.arch.set_reg(instr.rd, value);
    Ok(())
}

/// Stores `rd` (and `rd + 1` for doublewords) truncated to `width`.
pub fn execute_store(
    state: &mut CoreState,
    spaces: &mut AddressSpaces,
    instr: &DecodedInstruction,
    width: AccessWidth,
) -> ExecResult {
    let (bus, addr) = resolve(state, spaces, instr, width)?;
    let value = state.arch.reg(instr.rd);
    match width {
        AccessWidth::Byte => bus.write8(addr, value as u8)?,
        AccessWidth::Half => bus.write16(addr, value as u16)?,
        AccessWidth::Word => bus.write32(addr, value)?,
        AccessWidth::Double => {
            bus.write32(addr, value)?;
            bus.write32(addr.wrapping_add(4), state.arch.reg(instr.rd | 1))?;
        }
    }
    Ok(())
}

/// `LDSTUB`: reads a byte into `rd` and sets it to `0xFF`.
pub fn execute_ldstub(
    state: &mut CoreState,
    spaces: &mut AddressSpaces,
    instr: &DecodedInstruction,
) -> ExecResult {
    let (bus, addr) = resolve(state, spaces, instr, AccessWidth::Byte)?;
    let old = bus.read8(addr)?;
    bus.write8(addr, 0xFF)?;
    state.arch.set_reg(instr.rd, u32::from(old));
    Ok(())
}

/// `SWAP`: exchanges `rd` with a memory word.
pub fn execute_swap(
    state: &mut CoreState,
    spaces: &mut AddressSpaces,
    instr: &DecodedInstruction,
) -> ExecResult {
    let (bus, addr) = resolve(state, spaces, instr, AccessWidth::Word)?;
    let old = bus.read32(addr)?;
    bus.write32(addr, state.arch.reg(instr.rd))?;
    state.arch.set_reg(instr.rd, old);
    Ok(())
}
