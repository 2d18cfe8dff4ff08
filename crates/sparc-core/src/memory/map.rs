use std::fmt;

use thiserror::Error;

use super::{Access, Bus, BusError, Permissions};

/// Maximum number of regions a [`MemoryMap`] can hold.
pub const MAX_REGIONS: usize = 16;

/// Rejected region mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MapError {
    /// Every region slot is in use.
    #[error("memory map has no free region slot")]
    Full,
    /// The region has no bytes or wraps past the end of the address space.
    #[error("invalid region at {base:#010x} of {size} bytes")]
    InvalidRange {
        /// Requested base address.
        base: u32,
        /// Requested size.
        size: u64,
    },
    /// The region intersects an existing mapping.
    #[error("region at {base:#010x} overlaps an existing mapping")]
    Overlap {
        /// Requested base address.
        base: u32,
    },
}

struct Region {
    base: u32,
    size: u64,
    permissions: Permissions,
    device: Box<dyn Bus>,
}

impl Region {
    fn end(&self) -> u64 {
        u64::from(self.base) + self.size
    }

    fn covers(&self, addr: u32, width: u64) -> bool {
        u64::from(addr) >= u64::from(self.base) && u64::from(addr) + width <= self.end()
    }
}

/// RAM controller routing physical addresses to mapped devices.
///
/// An access is routed only when it falls entirely inside one region; the
/// device sees offsets relative to the region base. Region permissions gate
/// reads, writes and instruction fetches independently.
#[derive(Default)]
pub struct MemoryMap {
    regions: Vec<Region>,
}

impl fmt::Debug for MemoryMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for region in &self.regions {
            list.entry(&format_args!(
                "{:#010x}+{:#x} {:?}",
                region.base, region.size, region.permissions
            ));
        }
        list.finish()
    }
}

impl MemoryMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Maps `device` over `[base, base + size)` with `permissions`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Full`] when all region slots are used,
    /// [`MapError::InvalidRange`] for empty or wrapping ranges and
    /// [`MapError::Overlap`] when the range intersects another region.
    pub fn map(
        &mut self,
        base: u32,
        size: u64,
        permissions: Permissions,
        device: Box<dyn Bus>,
    ) -> Result<(), MapError> {
        if self.regions.len() == MAX_REGIONS {
            return Err(MapError::Full);
        }
        let end = u64::from(base) + size;
        if size == 0 || end > 1 << 32 {
            return Err(MapError::InvalidRange { base, size });
        }
        if self
            .regions
            .iter()
            .any(|region| u64::from(base) < region.end() && u64::from(region.base) < end)
        {
            return Err(MapError::Overlap { base });
        }
        tracing::debug!(base, size, ?permissions, "mapped memory region");
        self.regions.push(Region {
            base,
            size,
            permissions,
            device,
        });
        Ok(())
    }

    /// Removes the region starting at `base` and hands its device back.
    pub fn unmap(&mut self, base: u32) -> Option<Box<dyn Bus>> {
        let index = self.regions.iter().position(|region| region.base == base)?;
        Some(self.regions.remove(index).device)
    }

    /// Number of mapped regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` when nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn route(
        &mut self,
        addr: u32,
        width: u64,
        access: Access,
    ) -> Result<(&mut dyn Bus, u32), BusError> {
        let region = self
            .regions
            .iter_mut()
            .find(|region| region.covers(addr, width))
            .ok_or(BusError::Unmapped { addr })?;
        if !region.permissions.allows(access) {
            return Err(BusError::PermissionDenied { addr, access });
        }
        Ok((region.device.as_mut(), addr - region.base))
    }
}

impl Bus for MemoryMap {
    fn read8(&mut self, addr: u32) -> Result<u8, BusError> {
        let (device, offset) = self.route(addr, 1, Access::Read)?;
        device.read8(offset)
    }

    fn read16(&mut self, addr: u32) -> Result<u16, BusError> {
        let (device, offset) = self.route(addr, 2, Access::Read)?;
        device.read16(offset)
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BusError> {
        let (device, offset) = self.route(addr, 4, Access::Read)?;
        device.read32(offset)
    }

    fn write8(&mut self, addr: u32, value: u8) -> Result<(), BusError> {
        let (device, offset) = self.route(addr, 1, Access::Write)?;
        device.write8(offset, value)
    }

    fn write16(&mut self, addr: u32, value: u16) -> Result<(), BusError> {
        let (device, offset) = self.route(addr, 2, Access::Write)?;
        device.write16(offset, value)
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BusError> {
        let (device, offset) = self.route(addr, 4, Access::Write)?;
        device.write32(offset, value)
    }

    fn fetch8(&mut self, addr: u32) -> Result<u8, BusError> {
        let (device, offset) = self.route(addr, 1, Access::Fetch)?;
        device.fetch8(offset)
    }

    fn fetch16(&mut self, addr: u32) -> Result<u16, BusError> {
        let (device, offset) = self.route(addr, 2, Access::Fetch)?;
        device.fetch16(offset)
    }

    fn fetch32(&mut self, addr: u32) -> Result<u32, BusError> {
        let (device, offset) = self.route(addr, 4, Access::Fetch)?;
        device.fetch32(offset)
    }
}
