use std::collections::BTreeMap;
use std::fmt;

use super::{Bus, BusError};

/// User instruction space.
pub const ASI_USER_INSTRUCTION: u8 = 0x08;
/// Supervisor instruction space.
pub const ASI_SUPERVISOR_INSTRUCTION: u8 = 0x09;
/// User data space.
pub const ASI_USER_DATA: u8 = 0x0A;
/// Supervisor data space.
pub const ASI_SUPERVISOR_DATA: u8 = 0x0B;

/// Registry of devices reachable through address space identifiers.
///
/// Built once by the embedder and owned by the CPU. The four standard
/// instruction/data spaces fall back to the main memory device unless a
/// device is registered for them explicitly; any other ASI must be
/// registered before an alternate-space instruction can reach it.
pub struct AddressSpaces {
    memory: Box<dyn Bus>,
    alternate: BTreeMap<u8, Box<dyn Bus>>,
}

impl fmt::Debug for AddressSpaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpaces")
            .field("alternate", &self.alternate.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl AddressSpaces {
    /// Creates a registry whose standard spaces resolve to `memory`.
    #[must_use]
    pub fn new(memory: Box<dyn Bus>) -> Self {
        Self {
            memory,
            alternate: BTreeMap::new(),
        }
    }

    /// Registers `device` for `asi`, returning the device it replaces.
    pub fn register(&mut self, asi: u8, device: Box<dyn Bus>) -> Option<Box<dyn Bus>> {
        tracing::debug!(asi, "registered address space");
        self.alternate.insert(asi, device)
    }

    /// Removes the device registered for `asi`.
    pub fn unregister(&mut self, asi: u8) -> Option<Box<dyn Bus>> {
        self.alternate.remove(&asi)
    }

    /// Main memory device.
    pub fn memory(&mut self) -> &mut dyn Bus {
        self.memory.as_mut()
    }

    /// Resolves `asi` to its device.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NoAddressSpace`] when `asi` is neither registered
    /// nor one of the standard instruction/data spaces.
    pub fn space(&mut self, asi: u8) -> Result<&mut dyn Bus, BusError> {
        if let Some(device) = self.alternate.get_mut(&asi) {
            return Ok(device.as_mut());
        }
        match asi {
            ASI_USER_INSTRUCTION..=ASI_SUPERVISOR_DATA => Ok(self.memory.as_mut()),
            _ => Err(BusError::NoAddressSpace { asi }),
        }
    }

    /// Device used for instruction fetches in the given mode.
    ///
    /// # Errors
    ///
    /// See [`Self::space`].
    pub fn instruction(&mut self, supervisor: bool) -> Result<&mut dyn Bus, BusError> {
        self.space(if supervisor {
            ASI_SUPERVISOR_INSTRUCTION
        } else {
            ASI_USER_INSTRUCTION
        })
    }

    /// Device used for ordinary loads and stores in the given mode.
    ///
    /// # Errors
    ///
    /// See [`Self::space`].
    pub fn data(&mut self, supervisor: bool) -> Result<&mut dyn Bus, BusError> {
        self.space(if supervisor {
            ASI_SUPERVISOR_DATA
        } else {
            ASI_USER_DATA
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressSpaces, ASI_SUPERVISOR_DATA, ASI_USER_INSTRUCTION};
    use crate::{Bus, BusError, Ram};

    #[test]
    fn standard_spaces_fall_back_to_memory() {
        let mut spaces = AddressSpaces::new(Box::new(Ram::new(16)));
        spaces
            .data(true)
            .and_then(|bus| bus.write32(0, 0xAB))
            .expect("supervisor data maps to memory");
        assert_eq!(
            spaces.instruction(false).and_then(|bus| bus.fetch32(0)),
            Ok(0xAB)
        );
        assert_eq!(spaces.space(ASI_USER_INSTRUCTION).and_then(|bus| bus.read32(0)), Ok(0xAB));
    }

    #[test]
    fn unregistered_alternate_space_is_an_error() {
        let mut spaces = AddressSpaces::new(Box::new(Ram::new(16)));
        assert!(matches!(
            spaces.space(0x20),
            Err(BusError::NoAddressSpace { asi: 0x20 })
        ));
    }

    #[test]
    fn registered_device_shadows_standard_space() {
        let mut spaces = AddressSpaces::new(Box::new(Ram::new(16)));
        let mut scratch = Ram::new(8);
        scratch.write32(0, 0x55).expect("in range");
        assert!(spaces.register(ASI_SUPERVISOR_DATA, Box::new(scratch)).is_none());
        assert_eq!(spaces.data(true).and_then(|bus| bus.read32(0)), Ok(0x55));
        assert_eq!(spaces.data(false).and_then(|bus| bus.read32(0)), Ok(0));
        assert!(spaces.unregister(ASI_SUPERVISOR_DATA).is_some());
        assert_eq!(spaces.data(true).and_then(|bus| bus.read32(0)), Ok(0));
    }
}
