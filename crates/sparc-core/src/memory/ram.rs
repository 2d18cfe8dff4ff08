use std::fs;
use std::path::Path;

use thiserror::Error;

use super::{Bus, BusError};

/// Failure while loading a program image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image file could not be read.
    #[error("cannot read program image: {0}")]
    Io(#[from] std::io::Error),
    /// The image does not fit into the region.
    #[error("image of {image} bytes does not fit into {capacity} bytes")]
    TooLarge {
        /// Image length in bytes.
        image: usize,
        /// Region capacity in bytes.
        capacity: usize,
    },
}

/// Byte-addressable RAM device with big-endian multi-byte accesses.
///
/// Addresses are offsets from the start of the device; accesses that do not
/// fit entirely inside the backing store fail with [`BusError::Unmapped`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    /// Allocates `size` zeroed bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Wraps an existing byte image.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Allocates `size` bytes and copies the file at `path` to offset 0.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] when the file cannot be read and
    /// [`LoadError::TooLarge`] when it is longer than `size`.
    pub fn from_image_file(path: impl AsRef<Path>, size: usize) -> Result<Self, LoadError> {
        let image = fs::read(path)?;
        let mut ram = Self::new(size);
        ram.load(0, &image)?;
        tracing::debug!(bytes = image.len(), size, "loaded program image");
        Ok(ram)
    }

    /// Copies `image` into the device at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TooLarge`] when the image does not fit.
    pub fn load(&mut self, offset: usize, image: &[u8]) -> Result<(), LoadError> {
        let end = offset
            .checked_add(image.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or(LoadError::TooLarge {
                image: image.len(),
                capacity: self.bytes.len().saturating_sub(offset),
            })?;
        self.bytes[offset..end].copy_from_slice(image);
        Ok(())
    }

    /// Device size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-sized device.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw backing store.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn span<const N: usize>(&self, addr: u32) -> Result<[u8; N], BusError> {
        let start = addr as usize;
        start
            .checked_add(N)
            .and_then(|end| self.bytes.get(start..end))
            .and_then(|slice| slice.try_into().ok())
            .ok_or(BusError::Unmapped { addr })
    }

    fn store<const N: usize>(&mut self, addr: u32, value: [u8; N]) -> Result<(), BusError> {
        let start = addr as usize;
        let slot = start
            .checked_add(N)
            .and_then(|end| self.bytes.get_mut(start..end))
            .ok_or(BusError::Unmapped { addr })?;
        slot.copy_from_slice(&value);
        Ok(())
    }
}

impl Bus for Ram {
    fn read8(&mut self, addr: u32) -> Result<u8, BusError> {
        self.span::<1>(addr).map(|[byte]| byte)
    }

    fn read16(&mut self, addr: u32) -> Result<u16, BusError> {
        self.span(addr).map(u16::from_be_bytes)
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BusError> {
        self.span(addr).map(u32::from_be_bytes)
    }

    fn write8(&mut self, addr: u32, value: u8) -> Result<(), BusError> {
        self.store(addr, [value])
    }

    fn write16(&mut self, addr: u32, value: u16) -> Result<(), BusError> {
        self.store(addr, value.to_be_bytes())
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), BusError> {
        self.store(addr, value.to_be_bytes())
    }
}
