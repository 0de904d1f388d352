//! Non-volatile memory region abstraction.
//!
//! The CLI persists small configuration blobs (currently the live-watch
//! setup) through this trait. A region is a flat, byte-addressable span of
//! durable storage; wear leveling, flash pages and erase granularity are
//! the implementor's business.

/// Errors reported by an NVM region.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The access reached past the end of the region.
    OutOfBounds,
    /// The underlying storage device failed.
    Device,
    /// Stored content failed validation (missing signature or bad CRC).
    Corrupt,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::OutOfBounds => defmt::write!(f, "OutOfBounds"),
            Error::Device => defmt::write!(f, "Device"),
            Error::Corrupt => defmt::write!(f, "Corrupt"),
        }
    }
}

/// A flat span of durable byte storage.
pub trait NvmRegion {
    /// Read `buf.len()` bytes starting at `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error>;

    /// Write `data` starting at `addr`.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error>;

    /// Erase `len` bytes starting at `addr` (reset to `0xFF`).
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), Error>;

    /// Total region size in bytes.
    fn size(&self) -> u32;
}

/// RAM-backed region for hosts and tests.
///
/// Fresh instances read back erased (`0xFF`) bytes, like blank flash.
pub struct RamNvm<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> RamNvm<N> {
    /// Create a blank region.
    pub const fn new() -> Self {
        Self { data: [0xFF; N] }
    }

    fn span(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, Error> {
        let start = addr as usize;
        let end = start.checked_add(len).ok_or(Error::OutOfBounds)?;
        if end > N {
            return Err(Error::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const N: usize> Default for RamNvm<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NvmRegion for RamNvm<N> {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error> {
        let span = self.span(addr, buf.len())?;
        buf.copy_from_slice(&self.data[span]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        let span = self.span(addr, data.len())?;
        self.data[span].copy_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<(), Error> {
        let span = self.span(addr, len as usize)?;
        self.data[span].fill(0xFF);
        Ok(())
    }

    fn size(&self) -> u32 {
        N as u32
    }
}
