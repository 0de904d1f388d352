//! Live-watch configuration persistence.
//!
//! Blob layout (little-endian) inside the NVM region:
//!
//! ```text
//! 0x00  u32  signature 0xFF00AA55
//! 0x04  u32  streaming period [ms]
//! 0x08  u8   number of watched parameters
//! 0x09  u8   active flag
//! 0x0A  u16  reserved
//! 0x0C  u32  CRC-32 over bytes 0x00..0x0A and the ID list
//! 0x10  u16  parameter ID list, one entry per watched parameter
//! ```
//!
//! A missing signature or CRC mismatch reads as [`Error::Corrupt`], which
//! callers treat as "never written": they keep compiled-in defaults.

use crate::nvm::{Error, NvmRegion};

use super::watch::{LiveWatch, MAX_WATCH_PARAMS};

const SIGNATURE: u32 = 0xFF00_AA55;
const HEADER_SIZE: usize = 16;
const CRC_OFFSET: usize = 12;
const CRC_SPAN: usize = 10;
const LIST_ADDR: u32 = 0x10;

/// Persist the live-watch configuration.
pub fn save_watch<N: NvmRegion>(nvm: &mut N, watch: &LiveWatch) -> Result<(), Error> {
    let ids = watch.ids();
    debug_assert!(ids.len() <= MAX_WATCH_PARAMS);

    let mut list = [0u8; 2 * MAX_WATCH_PARAMS];
    for (chunk, id) in list.chunks_exact_mut(2).zip(ids) {
        chunk.copy_from_slice(&id.to_le_bytes());
    }
    let list = &list[..2 * ids.len()];

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&SIGNATURE.to_le_bytes());
    header[4..8].copy_from_slice(&watch.period_ms().to_le_bytes());
    header[8] = ids.len() as u8;
    header[9] = watch.is_active() as u8;
    let crc = checksum(&header[..CRC_SPAN], list);
    header[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());

    nvm.write(0, &header)?;
    nvm.write(LIST_ADDR, list)
}

/// Restore the live-watch configuration, validating signature and CRC.
///
/// On success `watch` carries the stored period, active flag and ID list.
/// On any error `watch` is left untouched.
pub fn load_watch<N: NvmRegion>(nvm: &mut N, watch: &mut LiveWatch) -> Result<(), Error> {
    let mut header = [0u8; HEADER_SIZE];
    nvm.read(0, &mut header)?;

    let sign = u32::from_le_bytes(header[0..4].try_into().unwrap_or_default());
    if sign != SIGNATURE {
        return Err(Error::Corrupt);
    }

    let count = header[8] as usize;
    if count > MAX_WATCH_PARAMS {
        return Err(Error::Corrupt);
    }

    let mut list = [0u8; 2 * MAX_WATCH_PARAMS];
    let list = &mut list[..2 * count];
    nvm.read(LIST_ADDR, list)?;

    let stored_crc = u32::from_le_bytes(
        header[CRC_OFFSET..CRC_OFFSET + 4]
            .try_into()
            .unwrap_or_default(),
    );
    if checksum(&header[..CRC_SPAN], list) != stored_crc {
        return Err(Error::Corrupt);
    }

    let period_ms = u32::from_le_bytes(header[4..8].try_into().unwrap_or_default());
    let active = header[9] != 0;

    let mut ids = [0u16; MAX_WATCH_PARAMS];
    for (id, chunk) in ids.iter_mut().zip(list.chunks_exact(2)) {
        *id = u16::from_le_bytes(chunk.try_into().unwrap_or_default());
    }

    watch.restore(period_ms, active, &ids[..count]);
    Ok(())
}

fn checksum(header: &[u8], list: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(header);
    hasher.update(list);
    hasher.finalize()
}
