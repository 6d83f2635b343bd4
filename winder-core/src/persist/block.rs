//! Self-validating storage blocks
//!
//! ```text
//! ┌────────────┬─────────┬──────────┬─────────────┬─────────┬────────────┐
//! │ magic u32  │ version │ category │ len u16     │ payload │ crc32 u32  │
//! │ LE         │ u8      │ u8       │ LE          │ len B   │ LE         │
//! └────────────┴─────────┴──────────┴─────────────┴─────────┴────────────┘
//! ```
//!
//! The payload holds every registry entry of one category, in table order,
//! each value postcard-encoded by its declared type. The CRC covers header
//! and payload.

use crate::vars::{Accessor, Category, Registry, VarEntry, VarValue};

use super::PersistError;

/// Identifies a block written by this firmware ("KBWN")
pub const STORAGE_MAGIC: u32 = 0x4B42_574E;

/// Current block format version
pub const STORAGE_VERSION: u8 = 1;

/// Header bytes before the payload
pub const HEADER_LEN: usize = 8;

/// Trailing checksum bytes
pub const CRC_LEN: usize = 4;

/// Encode the `category` entries of `host` into `buf`
///
/// Returns the number of bytes used.
pub fn encode_block<T>(
    registry: &Registry<T>,
    host: &T,
    category: Category,
    buf: &mut [u8],
) -> Result<usize, PersistError> {
    if buf.len() < HEADER_LEN + CRC_LEN {
        return Err(PersistError::Encode);
    }

    let payload_end = {
        let (_, payload) = buf.split_at_mut(HEADER_LEN);
        let payload_room = payload.len() - CRC_LEN;
        let mut used = 0;
        for entry in registry.persisted(category) {
            let rest = &mut payload[used..payload_room];
            used += encode_value(entry.value(host), rest)?;
        }
        HEADER_LEN + used
    };

    let payload_len =
        u16::try_from(payload_end - HEADER_LEN).map_err(|_| PersistError::Encode)?;
    buf[0..4].copy_from_slice(&STORAGE_MAGIC.to_le_bytes());
    buf[4] = STORAGE_VERSION;
    buf[5] = category.code();
    buf[6..8].copy_from_slice(&payload_len.to_le_bytes());

    let crc = crc32(&buf[..payload_end]);
    buf[payload_end..payload_end + CRC_LEN].copy_from_slice(&crc.to_le_bytes());
    Ok(payload_end + CRC_LEN)
}

/// Validate a block and apply its values to `host`
///
/// Either every value is applied or none is.
pub fn decode_block<T>(
    registry: &Registry<T>,
    host: &mut T,
    category: Category,
    bytes: &[u8],
) -> Result<(), PersistError> {
    if bytes.len() < HEADER_LEN + CRC_LEN {
        return Err(PersistError::Corrupted);
    }

    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != STORAGE_MAGIC {
        return Err(PersistError::NotFound);
    }
    if bytes[4] != STORAGE_VERSION {
        return Err(PersistError::VersionMismatch);
    }
    if bytes[5] != category.code() {
        return Err(PersistError::Corrupted);
    }

    let payload_len = u16::from_le_bytes([bytes[6], bytes[7]]) as usize;
    let payload_end = HEADER_LEN + payload_len;
    if payload_end + CRC_LEN > bytes.len() {
        return Err(PersistError::Corrupted);
    }
    let stored_crc = u32::from_le_bytes([
        bytes[payload_end],
        bytes[payload_end + 1],
        bytes[payload_end + 2],
        bytes[payload_end + 3],
    ]);
    if stored_crc != crc32(&bytes[..payload_end]) {
        return Err(PersistError::Corrupted);
    }

    // Decode everything first so a bad value leaves the host untouched
    let mut rest = &bytes[HEADER_LEN..payload_end];
    for entry in registry.persisted(category) {
        let (_, tail) = decode_value(entry, rest)?;
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(PersistError::Corrupted);
    }

    let mut rest = &bytes[HEADER_LEN..payload_end];
    for entry in registry.persisted(category) {
        let (value, tail) = decode_value(entry, rest)?;
        entry.store(host, value).map_err(|_| PersistError::Decode)?;
        rest = tail;
    }
    Ok(())
}

fn encode_value(value: VarValue<'_>, buf: &mut [u8]) -> Result<usize, PersistError> {
    let written = match value {
        VarValue::Int(v) => postcard::to_slice(&v, buf),
        VarValue::Long(v) => postcard::to_slice(&v, buf),
        VarValue::Float(v) => postcard::to_slice(&v, buf),
        VarValue::Bool(v) => postcard::to_slice(&v, buf),
        VarValue::Text(v) => postcard::to_slice(v, buf),
    }
    .map_err(|_| PersistError::Encode)?;
    Ok(written.len())
}

fn decode_value<'a, T>(
    entry: &VarEntry<T>,
    bytes: &'a [u8],
) -> Result<(VarValue<'a>, &'a [u8]), PersistError> {
    let decoded = match entry.access {
        Accessor::Int { .. } => {
            postcard::take_from_bytes::<i32>(bytes).map(|(v, rest)| (VarValue::Int(v), rest))
        }
        Accessor::Long { .. } => {
            postcard::take_from_bytes::<i64>(bytes).map(|(v, rest)| (VarValue::Long(v), rest))
        }
        Accessor::Float { .. } => {
            postcard::take_from_bytes::<f32>(bytes).map(|(v, rest)| (VarValue::Float(v), rest))
        }
        Accessor::Bool { .. } => {
            postcard::take_from_bytes::<bool>(bytes).map(|(v, rest)| (VarValue::Bool(v), rest))
        }
        Accessor::Text { .. } => {
            postcard::take_from_bytes::<&str>(bytes).map(|(v, rest)| (VarValue::Text(v), rest))
        }
    };
    match decoded {
        Ok((VarValue::Float(v), _)) if !v.is_finite() => Err(PersistError::Decode),
        Ok(pair) => Ok(pair),
        Err(_) => Err(PersistError::Decode),
    }
}

/// CRC-32 (IEEE 802.3) of `data`
pub fn crc32(data: &[u8]) -> u32 {
    !crc32_update(0xFFFF_FFFF, data)
}

fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
