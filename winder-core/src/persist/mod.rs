//! Non-volatile storage of machine configuration and presets
//!
//! Storage is a flat byte range behind [`NvStorage`]:
//!
//! ```text
//! 0          128        224        320              128 + 25 * 96
//! ├──────────┼──────────┼──────────┼──── ... ───────┤
//! │ machine  │ preset 0 │ preset 1 │                │
//! └──────────┴──────────┴──────────┴──── ... ───────┘
//! ```
//!
//! Each region holds one block (see [`block`]). A block that fails any check
//! is never applied, so callers keep whatever values they had.

pub mod block;

pub use block::{crc32, decode_block, encode_block, STORAGE_MAGIC, STORAGE_VERSION};

use crate::config::MAX_PRESETS;
use crate::traits::{NvStorage, StorageError};
use crate::vars::{Category, REGISTRY};
use crate::winder::Winder;

/// Offset of the machine configuration block
pub const CONFIG_BASE: usize = 0;

/// Bytes reserved for the machine configuration block
pub const CONFIG_BLOCK_SIZE: usize = 128;

/// Offset of preset slot 0
pub const PRESET_BASE: usize = CONFIG_BASE + CONFIG_BLOCK_SIZE;

/// Bytes reserved per preset slot
pub const PRESET_STRIDE: usize = 96;

/// Bytes of storage the layout needs
pub const STORAGE_SIZE: usize = PRESET_BASE + MAX_PRESETS * PRESET_STRIDE;

/// Errors that can occur while saving or loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Underlying storage failed
    Storage(StorageError),
    /// Region holds no block (erased or never written)
    NotFound,
    /// Header, length or checksum did not validate
    Corrupted,
    /// Block was written by another format version
    VersionMismatch,
    /// Values did not fit the region
    Encode,
    /// Checksum was good but a value did not decode
    Decode,
    /// Preset slot out of range
    BadSlot,
}

impl PersistError {
    pub fn as_token(&self) -> &'static str {
        match self {
            PersistError::Storage(_) => "STORAGE",
            PersistError::NotFound => "NOT_FOUND",
            PersistError::Corrupted | PersistError::Decode => "CORRUPT",
            PersistError::VersionMismatch => "VERSION",
            PersistError::Encode => "ENCODE",
            PersistError::BadSlot => "BAD_SLOT",
        }
    }
}

impl From<StorageError> for PersistError {
    fn from(e: StorageError) -> Self {
        PersistError::Storage(e)
    }
}

/// Start offset of a preset slot
pub fn preset_offset(slot: u8) -> Result<usize, PersistError> {
    let slot = slot as usize;
    if slot >= MAX_PRESETS {
        return Err(PersistError::BadSlot);
    }
    Ok(PRESET_BASE + slot * PRESET_STRIDE)
}

/// Write the machine configuration block
pub fn save_machine<S: NvStorage>(storage: &mut S, winder: &Winder) -> Result<(), PersistError> {
    let mut buf = [0u8; CONFIG_BLOCK_SIZE];
    let len = encode_block(&REGISTRY, winder, Category::Machine, &mut buf)?;
    storage.write(CONFIG_BASE, &buf[..len])?;
    Ok(())
}

/// Replace the machine configuration with the stored block
pub fn load_machine<S: NvStorage>(storage: &mut S, winder: &mut Winder) -> Result<(), PersistError> {
    let mut buf = [0u8; CONFIG_BLOCK_SIZE];
    storage.read(CONFIG_BASE, &mut buf)?;
    decode_block(&REGISTRY, winder, Category::Machine, &buf)
}

/// Write the active preset to `slot`
pub fn save_preset<S: NvStorage>(
    storage: &mut S,
    winder: &Winder,
    slot: u8,
) -> Result<(), PersistError> {
    let offset = preset_offset(slot)?;
    let mut buf = [0u8; PRESET_STRIDE];
    let len = encode_block(&REGISTRY, winder, Category::Preset, &mut buf)?;
    storage.write(offset, &buf[..len])?;
    Ok(())
}

/// Replace the active preset with the one stored in `slot`
pub fn load_preset<S: NvStorage>(
    storage: &mut S,
    winder: &mut Winder,
    slot: u8,
) -> Result<(), PersistError> {
    let offset = preset_offset(slot)?;
    let mut buf = [0u8; PRESET_STRIDE];
    storage.read(offset, &mut buf)?;
    decode_block(&REGISTRY, winder, Category::Preset, &buf)
}

/// Outcome of restoring settings at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Restored {
    pub machine: Result<(), PersistError>,
    pub preset: Result<(), PersistError>,
}

/// Load the machine block and preset slot 0
///
/// Whatever fails to load keeps its current (factory) values.
pub fn restore<S: NvStorage>(storage: &mut S, winder: &mut Winder) -> Restored {
    Restored {
        machine: load_machine(storage, winder),
        preset: load_preset(storage, winder, 0),
    }
}
