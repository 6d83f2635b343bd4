//! Flash-backed settings storage
//!
//! Settings live in the last erase sector of flash. A RAM copy of the whole
//! sector serves reads; every write updates the copy, then erases and
//! reprograms the sector. Flash operations stall the core for a few
//! milliseconds, so steps pause while a `SAVE` completes.

use defmt::*;
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use winder_core::persist::STORAGE_SIZE;
use winder_core::traits::{NvStorage, RamStorage, StorageError};

/// Flash size of the SKR Pico
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the settings sector from the start of flash
pub const SETTINGS_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

const _: () = assert!(STORAGE_SIZE <= ERASE_SIZE);

/// Settings sector with a RAM shadow
pub struct FlashSettings {
    flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>,
    shadow: RamStorage<ERASE_SIZE>,
}

impl FlashSettings {
    /// Take the flash peripheral and read the settings sector
    pub fn new(flash: Peri<'static, FLASH>) -> Self {
        let mut flash = Flash::new_blocking(flash);
        let mut shadow = RamStorage::new();
        if let Err(e) = flash.blocking_read(SETTINGS_OFFSET, shadow.as_bytes_mut()) {
            warn!("Settings sector unreadable: {:?}", e);
            shadow = RamStorage::new();
        }
        Self { flash, shadow }
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let end = SETTINGS_OFFSET + ERASE_SIZE as u32;
        self.flash.blocking_erase(SETTINGS_OFFSET, end).map_err(|e| {
            error!("Settings erase failed: {:?}", e);
            StorageError::Io
        })?;
        self.flash
            .blocking_write(SETTINGS_OFFSET, self.shadow.as_bytes())
            .map_err(|e| {
                error!("Settings write failed: {:?}", e);
                StorageError::Io
            })
    }
}

impl NvStorage for FlashSettings {
    fn capacity(&self) -> usize {
        self.shadow.capacity()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.shadow.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.shadow.write(offset, data)?;
        self.commit()?;
        debug!("Settings committed ({} bytes at {})", data.len(), offset);
        Ok(())
    }
}
