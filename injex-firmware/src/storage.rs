//! Correction map storage in the last flash sector

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use injex_hal::storage::{NvStorage, StorageError};

/// 2MB flash on the Pico
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the sector reserved in memory.x
const SECTOR_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

/// Bytes exposed to the core, rewritten as a whole
const IMAGE_LEN: usize = 256;

/// One erase sector holding the calibration image
pub struct CalibrationFlash {
    flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>,
}

impl CalibrationFlash {
    pub fn new(flash: Peri<'static, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }

    fn check_bounds(offset: usize, len: usize) -> Result<u32, StorageError> {
        match offset.checked_add(len) {
            Some(end) if end <= IMAGE_LEN => Ok(SECTOR_OFFSET + offset as u32),
            _ => Err(StorageError::OutOfBounds),
        }
    }
}

impl NvStorage for CalibrationFlash {
    fn capacity(&self) -> usize {
        IMAGE_LEN
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), StorageError> {
        let at = Self::check_bounds(offset, buffer.len())?;
        self.flash
            .blocking_read(at, buffer)
            .map_err(|_| StorageError::Device)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        Self::check_bounds(offset, data.len())?;

        // Erase is per sector: merge into the current image first
        let mut image = [0u8; IMAGE_LEN];
        self.flash
            .blocking_read(SECTOR_OFFSET, &mut image)
            .map_err(|_| StorageError::Device)?;
        image[offset..offset + data.len()].copy_from_slice(data);

        self.flash
            .blocking_erase(SECTOR_OFFSET, SECTOR_OFFSET + ERASE_SIZE as u32)
            .map_err(|_| StorageError::Device)?;
        self.flash
            .blocking_write(SECTOR_OFFSET, &image)
            .map_err(|_| StorageError::Device)
    }
}
