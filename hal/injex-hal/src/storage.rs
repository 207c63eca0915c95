//! Non-volatile storage abstraction
//!
//! Calibration maps are kept in a small byte-addressed store (EEPROM on
//! the reference hardware, a reserved flash sector on the RP2040 build).
//! Data integrity is the caller's job: the core writes every byte next to
//! its complement and checks the pair on load.

/// Errors from storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Underlying memory operation failed
    Device,
    /// Address range outside the store
    OutOfBounds,
}

/// Byte-addressed persistent storage
pub trait NvStorage {
    /// Capacity in bytes
    fn capacity(&self) -> usize;

    /// Read `buffer.len()` bytes starting at `offset`
    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}
