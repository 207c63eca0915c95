//! Injection correction maps
//!
//! Two 8-point maps give the extension percentage: one indexed by engine
//! period, one by throttle position. Each point is one byte where 256 is
//! +50 %; interpolation shifts it left by 7 into the 16-bit fraction used
//! by the timing engine (0x10000 = 100 %).
//!
//! In storage every map is followed by its bitwise complement, so a torn or
//! decayed byte is detected on load:
//!
//! ```text
//! 0        8        16        24        32
//! ├ rpm ───┼ !rpm ──┼ thr ────┼ !thr ───┤
//! ```

use injex_hal::storage::{NvStorage, StorageError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of points per map
pub const MAP_SIZE: usize = 8;

/// Factory RPM correction point (128 = +25 %)
pub const RPM_DEFAULT_INCREMENT: u8 = 128;

/// Factory throttle correction point
pub const THROTTLE_DEFAULT_INCREMENT: u8 = 0;

/// Storage offset of the RPM map
pub const RPM_MAP_OFFSET: usize = 0;

/// Storage offset of the throttle map
pub const THROTTLE_MAP_OFFSET: usize = 2 * MAP_SIZE;

/// Bytes used in storage by both maps and their complements
pub const CALIBRATION_IMAGE_LEN: usize = 4 * MAP_SIZE;

/// Errors from calibration load/store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Storage access failed
    Storage(StorageError),
    /// A map byte does not match its stored complement
    Corrupted,
    /// Map point index past the end of the map
    IndexOutOfRange,
}

impl From<StorageError> for CalibrationError {
    fn from(err: StorageError) -> Self {
        CalibrationError::Storage(err)
    }
}

/// Map selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MapId {
    /// Engine period correction
    Rpm,
    /// Throttle position correction
    Throttle,
}

/// The two correction maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationMaps {
    /// Correction by engine period
    pub rpm: [u8; MAP_SIZE],
    /// Correction by throttle position
    pub throttle: [u8; MAP_SIZE],
}

impl Default for CalibrationMaps {
    fn default() -> Self {
        Self {
            rpm: [RPM_DEFAULT_INCREMENT; MAP_SIZE],
            throttle: [THROTTLE_DEFAULT_INCREMENT; MAP_SIZE],
        }
    }
}

impl CalibrationMaps {
    /// Get a map by id
    pub fn map(&self, id: MapId) -> &[u8; MAP_SIZE] {
        match id {
            MapId::Rpm => &self.rpm,
            MapId::Throttle => &self.throttle,
        }
    }

    /// Set one point of a map (RAM only, call [`store`](Self::store) to persist)
    pub fn set_point(&mut self, id: MapId, index: usize, value: u8) -> Result<(), CalibrationError> {
        let map = match id {
            MapId::Rpm => &mut self.rpm,
            MapId::Throttle => &mut self.throttle,
        };
        let point = map.get_mut(index).ok_or(CalibrationError::IndexOutOfRange)?;
        *point = value;
        Ok(())
    }

    /// Load both maps, verifying every byte against its complement
    pub fn load<S: NvStorage>(storage: &mut S) -> Result<Self, CalibrationError> {
        let mut image = [0u8; CALIBRATION_IMAGE_LEN];
        storage.read(0, &mut image)?;

        Ok(Self {
            rpm: decode_map(&image[RPM_MAP_OFFSET..THROTTLE_MAP_OFFSET])?,
            throttle: decode_map(&image[THROTTLE_MAP_OFFSET..CALIBRATION_IMAGE_LEN])?,
        })
    }

    /// Write the factory maps to storage and return them
    pub fn restore_defaults<S: NvStorage>(storage: &mut S) -> Result<Self, CalibrationError> {
        let maps = Self::default();
        maps.store(storage, None)?;
        Ok(maps)
    }

    /// Persist one map, or both with `None`
    pub fn store<S: NvStorage>(
        &self,
        storage: &mut S,
        which: Option<MapId>,
    ) -> Result<(), CalibrationError> {
        for id in [MapId::Rpm, MapId::Throttle] {
            if which.is_some_and(|selected| selected != id) {
                continue;
            }
            let offset = match id {
                MapId::Rpm => RPM_MAP_OFFSET,
                MapId::Throttle => THROTTLE_MAP_OFFSET,
            };
            storage.write(offset, &encode_map(self.map(id)))?;
        }
        Ok(())
    }
}

fn encode_map(map: &[u8; MAP_SIZE]) -> [u8; 2 * MAP_SIZE] {
    let mut block = [0u8; 2 * MAP_SIZE];
    for (i, &value) in map.iter().enumerate() {
        block[i] = value;
        block[MAP_SIZE + i] = !value;
    }
    block
}

fn decode_map(block: &[u8]) -> Result<[u8; MAP_SIZE], CalibrationError> {
    let mut map = [0u8; MAP_SIZE];
    for (i, point) in map.iter_mut().enumerate() {
        let value = block[i];
        if block[MAP_SIZE + i] != !value {
            return Err(CalibrationError::Corrupted);
        }
        *point = value;
    }
    Ok(map)
}
