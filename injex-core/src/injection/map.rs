//! Correction map interpolation
//!
//! Maps hold one byte per breakpoint (256 = +50 %). The result is the
//! 16-bit fraction used by the timing engine, `map[i] << 7` at breakpoint
//! `i`, linear in between and saturated outside the axis.
//!
//! Breakpoint spacing is a power of two so the division by `dx` is a
//! shift.

use crate::config::MAP_SIZE;

/// Breakpoint axis of a correction map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapAxis {
    breakpoints: [u16; MAP_SIZE],
    shifts: [u8; MAP_SIZE - 1],
}

impl MapAxis {
    /// Build an axis from strictly increasing breakpoints
    ///
    /// # Panics
    ///
    /// When two consecutive breakpoints are not a power of two apart.
    /// Axes are constants, so this is caught at compile time.
    pub const fn new(breakpoints: [u16; MAP_SIZE]) -> Self {
        let mut shifts = [0u8; MAP_SIZE - 1];
        let mut i = 0;
        while i < MAP_SIZE - 1 {
            assert!(breakpoints[i + 1] > breakpoints[i]);
            let dx = breakpoints[i + 1] - breakpoints[i];
            assert!(dx.is_power_of_two());
            shifts[i] = dx.trailing_zeros() as u8;
            i += 1;
        }
        Self {
            breakpoints,
            shifts,
        }
    }

    /// Breakpoint values
    pub const fn breakpoints(&self) -> &[u16; MAP_SIZE] {
        &self.breakpoints
    }
}

/// Engine period axis (clock ticks between injections)
pub const RPM_AXIS: MapAxis =
    MapAxis::new([2600, 3112, 4136, 5160, 7208, 11304, 15400, 23592]);

/// Throttle position axis (0..=1023)
pub const THROTTLE_AXIS: MapAxis = MapAxis::new([0, 128, 256, 384, 512, 640, 768, 896]);

/// Interpolate a map at `x`
pub fn interpolate(axis: &MapAxis, map: &[u8; MAP_SIZE], x: u16) -> u16 {
    let bp = &axis.breakpoints;
    if x <= bp[0] {
        return u16::from(map[0]) << 7;
    }

    // Last breakpoint not above x
    let mut index = 0;
    while index + 1 < MAP_SIZE && x >= bp[index + 1] {
        index += 1;
    }
    if index >= MAP_SIZE - 1 {
        return u16::from(map[MAP_SIZE - 1]) << 7;
    }

    let y0 = u16::from(map[index]) << 7;
    let y1 = map[index + 1];
    let rem = u32::from(x - bp[index]);
    let dy = u32::from(y1.abs_diff(map[index]));
    let delta = ((rem * dy) << 7) >> axis.shifts[index];
    // rem < dx, so |delta| < |y1 - y0| << 7 and stays in range
    let delta = delta as u16;

    if y1 >= map[index] {
        y0 + delta
    } else {
        y0 - delta
    }
}
