//! Configuration type definitions
//!
//! Defaults reproduce the reference tuning: 4 µs clock ticks, a 0.5 µs
//! extension timer and a 9600 baud software serial link.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of channels in the round-robin sequence
pub const MAX_CHANNELS: usize = 8;

/// Ordered list of ADC channel identifiers
///
/// The position in the table is the canonical identity of a channel: it
/// selects the measurement slot, the busy bit and the classification bit.
pub type ChannelTable = Vec<u8, MAX_CHANNELS>;

/// Errors from configuration validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The channel table is empty
    NoChannels,
    /// More channels than measurement slots
    TooManyChannels,
    /// A role points past the end of the channel table
    SlotOutOfRange,
}

/// Injection timing and safety parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InjectionConfig {
    /// Shortest plausible host pulse (clock ticks)
    pub pulse_min_ticks: u16,
    /// Longest plausible host pulse (clock ticks)
    pub pulse_max_ticks: u16,
    /// Ceiling of the summed correction (0x10000 = 100 %)
    pub max_percentage: u16,
    /// Shortest plausible extension (timer ticks)
    pub extension_min_ticks: u16,
    /// Longest plausible extension (timer ticks)
    pub extension_max_ticks: u16,
    /// Injector opening time removed from the measured pulse (clock ticks)
    pub opening_offset_ticks: u16,
    /// Handler latency removed from the extension (timer ticks)
    pub calculation_offset_ticks: u16,
    /// log2 of timer ticks per clock tick (3: 4 µs clock, 0.5 µs timer)
    pub extension_timer_shift: u8,
    /// Re-samples of the input while the engine is cranking
    pub debounce_samples: u8,
    /// At most this many high samples read as a low level
    pub debounce_low_max: u8,
    /// At least this many high samples read as a high level
    pub debounce_high_min: u8,
    /// Minimum time between safety checks (ms)
    pub safety_interval_ms: u16,
    /// Consecutive unconfirmed checks that force the output off
    pub safety_max_faults: u8,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            pulse_min_ticks: 50,    // 200 µs
            pulse_max_ticks: 2000,  // 8 ms
            max_percentage: 32768,  // +50 %
            extension_min_ticks: 100,  // 50 µs
            extension_max_ticks: 6000, // 3 ms
            opening_offset_ticks: 0,
            calculation_offset_ticks: 54, // 27 µs
            extension_timer_shift: 3,
            debounce_samples: 64,
            debounce_low_max: 16,
            debounce_high_min: 48,
            safety_interval_ms: 100,
            safety_max_faults: 10,
        }
    }
}

/// Steady-state detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SteadyStateConfig {
    /// Minimum time between evaluations (ms)
    pub interval_ms: u16,
    /// Shortest period considered (clock ticks, 2500 = 12000 rpm)
    pub period_min_ticks: u16,
    /// Longest period considered (clock ticks, 40000 = 750 rpm)
    pub period_max_ticks: u16,
    /// Lowest throttle considered
    pub throttle_min: u16,
    /// Highest throttle considered
    pub throttle_max: u16,
    /// Largest throttle change between evaluations
    pub throttle_delta_max: u16,
    /// Largest period change as `previous >> shift` (7: about 0.8 %)
    pub period_drift_shift: u8,
    /// Decimation raised to `.1` when the period exceeds `.0`, ascending
    pub decimation_steps: [(u16, u8); 3],
}

impl Default for SteadyStateConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            period_min_ticks: 2500,
            period_max_ticks: 40000,
            throttle_min: 0,
            throttle_max: 1023,
            throttle_delta_max: 16,
            period_drift_shift: 7,
            decimation_steps: [(8000, 2), (16000, 3), (24000, 4)],
        }
    }
}

impl SteadyStateConfig {
    /// Lambda decimation for a steady operating point
    ///
    /// Slow engines are sampled less often so a capture spans a similar
    /// number of combustion cycles.
    pub fn decimation_for(&self, period_ticks: u16) -> u8 {
        self.decimation_steps
            .iter()
            .filter(|(threshold, _)| period_ticks > *threshold)
            .map(|(_, decimation)| *decimation)
            .last()
            .unwrap_or(1)
    }
}

/// Round-robin ADC parameters
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdcConfig {
    /// Channels sampled in order, one conversion per interrupt
    pub channels: ChannelTable,
    /// Slot holding the throttle position sensor
    pub throttle_slot: u8,
    /// Slot holding the oxygen sensor
    pub lambda_slot: u8,
    /// Slot holding the battery voltage divider
    pub battery_slot: u8,
}

impl AdcConfig {
    /// Build and validate a channel table with its sensor roles
    pub fn new(
        channels: &[u8],
        throttle_slot: u8,
        lambda_slot: u8,
        battery_slot: u8,
    ) -> Result<Self, ConfigError> {
        if channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let channels = Vec::from_slice(channels).map_err(|_| ConfigError::TooManyChannels)?;

        let len = channels.len();
        if [throttle_slot, lambda_slot, battery_slot]
            .iter()
            .any(|&slot| usize::from(slot) >= len)
        {
            return Err(ConfigError::SlotOutOfRange);
        }

        Ok(Self {
            channels,
            throttle_slot,
            lambda_slot,
            battery_slot,
        })
    }

    /// Number of channels in one round
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if the channel table is empty
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        // DI1, throttle, lambda, battery, enable/ignition
        let mut channels = ChannelTable::new();
        for channel in [0u8, 2, 3, 6, 7] {
            // Five entries always fit in eight slots
            let _ = channels.push(channel);
        }
        Self {
            channels,
            throttle_slot: 1,
            lambda_slot: 2,
            battery_slot: 3,
        }
    }
}

/// Software serial parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialConfig {
    /// One bit time in bit-timer ticks
    pub bit_ticks: u16,
    /// Delay from the start edge to the middle of the start bit
    pub sample_delay_ticks: u16,
    /// Bit times the receiver stays armed after a stop bit
    pub linger_bits: u8,
    /// Start sending even while a reception is in progress
    pub force_send: bool,
}

impl SerialConfig {
    /// Timing for a baud rate, given the bit-timer tick frequency
    pub const fn for_baud(timer_hz: u32, baud: u32) -> Self {
        let bit_ticks = (timer_hz / baud - 1) as u16;
        Self {
            bit_ticks,
            sample_delay_ticks: bit_ticks / 2,
            linger_bits: 5,
            force_send: false,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        // 9600 baud on a 2 MHz (0.5 µs) timer: 207 ticks per bit
        Self::for_baud(2_000_000, 9600)
    }
}
