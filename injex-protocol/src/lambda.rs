//! Lambda capture packet layout
//!
//! A capture is a short burst of decimated oxygen-sensor samples taken
//! while the engine sits at a steady operating point. The packet carries
//! the engine state that triggered the capture so the samples can be
//! correlated with speed and load offline.

use crate::checksum::{append_checksum, verify_checksum};
use crate::PacketError;

/// Packet identifier ('L')
pub const LAMBDA_HEADER: u8 = 0x4C;

/// Offset of the engine-state block
pub const ENGINE_STATE_OFFSET: usize = 1;

/// Size of the engine-state block
pub const ENGINE_STATE_LEN: usize = 8;

/// Offset of the first sample
pub const LAMBDA_SAMPLES_OFFSET: usize = ENGINE_STATE_OFFSET + ENGINE_STATE_LEN;

/// Number of decimated samples per capture
pub const LAMBDA_SAMPLE_COUNT: usize = 32;

/// Offset of the elapsed-ticks trailer (first to last sample)
pub const LAMBDA_ELAPSED_OFFSET: usize = LAMBDA_SAMPLES_OFFSET + LAMBDA_SAMPLE_COUNT;

/// Offset of the checksum
pub const LAMBDA_CHECKSUM_OFFSET: usize = LAMBDA_ELAPSED_OFFSET + 2;

/// Total packet size
pub const LAMBDA_PACKET_LEN: usize = LAMBDA_CHECKSUM_OFFSET + 2;

/// Engine operating point recorded with a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineState {
    /// Combustion counter at the time of the request
    pub combustion_counter: u16,
    /// Ticks between consecutive injections (two crank revolutions)
    pub period_ticks: u16,
    /// Host-commanded pulse width in ticks
    pub pulse_width_ticks: u16,
    /// Throttle reading (0..=1023)
    pub throttle: u16,
}

impl EngineState {
    /// Encode as four little-endian u16 values
    pub fn to_bytes(&self) -> [u8; ENGINE_STATE_LEN] {
        let mut bytes = [0u8; ENGINE_STATE_LEN];
        bytes[0..2].copy_from_slice(&self.combustion_counter.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.period_ticks.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.pulse_width_ticks.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.throttle.to_le_bytes());
        bytes
    }

    /// Decode from four little-endian u16 values
    pub fn from_bytes(bytes: &[u8; ENGINE_STATE_LEN]) -> Self {
        Self {
            combustion_counter: u16::from_le_bytes([bytes[0], bytes[1]]),
            period_ticks: u16::from_le_bytes([bytes[2], bytes[3]]),
            pulse_width_ticks: u16::from_le_bytes([bytes[4], bytes[5]]),
            throttle: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

/// Decoded lambda capture packet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LambdaPacket {
    /// Operating point that requested the capture
    pub engine_state: EngineState,
    /// Saturated 8-bit sensor samples, oldest first
    pub samples: [u8; LAMBDA_SAMPLE_COUNT],
    /// Ticks between the first and the last sample
    pub elapsed_ticks: u16,
}

impl LambdaPacket {
    /// Write the checksum over everything before it
    pub fn seal(buffer: &mut [u8; LAMBDA_PACKET_LEN]) {
        // The buffer is sized for the trailer, append cannot fail
        let _ = append_checksum(buffer, LAMBDA_CHECKSUM_OFFSET);
    }

    /// Validate and decode a sealed packet
    pub fn parse(buffer: &[u8]) -> Result<Self, PacketError> {
        if buffer.len() < LAMBDA_PACKET_LEN {
            return Err(PacketError::BufferTooSmall);
        }
        let buffer = &buffer[..LAMBDA_PACKET_LEN];
        if buffer[0] != LAMBDA_HEADER {
            return Err(PacketError::InvalidHeader);
        }
        verify_checksum(buffer)?;

        let mut state = [0u8; ENGINE_STATE_LEN];
        state.copy_from_slice(&buffer[ENGINE_STATE_OFFSET..LAMBDA_SAMPLES_OFFSET]);
        let mut samples = [0u8; LAMBDA_SAMPLE_COUNT];
        samples.copy_from_slice(&buffer[LAMBDA_SAMPLES_OFFSET..LAMBDA_ELAPSED_OFFSET]);

        Ok(Self {
            engine_state: EngineState::from_bytes(&state),
            samples,
            elapsed_ticks: u16::from_le_bytes([
                buffer[LAMBDA_ELAPSED_OFFSET],
                buffer[LAMBDA_ELAPSED_OFFSET + 1],
            ]),
        })
    }
}
