//! Engine telemetry snapshot and its packet encoding
//!
//! The snapshot is copied out of the core's telemetry buffer in one piece
//! and handed verbatim to the logging and command collaborators.

use crate::checksum::{append_checksum, verify_checksum, CHECKSUM_LEN};
use crate::PacketError;

/// Packet identifier ('d')
pub const ENGINE_DATA_HEADER: u8 = 0x64;

/// Total packet size
pub const ENGINE_DATA_PACKET_LEN: usize = 1 + 1 + 4 + 12 + 2 + 1 + CHECKSUM_LEN;

/// Consistent copy of the engine telemetry buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    /// Combustion cycles counted since boot (wrapping)
    pub combustion_counter: u16,
    /// Ticks between consecutive injections
    pub period_ticks: u16,
    /// Host-commanded pulse width in ticks, opening offset removed
    pub pulse_width_ticks: u16,
    /// Throttle reading (0..=1023)
    pub throttle: u16,
    /// Lambda reading (0..=1023)
    pub lambda: u16,
    /// Programmed extension in extension-timer ticks (0 when skipped)
    pub extension_ticks: u16,
    /// Edge handler run time on the rising edge, in ticks
    pub exec_ticks_rising: u8,
    /// Edge handler run time on the falling edge, in ticks
    pub exec_ticks_falling: u8,
}

/// Engine data packet as written to the log and sent on request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineDataPacket {
    /// Rolling packet counter
    pub sequence: u8,
    /// Milliseconds since boot
    pub timestamp_ms: u32,
    /// Telemetry content
    pub snapshot: TelemetrySnapshot,
    /// Digital classification bits of the sampled channels
    pub digital_inputs: u8,
}

impl EngineDataPacket {
    /// Encode into a fixed-size buffer, checksum included
    pub fn encode(&self) -> [u8; ENGINE_DATA_PACKET_LEN] {
        let s = &self.snapshot;
        let mut buffer = [0u8; ENGINE_DATA_PACKET_LEN];
        buffer[0] = ENGINE_DATA_HEADER;
        buffer[1] = self.sequence;
        buffer[2..6].copy_from_slice(&self.timestamp_ms.to_le_bytes());

        let words = [
            s.combustion_counter,
            s.period_ticks,
            s.pulse_width_ticks,
            s.throttle,
            s.lambda,
            s.extension_ticks,
        ];
        for (i, word) in words.iter().enumerate() {
            let at = 6 + i * 2;
            buffer[at..at + 2].copy_from_slice(&word.to_le_bytes());
        }

        buffer[18] = s.exec_ticks_rising;
        buffer[19] = s.exec_ticks_falling;
        buffer[20] = self.digital_inputs;
        // Sized for the trailer, append cannot fail
        let _ = append_checksum(&mut buffer, ENGINE_DATA_PACKET_LEN - CHECKSUM_LEN);
        buffer
    }

    /// Validate and decode a packet
    pub fn decode(buffer: &[u8]) -> Result<Self, PacketError> {
        if buffer.len() < ENGINE_DATA_PACKET_LEN {
            return Err(PacketError::BufferTooSmall);
        }
        let buffer = &buffer[..ENGINE_DATA_PACKET_LEN];
        if buffer[0] != ENGINE_DATA_HEADER {
            return Err(PacketError::InvalidHeader);
        }
        verify_checksum(buffer)?;

        let word = |i: usize| u16::from_le_bytes([buffer[6 + i * 2], buffer[7 + i * 2]]);
        Ok(Self {
            sequence: buffer[1],
            timestamp_ms: u32::from_le_bytes([buffer[2], buffer[3], buffer[4], buffer[5]]),
            snapshot: TelemetrySnapshot {
                combustion_counter: word(0),
                period_ticks: word(1),
                pulse_width_ticks: word(2),
                throttle: word(3),
                lambda: word(4),
                extension_ticks: word(5),
                exec_ticks_rising: buffer[18],
                exec_ticks_falling: buffer[19],
            },
            digital_inputs: buffer[20],
        })
    }
}
