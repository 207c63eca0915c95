//! Injex boundary formats
//!
//! This crate defines the byte layouts that leave the real-time core:
//! the high-rate lambda capture packet and the engine telemetry packet.
//! Both are protected by the same two-sum checksum.
//!
//! # Lambda capture packet
//!
//! ```text
//! ┌────────┬──────────────┬──────────────┬─────────┬──────────┐
//! │ HEADER │ ENGINE STATE │ SAMPLES      │ ELAPSED │ CHECKSUM │
//! │ 1B 'L' │ 8B           │ 32B          │ 2B LE   │ 2B (A,B) │
//! └────────┴──────────────┴──────────────┴─────────┴──────────┘
//! ```
//!
//! # Engine data packet
//!
//! ```text
//! ┌─────┬─────┬──────────┬────────────────┬──────────┬────┬──────────┐
//! │ 'd' │ CNT │ TIME ms  │ 6 × u16 LE     │ EXEC ON/ │ DI │ CHECKSUM │
//! │ 1B  │ 1B  │ 4B LE    │ 12B            │ OFF 2B   │ 1B │ 2B (A,B) │
//! └─────┴─────┴──────────┴────────────────┴──────────┴────┴──────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod checksum;
pub mod lambda;
pub mod telemetry;

pub use checksum::{append_checksum, checksum, verify_checksum, CHECKSUM_LEN};
pub use lambda::{EngineState, LambdaPacket, LAMBDA_PACKET_LEN, LAMBDA_SAMPLE_COUNT};
pub use telemetry::{EngineDataPacket, TelemetrySnapshot, ENGINE_DATA_PACKET_LEN};

/// Errors that can occur while encoding or validating packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Buffer too small for the packet
    BufferTooSmall,
    /// Checksum mismatch
    InvalidChecksum,
    /// First byte is not the expected packet identifier
    InvalidHeader,
}
