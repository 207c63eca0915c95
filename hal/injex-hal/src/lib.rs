//! Injex Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the real-time core is written
//! against. Chip-specific code (the RP2040 firmware, host simulations in
//! tests) implements them, so the same handlers run on the target and on
//! the development machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  injex-firmware (embassy, RP2040)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  injex-core (interrupt handlers)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  injex-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`], [`gpio::EdgeInterrupt`] - Digital I/O
//! - [`timer::TickClock`], [`timer::CompareTimer`] - Timekeeping and one-shot scheduling
//! - [`adc::AdcPeripheral`] - Analog conversions
//! - [`storage::NvStorage`] - Persistent calibration storage

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod gpio;
pub mod storage;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use adc::AdcPeripheral;
pub use gpio::{EdgeInterrupt, InputPin, OutputPin};
pub use storage::{NvStorage, StorageError};
pub use timer::{CompareTimer, TickClock};
