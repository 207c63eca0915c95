//! Configuration types
//!
//! Board-agnostic tuning parameters for the three real-time subsystems and
//! the calibration maps that are persisted in non-volatile storage.

pub mod calibration;
pub mod types;

pub use calibration::*;
pub use types::*;
