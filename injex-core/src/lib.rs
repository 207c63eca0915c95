//! Board-agnostic real-time core of the injector pulse extender
//!
//! This crate contains every interrupt-level behaviour of the firmware,
//! written against the `injex-hal` traits so it can be exercised on the
//! host:
//!
//! - Extension timer abstraction
//! - Round-robin ADC sampling with opportunistic lambda capture
//! - Bit-level half-duplex software serial
//! - Injection timing, safety watchdog and steady-state detection
//! - Configuration and calibration map types
//!
//! # Execution contexts
//!
//! Every handler runs to completion and is never re-entered. State shared
//! between contexts is either an atomic published through a busy bit
//! ([`acquisition::MeasurementTable`], [`injection::TelemetryBuffer`],
//! [`acquisition::LambdaCapture`], [`serial::SerialQueues`]) or owned by
//! the single task that drives one engine.

#![no_std]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod config;
pub mod injection;
pub mod serial;
pub mod timer;
