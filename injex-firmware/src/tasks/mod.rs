//! Embassy async tasks
//!
//! The injector, ADC and serial tasks stand in for interrupt handlers and
//! run on the high-priority interrupt executor. Each one owns its engine.
//! The telemetry task is the foreground loop on the thread executor.

pub mod adc;
pub mod injector;
pub mod serial;
pub mod telemetry;

pub use adc::{adc_task, Sampler};
pub use injector::{injector_task, Injector};
pub use serial::{serial_task, Serial};
pub use telemetry::telemetry_task;
