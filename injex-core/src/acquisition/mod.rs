//! Round-robin analog acquisition
//!
//! One conversion per interrupt, cycling a fixed channel table forever.
//! Each completion publishes into the [`MeasurementTable`] and, while a
//! capture is armed, feeds decimated oxygen-sensor samples into the
//! [`LambdaCapture`] buffer.
//!
//! The table and the capture buffer are shared with the foreground loop and
//! live in statics; the [`RoundRobinAdc`] engine is owned by the ADC
//! interrupt.

mod engine;
mod lambda;
mod table;

pub use engine::{AdcError, RoundRobinAdc};
pub use lambda::LambdaCapture;
pub use table::{MeasurementTable, SensorReader, SlotGuard};
