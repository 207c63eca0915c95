//! Injection timing and safety
//!
//! Top-level controller of the extender. The host ECU drives the injector
//! command line low to open the injector; this engine mirrors the command
//! on its own output and, when the command ends, keeps the injector open
//! for an extension computed from two correction maps.
//!
//! ```text
//!  command  ────┐            ┌──────────────────
//!               └────────────┘
//!  output   ____┌────────────────────┐__________
//!               │◄─ pulse width ─►│◄─ ext ─►│
//!            rising           falling   timer match
//! ```
//!
//! Two foreground tasks run alongside: a watchdog that forces the output
//! off if the timer completion is ever lost, and a steady-state evaluator
//! that requests lambda captures at stable operating points.

mod cycle;
mod engine;
mod map;
mod safety;
mod steady;
mod telemetry;

pub use cycle::{InjectionCycleState, TriggerPhase};
pub use engine::{extension_ticks, EdgeOutcome, InjectionEngine};
pub use map::{interpolate, MapAxis, RPM_AXIS, THROTTLE_AXIS};
pub use safety::{SafetyStatus, SafetyWatchdog};
pub use steady::{SteadyStateDecision, SteadyStateModel};
pub use telemetry::{CycleRecord, TelemetryBuffer};
