//! Telemetry buffer
//!
//! Latest cycle values for the logging and command collaborators. The
//! foreground reader holds the busy flag while it copies the buffer out;
//! interrupt-side updates are skipped meanwhile, so a snapshot never mixes
//! two cycles. Execution-time samples are single bytes and always land.

use injex_protocol::lambda::EngineState;
use injex_protocol::telemetry::TelemetrySnapshot;
use portable_atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

/// Values published at the end of an injection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleRecord {
    /// Rising edges seen since boot
    pub combustion_counter: u16,
    /// Ticks between the last two rising edges
    pub period_ticks: u16,
    /// Pulse width, opening offset removed
    pub pulse_width_ticks: u16,
    /// Programmed extension (0 when skipped)
    pub extension_ticks: u16,
}

/// Cross-context telemetry storage
pub struct TelemetryBuffer {
    busy: AtomicBool,
    combustion_counter: AtomicU16,
    period_ticks: AtomicU16,
    pulse_width_ticks: AtomicU16,
    extension_ticks: AtomicU16,
    throttle: AtomicU16,
    lambda: AtomicU16,
    exec_ticks_rising: AtomicU8,
    exec_ticks_falling: AtomicU8,
}

impl TelemetryBuffer {
    /// Create a zeroed buffer
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            combustion_counter: AtomicU16::new(0),
            period_ticks: AtomicU16::new(0),
            pulse_width_ticks: AtomicU16::new(0),
            extension_ticks: AtomicU16::new(0),
            throttle: AtomicU16::new(0),
            lambda: AtomicU16::new(0),
            exec_ticks_rising: AtomicU8::new(0),
            exec_ticks_falling: AtomicU8::new(0),
        }
    }

    /// Check if a reader holds the buffer
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Publish the values of a finished cycle, unless a reader holds the buffer
    pub fn publish_cycle(&self, record: &CycleRecord) -> bool {
        if self.is_busy() {
            return false;
        }
        self.combustion_counter
            .store(record.combustion_counter, Ordering::Relaxed);
        self.period_ticks.store(record.period_ticks, Ordering::Relaxed);
        self.pulse_width_ticks
            .store(record.pulse_width_ticks, Ordering::Relaxed);
        self.extension_ticks
            .store(record.extension_ticks, Ordering::Release);
        true
    }

    /// Publish the latest sensor readings, unless a reader holds the buffer
    pub fn publish_sensors(&self, throttle: u16, lambda: u16) -> bool {
        if self.is_busy() {
            return false;
        }
        self.throttle.store(throttle, Ordering::Relaxed);
        self.lambda.store(lambda, Ordering::Release);
        true
    }

    /// Record the run time of an edge handler
    pub fn record_exec_time(&self, rising: bool, ticks: u8) {
        if rising {
            self.exec_ticks_rising.store(ticks, Ordering::Relaxed);
        } else {
            self.exec_ticks_falling.store(ticks, Ordering::Relaxed);
        }
    }

    /// Copy the whole buffer out under the busy flag
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.busy.store(true, Ordering::Release);
        let snapshot = TelemetrySnapshot {
            combustion_counter: self.combustion_counter.load(Ordering::Acquire),
            period_ticks: self.period_ticks.load(Ordering::Acquire),
            pulse_width_ticks: self.pulse_width_ticks.load(Ordering::Acquire),
            throttle: self.throttle.load(Ordering::Acquire),
            lambda: self.lambda.load(Ordering::Acquire),
            extension_ticks: self.extension_ticks.load(Ordering::Acquire),
            exec_ticks_rising: self.exec_ticks_rising.load(Ordering::Relaxed),
            exec_ticks_falling: self.exec_ticks_falling.load(Ordering::Relaxed),
        };
        self.busy.store(false, Ordering::Release);
        snapshot
    }

    /// Operating point for steady-state evaluation
    pub fn engine_state(&self) -> EngineState {
        let snapshot = self.snapshot();
        EngineState {
            combustion_counter: snapshot.combustion_counter,
            period_ticks: snapshot.period_ticks,
            pulse_width_ticks: snapshot.pulse_width_ticks,
            throttle: snapshot.throttle,
        }
    }
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
