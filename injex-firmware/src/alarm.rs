//! Compare timers on top of the embassy time driver
//!
//! An [`AlarmState`] emulates a count-up timer that clears on compare
//! match: the counter origin is an instant, the match is a deadline
//! `period` microseconds later. The owning task awaits
//! [`AlarmState::wait_match`] and calls the core's match handler; the
//! core drives the timer through an [`AlarmTimer`] handle.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use portable_atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};

use injex_hal::timer::CompareTimer;

/// Timer registers shared between the core and the waiting task
pub struct AlarmState {
    period_us: AtomicU16,
    /// Instant of counter zero, in driver ticks
    origin: AtomicU64,
    running: AtomicBool,
    irq: AtomicBool,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl AlarmState {
    pub const fn new() -> Self {
        Self {
            period_us: AtomicU16::new(0),
            origin: AtomicU64::new(0),
            running: AtomicBool::new(false),
            irq: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    /// Handle for the core
    pub fn timer(&'static self) -> AlarmTimer {
        AlarmTimer(self)
    }

    fn deadline(&self) -> Option<Instant> {
        let period = self.period_us.load(Ordering::Acquire);
        if !self.running.load(Ordering::Acquire) || period == 0 {
            return None;
        }
        let origin = Instant::from_ticks(self.origin.load(Ordering::Acquire));
        Some(origin + Duration::from_micros(u64::from(period)))
    }

    /// Wait for the next compare match with the interrupt enabled
    ///
    /// Re-evaluates the deadline whenever the core touches the timer.
    /// Dropping the future loses nothing; the timer state lives here.
    pub async fn wait_match(&self) {
        loop {
            let Some(deadline) = self.deadline() else {
                self.changed.wait().await;
                continue;
            };

            if let Either::First(()) = select(Timer::at(deadline), self.changed.wait()).await {
                // Counter clears on match
                self.origin.store(deadline.as_ticks(), Ordering::Release);
                if self.irq.load(Ordering::Acquire) {
                    return;
                }
            }
        }
    }

    fn touch(&self) {
        self.changed.signal(());
    }
}

impl Default for AlarmState {
    fn default() -> Self {
        Self::new()
    }
}

/// [`CompareTimer`] handle with 1 µs ticks
#[derive(Clone, Copy)]
pub struct AlarmTimer(&'static AlarmState);

impl CompareTimer for AlarmTimer {
    fn set_period(&mut self, ticks: u16) {
        self.0.period_us.store(ticks, Ordering::Release);
        self.0.touch();
    }

    fn start(&mut self) {
        self.0.running.store(true, Ordering::Release);
        self.0.touch();
    }

    fn stop(&mut self) {
        self.0.running.store(false, Ordering::Release);
        self.0.touch();
    }

    fn reset(&mut self) {
        self.0
            .origin
            .store(Instant::now().as_ticks(), Ordering::Release);
        self.0.touch();
    }

    fn read(&self) -> u16 {
        let origin = Instant::from_ticks(self.0.origin.load(Ordering::Acquire));
        Instant::now()
            .checked_duration_since(origin)
            .map_or(0, |elapsed| elapsed.as_micros() as u16)
    }

    fn enable_interrupt(&mut self) {
        self.0.irq.store(true, Ordering::Release);
    }

    fn disable_interrupt(&mut self) {
        self.0.irq.store(false, Ordering::Release);
    }
}
