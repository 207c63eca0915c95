//! Timekeeping abstractions
//!
//! Two kinds of timers are used by the core:
//!
//! - A free-running tick counter shared with system timekeeping, used for
//!   timestamps (edge capture, execution time, capture duration).
//! - Count-up compare timers that raise an interrupt when the counter
//!   reaches a programmed period. One schedules the pulse extension, a
//!   second one clocks the software serial bits.

/// Free-running tick counter
///
/// One tick is 4 µs on the reference hardware. The counter is 16 bits wide
/// and wraps; callers compute durations with `wrapping_sub`.
pub trait TickClock {
    /// Current tick count
    fn now_ticks(&self) -> u16;
}

/// Count-up timer with a compare interrupt
///
/// The timer counts from zero to the programmed period and raises its
/// interrupt on match, restarting from zero (clear-on-compare). Writes of
/// 16-bit registers must be done with interrupts masked by the
/// implementation.
pub trait CompareTimer {
    /// Program the compare period in timer ticks
    ///
    /// Takes effect on the next match when the timer is running.
    fn set_period(&mut self, ticks: u16);

    /// Start counting from the current counter value
    fn start(&mut self);

    /// Stop counting; the counter value is retained
    fn stop(&mut self);

    /// Reset the counter to zero
    fn reset(&mut self);

    /// Read the counter
    fn read(&self) -> u16;

    /// Unmask the compare interrupt
    fn enable_interrupt(&mut self);

    /// Mask the compare interrupt; the counter keeps running
    fn disable_interrupt(&mut self);
}
