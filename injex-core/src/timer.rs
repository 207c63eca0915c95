//! Extension timer
//!
//! Thin wrapper over the one compare timer reserved for pulse extension.
//! Besides the raw counter operations it tracks whether the completion
//! handler is attached, so a stray compare match after the handler has
//! detached itself is ignored.

use injex_hal::timer::CompareTimer;

/// One-shot scheduler over a count-up compare timer
pub struct ExtensionTimer<T> {
    timer: T,
    attached: bool,
}

impl<T: CompareTimer> ExtensionTimer<T> {
    /// Wrap a stopped timer
    pub fn new(mut timer: T) -> Self {
        timer.stop();
        timer.disable_interrupt();
        Self {
            timer,
            attached: false,
        }
    }

    /// Program the compare period
    pub fn set_period(&mut self, ticks: u16) {
        self.timer.set_period(ticks);
    }

    /// Start counting
    pub fn start(&mut self) {
        self.timer.start();
    }

    /// Stop counting
    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// Reset the counter to zero
    pub fn reset(&mut self) {
        self.timer.reset();
    }

    /// Current counter value
    pub fn read(&self) -> u16 {
        self.timer.read()
    }

    /// Attach the completion handler (unmask the compare interrupt)
    pub fn attach(&mut self) {
        self.attached = true;
        self.timer.enable_interrupt();
    }

    /// Detach the completion handler (mask the compare interrupt)
    pub fn detach(&mut self) {
        self.timer.disable_interrupt();
        self.attached = false;
    }

    /// Check if the completion handler is attached
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Fire the completion handler once, `ticks` from now
    ///
    /// The timer is restarted from zero so the match happens after exactly
    /// `ticks` timer ticks.
    pub fn schedule(&mut self, ticks: u16) {
        self.timer.stop();
        self.timer.reset();
        self.timer.set_period(ticks);
        self.attach();
        self.timer.start();
    }

    /// Access the underlying timer
    pub fn inner(&self) -> &T {
        &self.timer
    }
}
