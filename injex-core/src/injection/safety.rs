//! Output watchdog
//!
//! Every path that turns the injector output off confirms it here. A
//! periodic check reads and clears the confirmation; too many checks in a
//! row without one force the output off and restart the trigger cycle.

/// Result of a safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// Interval not elapsed, nothing checked
    NotDue,
    /// Output was confirmed off since the last check
    Ok,
    /// No confirmation since the last check
    Fault {
        /// Consecutive unconfirmed checks
        count: u8,
    },
    /// Fault threshold reached, output must be forced off
    Tripped,
}

/// Fault counter over output-off confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafetyWatchdog {
    fault_count: u8,
    last_check_ms: u16,
    output_confirmed_off: bool,
    interval_ms: u16,
    max_faults: u8,
}

impl SafetyWatchdog {
    /// Create a watchdog with no faults recorded
    pub const fn new(interval_ms: u16, max_faults: u8) -> Self {
        Self {
            fault_count: 0,
            last_check_ms: 0,
            output_confirmed_off: false,
            interval_ms,
            max_faults,
        }
    }

    /// Record that the output was turned off
    pub fn confirm_off(&mut self) {
        self.output_confirmed_off = true;
    }

    /// Run the check if the interval has elapsed
    ///
    /// `now_ms` is a wrapping millisecond timestamp.
    pub fn check(&mut self, now_ms: u16) -> SafetyStatus {
        if now_ms.wrapping_sub(self.last_check_ms) < self.interval_ms {
            return SafetyStatus::NotDue;
        }
        self.last_check_ms = now_ms;

        let confirmed = core::mem::replace(&mut self.output_confirmed_off, false);
        if confirmed {
            self.fault_count = 0;
            return SafetyStatus::Ok;
        }

        self.fault_count = self.fault_count.saturating_add(1);
        if self.fault_count >= self.max_faults {
            self.fault_count = 0;
            SafetyStatus::Tripped
        } else {
            SafetyStatus::Fault {
                count: self.fault_count,
            }
        }
    }

    /// Consecutive unconfirmed checks
    pub fn fault_count(&self) -> u8 {
        self.fault_count
    }

    /// Check if the output was confirmed off since the last check
    pub fn is_confirmed_off(&self) -> bool {
        self.output_confirmed_off
    }
}
