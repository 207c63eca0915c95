//! GPIO pin abstractions
//!
//! Provides traits for digital input and output pins and for the
//! pin-change interrupt that drives edge-triggered handlers.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
///
/// Implementations should handle the actual hardware register reading
/// for the specific chip. Reads must not be cached: debouncing samples the
/// same pin many times in a row and expects each call to hit the port.
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Edge interrupt attached to an input pin
///
/// The software serial receiver masks its start-bit interrupt while a byte
/// is being shifted in or out and unmasks it again when the line returns
/// to idle.
pub trait EdgeInterrupt {
    /// Unmask the edge interrupt
    fn enable(&mut self);

    /// Mask the edge interrupt
    fn disable(&mut self);

    /// Drop any edge latched while the interrupt was masked
    fn clear_pending(&mut self);

    /// Check if the edge interrupt is currently unmasked
    fn is_enabled(&self) -> bool;
}
