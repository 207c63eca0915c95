//! Analog-to-digital converter abstraction
//!
//! The converter is driven one channel at a time. A conversion is started
//! either with the completion interrupt enabled (round-robin sampling) or
//! masked (blocking one-off reads at boot).

/// Single-channel-at-a-time ADC peripheral
pub trait AdcPeripheral {
    /// Route the multiplexer to a channel
    fn select_channel(&mut self, channel: u8);

    /// Power the converter and start a conversion
    ///
    /// # Arguments
    /// * `interrupt` - raise the completion interrupt when done
    fn start_conversion(&mut self, interrupt: bool);

    /// Check if a conversion is still in progress
    fn is_busy(&self) -> bool;

    /// Read the last conversion result (10-bit on the reference hardware)
    fn read_result(&mut self) -> u16;

    /// Power the converter down
    fn disable(&mut self);
}
