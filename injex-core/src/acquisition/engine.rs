//! Round-robin conversion engine
//!
//! Started once at boot, then self-re-arming: every completion interrupt
//! publishes its result and immediately starts the next channel.

use injex_hal::adc::AdcPeripheral;
use injex_hal::timer::TickClock;
use injex_protocol::lambda::LAMBDA_SAMPLE_COUNT;

use super::{LambdaCapture, MeasurementTable};
use crate::config::AdcConfig;

/// Errors from direct ADC access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// The round-robin sequence owns the converter
    SequenceRunning,
}

/// Interrupt-driven round-robin sampler
pub struct RoundRobinAdc<'a, A, C> {
    adc: A,
    clock: C,
    config: AdcConfig,
    table: &'a MeasurementTable,
    capture: &'a LambdaCapture,
    /// Slot being converted
    index: usize,
    running: bool,
    decimation_count: u8,
    sample_index: usize,
    capture_start: u16,
    cycle_start: u16,
}

impl<'a, A, C> RoundRobinAdc<'a, A, C>
where
    A: AdcPeripheral,
    C: TickClock,
{
    /// Create a stopped engine
    pub fn new(
        adc: A,
        clock: C,
        config: AdcConfig,
        table: &'a MeasurementTable,
        capture: &'a LambdaCapture,
    ) -> Self {
        Self {
            adc,
            clock,
            config,
            table,
            capture,
            index: 0,
            running: false,
            decimation_count: 0,
            sample_index: 0,
            capture_start: 0,
            cycle_start: 0,
        }
    }

    /// Start the perpetual sequence from the first channel
    pub fn start(&mut self) {
        if self.config.is_empty() {
            return;
        }
        self.running = true;
        self.index = 0;
        self.cycle_start = self.clock.now_ticks();
        self.start_channel(0);
    }

    /// Stop after the conversion in progress
    pub fn stop(&mut self) {
        self.running = false;
        self.adc.disable();
    }

    /// Route a slot's channel and start an interrupt-driven conversion
    pub fn start_channel(&mut self, slot: usize) {
        if let Some(&channel) = self.config.channels.get(slot) {
            self.adc.select_channel(channel);
            self.adc.start_conversion(true);
        }
    }

    /// Conversion complete interrupt
    pub fn on_conversion_complete(&mut self) {
        if !self.running {
            return;
        }

        let value = self.adc.read_result();
        self.adc.disable();

        let slot = self.index as u8;
        self.table.publish(slot, value);
        if slot == self.config.lambda_slot {
            self.capture_lambda(value);
        }

        self.index += 1;
        if self.index >= self.config.len() {
            self.index = 0;
            let now = self.clock.now_ticks();
            self.table.set_cycle_ticks(now.wrapping_sub(self.cycle_start));
            self.cycle_start = now;
        }
        self.start_channel(self.index);
    }

    fn capture_lambda(&mut self, value: u16) {
        let decimation = self.capture.decimation();
        if decimation == 0 || self.capture.is_filled() {
            self.sample_index = 0;
            self.decimation_count = 0;
            return;
        }

        self.decimation_count += 1;
        if self.decimation_count < decimation {
            return;
        }
        self.decimation_count = 0;

        if self.sample_index == 0 {
            self.capture_start = self.clock.now_ticks();
        }
        // Saturate at the top of the 8-bit range (about 1.25 V)
        let sample = if value > 0xFF { 0xFF } else { value as u8 };
        self.capture.write_sample(self.sample_index, sample);
        self.sample_index += 1;

        if self.sample_index >= LAMBDA_SAMPLE_COUNT {
            let elapsed = self.clock.now_ticks().wrapping_sub(self.capture_start);
            self.capture.complete(elapsed);
            self.sample_index = 0;
        }
    }

    /// One-off conversion, spinning until the result is ready
    ///
    /// Only valid before [`start`](Self::start) or after
    /// [`stop`](Self::stop).
    pub fn read_blocking(&mut self, channel: u8) -> Result<u16, AdcError> {
        if self.running {
            return Err(AdcError::SequenceRunning);
        }

        self.adc.select_channel(channel);
        self.adc.start_conversion(false);
        while self.adc.is_busy() {
            core::hint::spin_loop();
        }
        let value = self.adc.read_result();
        self.adc.disable();
        Ok(value)
    }

    /// Slot whose conversion is in progress
    pub fn current_slot(&self) -> usize {
        self.index
    }

    /// Check if the sequence is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Channel configuration
    pub fn config(&self) -> &AdcConfig {
        &self.config
    }

    /// Access the converter
    pub fn adc(&self) -> &A {
        &self.adc
    }
}
