//! Board support for the Raspberry Pi Pico
//!
//! Pin map:
//!
//! | Signal            | GPIO |
//! |-------------------|------|
//! | Injector command  | 2    |
//! | Injector driver   | 3    |
//! | Serial TX         | 4    |
//! | Serial RX         | 5    |
//! | DI1 (ADC0)        | 26   |
//! | Throttle (ADC1)   | 27   |
//! | Lambda (ADC2)     | 28   |
//! | Battery (ADC3)    | 29   |

use defmt::*;
use embassy_rp::adc::{Adc, Blocking, Channel};
use embassy_rp::gpio::{Input, Output};
use embassy_time::Instant;

use injex_core::config::{AdcConfig, ConfigError, InjectionConfig, SerialConfig};
use injex_hal::adc::AdcPeripheral;
use injex_hal::gpio::{EdgeInterrupt, InputPin, OutputPin};
use injex_hal::timer::TickClock;

/// Microseconds per clock tick
pub const CLOCK_TICK_US: u64 = 4;

/// Extension and bit timer frequency
pub const TIMER_HZ: u32 = 1_000_000;

/// Soft serial link speed
pub const SERIAL_BAUD: u32 = 9600;

/// ADC inputs wired on the board, channel id = ADC input number
pub const ADC_INPUTS: usize = 4;

/// ADC channel of the battery divider
pub const BATTERY_CHANNEL: u8 = 3;

/// Injection tuning for a 1 µs extension timer against the 4 µs clock
pub fn injection_config() -> InjectionConfig {
    InjectionConfig {
        extension_timer_shift: 2,
        extension_min_ticks: 50,
        extension_max_ticks: 3000,
        calculation_offset_ticks: 27,
        ..Default::default()
    }
}

pub fn serial_config() -> SerialConfig {
    SerialConfig::for_baud(TIMER_HZ, SERIAL_BAUD)
}

/// Round-robin table: DI1, throttle, lambda, battery
pub fn adc_config() -> Result<AdcConfig, ConfigError> {
    AdcConfig::new(&[0, 1, 2, BATTERY_CHANNEL], 1, 2, 3)
}

/// Digital input
pub struct InPin(pub Input<'static>);

impl InputPin for InPin {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

/// Push-pull output
pub struct OutPin(pub Output<'static>);

impl OutputPin for OutPin {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// 4 µs tick counter derived from the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeClock;

impl TickClock for UptimeClock {
    fn now_ticks(&self) -> u16 {
        (Instant::now().as_micros() / CLOCK_TICK_US) as u16
    }
}

/// Start-bit detection mask and pending latch for the serial RX pin
///
/// The serial task latches every falling edge it sees; the engine only
/// receives it once detection is unmasked, mirroring a pin interrupt flag.
#[derive(Debug, Default)]
pub struct StartBitIrq {
    enabled: bool,
    pending: bool,
}

impl StartBitIrq {
    /// Record a falling edge on the RX pin
    pub fn latch(&mut self) {
        self.pending = true;
    }

    /// Consume a latched edge if detection is unmasked
    pub fn take(&mut self) -> bool {
        let fire = self.enabled && self.pending;
        if fire {
            self.pending = false;
        }
        fire
    }
}

impl EdgeInterrupt for StartBitIrq {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// RP2040 ADC behind the core's converter interface
///
/// Conversions are polled to completion inside `start_conversion` (2 µs),
/// so there is no completion interrupt; the ADC task paces the sequence
/// and reports each completion itself. A failed conversion keeps the
/// previous result.
pub struct SensorAdc {
    adc: Adc<'static, Blocking>,
    inputs: [Channel<'static>; ADC_INPUTS],
    selected: usize,
    result: u16,
}

impl SensorAdc {
    pub fn new(adc: Adc<'static, Blocking>, inputs: [Channel<'static>; ADC_INPUTS]) -> Self {
        Self {
            adc,
            inputs,
            selected: 0,
            result: 0,
        }
    }
}

impl AdcPeripheral for SensorAdc {
    fn select_channel(&mut self, channel: u8) {
        self.selected = usize::from(channel);
    }

    fn start_conversion(&mut self, _interrupt: bool) {
        let Some(input) = self.inputs.get_mut(self.selected) else {
            warn!("ADC input {} not wired", self.selected);
            return;
        };
        match self.adc.blocking_read(input) {
            // 12-bit converter, scaled to the 10-bit range of the maps
            Ok(raw) => self.result = raw >> 2,
            Err(e) => warn!("ADC conversion on input {} failed: {}", self.selected, e),
        }
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn read_result(&mut self) -> u16 {
        self.result
    }

    fn disable(&mut self) {}
}
