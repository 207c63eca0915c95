//! ADC task
//!
//! Paces the round-robin sequence: each wake-up completes the conversion
//! in flight, which publishes it and starts the next channel.

use defmt::*;
use embassy_time::Timer;

use injex_core::acquisition::RoundRobinAdc;

use crate::board::{SensorAdc, UptimeClock};

/// Time per conversion slot, matching a 125 kHz converter clock
pub const CONVERSION_INTERVAL_US: u64 = 104;

/// Round-robin sampler on board hardware
pub type Sampler = RoundRobinAdc<'static, SensorAdc, UptimeClock>;

#[embassy_executor::task]
pub async fn adc_task(mut sampler: Sampler) {
    info!("ADC task started, {} channels", sampler.config().len());

    sampler.start();
    loop {
        Timer::after_micros(CONVERSION_INTERVAL_US).await;
        sampler.on_conversion_complete();
    }
}
