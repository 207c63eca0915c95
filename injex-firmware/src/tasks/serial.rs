//! Soft serial task
//!
//! Owns the serial engine. Services start edges on the RX pin, the bit
//! timer match and write requests from the foreground.
//!
//! Every falling edge is latched in [`StartBitIrq`]; the engine sees it
//! once start-bit detection is unmasked, and [`SoftSerial::listen`] drops
//! edges latched by data bits. An edge that lands while a handler runs is
//! lost with its frame; the next frame recovers.

use defmt::*;
use embassy_futures::select::{select3, Either3};

use injex_core::serial::SoftSerial;

use crate::alarm::{AlarmState, AlarmTimer};
use crate::board::{InPin, OutPin, StartBitIrq};
use crate::channels::SERIAL_TX;

/// Soft serial engine on board hardware
pub type Serial = SoftSerial<'static, InPin, OutPin, StartBitIrq, AlarmTimer>;

#[embassy_executor::task]
pub async fn serial_task(mut serial: Serial, alarm: &'static AlarmState) {
    info!("Serial task started");

    serial.begin();
    loop {
        let event = select3(
            serial.rx_mut().0.wait_for_falling_edge(),
            alarm.wait_match(),
            SERIAL_TX.receive(),
        )
        .await;

        match event {
            Either3::First(()) => serial.edge_mut().latch(),
            Either3::Second(()) => serial.on_bit_timer(),
            Either3::Third(frame) => {
                if let Err(e) = serial.write(&frame) {
                    warn!("Serial frame of {} bytes dropped: {}", frame.len(), e);
                }
            }
        }

        if serial.edge_mut().take() {
            serial.on_start_edge();
        }
    }
}
