//! Telemetry task
//!
//! Foreground loop: drains received bytes, forwards finished lambda
//! captures and sends a periodic engine-data packet over the soft serial
//! link.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker, Timer};

use injex_core::acquisition::{LambdaCapture, SensorReader};
use injex_core::injection::TelemetryBuffer;
use injex_core::serial::SerialQueues;
use injex_protocol::lambda::LambdaPacket;
use injex_protocol::telemetry::EngineDataPacket;

use crate::channels::{SerialFrame, SERIAL_FRAME_LEN, SERIAL_TX};

/// Engine-data packet interval in milliseconds
pub const TELEMETRY_INTERVAL_MS: u64 = 500;

/// Poll interval while waiting for the transmit queue to drain
const TX_DRAIN_POLL_MS: u64 = 2;

#[embassy_executor::task]
pub async fn telemetry_task(
    sensors: SensorReader<'static>,
    telemetry: &'static TelemetryBuffer,
    capture: &'static LambdaCapture,
    queues: &'static SerialQueues,
) {
    info!("Telemetry task started");

    let mut ticker = Ticker::every(Duration::from_millis(TELEMETRY_INTERVAL_MS));
    let boot = Instant::now();
    let mut sequence: u8 = 0;

    loop {
        ticker.next().await;

        while let Some(byte) = queues.read() {
            trace!("Serial RX {=u8:#x}", byte);
        }

        if let Some(packet) = capture.take() {
            match LambdaPacket::parse(&packet) {
                Ok(parsed) => info!(
                    "Lambda capture: counter {}, period {}, {} ticks",
                    parsed.engine_state.combustion_counter,
                    parsed.engine_state.period_ticks,
                    parsed.elapsed_ticks
                ),
                Err(e) => warn!("Lambda capture unreadable: {}", e),
            }
            send(queues, &packet).await;
        }

        let packet = EngineDataPacket {
            sequence,
            timestamp_ms: boot.elapsed().as_millis() as u32,
            snapshot: telemetry.snapshot(),
            digital_inputs: sensors.digital_inputs(),
        };
        sequence = sequence.wrapping_add(1);
        debug!("Engine data: {}", packet);
        send(queues, &packet.encode()).await;
    }
}

/// Hand bytes to the serial task one frame at a time
///
/// Waits for the previous frame to leave the transmit queue so a write
/// never finds the queue full.
async fn send(queues: &SerialQueues, bytes: &[u8]) {
    for chunk in bytes.chunks(SERIAL_FRAME_LEN) {
        while !SERIAL_TX.is_empty() || queues.pending() > 0 {
            Timer::after_millis(TX_DRAIN_POLL_MS).await;
        }
        if let Ok(frame) = SerialFrame::from_slice(chunk) {
            SERIAL_TX.send(frame).await;
        }
    }
}
