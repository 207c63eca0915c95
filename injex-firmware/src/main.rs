//! Injex - Injector Pulse Extender Firmware
//!
//! Sits on the injector command line of the host ECU and holds the
//! injector open a calibrated fraction longer than commanded.
//!
//! Timing-critical work runs on a high-priority interrupt executor; the
//! telemetry loop runs on the thread executor below it.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::adc::{self, Adc, Channel};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use injex_core::acquisition::{LambdaCapture, MeasurementTable, RoundRobinAdc, SensorReader};
use injex_core::config::{AdcConfig, CalibrationError, CalibrationMaps};
use injex_core::injection::{InjectionEngine, TelemetryBuffer};
use injex_core::serial::{SerialQueues, SoftSerial};
use injex_hal::storage::NvStorage;

use crate::alarm::AlarmState;
use crate::board::{InPin, OutPin, SensorAdc, StartBitIrq, UptimeClock, BATTERY_CHANNEL};
use crate::storage::CalibrationFlash;

mod alarm;
mod board;
mod channels;
mod storage;
mod tasks;

// Cross-context state, shared between the tasks and the telemetry loop
static TABLE: MeasurementTable = MeasurementTable::new();
static TELEMETRY: TelemetryBuffer = TelemetryBuffer::new();
static CAPTURE: LambdaCapture = LambdaCapture::new();
static SERIAL_QUEUES: SerialQueues = SerialQueues::new();

// Compare timers for the injection extension and the serial bit clock
static EXTENSION_ALARM: AlarmState = AlarmState::new();
static BIT_ALARM: AlarmState = AlarmState::new();

static ADC_CONFIG: StaticCell<AdcConfig> = StaticCell::new();

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Injex firmware starting...");

    let p = embassy_rp::init(Default::default());

    // Injector: command from the ECU (low = open), driver output
    let command = Input::new(p.PIN_2, Pull::Up);
    let driver = Output::new(p.PIN_3, Level::Low);

    // Soft serial link, idle high
    let serial_tx = Output::new(p.PIN_4, Level::High);
    let serial_rx = Input::new(p.PIN_5, Pull::Up);

    let adc_config: &'static AdcConfig = ADC_CONFIG.init(unwrap!(board::adc_config()));
    let converter = Adc::new_blocking(p.ADC, adc::Config::default());
    let inputs = [
        Channel::new_pin(p.PIN_26, Pull::None),
        Channel::new_pin(p.PIN_27, Pull::None),
        Channel::new_pin(p.PIN_28, Pull::None),
        Channel::new_pin(p.PIN_29, Pull::None),
    ];
    let mut sampler = RoundRobinAdc::new(
        SensorAdc::new(converter, inputs),
        UptimeClock,
        adc_config.clone(),
        &TABLE,
        &CAPTURE,
    );

    // One-off reading before the sequence takes the converter
    match sampler.read_blocking(BATTERY_CHANNEL) {
        Ok(raw) => info!("Battery input at boot: {}", raw),
        Err(e) => warn!("Battery read failed: {}", e),
    }

    let mut flash = CalibrationFlash::new(p.FLASH);
    let maps = load_maps(&mut flash);

    let sensors = SensorReader::new(&TABLE, adc_config);
    let engine = InjectionEngine::new(
        InPin(command),
        OutPin(driver),
        EXTENSION_ALARM.timer(),
        UptimeClock,
        sensors,
        &TELEMETRY,
        &CAPTURE,
    )
    .with_config(board::injection_config())
    .with_maps(maps);

    let serial = SoftSerial::new(
        InPin(serial_rx),
        OutPin(serial_tx),
        StartBitIrq::default(),
        BIT_ALARM.timer(),
        board::serial_config(),
        &SERIAL_QUEUES,
    );

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);

    high.spawn(tasks::injector_task(engine, &EXTENSION_ALARM)).unwrap();
    high.spawn(tasks::adc_task(sampler)).unwrap();
    high.spawn(tasks::serial_task(serial, &BIT_ALARM)).unwrap();
    spawner
        .spawn(tasks::telemetry_task(sensors, &TELEMETRY, &CAPTURE, &SERIAL_QUEUES))
        .unwrap();

    info!("All tasks spawned, firmware running");
}

/// Load the correction maps, restoring factory maps if storage is corrupted
fn load_maps<S: NvStorage>(storage: &mut S) -> CalibrationMaps {
    match CalibrationMaps::load(storage) {
        Ok(maps) => {
            info!("Loaded correction maps");
            debug!("RPM map: {}", maps.rpm);
            debug!("Throttle map: {}", maps.throttle);
            maps
        }
        Err(CalibrationError::Corrupted) => {
            warn!("Correction maps corrupted, restoring defaults");
            match CalibrationMaps::restore_defaults(storage) {
                Ok(maps) => maps,
                Err(e) => {
                    error!("Failed to restore correction maps: {}", e);
                    CalibrationMaps::default()
                }
            }
        }
        Err(e) => {
            error!("Failed to read correction maps: {}, using defaults", e);
            CalibrationMaps::default()
        }
    }
}
