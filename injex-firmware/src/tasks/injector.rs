//! Injector task
//!
//! Owns the injection engine. Services the command pin, the extension
//! timer match and the periodic maintenance steps (sensor copy, output
//! watchdog, steady-state evaluation).
//!
//! The pin is awaited by level, not by edge: each wait targets the level
//! the next edge would leave behind, so a transition that happens while a
//! handler runs is still seen. After cranking noise the task waits for
//! the next edge instead, and the maintenance step catches up on any
//! transition that edge wait missed.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_time::{Duration, Instant, Ticker};

use injex_core::injection::{
    EdgeOutcome, InjectionEngine, SafetyStatus, SteadyStateDecision, TriggerPhase,
};

use crate::alarm::{AlarmState, AlarmTimer};
use crate::board::{InPin, OutPin, UptimeClock};

/// Maintenance step interval in milliseconds
///
/// The watchdog and the steady-state model keep their own, longer,
/// intervals; this only bounds how late they run.
pub const MAINTENANCE_INTERVAL_MS: u64 = 10;

/// Injection engine on board hardware
pub type Injector = InjectionEngine<'static, InPin, OutPin, AlarmTimer, UptimeClock>;

#[embassy_executor::task]
pub async fn injector_task(mut engine: Injector, alarm: &'static AlarmState) {
    info!("Injector task started");

    let mut ticker = Ticker::every(Duration::from_millis(MAINTENANCE_INTERVAL_MS));
    let boot = Instant::now();

    // Set after an undecided debounce, so a ringing line cannot spin the task
    let mut settling = false;

    loop {
        let phase = engine.cycle().phase;
        let command = &mut engine.input_mut().0;
        let pin = async {
            match (settling, phase) {
                (true, _) => command.wait_for_any_edge().await,
                // Asserted is low
                (false, TriggerPhase::AwaitingRising) => command.wait_for_low().await,
                (false, TriggerPhase::AwaitingFalling) => command.wait_for_high().await,
            }
        };

        let event = select3(alarm.wait_match(), ticker.next(), pin).await;

        match event {
            Either3::First(()) => {
                if !engine.on_extension_elapsed() {
                    trace!("Stray extension timer match");
                }
            }
            Either3::Second(()) => {
                let now_ms = boot.elapsed().as_millis() as u32;
                settling = maintain(&mut engine, now_ms, settling);
            }
            Either3::Third(()) => {
                settling = engine.service_input().is_some_and(report);
            }
        }
    }
}

/// Log skipped injections; `true` when the line needs to settle
fn report(outcome: EdgeOutcome) -> bool {
    match outcome {
        EdgeOutcome::Noise => true,
        EdgeOutcome::PulseRejected | EdgeOutcome::ExtensionRejected => {
            trace!("Injection skipped: {}", outcome);
            false
        }
        _ => false,
    }
}

fn maintain(engine: &mut Injector, now_ms: u32, settling: bool) -> bool {
    let settling = match engine.service_input() {
        Some(outcome) => {
            debug!("Injector edge recovered by maintenance: {}", outcome);
            report(outcome)
        }
        None => settling && engine.edge_outstanding(),
    };

    if !engine.acquire_sensors() {
        trace!("Telemetry busy, sensor copy skipped");
    }

    match engine.safety_check(now_ms) {
        SafetyStatus::Tripped => {
            warn!("Output not confirmed off, injector forced off");
        }
        SafetyStatus::Fault { count } => {
            debug!("Output watchdog fault {}", count);
        }
        SafetyStatus::Ok | SafetyStatus::NotDue => {}
    }

    match engine.evaluate_steady_state(now_ms) {
        SteadyStateDecision::Steady { decimation } => {
            debug!("Steady state, lambda capture requested (1/{})", decimation);
        }
        SteadyStateDecision::Unsteady { .. } | SteadyStateDecision::NotDue => {}
    }

    settling
}
