//! Injection engine against a simulated injector line
//!
//! The step simulation runs at the extension timer resolution (0.5 µs):
//! one clock tick is 8 steps and one millisecond is 2000 steps.

mod common;

use std::cell::Cell;

use common::{InjectorHw, Shared, SimEngine, SimOutput};
use injex_core::acquisition::SensorReader;
use injex_core::config::{CalibrationMaps, InjectionConfig};
use injex_core::injection::{
    extension_ticks, EdgeOutcome, InjectionEngine, SafetyStatus, SteadyStateDecision,
    TriggerPhase,
};
use injex_hal::gpio::InputPin;

const STEPS_PER_TICK: u64 = 8;
const STEPS_PER_MS: u64 = 2000;

/// Drive one command pulse by hand: rising at `rise`, falling `width` later
fn pulse(hw: &InjectorHw, engine: &mut SimEngine<'_>, rise: u16, width: u16) -> EdgeOutcome {
    hw.clock.set(rise);
    hw.command.set(false);
    let started = engine.on_input_change();
    assert!(
        matches!(started, EdgeOutcome::Started { .. }),
        "rising edge: {started:?}"
    );

    hw.clock.set(rise.wrapping_add(width));
    hw.command.set(true);
    engine.on_input_change()
}

/// Expected programmed ticks for map points hit exactly
fn expected(width: u16, rpm_point: u8, thr_point: u8) -> u16 {
    let percentage = ((u32::from(rpm_point) + u32::from(thr_point)) << 7).min(32768) as u16;
    extension_ticks(width, percentage, 3) - 54
}

fn graded_maps() -> CalibrationMaps {
    CalibrationMaps {
        rpm: [16, 32, 48, 64, 80, 96, 112, 128],
        throttle: [0, 8, 16, 24, 32, 40, 48, 56],
    }
}

#[test]
fn test_reference_extension() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);

    // Default maps: +25 % everywhere, 4 ms pulse -> 1 ms minus overhead
    let outcome = pulse(&hw, &mut engine, 1000, 1000);
    assert_eq!(outcome, EdgeOutcome::Extended { ticks: 1946 });
    assert!(hw.output.get());
    assert!(hw.timer.is_running());
    assert_eq!(hw.timer.period(), 1946);
    assert_eq!(engine.cycle().phase, TriggerPhase::AwaitingRising);

    assert!(engine.on_extension_elapsed());
    assert!(!hw.output.get());
    assert!(!hw.timer.is_running());
    assert!(!engine.timer().is_attached());

    let snapshot = shared.telemetry.snapshot();
    assert_eq!(snapshot.combustion_counter, 1);
    assert_eq!(snapshot.pulse_width_ticks, 1000);
    assert_eq!(snapshot.extension_ticks, 1946);
}

#[test]
fn test_stray_timer_match_is_ignored() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);
    assert!(!engine.on_extension_elapsed());
}

#[test]
fn test_extension_at_breakpoints() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared).with_maps(graded_maps());
    let width = 1200;

    // (period, throttle, rpm point, throttle point)
    let cases = [
        (2600u16, 0u16, 16u8, 0u8), // first breakpoints
        (2000, 0, 16, 0),           // below first rpm breakpoint
        (4136, 512, 48, 32),        // interior breakpoints
        (30000, 1000, 128, 56),     // above last breakpoints
        (23592, 896, 128, 56),      // last breakpoints
    ];

    let mut rise: u16 = 10;
    for (period, throttle, rpm_point, thr_point) in cases {
        shared.set_throttle(throttle);
        // Prime the previous rising edge so the next one sees `period`
        pulse(&hw, &mut engine, rise, width);
        rise = rise.wrapping_add(period);

        let outcome = pulse(&hw, &mut engine, rise, width);
        assert_eq!(
            outcome,
            EdgeOutcome::Extended {
                ticks: expected(width, rpm_point, thr_point)
            },
            "period {period}, throttle {throttle}"
        );
        assert_eq!(engine.cycle().period_ticks, period);
        rise = rise.wrapping_add(period);
    }
}

#[test]
fn test_percentage_ceiling() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let maps = CalibrationMaps {
        rpm: [255; 8],
        throttle: [255; 8],
    };
    let mut engine = hw.engine(&shared).with_maps(maps);
    shared.set_throttle(700);

    // Sum would be about +99 %, capped at +50 %
    let outcome = pulse(&hw, &mut engine, 0, 1200);
    assert_eq!(outcome, EdgeOutcome::Extended { ticks: 4800 - 54 });
}

#[test]
fn test_plausibility_rejections() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);

    let short = pulse(&hw, &mut engine, 0, 49);
    assert_eq!(short, EdgeOutcome::PulseRejected);
    assert!(!hw.output.get());
    assert!(engine.watchdog().is_confirmed_off());
    assert!(!engine.timer().is_attached());

    let long = pulse(&hw, &mut engine, 10000, 2001);
    assert_eq!(long, EdgeOutcome::PulseRejected);
    assert!(!hw.output.get());

    // Zero correction gives a zero extension
    engine.set_maps(CalibrationMaps {
        rpm: [0; 8],
        throttle: [0; 8],
    });
    let none = pulse(&hw, &mut engine, 20000, 1000);
    assert_eq!(none, EdgeOutcome::ExtensionRejected);
    assert!(!hw.output.get());
    assert_eq!(shared.telemetry.snapshot().extension_ticks, 0);

    // 8 ms at +50 % is 8000 timer ticks, above the window
    engine.set_maps(CalibrationMaps {
        rpm: [255; 8],
        throttle: [255; 8],
    });
    let too_long = pulse(&hw, &mut engine, 40000, 2000);
    assert_eq!(too_long, EdgeOutcome::ExtensionRejected);
    assert_eq!(engine.cycle().phase, TriggerPhase::AwaitingRising);
}

#[test]
fn test_opening_offset_is_removed() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let config = InjectionConfig {
        opening_offset_ticks: 200,
        ..Default::default()
    };
    let mut engine = hw.engine(&shared).with_config(config);

    let outcome = pulse(&hw, &mut engine, 0, 1200);
    assert_eq!(outcome, EdgeOutcome::Extended { ticks: 1946 });
    assert_eq!(engine.cycle().pulse_width_ticks, 1000);
}

#[test]
fn test_edges_out_of_phase_are_ignored() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);

    // Release without a preceding assertion
    hw.command.set(true);
    assert_eq!(engine.on_input_change(), EdgeOutcome::Ignored);

    hw.command.set(false);
    assert!(matches!(
        engine.on_input_change(),
        EdgeOutcome::Started { .. }
    ));
    // Second assertion while waiting for release
    assert_eq!(engine.on_input_change(), EdgeOutcome::Ignored);
    assert_eq!(engine.cycle().combustion_counter, 1);
}

#[test]
fn test_combustion_counter_wraps() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);

    let mut rise: u16 = 0;
    for _ in 0..=u16::MAX {
        pulse(&hw, &mut engine, rise, 1000);
        engine.on_extension_elapsed();
        rise = rise.wrapping_add(5000);
    }
    assert_eq!(engine.cycle().combustion_counter, 0);
}

/// Step simulation with a scripted command line
struct Sim<'a> {
    hw: InjectorHw,
    engine: SimEngine<'a>,
    step: u64,
    /// Drop extension timer interrupts, as if the handler were lost
    lose_completion: bool,
    /// Drop command pin interrupts; only the service pass sees edges
    lose_edges: bool,
    /// Steps the output may stay on after the command is released
    allowed: u64,
    /// Steps the output has been on since the command was released
    uncommanded: u64,
    longest_excess: i64,
    tripped: u32,
}

impl<'a> Sim<'a> {
    fn new(shared: &'a Shared, config: InjectionConfig) -> Self {
        let hw = InjectorHw::new();
        let engine = hw.engine(shared).with_config(config);
        Self {
            hw,
            engine,
            step: 1,
            lose_completion: false,
            lose_edges: false,
            allowed: 0,
            uncommanded: 0,
            longest_excess: i64::MIN,
            tripped: 0,
        }
    }

    fn set_command(&mut self, asserted: bool) {
        self.hw.command.set(!asserted);
        if !self.lose_edges {
            let outcome = self.engine.on_input_change();
            self.note(outcome);
        }
    }

    fn note(&mut self, outcome: EdgeOutcome) {
        match outcome {
            EdgeOutcome::Extended { ticks } => self.allowed = u64::from(ticks),
            EdgeOutcome::PulseRejected | EdgeOutcome::ExtensionRejected => self.allowed = 0,
            _ => {}
        }
    }

    fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.hw.clock.set((self.step / STEPS_PER_TICK) as u16);

            if self.hw.timer.tick() && !self.lose_completion {
                self.engine.on_extension_elapsed();
            }

            if self.step % STEPS_PER_MS == 0 {
                let ms = (self.step / STEPS_PER_MS) as u32;
                if let Some(outcome) = self.engine.service_input() {
                    self.note(outcome);
                }
                if self.engine.safety_check(ms) == SafetyStatus::Tripped {
                    self.tripped += 1;
                }
                self.engine.evaluate_steady_state(ms);
                self.engine.acquire_sensors();
            }

            let released = self.hw.command.get();
            if released && self.hw.output.get() {
                self.uncommanded += 1;
                let excess = self.uncommanded as i64 - self.allowed as i64;
                self.longest_excess = self.longest_excess.max(excess);
            } else {
                self.uncommanded = 0;
            }
            self.step += 1;
        }
    }

    /// Command pulse of `width` ticks followed by `gap` ticks released
    fn cycle(&mut self, width: u64, gap: u64) {
        self.set_command(true);
        self.run(width * STEPS_PER_TICK);
        self.set_command(false);
        self.run(gap * STEPS_PER_TICK);
    }
}

/// Small deterministic generator for pulse trains
struct Lcg(u32);

impl Lcg {
    fn next(&mut self, lo: u64, hi: u64) -> u64 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        lo + u64::from(self.0 >> 8) % (hi - lo + 1)
    }
}

#[test]
fn test_output_never_outlives_extension() {
    let shared = Shared::new();
    shared.set_throttle(300);
    let mut sim = Sim::new(&shared, InjectionConfig::default());
    let mut rng = Lcg(0x1234_5678);

    for _ in 0..150 {
        // Mostly plausible pulses, some too short to extend
        let width = if rng.next(0, 9) == 0 {
            rng.next(10, 49)
        } else {
            rng.next(100, 1500)
        };
        let gap = rng.next(1000, 9000);
        sim.cycle(width, gap);
    }

    assert!(sim.longest_excess <= 0, "excess {}", sim.longest_excess);
    assert!(!sim.hw.output.get());
    assert_eq!(sim.tripped, 0);
}

#[test]
fn test_lost_completion_bounded_by_one_interval() {
    let shared = Shared::new();
    let config = InjectionConfig {
        safety_max_faults: 1,
        ..Default::default()
    };
    let mut sim = Sim::new(&shared, config);
    sim.lose_completion = true;

    for _ in 0..20 {
        sim.cycle(1000, 4000);
    }
    // Engine stops with the output stuck on
    sim.set_command(true);
    sim.run(1000 * STEPS_PER_TICK);
    sim.set_command(false);
    let extension = sim.allowed;
    assert!(extension > 0);
    assert!(sim.hw.output.get());

    sim.run(300 * STEPS_PER_MS);
    assert!(!sim.hw.output.get());
    assert!(sim.tripped > 0);
    assert_eq!(sim.engine.cycle().phase, TriggerPhase::AwaitingRising);

    let interval = u64::from(config.safety_interval_ms) * STEPS_PER_MS;
    assert!(
        sim.longest_excess <= interval as i64,
        "excess {} > interval {interval}",
        sim.longest_excess
    );
}

#[test]
fn test_lost_completion_bounded_by_fault_threshold() {
    let shared = Shared::new();
    let config = InjectionConfig::default();
    let mut sim = Sim::new(&shared, config);
    sim.lose_completion = true;

    sim.cycle(1000, 4000);
    assert!(sim.hw.output.get());

    sim.run(2000 * STEPS_PER_MS);
    assert!(!sim.hw.output.get());

    let bound = u64::from(config.safety_interval_ms)
        * u64::from(config.safety_max_faults)
        * STEPS_PER_MS;
    assert!(sim.longest_excess <= bound as i64);
    // More than one interval was needed to trip
    assert!(sim.longest_excess > (u64::from(config.safety_interval_ms) * STEPS_PER_MS) as i64);
}

#[test]
fn test_service_pass_recovers_lost_edges() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);

    // Line matches the phase: nothing to do
    assert_eq!(engine.service_input(), None);

    // Command asserted, interrupt never delivered
    hw.clock.set(1000);
    hw.command.set(false);
    assert!(engine.edge_outstanding());
    assert!(matches!(
        engine.service_input(),
        Some(EdgeOutcome::Started { .. })
    ));
    assert!(hw.output.get());
    assert_eq!(engine.service_input(), None);

    // Release lost as well: the service pass still schedules the extension
    hw.clock.set(2000);
    hw.command.set(true);
    assert_eq!(
        engine.service_input(),
        Some(EdgeOutcome::Extended { ticks: 1946 })
    );
    assert_eq!(engine.cycle().phase, TriggerPhase::AwaitingRising);
    assert!(hw.timer.is_running());
    assert!(!engine.edge_outstanding());

    assert!(engine.on_extension_elapsed());
    assert!(!hw.output.get());
}

#[test]
fn test_lost_edges_bounded_by_service_interval() {
    let shared = Shared::new();
    shared.set_throttle(300);
    let mut sim = Sim::new(&shared, InjectionConfig::default());
    sim.lose_edges = true;
    let mut rng = Lcg(0x0bad_cafe);

    // Pulses and gaps longer than one service interval (250 ticks)
    for _ in 0..100 {
        let width = rng.next(300, 1500);
        let gap = rng.next(1000, 9000);
        sim.cycle(width, gap);
    }

    assert!(sim.engine.cycle().combustion_counter >= 100);
    assert!(
        sim.longest_excess <= STEPS_PER_MS as i64,
        "excess {}",
        sim.longest_excess
    );
    assert!(!sim.hw.output.get());
    assert_eq!(sim.tripped, 0);
}

#[test]
fn test_healthy_cycles_keep_watchdog_quiet() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);

    let mut rise: u16 = 0;
    for ms in (100..=1000).step_by(100) {
        pulse(&hw, &mut engine, rise, 1000);
        engine.on_extension_elapsed();
        rise = rise.wrapping_add(5000);
        assert_eq!(engine.safety_check(ms), SafetyStatus::Ok);
    }
    assert_eq!(engine.watchdog().fault_count(), 0);
}

/// Run `count` identical 4 ms pulses, 5000 ticks apart, completing each one
fn run_cycles(hw: &InjectorHw, engine: &mut SimEngine<'_>, rise: &mut u16, count: usize) {
    for _ in 0..count {
        pulse(hw, engine, *rise, 1000);
        engine.on_extension_elapsed();
        *rise = rise.wrapping_add(5000);
    }
}

#[test]
fn test_steady_state_requests_capture() {
    let shared = Shared::new();
    shared.set_throttle(400);
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);
    engine.acquire_sensors();
    let mut rise: u16 = 0;

    // Same operating point over several evaluations
    run_cycles(&hw, &mut engine, &mut rise, 25);
    assert_eq!(
        engine.evaluate_steady_state(500),
        SteadyStateDecision::Unsteady { running: false }
    );
    assert!(!engine.cycle().running);

    run_cycles(&hw, &mut engine, &mut rise, 25);
    assert_eq!(
        engine.evaluate_steady_state(1000),
        SteadyStateDecision::Steady { decimation: 1 }
    );
    assert!(engine.cycle().running);
    assert!(!shared.capture.is_in_flight());

    // The next falling edge arms the capture with the evaluated state
    run_cycles(&hw, &mut engine, &mut rise, 1);
    assert!(shared.capture.is_in_flight());
    let state = shared.capture.engine_state();
    assert_eq!(state.combustion_counter, 50);
    assert_eq!(state.period_ticks, 5000);
    assert_eq!(state.pulse_width_ticks, 1000);
    assert_eq!(state.throttle, 400);
}

#[test]
fn test_throttle_step_clears_steady_state() {
    let shared = Shared::new();
    shared.set_throttle(400);
    let hw = InjectorHw::new();
    let mut engine = hw.engine(&shared);
    let mut rise: u16 = 0;

    let mut now_ms = 0;
    for _ in 0..3 {
        run_cycles(&hw, &mut engine, &mut rise, 25);
        engine.acquire_sensors();
        now_ms += 500;
        engine.evaluate_steady_state(now_ms);
    }
    assert!(engine.steady_state().has_request());

    // Step beyond the allowed throttle delta
    shared.set_throttle(450);
    run_cycles(&hw, &mut engine, &mut rise, 25);
    engine.acquire_sensors();
    assert_eq!(
        engine.evaluate_steady_state(now_ms + 500),
        SteadyStateDecision::Unsteady { running: true }
    );
    assert!(!engine.steady_state().has_request());
}

/// Pin that flips on every read, as during cranking ringing
struct RingingInput(Cell<bool>);

impl InputPin for RingingInput {
    fn is_high(&self) -> bool {
        let level = !self.0.get();
        self.0.set(level);
        level
    }
}

#[test]
fn test_cranking_noise_is_filtered() {
    let shared = Shared::new();
    let hw = InjectorHw::new();
    let mut engine = InjectionEngine::new(
        RingingInput(Cell::new(false)),
        SimOutput(hw.output.clone()),
        hw.timer.clone(),
        hw.clock.clone(),
        SensorReader::new(&shared.table, &shared.adc_config),
        &shared.telemetry,
        &shared.capture,
    );
    assert!(!engine.cycle().running);

    // Half the samples high: neither level wins the vote
    assert_eq!(engine.on_input_change(), EdgeOutcome::Noise);
    assert!(!hw.output.get());
    assert_eq!(engine.cycle().combustion_counter, 0);
    assert_eq!(engine.cycle().phase, TriggerPhase::AwaitingRising);
}
