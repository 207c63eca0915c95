//! Injection engine
//!
//! Entry points by execution context:
//!
//! | Context                 | Method                                      |
//! |-------------------------|---------------------------------------------|
//! | injector pin change     | [`InjectionEngine::on_input_change`]        |
//! | extension timer match   | [`InjectionEngine::on_extension_elapsed`]   |
//! | foreground, every loop  | [`InjectionEngine::service_input`], [`InjectionEngine::acquire_sensors`], [`InjectionEngine::safety_check`], [`InjectionEngine::evaluate_steady_state`] |

use injex_hal::gpio::{InputPin, OutputPin};
use injex_hal::timer::{CompareTimer, TickClock};

use super::map::{interpolate, RPM_AXIS, THROTTLE_AXIS};
use super::{
    CycleRecord, InjectionCycleState, SafetyStatus, SafetyWatchdog, SteadyStateDecision,
    SteadyStateModel, TelemetryBuffer, TriggerPhase,
};
use crate::acquisition::{LambdaCapture, SensorReader};
use crate::config::{CalibrationMaps, InjectionConfig, SteadyStateConfig};
use crate::timer::ExtensionTimer;

/// What an injector edge did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// Debouncing could not decide the level
    Noise,
    /// Level does not match the expected edge
    Ignored,
    /// Command asserted, output on
    Started {
        /// Ticks since the previous rising edge
        period_ticks: u16,
    },
    /// Command released, extension scheduled
    Extended {
        /// Programmed timer ticks
        ticks: u16,
    },
    /// Pulse width outside the plausibility window, output off
    PulseRejected,
    /// Extension outside the plausibility window, output off
    ExtensionRejected,
}

/// Extension in timer ticks for a pulse width and a correction fraction
///
/// `percentage` is a 16-bit fraction (0x10000 = 100 %); `timer_shift` is
/// log2 of timer ticks per clock tick.
pub fn extension_ticks(pulse_width_ticks: u16, percentage: u16, timer_shift: u8) -> u16 {
    let product = u32::from(pulse_width_ticks) * u32::from(percentage);
    let ticks = product >> 16u8.saturating_sub(timer_shift);
    ticks.min(u32::from(u16::MAX)) as u16
}

/// Pulse extender controller
pub struct InjectionEngine<'a, I, O, T, C> {
    input: I,
    output: O,
    timer: ExtensionTimer<T>,
    clock: C,
    config: InjectionConfig,
    steady_config: SteadyStateConfig,
    maps: CalibrationMaps,
    cycle: InjectionCycleState,
    watchdog: SafetyWatchdog,
    steady: SteadyStateModel,
    sensors: SensorReader<'a>,
    telemetry: &'a TelemetryBuffer,
    capture: &'a LambdaCapture,
}

impl<'a, I, O, T, C> InjectionEngine<'a, I, O, T, C>
where
    I: InputPin,
    O: OutputPin,
    T: CompareTimer,
    C: TickClock,
{
    /// Create an engine with default tuning and factory maps
    ///
    /// The output is driven low.
    pub fn new(
        input: I,
        mut output: O,
        timer: T,
        clock: C,
        sensors: SensorReader<'a>,
        telemetry: &'a TelemetryBuffer,
        capture: &'a LambdaCapture,
    ) -> Self {
        output.set_low();
        let config = InjectionConfig::default();
        Self {
            input,
            output,
            timer: ExtensionTimer::new(timer),
            clock,
            config,
            steady_config: SteadyStateConfig::default(),
            maps: CalibrationMaps::default(),
            cycle: InjectionCycleState::default(),
            watchdog: SafetyWatchdog::new(config.safety_interval_ms, config.safety_max_faults),
            steady: SteadyStateModel::new(),
            sensors,
            telemetry,
            capture,
        }
    }

    /// Replace the injection tuning
    pub fn with_config(mut self, config: InjectionConfig) -> Self {
        self.config = config;
        self.watchdog = SafetyWatchdog::new(config.safety_interval_ms, config.safety_max_faults);
        self
    }

    /// Replace the steady-state tuning
    pub fn with_steady_config(mut self, config: SteadyStateConfig) -> Self {
        self.steady_config = config;
        self
    }

    /// Replace the correction maps
    pub fn with_maps(mut self, maps: CalibrationMaps) -> Self {
        self.maps = maps;
        self
    }

    /// Swap in new correction maps, effective from the next edge
    pub fn set_maps(&mut self, maps: CalibrationMaps) {
        self.maps = maps;
    }

    /// Injector command pin change interrupt
    pub fn on_input_change(&mut self) -> EdgeOutcome {
        let start = self.clock.now_ticks();

        let Some(asserted) = self.sample_command() else {
            return EdgeOutcome::Noise;
        };

        let outcome = match (asserted, self.cycle.phase) {
            (true, TriggerPhase::AwaitingRising) => self.on_rising(start),
            (false, TriggerPhase::AwaitingFalling) => self.on_falling(start),
            _ => EdgeOutcome::Ignored,
        };

        let elapsed = self.clock.now_ticks().wrapping_sub(start);
        let elapsed = u8::try_from(elapsed).unwrap_or(u8::MAX);
        self.telemetry.record_exec_time(asserted, elapsed);
        outcome
    }

    /// Run the edge handler if the command line has already moved past
    /// the edge the engine is waiting for
    ///
    /// Recovers an edge whose interrupt was lost. Returns `None` while the
    /// line still sits at the level of the last handled edge.
    pub fn service_input(&mut self) -> Option<EdgeOutcome> {
        if self.edge_outstanding() {
            Some(self.on_input_change())
        } else {
            None
        }
    }

    /// Command line level differs from the one the current phase expects
    pub fn edge_outstanding(&self) -> bool {
        let asserted = self.input.is_low();
        match self.cycle.phase {
            TriggerPhase::AwaitingRising => asserted,
            TriggerPhase::AwaitingFalling => !asserted,
        }
    }

    /// Command level, `true` when the ECU asserts the injector (line low)
    ///
    /// While cranking the level is decided by majority over rapid
    /// re-samples; `None` means the samples were inconclusive.
    fn sample_command(&self) -> Option<bool> {
        if self.cycle.running {
            return Some(self.input.is_low());
        }

        let high_count = (0..self.config.debounce_samples)
            .filter(|_| self.input.is_high())
            .count();
        if high_count <= usize::from(self.config.debounce_low_max) {
            Some(true)
        } else if high_count >= usize::from(self.config.debounce_high_min) {
            Some(false)
        } else {
            None
        }
    }

    fn on_rising(&mut self, now: u16) -> EdgeOutcome {
        self.output.set_high();

        let period = now.wrapping_sub(self.cycle.last_rising_ticks);
        self.cycle.period_ticks = period;
        self.cycle.base_percentage = interpolate(&RPM_AXIS, &self.maps.rpm, period);
        self.cycle.last_rising_ticks = now;
        self.cycle.combustion_counter = self.cycle.combustion_counter.wrapping_add(1);
        self.cycle.phase = TriggerPhase::AwaitingFalling;

        EdgeOutcome::Started {
            period_ticks: period,
        }
    }

    fn on_falling(&mut self, now: u16) -> EdgeOutcome {
        let raw = now.wrapping_sub(self.cycle.last_rising_ticks);
        self.cycle.pulse_width_ticks = raw;

        let outcome = self.schedule_extension(raw);
        self.cycle.phase = TriggerPhase::AwaitingRising;

        if !matches!(outcome, EdgeOutcome::Extended { .. }) {
            self.output.set_low();
            self.watchdog.confirm_off();
            self.cycle.extension_ticks = 0;
            self.publish_cycle();
        }

        self.arm_capture();
        outcome
    }

    fn schedule_extension(&mut self, raw_width: u16) -> EdgeOutcome {
        let cfg = &self.config;
        if !(cfg.pulse_min_ticks..=cfg.pulse_max_ticks).contains(&raw_width) {
            return EdgeOutcome::PulseRejected;
        }

        let width = raw_width.saturating_sub(cfg.opening_offset_ticks);
        self.cycle.pulse_width_ticks = width;

        let throttle = self.sensors.throttle();
        let percentage = self
            .cycle
            .base_percentage
            .saturating_add(interpolate(&THROTTLE_AXIS, &self.maps.throttle, throttle))
            .min(cfg.max_percentage);

        let ticks = extension_ticks(width, percentage, cfg.extension_timer_shift);
        if !(cfg.extension_min_ticks..=cfg.extension_max_ticks).contains(&ticks)
            || ticks <= cfg.calculation_offset_ticks
        {
            return EdgeOutcome::ExtensionRejected;
        }

        let ticks = ticks - cfg.calculation_offset_ticks;
        self.cycle.extension_ticks = ticks;
        self.timer.schedule(ticks);
        EdgeOutcome::Extended { ticks }
    }

    fn arm_capture(&mut self) {
        if self.capture.is_in_flight() || self.capture.is_filled() {
            return;
        }
        if let Some((decimation, state)) = self.steady.take_request() {
            self.capture.arm(decimation, &state);
        }
    }

    fn publish_cycle(&self) {
        self.telemetry.publish_cycle(&CycleRecord {
            combustion_counter: self.cycle.combustion_counter,
            period_ticks: self.cycle.period_ticks,
            pulse_width_ticks: self.cycle.pulse_width_ticks,
            extension_ticks: self.cycle.extension_ticks,
        });
    }

    /// Extension timer compare interrupt
    ///
    /// Returns `false` for a match with no handler attached.
    pub fn on_extension_elapsed(&mut self) -> bool {
        if !self.timer.is_attached() {
            return false;
        }

        self.timer.stop();
        self.output.set_low();
        self.watchdog.confirm_off();
        self.timer.detach();
        self.publish_cycle();
        true
    }

    /// Copy the latest throttle and lambda readings into telemetry
    pub fn acquire_sensors(&self) -> bool {
        self.telemetry
            .publish_sensors(self.sensors.throttle(), self.sensors.lambda())
    }

    /// Periodic output watchdog
    ///
    /// On [`SafetyStatus::Tripped`] the output is forced off and the
    /// trigger cycle restarts from the next rising edge.
    pub fn safety_check(&mut self, now_ms: u32) -> SafetyStatus {
        let status = self.watchdog.check(now_ms as u16);
        if status == SafetyStatus::Tripped {
            self.output.set_low();
            self.cycle.phase = TriggerPhase::AwaitingRising;
        }
        status
    }

    /// Periodic steady-state evaluation
    ///
    /// Sets the running flag once the engine speed is stable.
    pub fn evaluate_steady_state(&mut self, now_ms: u32) -> SteadyStateDecision {
        let now_ms = now_ms as u16;
        if !self.steady.is_due(&self.steady_config, now_ms) {
            return SteadyStateDecision::NotDue;
        }

        let state = self.telemetry.engine_state();
        let decision = self.steady.evaluate(&self.steady_config, now_ms, state);
        if matches!(
            decision,
            SteadyStateDecision::Steady { .. } | SteadyStateDecision::Unsteady { running: true }
        ) {
            self.cycle.running = true;
        }
        decision
    }

    /// Current cycle state
    pub fn cycle(&self) -> &InjectionCycleState {
        &self.cycle
    }

    /// Output watchdog state
    pub fn watchdog(&self) -> &SafetyWatchdog {
        &self.watchdog
    }

    /// Steady-state model
    pub fn steady_state(&self) -> &SteadyStateModel {
        &self.steady
    }

    /// Active correction maps
    pub fn maps(&self) -> &CalibrationMaps {
        &self.maps
    }

    /// Injection tuning
    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    /// Injector command pin, for waiting on its next edge
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Injector output pin
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Extension timer
    pub fn timer(&self) -> &ExtensionTimer<T> {
        &self.timer
    }
}
