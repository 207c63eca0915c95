//! Simulated hardware shared by the integration tests
//!
//! Every handle is a cheap clone over shared state so the test can keep a
//! copy while the engine under test owns another.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use injex_core::acquisition::{LambdaCapture, MeasurementTable, SensorReader};
use injex_core::config::AdcConfig;
use injex_core::injection::{InjectionEngine, TelemetryBuffer};
use injex_hal::adc::AdcPeripheral;
use injex_hal::gpio::{EdgeInterrupt, InputPin, OutputPin};
use injex_hal::timer::{CompareTimer, TickClock};

/// A wire, readable and drivable from both ends
#[derive(Clone)]
pub struct SimLine(Rc<Cell<bool>>);

impl SimLine {
    pub fn new(level: bool) -> Self {
        Self(Rc::new(Cell::new(level)))
    }

    pub fn get(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, level: bool) {
        self.0.set(level);
    }
}

/// Input pin reading a wire
#[derive(Clone)]
pub struct SimInput(pub SimLine);

impl InputPin for SimInput {
    fn is_high(&self) -> bool {
        self.0.get()
    }
}

/// Output pin driving a wire
#[derive(Clone)]
pub struct SimOutput(pub SimLine);

impl OutputPin for SimOutput {
    fn set_high(&mut self) {
        self.0.set(true);
    }

    fn set_low(&mut self) {
        self.0.set(false);
    }

    fn is_set_high(&self) -> bool {
        self.0.get()
    }
}

/// Free-running tick counter set by the test
#[derive(Clone, Default)]
pub struct SimClock(Rc<Cell<u16>>);

impl SimClock {
    pub fn set(&self, ticks: u16) {
        self.0.set(ticks);
    }

    pub fn advance(&self, ticks: u16) {
        self.0.set(self.0.get().wrapping_add(ticks));
    }
}

impl TickClock for SimClock {
    fn now_ticks(&self) -> u16 {
        self.0.get()
    }
}

#[derive(Debug, Default)]
pub struct TimerState {
    pub period: u16,
    pub counter: u16,
    pub running: bool,
    pub irq: bool,
}

/// Count-up compare timer, one count per [`SimTimer::tick`]
#[derive(Clone, Default)]
pub struct SimTimer(pub Rc<RefCell<TimerState>>);

impl SimTimer {
    /// Advance one timer tick; `true` when the compare interrupt fires
    pub fn tick(&self) -> bool {
        let mut state = self.0.borrow_mut();
        if !state.running {
            return false;
        }
        state.counter = state.counter.wrapping_add(1);
        if state.counter >= state.period {
            state.counter = 0;
            return state.irq;
        }
        false
    }

    pub fn is_running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn period(&self) -> u16 {
        self.0.borrow().period
    }
}

impl CompareTimer for SimTimer {
    fn set_period(&mut self, ticks: u16) {
        self.0.borrow_mut().period = ticks;
    }

    fn start(&mut self) {
        self.0.borrow_mut().running = true;
    }

    fn stop(&mut self) {
        self.0.borrow_mut().running = false;
    }

    fn reset(&mut self) {
        self.0.borrow_mut().counter = 0;
    }

    fn read(&self) -> u16 {
        self.0.borrow().counter
    }

    fn enable_interrupt(&mut self) {
        self.0.borrow_mut().irq = true;
    }

    fn disable_interrupt(&mut self) {
        self.0.borrow_mut().irq = false;
    }
}

#[derive(Debug, Default)]
pub struct EdgeState {
    pub enabled: bool,
    pub pending: bool,
}

/// Falling-edge interrupt with a pending latch, like a real edge detector
#[derive(Clone, Default)]
pub struct SimEdge(pub Rc<RefCell<EdgeState>>);

impl SimEdge {
    /// Latch an edge seen on the pin
    pub fn latch(&self) {
        self.0.borrow_mut().pending = true;
    }

    /// Deliver a latched edge if the interrupt is unmasked
    pub fn take(&self) -> bool {
        let mut state = self.0.borrow_mut();
        if state.enabled && state.pending {
            state.pending = false;
            return true;
        }
        false
    }
}

impl EdgeInterrupt for SimEdge {
    fn enable(&mut self) {
        self.0.borrow_mut().enabled = true;
    }

    fn disable(&mut self) {
        self.0.borrow_mut().enabled = false;
    }

    fn clear_pending(&mut self) {
        self.0.borrow_mut().pending = false;
    }

    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
}

#[derive(Debug, Default)]
pub struct AdcState {
    pub values: [u16; 16],
    pub selected: u8,
    /// Channels started with the completion interrupt enabled
    pub sequence: Vec<u8>,
    pub busy_polls: u8,
    pub enabled: bool,
}

/// Converter returning a preset value per channel
#[derive(Clone, Default)]
pub struct SimAdc(pub Rc<RefCell<AdcState>>);

impl SimAdc {
    pub fn set_value(&self, channel: u8, value: u16) {
        self.0.borrow_mut().values[usize::from(channel)] = value;
    }

    pub fn sequence(&self) -> Vec<u8> {
        self.0.borrow().sequence.clone()
    }
}

impl AdcPeripheral for SimAdc {
    fn select_channel(&mut self, channel: u8) {
        self.0.borrow_mut().selected = channel;
    }

    fn start_conversion(&mut self, interrupt: bool) {
        let mut state = self.0.borrow_mut();
        state.enabled = true;
        state.busy_polls = 3;
        if interrupt {
            let channel = state.selected;
            state.sequence.push(channel);
        }
    }

    fn is_busy(&self) -> bool {
        let mut state = self.0.borrow_mut();
        if state.busy_polls == 0 {
            return false;
        }
        state.busy_polls -= 1;
        true
    }

    fn read_result(&mut self) -> u16 {
        let state = self.0.borrow();
        state.values[usize::from(state.selected)]
    }

    fn disable(&mut self) {
        self.0.borrow_mut().enabled = false;
    }
}

/// State that lives in statics on the target
pub struct Shared {
    pub adc_config: AdcConfig,
    pub table: MeasurementTable,
    pub telemetry: TelemetryBuffer,
    pub capture: LambdaCapture,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            adc_config: AdcConfig::default(),
            table: MeasurementTable::new(),
            telemetry: TelemetryBuffer::new(),
            capture: LambdaCapture::new(),
        }
    }

    pub fn set_throttle(&self, value: u16) {
        self.table.publish(self.adc_config.throttle_slot, value);
    }
}

pub type SimEngine<'a> = InjectionEngine<'a, SimInput, SimOutput, SimTimer, SimClock>;

/// Injector command input, injector output, clock and extension timer
pub struct InjectorHw {
    /// ECU command, low while the injector is commanded open
    pub command: SimLine,
    /// Injector driver, high while energized
    pub output: SimLine,
    pub clock: SimClock,
    pub timer: SimTimer,
}

impl InjectorHw {
    pub fn new() -> Self {
        Self {
            command: SimLine::new(true),
            output: SimLine::new(false),
            clock: SimClock::default(),
            timer: SimTimer::default(),
        }
    }

    pub fn engine<'a>(&self, shared: &'a Shared) -> SimEngine<'a> {
        InjectionEngine::new(
            SimInput(self.command.clone()),
            SimOutput(self.output.clone()),
            self.timer.clone(),
            self.clock.clone(),
            SensorReader::new(&shared.table, &shared.adc_config),
            &shared.telemetry,
            &shared.capture,
        )
    }
}
