//! Injection cycle state

/// Which command edge the engine is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerPhase {
    /// Waiting for the command to assert (injector opens)
    #[default]
    AwaitingRising,
    /// Waiting for the command to release (extension starts)
    AwaitingFalling,
}

/// State carried from one injector edge to the next
///
/// Written by the edge interrupt; the running flag is written by the
/// steady-state evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InjectionCycleState {
    /// Edge expected next
    pub phase: TriggerPhase,
    /// Tick of the last accepted rising edge
    pub last_rising_ticks: u16,
    /// Ticks between the last two rising edges
    pub period_ticks: u16,
    /// Last pulse width, opening offset removed
    pub pulse_width_ticks: u16,
    /// RPM map correction computed on the rising edge
    pub base_percentage: u16,
    /// Last programmed extension in timer ticks (0 when skipped)
    pub extension_ticks: u16,
    /// Rising edges seen since boot (wrapping)
    pub combustion_counter: u16,
    /// Engine out of cranking, raw input trusted without debouncing
    pub running: bool,
}
