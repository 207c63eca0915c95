//! Steady-state detection
//!
//! Compares the current operating point with the one seen at the previous
//! evaluation. A steady point requests a lambda capture; the request is
//! picked up by the next injection cycle.

use injex_protocol::lambda::EngineState;

use crate::config::SteadyStateConfig;

/// Result of a steady-state evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SteadyStateDecision {
    /// Interval not elapsed, nothing evaluated
    NotDue,
    /// Operating point not steady
    Unsteady {
        /// Engine speed is stable enough to leave cranking
        running: bool,
    },
    /// Steady operating point, capture requested
    Steady {
        /// Lambda decimation requested
        decimation: u8,
    },
}

/// Previous operating point and pending capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SteadyStateModel {
    prev_combustion_counter: u16,
    prev_period_ticks: u16,
    prev_throttle: u16,
    last_eval_ms: u16,
    request: Option<(u8, EngineState)>,
}

impl SteadyStateModel {
    /// Create a model with no history
    pub const fn new() -> Self {
        Self {
            // Differs from any counter value seen on the first evaluation
            prev_combustion_counter: 0xFFFF,
            prev_period_ticks: 0,
            prev_throttle: 0,
            last_eval_ms: 0,
            request: None,
        }
    }

    /// Check if the evaluation interval has elapsed
    pub fn is_due(&self, config: &SteadyStateConfig, now_ms: u16) -> bool {
        now_ms.wrapping_sub(self.last_eval_ms) >= config.interval_ms
    }

    /// Evaluate the operating point if the interval has elapsed
    ///
    /// The current point always becomes the reference for the next
    /// evaluation. An unsteady result withdraws any pending request.
    pub fn evaluate(
        &mut self,
        config: &SteadyStateConfig,
        now_ms: u16,
        state: EngineState,
    ) -> SteadyStateDecision {
        if !self.is_due(config, now_ms) {
            return SteadyStateDecision::NotDue;
        }
        self.last_eval_ms = now_ms;

        let mut running = false;
        let mut steady = false;

        let period = state.period_ticks;
        let throttle = state.throttle;
        if state.combustion_counter != self.prev_combustion_counter
            && (config.period_min_ticks..=config.period_max_ticks).contains(&period)
            && (config.throttle_min..=config.throttle_max).contains(&throttle)
        {
            let drift = self.prev_period_ticks >> config.period_drift_shift;
            let period_low = self.prev_period_ticks.saturating_sub(drift);
            let period_high = self.prev_period_ticks.saturating_add(drift);
            if (period_low..=period_high).contains(&period) {
                let throttle_low = self.prev_throttle.saturating_sub(config.throttle_delta_max);
                let throttle_high = self.prev_throttle.saturating_add(config.throttle_delta_max);
                steady = (throttle_low..=throttle_high).contains(&throttle);
                running = true;
            }
        }

        self.prev_combustion_counter = state.combustion_counter;
        self.prev_period_ticks = period;
        self.prev_throttle = throttle;

        if steady {
            let decimation = config.decimation_for(period);
            self.request = Some((decimation, state));
            SteadyStateDecision::Steady { decimation }
        } else {
            self.request = None;
            SteadyStateDecision::Unsteady { running }
        }
    }

    /// Take the pending capture request
    pub fn take_request(&mut self) -> Option<(u8, EngineState)> {
        self.request.take()
    }

    /// Check if a capture request is pending
    pub fn has_request(&self) -> bool {
        self.request.is_some()
    }
}

impl Default for SteadyStateModel {
    fn default() -> Self {
        Self::new()
    }
}
