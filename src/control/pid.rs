//! PID controller for heater duty
//!
//! Discrete-time proportional-integral-derivative controller producing a
//! heater duty in percent.
//!
//! - **Conditional integration**: the integrator is frozen whenever the
//!   unclamped output is already saturated in the direction the error
//!   would push it.  Long ramps with the heater pinned at 100 % therefore
//!   do not wind the integrator up and overshoot the next phase.
//! - **Derivative on measurement**: setpoint steps at phase boundaries do
//!   not kick the output; the derivative is low-pass filtered because
//!   thermocouple noise is large relative to the oven's time constant.
//! - **Slew limiting** (optional): bounds the output change per second
//!   using the previous output.

use crate::config::PidGains;

/// Integrator, derivative and output history.  Cleared by [`PidController::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    pub integral: f32,
    /// Previous measurement, `None` until the first update after reset.
    pub prev_measured: Option<f32>,
    /// Filtered d(measured)/dt in °C/s.
    pub filtered_derivative: f32,
    /// Output of the previous update (percent).
    pub prev_output: f32,
}

/// PID controller
pub struct PidController {
    gains: PidGains,
    state: ControllerState,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            state: ControllerState::default(),
        }
    }

    /// Replace gains (per-profile tuning).  Controller state is kept; call
    /// [`reset`](Self::reset) too when starting a new run.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Compute the actuator command for one control period.
    ///
    /// The result is always within the configured output bounds (and hence
    /// within `[0, 100]`).  Non-finite inputs yield the lower bound and
    /// leave the controller state untouched.
    pub fn update(&mut self, setpoint: f32, measured: f32, dt: f32) -> f32 {
        let g = self.gains;
        if !(setpoint.is_finite() && measured.is_finite() && dt.is_finite()) || dt <= 0.0 {
            return g.output_min;
        }

        let error = setpoint - measured;

        // Derivative of the measurement, single-pole low-pass.
        let raw_derivative = match self.state.prev_measured {
            Some(prev) => (measured - prev) / dt,
            None => 0.0,
        };
        let alpha = dt / (g.derivative_filter_secs + dt);
        let filtered = self.state.filtered_derivative
            + alpha * (raw_derivative - self.state.filtered_derivative);

        let p = g.kp * error;
        let d = g.kd * filtered;

        // Conditional integration: skip when already saturated the same way.
        let unclamped = p + g.ki * self.state.integral - d;
        let pushing_high = unclamped >= g.output_max && error > 0.0;
        let pushing_low = unclamped <= g.output_min && error < 0.0;
        let mut integral = self.state.integral;
        if !(pushing_high || pushing_low) {
            integral += error * dt;
        }

        let mut output = p + g.ki * integral - d;
        if let Some(slew) = g.max_slew_per_sec {
            let step = slew * dt;
            output = output.clamp(self.state.prev_output - step, self.state.prev_output + step);
        }
        let mut output = output.clamp(g.output_min, g.output_max);
        if !output.is_finite() {
            // Overflowed gains; fall back to the safe bound without
            // committing a poisoned integrator.
            output = g.output_min;
            integral = self.state.integral;
        }

        self.state = ControllerState {
            integral,
            prev_measured: Some(measured),
            filtered_derivative: if filtered.is_finite() { filtered } else { 0.0 },
            prev_output: output,
        };
        output
    }

    /// Clear integrator and derivative history.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }
}
