//! Controller block implementations.
//!
//! Provides the integrating blocks of the signal domain:
//! - **PI (Proportional-Integral)**: `kp·e + ∫ki·e dt`
//! - **PID (Proportional-Integral-Derivative)**: PI plus `kd·Δe/Δt`
//! - **Integrator**: `initial + ∫gain·u dt`
//!
//! All three clamp their output to `[out_min, out_max]`. The integral itself
//! is not clamped. Updates are pure: they take the previous state and return
//! the next one together with the output.

use sl_core::{clamp_bounds, ensure_finite};
use sl_netlist::Params;
use tracing::warn;

use crate::error::{ControlError, ControlResult};
use crate::sampled::LastTime;

/// Integral and timing state shared by PI, PID and integrator blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntegralState {
    /// Integral accumulator.
    pub integral: f64,
    pub last_time: LastTime,
    /// Error (or input) seen at the last evaluation.
    pub last_error: f64,
    /// Derivative term from the last evaluation with `dt > 0`.
    pub derivative: f64,
}

impl IntegralState {
    pub fn with_integral(integral: f64) -> Self {
        Self {
            integral,
            ..Self::default()
        }
    }
}

/// Output bounds read from `out_min` / `out_max`. Inverted bounds are swapped.
fn bounds_from_params(params: &Params, id: &str) -> (f64, f64) {
    let out_min = params.number_or("out_min", f64::NEG_INFINITY);
    let out_max = params.number_or("out_max", f64::INFINITY);
    if out_min > out_max {
        warn!(block = id, out_min, out_max, "output bounds inverted; swapping");
        (out_max, out_min)
    } else {
        (out_min, out_max)
    }
}

fn check_bounds(out_min: f64, out_max: f64) -> ControlResult<()> {
    if out_min.is_nan() || out_max.is_nan() {
        return Err(ControlError::InvalidArg {
            what: "output bounds must not be NaN",
        });
    }
    if out_min > out_max {
        return Err(ControlError::InvalidArg {
            what: "out_min must not exceed out_max",
        });
    }
    Ok(())
}

/// PI controller configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PIController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (1/s).
    pub ki: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
}

impl PIController {
    /// Create a new PI controller.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain
    /// * `ki` - Integral gain
    /// * `out_min` - Minimum output
    /// * `out_max` - Maximum output
    pub fn new(kp: f64, ki: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        ensure_finite(kp, "kp")?;
        ensure_finite(ki, "ki")?;
        check_bounds(out_min, out_max)?;
        Ok(Self {
            kp,
            ki,
            out_min,
            out_max,
        })
    }

    /// Read `kp`, `ki`, `out_min`, `out_max` from block parameters.
    pub fn from_params(params: &Params, id: &str) -> Self {
        let (out_min, out_max) = bounds_from_params(params, id);
        Self {
            kp: params.number_or("kp", 1.0),
            ki: params.number_or("ki", 0.0),
            out_min,
            out_max,
        }
    }

    /// Compute controller output for `error` at time `t`.
    ///
    /// Returns the updated state and the clamped output.
    pub fn update(&self, state: &IntegralState, error: f64, t: f64) -> (IntegralState, f64) {
        let dt = state.last_time.dt_to(t);
        let integral = state.integral + self.ki * error * dt;
        let output = clamp_bounds(self.kp * error + integral, self.out_min, self.out_max);

        let new_state = IntegralState {
            integral,
            last_time: state.last_time.advance(t),
            last_error: error,
            derivative: 0.0,
        };
        (new_state, output)
    }
}

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PIDController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (1/s).
    pub ki: f64,
    /// Derivative gain (s).
    pub kd: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
}

impl PIDController {
    pub fn new(kp: f64, ki: f64, kd: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        ensure_finite(kp, "kp")?;
        ensure_finite(ki, "ki")?;
        ensure_finite(kd, "kd")?;
        check_bounds(out_min, out_max)?;
        Ok(Self {
            kp,
            ki,
            kd,
            out_min,
            out_max,
        })
    }

    pub fn from_params(params: &Params, id: &str) -> Self {
        let (out_min, out_max) = bounds_from_params(params, id);
        Self {
            kp: params.number_or("kp", 1.0),
            ki: params.number_or("ki", 0.0),
            kd: params.number_or("kd", 0.0),
            out_min,
            out_max,
        }
    }

    /// Compute controller output.
    ///
    /// The derivative term is zero on the first evaluation and is held from
    /// the previous evaluation when `dt = 0`.
    pub fn update(&self, state: &IntegralState, error: f64, t: f64) -> (IntegralState, f64) {
        let dt = state.last_time.dt_to(t);
        let integral = state.integral + self.ki * error * dt;
        let derivative = if dt > 0.0 {
            self.kd * (error - state.last_error) / dt
        } else {
            state.derivative
        };

        let raw = self.kp * error + integral + derivative;
        let output = clamp_bounds(raw, self.out_min, self.out_max);

        let new_state = IntegralState {
            integral,
            last_time: state.last_time.advance(t),
            last_error: error,
            derivative,
        };
        (new_state, output)
    }
}

/// Pure integrator with an initial value and output bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrator {
    pub gain: f64,
    /// Integral value after construction or reset.
    pub initial: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl Integrator {
    pub fn from_params(params: &Params, id: &str) -> Self {
        let (out_min, out_max) = bounds_from_params(params, id);
        Self {
            gain: params.number_or("gain", 1.0),
            initial: params.number_or("initial", 0.0),
            out_min,
            out_max,
        }
    }

    pub fn initial_state(&self) -> IntegralState {
        IntegralState::with_integral(self.initial)
    }

    pub fn update(&self, state: &IntegralState, input: f64, t: f64) -> (IntegralState, f64) {
        let dt = state.last_time.dt_to(t);
        let integral = state.integral + self.gain * input * dt;
        let output = clamp_bounds(integral, self.out_min, self.out_max);

        let new_state = IntegralState {
            integral,
            last_time: state.last_time.advance(t),
            last_error: input,
            derivative: 0.0,
        };
        (new_state, output)
    }
}
