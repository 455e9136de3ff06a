//! Stateful block kernels and the pluggable kernel provider.
//!
//! Rate limiters, hysteresis comparators and sample-and-hold blocks keep
//! private state between evaluations. Each is driven through the
//! [`StatefulKernel`] trait. A [`KernelProvider`] may supply an alternative
//! (for example, accelerated) implementation per block type; when it declines,
//! the built-in kernel is used. The choice is made once, when the evaluator is
//! built, and both implementations must produce the same outputs.

use core::fmt;

use sl_netlist::Params;
use tracing::debug;

use crate::sampled::{LastTime, SampleClock};

/// Single-input, single-output block with private state.
pub trait StatefulKernel: fmt::Debug {
    /// Evaluate at time `t`. Calling twice with the same `t` and input must
    /// return the same value.
    fn evaluate(&mut self, input: f64, t: f64) -> f64;

    /// Return to the freshly constructed state.
    fn reset(&mut self);
}

/// Source of alternative kernel implementations.
pub trait KernelProvider: fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return a kernel for `block`, or `None` to fall back to the built-in one.
    fn kernel_for(&self, block: &StatefulBlock) -> Option<Box<dyn StatefulKernel>>;
}

/// Configuration of a block that is evaluated through a kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum StatefulBlock {
    RateLimiter(RateLimitConfig),
    Hysteresis(HysteresisConfig),
    SampleHold(SampleHoldConfig),
}

impl StatefulBlock {
    pub fn builtin_kernel(&self) -> Box<dyn StatefulKernel> {
        match self {
            Self::RateLimiter(config) => Box::new(RateLimiterKernel::new(config.clone())),
            Self::Hysteresis(config) => Box::new(HysteresisKernel::new(config.clone())),
            Self::SampleHold(config) => Box::new(SampleHoldKernel::new(config.clone())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RateLimiter(_) => "RATE_LIMITER",
            Self::Hysteresis(_) => "HYSTERESIS",
            Self::SampleHold(_) => "SAMPLE_HOLD",
        }
    }
}

/// Pick the provider's kernel if it offers one, otherwise the built-in.
pub fn select_kernel(
    block: &StatefulBlock,
    provider: Option<&dyn KernelProvider>,
) -> Box<dyn StatefulKernel> {
    if let Some(provider) = provider {
        if let Some(kernel) = provider.kernel_for(block) {
            debug!(
                provider = provider.name(),
                block_type = block.type_name(),
                "using provided kernel"
            );
            return kernel;
        }
    }
    block.builtin_kernel()
}

/// Slew limits in units per second. Both are magnitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub rising_rate: f64,
    pub falling_rate: f64,
}

impl RateLimitConfig {
    pub fn from_params(params: &Params) -> Self {
        Self {
            rising_rate: params.number_or("rising_rate", f64::INFINITY).abs(),
            falling_rate: params.number_or("falling_rate", f64::INFINITY).abs(),
        }
    }
}

/// Largest change allowed over `dt` at `rate`. Avoids `inf * 0`.
fn slew_limit(rate: f64, dt: f64) -> f64 {
    if rate.is_infinite() {
        f64::INFINITY
    } else {
        rate * dt
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterKernel {
    config: RateLimitConfig,
    last_time: LastTime,
    output: f64,
}

impl RateLimiterKernel {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_time: LastTime::Uninitialized,
            output: 0.0,
        }
    }
}

impl StatefulKernel for RateLimiterKernel {
    fn evaluate(&mut self, input: f64, t: f64) -> f64 {
        if self.last_time.is_uninitialized() {
            self.output = input;
        } else {
            let dt = self.last_time.dt_to(t);
            let up = slew_limit(self.config.rising_rate, dt);
            let down = slew_limit(self.config.falling_rate, dt);
            let delta = (input - self.output).max(-down).min(up);
            self.output += delta;
        }
        self.last_time = self.last_time.advance(t);
        self.output
    }

    fn reset(&mut self) {
        self.last_time = LastTime::Uninitialized;
        self.output = 0.0;
    }
}

/// Two-threshold comparator.
#[derive(Debug, Clone, PartialEq)]
pub struct HysteresisConfig {
    pub upper: f64,
    pub lower: f64,
    /// Output while switched on.
    pub high: f64,
    /// Output while switched off.
    pub low: f64,
}

impl HysteresisConfig {
    pub fn from_params(params: &Params) -> Self {
        let upper = params.number_or("upper", 0.5);
        let lower = params.number_or("lower", -0.5);
        Self {
            upper: upper.max(lower),
            lower: lower.min(upper),
            high: params.number_or("high", 1.0),
            low: params.number_or("low", 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HysteresisKernel {
    config: HysteresisConfig,
    on: bool,
}

impl HysteresisKernel {
    pub fn new(config: HysteresisConfig) -> Self {
        Self { config, on: false }
    }
}

impl StatefulKernel for HysteresisKernel {
    fn evaluate(&mut self, input: f64, _t: f64) -> f64 {
        if input >= self.config.upper {
            self.on = true;
        } else if input <= self.config.lower {
            self.on = false;
        }
        if self.on {
            self.config.high
        } else {
            self.config.low
        }
    }

    fn reset(&mut self) {
        self.on = false;
    }
}

/// Sample period in seconds; zero samples on every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleHoldConfig {
    pub period: f64,
}

impl SampleHoldConfig {
    pub fn from_params(params: &Params) -> Self {
        Self {
            period: params.number_or("period", 0.0).max(0.0),
        }
    }
}

/// Zero-order hold driven by a [`SampleClock`].
#[derive(Debug, Clone)]
pub struct SampleHoldKernel {
    clock: SampleClock,
    held: f64,
}

impl SampleHoldKernel {
    pub fn new(config: SampleHoldConfig) -> Self {
        Self {
            clock: SampleClock::new(config.period),
            held: 0.0,
        }
    }
}

impl StatefulKernel for SampleHoldKernel {
    fn evaluate(&mut self, input: f64, t: f64) -> f64 {
        if self.clock.tick(t) {
            self.held = input;
        }
        self.held
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.held = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_follows_first_input() {
        let mut k = RateLimiterKernel::new(RateLimitConfig {
            rising_rate: 1.0,
            falling_rate: 1.0,
        });
        assert_eq!(k.evaluate(5.0, 0.0), 5.0);
    }

    #[test]
    fn rate_limiter_clamps_slew() {
        let mut k = RateLimiterKernel::new(RateLimitConfig {
            rising_rate: 10.0,
            falling_rate: 2.0,
        });
        k.evaluate(0.0, 0.0);
        assert!((k.evaluate(100.0, 0.1) - 1.0).abs() < 1e-12);
        assert!((k.evaluate(-100.0, 0.2) - 0.8).abs() < 1e-12);
        // dt = 0 holds.
        assert!((k.evaluate(-100.0, 0.2) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn unlimited_rate_passes_through() {
        let mut k = RateLimiterKernel::new(RateLimitConfig::from_params(&Params::new()));
        k.evaluate(0.0, 0.0);
        assert_eq!(k.evaluate(42.0, 0.0), 42.0);
    }

    #[test]
    fn hysteresis_latches_between_thresholds() {
        let mut k = HysteresisKernel::new(HysteresisConfig::from_params(&Params::new()));
        assert_eq!(k.evaluate(0.0, 0.0), 0.0);
        assert_eq!(k.evaluate(0.6, 0.1), 1.0);
        assert_eq!(k.evaluate(0.0, 0.2), 1.0);
        assert_eq!(k.evaluate(-0.6, 0.3), 0.0);
        assert_eq!(k.evaluate(0.4, 0.4), 0.0);
    }

    #[test]
    fn sample_hold_holds_between_samples() {
        let mut k = SampleHoldKernel::new(SampleHoldConfig { period: 1.0 });
        assert_eq!(k.evaluate(3.0, 0.0), 3.0);
        assert_eq!(k.evaluate(7.0, 0.5), 3.0);
        assert_eq!(k.evaluate(7.0, 1.0), 7.0);
        k.reset();
        assert_eq!(k.evaluate(9.0, 1.2), 9.0);
    }

    #[derive(Debug)]
    struct OnlyHysteresis;

    impl KernelProvider for OnlyHysteresis {
        fn name(&self) -> &str {
            "only-hysteresis"
        }

        fn kernel_for(&self, block: &StatefulBlock) -> Option<Box<dyn StatefulKernel>> {
            match block {
                StatefulBlock::Hysteresis(c) => Some(Box::new(HysteresisKernel::new(c.clone()))),
                _ => None,
            }
        }
    }

    #[test]
    fn provider_fallback_matches_builtin() {
        let block = StatefulBlock::SampleHold(SampleHoldConfig { period: 0.0 });
        let mut provided = select_kernel(&block, Some(&OnlyHysteresis));
        let mut builtin = block.builtin_kernel();
        for (i, u) in [1.0, -2.0, 3.5].into_iter().enumerate() {
            let t = i as f64;
            assert_eq!(provided.evaluate(u, t), builtin.evaluate(u, t));
        }
    }
}
