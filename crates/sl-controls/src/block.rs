//! Signal block types and abstractions.
//!
//! A [`SignalBlock`] is the evaluator's view of a signal-domain component:
//! its parsed configuration, its input slots and which of its terminals are
//! outputs. Blocks fall into:
//! - **Sources**: constants and probes (no wired inputs needed)
//! - **Processors**: gains, sums, limiters, controllers and stateful kernels
//! - **Actuators**: PWM generators, whose output is the switching duty cycle

use sl_core::ComponentId;
use sl_netlist::{Component, ComponentKind, Params};
use tracing::warn;

use crate::controller::{Integrator, PIController, PIDController};
use crate::kernel::{HysteresisConfig, RateLimitConfig, SampleHoldConfig, StatefulBlock};
use crate::probe::ProbeKind;

/// Name of the PWM generator's duty-cycle input.
pub const DUTY_TERMINAL: &str = "DUTY";
/// Name of the multiplexer's selector input.
pub const SELECT_TERMINAL: &str = "SEL";

const SINGLE_OUTPUT: &[&str] = &["OUT"];
const DEMUX_OUTPUTS: &[&str] = &[
    "OUT1", "OUT2", "OUT3", "OUT4", "OUT5", "OUT6", "OUT7", "OUT8",
];
const CURRENT_PROBE_OUTPUTS: &[&str] = &["MEAS"];

/// Output terminal names for a block type. Every other terminal is an input.
pub fn output_terminals(kind: &ComponentKind) -> &'static [&'static str] {
    match kind {
        ComponentKind::SignalDemux => DEMUX_OUTPUTS,
        ComponentKind::CurrentProbe => CURRENT_PROBE_OUTPUTS,
        k if k.is_signal() => SINGLE_OUTPUT,
        _ => &[],
    }
}

/// Whether `terminal` is an output of a block of type `kind`.
pub fn is_output(kind: &ComponentKind, terminal: &str) -> bool {
    output_terminals(kind).contains(&terminal)
}

/// Parsed configuration of a signal block.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalBlockKind {
    Constant { value: f64 },
    Gain { gain: f64 },
    /// Signed accumulation; SUM and MATH_BLOCK. Missing signs are `+1`.
    Sum { signs: Vec<f64> },
    Subtractor,
    Limiter { lower: f64, upper: f64 },
    Stateful(StatefulBlock),
    PIController(PIController),
    PIDController(PIDController),
    Integrator(Integrator),
    Differentiator { gain: f64 },
    Pwm { duty: f64 },
    Probe(ProbeKind),
    /// Zero-based default selection; a wired SEL input overrides it.
    Mux { select: usize },
    Demux,
    /// Unrecognised type, evaluated as a passthrough of its first input.
    Passthrough { tag: String },
}

impl SignalBlockKind {
    /// Parse block parameters. Missing or malformed values fall back to defaults.
    pub fn from_component(component: &Component) -> Option<Self> {
        let p = &component.params;
        let id = component.id.as_str();
        let kind = match &component.kind {
            ComponentKind::Constant => Self::Constant {
                value: p.number_or("value", 0.0),
            },
            ComponentKind::Gain => Self::Gain {
                gain: p.number_or("gain", 1.0),
            },
            ComponentKind::Sum | ComponentKind::MathBlock => Self::Sum {
                signs: parse_signs(p),
            },
            ComponentKind::Subtractor => Self::Subtractor,
            ComponentKind::Limiter => {
                let lower = p.number_or("lower", 0.0);
                let upper = p.number_or("upper", 1.0);
                if lower > upper {
                    warn!(block = id, lower, upper, "limiter bounds inverted; swapping");
                    Self::Limiter {
                        lower: upper,
                        upper: lower,
                    }
                } else {
                    Self::Limiter { lower, upper }
                }
            }
            ComponentKind::RateLimiter => {
                Self::Stateful(StatefulBlock::RateLimiter(RateLimitConfig::from_params(p)))
            }
            ComponentKind::Hysteresis => {
                Self::Stateful(StatefulBlock::Hysteresis(HysteresisConfig::from_params(p)))
            }
            ComponentKind::SampleHold => {
                Self::Stateful(StatefulBlock::SampleHold(SampleHoldConfig::from_params(p)))
            }
            ComponentKind::PiController => Self::PIController(PIController::from_params(p, id)),
            ComponentKind::PidController => Self::PIDController(PIDController::from_params(p, id)),
            ComponentKind::Integrator => Self::Integrator(Integrator::from_params(p, id)),
            ComponentKind::Differentiator => Self::Differentiator {
                gain: p.number_or("gain", 1.0),
            },
            ComponentKind::PwmGenerator => Self::Pwm {
                duty: p.number_or("duty", 0.5),
            },
            ComponentKind::VoltageProbe | ComponentKind::CurrentProbe | ComponentKind::PowerProbe => {
                Self::Probe(ProbeKind::from_kind(&component.kind)?)
            }
            ComponentKind::SignalMux => Self::Mux {
                select: p.number_or("select", 0.0).max(0.0) as usize,
            },
            ComponentKind::SignalDemux => Self::Demux,
            ComponentKind::Other(tag) => Self::Passthrough { tag: tag.clone() },
            _ => return None,
        };
        Some(kind)
    }
}

/// Signs from a numeric list (`[1, -1]`) or a text pattern (`"+-"`).
fn parse_signs(params: &Params) -> Vec<f64> {
    let sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };
    if let Some(text) = params.text("signs") {
        return text
            .chars()
            .filter_map(|c| match c {
                '+' => Some(1.0),
                '-' => Some(-1.0),
                _ => None,
            })
            .collect();
    }
    params
        .list("signs")
        .map(|v| v.into_iter().map(sign).collect())
        .unwrap_or_default()
}

/// Signal block represents a processing element in the control graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBlock {
    pub id: ComponentId,
    /// Display name, used in diagnostics.
    pub name: String,
    pub component_kind: ComponentKind,
    /// Block type and configuration.
    pub kind: SignalBlockKind,
    /// Input terminal names, in terminal-index order.
    inputs: Vec<String>,
}

impl SignalBlock {
    /// Build the block for a signal-domain component. Returns `None` for
    /// electrical components.
    pub fn from_component(component: &Component) -> Option<Self> {
        if !component.kind.is_signal() {
            return None;
        }
        let kind = SignalBlockKind::from_component(component)?;
        let mut terminals: Vec<_> = component.terminals().iter().collect();
        terminals.sort_by_key(|t| t.index);
        let inputs = terminals
            .into_iter()
            .filter(|t| !is_output(&component.kind, &t.name))
            .map(|t| t.name.clone())
            .collect();
        Some(Self {
            id: component.id.clone(),
            name: component.name.clone(),
            component_kind: component.kind.clone(),
            kind,
            inputs,
        })
    }

    /// Input terminal names, one slot each.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Slot index of a named input terminal.
    pub fn input_slot(&self, terminal: &str) -> Option<usize> {
        self.inputs.iter().position(|n| n == terminal)
    }

    /// Slot read as the PWM duty input.
    pub fn duty_slot(&self) -> usize {
        self.input_slot(DUTY_TERMINAL).unwrap_or(0)
    }

    pub fn is_probe(&self) -> bool {
        matches!(self.kind, SignalBlockKind::Probe(_))
    }

    pub fn is_pwm(&self) -> bool {
        matches!(self.kind, SignalBlockKind::Pwm { .. })
    }
}
