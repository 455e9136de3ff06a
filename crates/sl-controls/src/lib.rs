//! Signal-domain control blocks for sigloop.
//!
//! This crate evaluates the control side of a co-simulated schematic. Signal
//! blocks (constants, gains, sums, limiters, controllers, PWM generators,
//! probes) are wired together on the same canvas as the electrical circuit;
//! their wires become a directed dataflow graph that is evaluated once per
//! solver time step.
//!
//! # Architecture
//!
//! - [`SignalGraph`] extracts blocks and directed edges from a schematic and
//!   computes a topological order, reporting algebraic loops by name
//! - [`BlockEvaluator`] owns per-block state and evaluates the graph at a time `t`
//! - [`SolverBridge`] hands PWM duties to a [`SwitchingBackend`] and accepts
//!   probe measurements back, closing the loop
//!
//! # Example
//!
//! ```
//! use sl_controls::{BlockEvaluator, EvaluatorOptions};
//! use sl_netlist::{Component, ComponentKind, Params, Schematic};
//!
//! let mut schematic = Schematic::new();
//! schematic
//!     .add_component(
//!         Component::new("K1", ComponentKind::Constant)
//!             .with_params(Params::new().with("value", 0.4)),
//!     )
//!     .unwrap();
//! schematic
//!     .add_component(Component::new("PWM1", ComponentKind::PwmGenerator).at((200.0, 0.0)))
//!     .unwrap();
//! schematic.connect(("K1", "OUT"), ("PWM1", "DUTY")).unwrap();
//!
//! let mut evaluator = BlockEvaluator::build(&schematic, EvaluatorOptions::default()).unwrap();
//! evaluator.advance(0.0);
//! assert_eq!(evaluator.output("PWM1"), Some(0.4));
//! ```

pub mod block;
pub mod bridge;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod kernel;
pub mod probe;
pub mod sampled;

pub use block::{
    DUTY_TERMINAL, SELECT_TERMINAL, SignalBlock, SignalBlockKind, is_output, output_terminals,
};
pub use bridge::{
    BackendCapabilities, BridgeMode, DutyCallback, ProbeInjector, SolverBridge, SwitchingBackend,
};
pub use controller::{IntegralState, Integrator, PIController, PIDController};
pub use error::{ControlError, ControlResult, CycleError, CycleMember};
pub use evaluator::{BlockEvaluator, EvaluatorOptions};
pub use graph::{SignalEdge, SignalGraph};
pub use kernel::{
    HysteresisConfig, HysteresisKernel, KernelProvider, RateLimitConfig, RateLimiterKernel,
    SampleHoldConfig, SampleHoldKernel, StatefulBlock, StatefulKernel, select_kernel,
};
pub use probe::{ProbeKind, ProbeReading};
pub use sampled::{LastTime, SampleClock};
