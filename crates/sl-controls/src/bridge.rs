//! Coupling between the signal domain and a switching circuit solver.
//!
//! The solver drives PWM-controlled switches and asks for a duty cycle at
//! each time it evaluates. [`SolverBridge`] answers those requests by
//! stepping the shared [`BlockEvaluator`] and reading the PWM block's output.
//! Measurements flow the other way through probe injection.
//!
//! Backends differ in what they support. A backend that can call back into
//! the bridge gets one live callback per PWM block. A backend that only
//! accepts fixed duties gets the duties evaluated once at `t = 0`, and the
//! loop runs open.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use sl_core::ComponentId;
use sl_netlist::Schematic;
use tracing::{debug, info, trace, warn};

use crate::error::ControlResult;
use crate::evaluator::{BlockEvaluator, EvaluatorOptions};
use crate::probe::ProbeReading;

/// Duty-cycle query: simulation time in, duty in `[0, 1]` out.
pub type DutyCallback = Box<dyn FnMut(f64) -> f64>;

/// Pushes measured probe values into the evaluator.
pub type ProbeInjector = Box<dyn FnMut(&HashMap<ComponentId, f64>)>;

/// What a switching backend can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    /// The backend can invoke a callback to obtain the duty at each time step.
    pub live_duty_callback: bool,
}

/// Solver-side receiver of PWM duty commands.
pub trait SwitchingBackend {
    fn capabilities(&self) -> BackendCapabilities;

    /// Register a live duty source for a PWM block.
    fn register_duty_callback(&mut self, block: &ComponentId, name: &str, callback: DutyCallback);

    /// Fix the duty of a PWM block for the whole run.
    fn set_static_duty(&mut self, block: &ComponentId, name: &str, duty: f64);
}

/// How a bridge ended up attached to a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMode {
    /// Live callbacks registered for this many PWM blocks.
    Live { blocks: usize },
    /// Static duties written once; feedback has no effect on switching.
    OpenLoop { duties: BTreeMap<ComponentId, f64> },
}

impl BridgeMode {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }
}

/// Exposes the PWM blocks of a schematic to a switching solver.
#[derive(Debug, Clone)]
pub struct SolverBridge {
    evaluator: Rc<RefCell<BlockEvaluator>>,
    pwm_blocks: BTreeMap<ComponentId, String>,
}

impl SolverBridge {
    pub fn build(schematic: &Schematic, options: EvaluatorOptions) -> ControlResult<Self> {
        Ok(Self::from_evaluator(BlockEvaluator::build(schematic, options)?))
    }

    /// Wrap an evaluator. Only PWM blocks whose duty input is wired are exposed.
    pub fn from_evaluator(evaluator: BlockEvaluator) -> Self {
        let graph = evaluator.graph();
        let mut pwm_blocks = BTreeMap::new();
        for edge in graph.edges() {
            let Some(block) = graph.block(edge.to.as_str()) else {
                continue;
            };
            if block.is_pwm() && block.input_slot(&edge.to_terminal) == Some(block.duty_slot()) {
                pwm_blocks.insert(block.id.clone(), block.name.clone());
            }
        }
        debug!(pwm_blocks = pwm_blocks.len(), "solver bridge built");

        Self {
            evaluator: Rc::new(RefCell::new(evaluator)),
            pwm_blocks,
        }
    }

    /// Controlled PWM blocks, id to display name.
    pub fn pwm_blocks(&self) -> &BTreeMap<ComponentId, String> {
        &self.pwm_blocks
    }

    /// Shared handle to the underlying evaluator.
    pub fn evaluator(&self) -> Rc<RefCell<BlockEvaluator>> {
        Rc::clone(&self.evaluator)
    }

    /// Duty callback for an exposed PWM block.
    ///
    /// Each call evaluates every block at the given time. If the evaluator
    /// is already borrowed (a callback re-entered during evaluation), the
    /// block's last duty is returned instead.
    pub fn duty_callback(&self, id: &str) -> Option<DutyCallback> {
        if !self.pwm_blocks.contains_key(id) {
            return None;
        }
        let position = self.evaluator.try_borrow().ok()?.graph().position_of(id)?;
        let evaluator = Rc::clone(&self.evaluator);
        let mut last = evaluator
            .try_borrow()
            .map(|ev| ev.output_at(position))
            .unwrap_or(0.0);
        Some(Box::new(move |t| {
            match evaluator.try_borrow_mut() {
                Ok(mut ev) => {
                    ev.advance(t);
                    last = ev.output_at(position);
                }
                Err(_) => trace!(t, "evaluator busy; returning last duty"),
            }
            last
        }))
    }

    pub fn update_probes(&self, values: &HashMap<ComponentId, f64>) {
        match self.evaluator.try_borrow_mut() {
            Ok(mut ev) => ev.update_probes(values),
            Err(_) => warn!("evaluator busy; probe update dropped"),
        }
    }

    /// Inject typed measurements, converted to SI scalars.
    pub fn update_probe_readings(&self, readings: &[(ComponentId, ProbeReading)]) {
        let values: HashMap<ComponentId, f64> = readings
            .iter()
            .map(|(id, reading)| (id.clone(), reading.si_value()))
            .collect();
        self.update_probes(&values);
    }

    /// Closure for a solver adapter to report measurements with.
    pub fn probe_injector(&self) -> ProbeInjector {
        let bridge = self.clone();
        Box::new(move |values: &HashMap<ComponentId, f64>| {
            bridge.update_probes(values)
        })
    }

    pub fn reset(&self) {
        match self.evaluator.try_borrow_mut() {
            Ok(mut ev) => ev.reset(),
            Err(_) => warn!("evaluator busy; reset skipped"),
        }
    }

    /// Connect the exposed PWM blocks to `backend`.
    ///
    /// Registers live callbacks when the backend supports them; otherwise
    /// writes duties evaluated once at `t = 0`.
    pub fn attach(&self, backend: &mut dyn SwitchingBackend) -> BridgeMode {
        if backend.capabilities().live_duty_callback {
            let mut blocks = 0;
            for (id, name) in &self.pwm_blocks {
                if let Some(callback) = self.duty_callback(id.as_str()) {
                    backend.register_duty_callback(id, name, callback);
                    blocks += 1;
                }
            }
            info!(blocks, "registered live duty callbacks");
            return BridgeMode::Live { blocks };
        }

        let duties: BTreeMap<ComponentId, f64> = match self.evaluator.try_borrow_mut() {
            Ok(mut ev) => {
                ev.advance(0.0);
                self.pwm_blocks
                    .keys()
                    .map(|id| (id.clone(), ev.output(id.as_str()).unwrap_or(0.0)))
                    .collect()
            }
            Err(_) => BTreeMap::new(),
        };
        for (id, name) in &self.pwm_blocks {
            if let Some(&duty) = duties.get(id) {
                backend.set_static_duty(id, name, duty);
            }
        }
        if !self.pwm_blocks.is_empty() {
            warn!(
                blocks = self.pwm_blocks.len(),
                "backend has no duty callback; duties fixed at t = 0 and closed-loop control is disabled"
            );
        }
        BridgeMode::OpenLoop { duties }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_netlist::{Component, ComponentKind, Params};

    fn duty_loop(duty: f64) -> Schematic {
        let mut s = Schematic::new();
        s.add_component(
            Component::new("K", ComponentKind::Constant).with_params(Params::new().with("value", duty)),
        )
        .unwrap();
        s.add_component(Component::new("PWM1", ComponentKind::PwmGenerator).at((200.0, 0.0)))
            .unwrap();
        s.add_component(Component::new("PWM2", ComponentKind::PwmGenerator).at((400.0, 0.0)))
            .unwrap();
        s.connect(("K", "OUT"), ("PWM1", "DUTY")).unwrap();
        s
    }

    #[test]
    fn only_wired_pwm_blocks_are_exposed() {
        let bridge = SolverBridge::build(&duty_loop(0.3), EvaluatorOptions::default()).unwrap();
        let ids: Vec<&str> = bridge.pwm_blocks().keys().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["PWM1"]);
        assert!(bridge.duty_callback("PWM2").is_none());
    }

    #[test]
    fn callback_is_idempotent_for_fixed_time() {
        let bridge = SolverBridge::build(&duty_loop(0.3), EvaluatorOptions::default()).unwrap();
        let mut cb = bridge.duty_callback("PWM1").unwrap();
        let a = cb(1e-4);
        let b = cb(1e-4);
        assert_eq!(a, 0.3);
        assert_eq!(a, b);
    }

    #[test]
    fn busy_evaluator_returns_last_duty() {
        let bridge = SolverBridge::build(&duty_loop(0.3), EvaluatorOptions::default()).unwrap();
        let mut cb = bridge.duty_callback("PWM1").unwrap();
        assert_eq!(cb(0.0), 0.3);
        let handle = bridge.evaluator();
        let _guard = handle.borrow_mut();
        assert_eq!(cb(1.0), 0.3);
    }
}
