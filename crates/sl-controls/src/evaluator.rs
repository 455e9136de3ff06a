//! Stateful block evaluation.
//!
//! [`BlockEvaluator`] owns the signal graph, a fixed evaluation order and the
//! per-block state. Each [`advance`](BlockEvaluator::advance) evaluates every
//! block once, in order, reading inputs from the outputs already computed in
//! the same pass.
//!
//! Input handling:
//! - One slot per input terminal, in terminal-index order
//! - An unconnected slot reads 0 (PWM falls back to its `duty` parameter)
//! - Several edges into one terminal are summed

use std::collections::HashMap;
use std::rc::Rc;

use sl_core::{ComponentId, clamp_bounds};
use sl_netlist::Schematic;
use tracing::{debug, trace, warn};

use crate::block::{SELECT_TERMINAL, SignalBlock, SignalBlockKind};
use crate::controller::IntegralState;
use crate::error::ControlResult;
use crate::graph::{SignalEdge, SignalGraph};
use crate::kernel::{KernelProvider, StatefulKernel, select_kernel};
use crate::sampled::LastTime;

/// Build-time options for a [`BlockEvaluator`].
#[derive(Debug, Clone, Default)]
pub struct EvaluatorOptions {
    /// Alternative implementations for stateful kernels.
    pub kernels: Option<Rc<dyn KernelProvider>>,
}

impl EvaluatorOptions {
    pub fn with_kernels(provider: Rc<dyn KernelProvider>) -> Self {
        Self {
            kernels: Some(provider),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InputLink {
    slot: usize,
    source: usize,
}

#[derive(Debug)]
enum BlockState {
    Stateless,
    Integral(IntegralState),
    Differentiator {
        last_time: LastTime,
        last_input: f64,
        output: f64,
    },
    Kernel(Box<dyn StatefulKernel>),
}

impl BlockState {
    fn initial(block: &SignalBlock, provider: Option<&dyn KernelProvider>) -> Self {
        match &block.kind {
            SignalBlockKind::Stateful(config) => Self::Kernel(select_kernel(config, provider)),
            SignalBlockKind::PIController(_) | SignalBlockKind::PIDController(_) => {
                Self::Integral(IntegralState::default())
            }
            SignalBlockKind::Integrator(integrator) => Self::Integral(integrator.initial_state()),
            SignalBlockKind::Differentiator { .. } => Self::Differentiator {
                last_time: LastTime::Uninitialized,
                last_input: 0.0,
                output: 0.0,
            },
            _ => Self::Stateless,
        }
    }

    fn reset(&mut self, block: &SignalBlock) {
        match self {
            // Keep whichever kernel was selected at build time.
            Self::Kernel(kernel) => kernel.reset(),
            other => *other = Self::initial(block, None),
        }
    }
}

/// Evaluates the signal domain of a schematic in dependency order.
#[derive(Debug)]
pub struct BlockEvaluator {
    graph: SignalGraph,
    order: Vec<usize>,
    links: Vec<Vec<InputLink>>,
    states: Vec<BlockState>,
    outputs: Vec<f64>,
    injected: Vec<f64>,
}

impl BlockEvaluator {
    /// Build an evaluator for the signal blocks of `schematic`.
    ///
    /// Fails with a cycle error if the signal graph has an algebraic loop.
    pub fn build(schematic: &Schematic, options: EvaluatorOptions) -> ControlResult<Self> {
        Self::from_graph(SignalGraph::from_schematic(schematic), options)
    }

    pub fn from_graph(graph: SignalGraph, options: EvaluatorOptions) -> ControlResult<Self> {
        let order = graph.evaluation_positions()?;

        let mut links = vec![Vec::new(); graph.len()];
        for edge in graph.edges() {
            let (Some(source), Some(target)) = (
                graph.position_of(edge.from.as_str()),
                graph.position_of(edge.to.as_str()),
            ) else {
                continue;
            };
            match graph.blocks()[target].input_slot(&edge.to_terminal) {
                Some(slot) => links[target].push(InputLink { slot, source }),
                None => trace!(
                    block = %edge.to,
                    terminal = edge.to_terminal.as_str(),
                    "edge targets a terminal with no input slot"
                ),
            }
        }

        let provider = options.kernels.as_deref();
        let states = graph
            .blocks()
            .iter()
            .map(|block| {
                if let SignalBlockKind::Passthrough { tag } = &block.kind {
                    warn!(
                        block = %block.id,
                        tag = tag.as_str(),
                        "unknown block type; passing first input through"
                    );
                }
                BlockState::initial(block, provider)
            })
            .collect();

        debug!(
            blocks = graph.len(),
            edges = graph.edges().len(),
            "block evaluator built"
        );

        let n = graph.len();
        Ok(Self {
            graph,
            order,
            links,
            states,
            outputs: vec![0.0; n],
            injected: vec![0.0; n],
        })
    }

    /// Evaluate every block at time `t` and return all outputs.
    pub fn step(&mut self, t: f64) -> HashMap<ComponentId, f64> {
        self.advance(t);
        self.outputs()
            .map(|(id, value)| (id.clone(), value))
            .collect()
    }

    /// Evaluate every block at time `t`.
    pub fn advance(&mut self, t: f64) {
        let mut slots: Vec<Option<f64>> = Vec::new();
        for &i in &self.order {
            let block = &self.graph.blocks()[i];
            slots.clear();
            slots.resize(block.inputs().len(), None);
            for link in &self.links[i] {
                let value = self.outputs[link.source];
                let slot = &mut slots[link.slot];
                *slot = Some(slot.unwrap_or(0.0) + value);
            }
            let value = evaluate(block, &mut self.states[i], &slots, t, self.injected[i]);
            self.outputs[i] = value;
        }
    }

    /// Last computed output of a block.
    pub fn output(&self, id: &str) -> Option<f64> {
        self.graph.position_of(id).map(|i| self.outputs[i])
    }

    pub(crate) fn output_at(&self, position: usize) -> f64 {
        self.outputs[position]
    }

    /// All block outputs in insertion order.
    pub fn outputs(&self) -> impl Iterator<Item = (&ComponentId, f64)> {
        self.graph
            .blocks()
            .iter()
            .zip(self.outputs.iter().copied())
            .map(|(block, value)| (&block.id, value))
    }

    /// Overwrite a probe's value. Returns `false` if `id` is not a probe block.
    pub fn set_probe(&mut self, id: &str, value: f64) -> bool {
        match self.graph.position_of(id) {
            Some(i) if self.graph.blocks()[i].is_probe() => {
                self.injected[i] = value;
                self.outputs[i] = value;
                true
            }
            _ => false,
        }
    }

    /// Inject measured values into probe blocks. Ids that are not probes are ignored.
    pub fn update_probes(&mut self, values: &HashMap<ComponentId, f64>) {
        for (id, &value) in values {
            if !self.set_probe(id.as_str(), value) {
                debug!(block = %id, "ignoring probe value for non-probe block");
            }
        }
    }

    /// Clear all accumulated state. Probe injections are kept.
    pub fn reset(&mut self) {
        for (i, block) in self.graph.blocks().iter().enumerate() {
            self.states[i].reset(block);
            self.outputs[i] = if block.is_probe() { self.injected[i] } else { 0.0 };
        }
        debug!("block evaluator reset");
    }

    /// Block ids in evaluation order.
    pub fn order(&self) -> impl Iterator<Item = &ComponentId> {
        self.order.iter().map(|&i| &self.graph.blocks()[i].id)
    }

    pub fn edges(&self) -> &[SignalEdge] {
        self.graph.edges()
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }
}

fn evaluate(
    block: &SignalBlock,
    state: &mut BlockState,
    slots: &[Option<f64>],
    t: f64,
    injected: f64,
) -> f64 {
    let input = |slot: usize| slots.get(slot).copied().flatten().unwrap_or(0.0);

    match (&block.kind, state) {
        (SignalBlockKind::Constant { value }, _) => *value,
        (SignalBlockKind::Gain { gain }, _) => gain * input(0),
        (SignalBlockKind::Sum { signs }, _) => (0..slots.len())
            .map(|k| signs.get(k).copied().unwrap_or(1.0) * input(k))
            .sum(),
        (SignalBlockKind::Subtractor, _) => input(0) - input(1),
        (SignalBlockKind::Limiter { lower, upper }, _) => clamp_bounds(input(0), *lower, *upper),
        (SignalBlockKind::Stateful(_), BlockState::Kernel(kernel)) => kernel.evaluate(input(0), t),
        (SignalBlockKind::PIController(pi), BlockState::Integral(s)) => {
            let (next, out) = pi.update(s, input(0), t);
            *s = next;
            out
        }
        (SignalBlockKind::PIDController(pid), BlockState::Integral(s)) => {
            let (next, out) = pid.update(s, input(0), t);
            *s = next;
            out
        }
        (SignalBlockKind::Integrator(integrator), BlockState::Integral(s)) => {
            let (next, out) = integrator.update(s, input(0), t);
            *s = next;
            out
        }
        (
            SignalBlockKind::Differentiator { gain },
            BlockState::Differentiator {
                last_time,
                last_input,
                output,
            },
        ) => {
            let u = input(0);
            let dt = last_time.dt_to(t);
            if dt > 0.0 {
                *output = gain * (u - *last_input) / dt;
            }
            *last_input = u;
            *last_time = last_time.advance(t);
            *output
        }
        (SignalBlockKind::Pwm { duty }, _) => {
            let command = slots
                .get(block.duty_slot())
                .copied()
                .flatten()
                .unwrap_or(*duty);
            if command.is_nan() {
                0.0
            } else {
                clamp_bounds(command, 0.0, 1.0)
            }
        }
        (SignalBlockKind::Probe(_), _) => injected,
        (SignalBlockKind::Mux { select }, _) => {
            let sel_slot = block.input_slot(SELECT_TERMINAL);
            let data: Vec<usize> = (0..slots.len()).filter(|&k| Some(k) != sel_slot).collect();
            let Some(last) = data.len().checked_sub(1) else {
                return 0.0;
            };
            let selected = match sel_slot.and_then(|s| slots[s]) {
                Some(v) if v.is_finite() => v.round().max(0.0) as usize,
                Some(_) => 0,
                None => *select,
            };
            input(data[selected.min(last)])
        }
        (SignalBlockKind::Demux, _) | (SignalBlockKind::Passthrough { .. }, _) => input(0),
        // Kind and state are created together; a mismatch means no state to use.
        (_, _) => input(0),
    }
}
