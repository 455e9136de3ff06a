//! End-to-end behaviour of the signal domain: scheduling, evaluation and
//! the solver bridge.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use proptest::prelude::*;
use sl_controls::{
    BackendCapabilities, BlockEvaluator, BridgeMode, ControlError, DutyCallback, EvaluatorOptions,
    KernelProvider, ProbeReading, SolverBridge, StatefulBlock, StatefulKernel, SwitchingBackend,
};
use sl_core::{ComponentId, volts};
use sl_netlist::{Component, ComponentKind, Params, Schematic};

struct Builder {
    schematic: Schematic,
}

impl Builder {
    fn new() -> Self {
        Self {
            schematic: Schematic::new(),
        }
    }

    fn block(mut self, id: &str, kind: ComponentKind, params: Params) -> Self {
        let x = self.schematic.components().len() as f64 * 200.0;
        self.schematic
            .add_component(Component::new(id, kind).with_params(params).at((x, 0.0)))
            .unwrap();
        self
    }

    fn wire(mut self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.schematic.connect(from, to).unwrap();
        self
    }

    fn build(self) -> Schematic {
        self.schematic
    }
}

fn value(v: f64) -> Params {
    Params::new().with("value", v)
}

fn gain(g: f64) -> Params {
    Params::new().with("gain", g)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

fn duty_chain(constant: f64) -> Schematic {
    Builder::new()
        .block("K1", ComponentKind::Constant, value(constant))
        .block("G1", ComponentKind::Gain, gain(1.5))
        .block("L1", ComponentKind::Limiter, Params::new())
        .block("PWM1", ComponentKind::PwmGenerator, Params::new())
        .wire(("K1", "OUT"), ("G1", "IN"))
        .wire(("G1", "OUT"), ("L1", "IN"))
        .wire(("L1", "OUT"), ("PWM1", "DUTY"))
        .build()
}

#[test]
fn closed_loop_duty_is_constant_times_gain() {
    let mut ev = BlockEvaluator::build(&duty_chain(0.4), EvaluatorOptions::default()).unwrap();
    for t in [0.0, 1e-6, 5e-4, 1.0] {
        let out = ev.step(t);
        assert!(approx(out[&ComponentId::new("PWM1")], 0.6), "t = {t}");
    }
}

#[test]
fn probe_feedback_reaches_downstream_gain() {
    let s = Builder::new()
        .block("VP", ComponentKind::VoltageProbe, Params::new())
        .block("G", ComponentKind::Gain, gain(2.0))
        .wire(("VP", "OUT"), ("G", "IN"))
        .build();
    let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();

    let out = ev.step(0.0);
    assert_eq!(out[&ComponentId::new("VP")], 0.0);
    assert_eq!(out[&ComponentId::new("G")], 0.0);

    ev.update_probes(&HashMap::from([(ComponentId::new("VP"), 3.0)]));
    let out = ev.step(1e-5);
    assert_eq!(out[&ComponentId::new("G")], 6.0);
}

#[test]
fn pi_without_integral_gain_is_exactly_proportional() {
    let (kp, e) = (2.5, 0.7);
    let s = Builder::new()
        .block("E", ComponentKind::Constant, value(e))
        .block(
            "PI",
            ComponentKind::PiController,
            Params::new().with("kp", kp).with("ki", 0.0),
        )
        .wire(("E", "OUT"), ("PI", "IN"))
        .build();
    let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
    ev.advance(0.3);
    ev.advance(0.3 + 1e-4);
    assert_eq!(ev.output("PI"), Some(kp * e));
}

#[test]
fn pwm_clamps_out_of_range_commands() {
    for (command, expected) in [(1.8, 1.0), (-0.5, 0.0)] {
        let s = Builder::new()
            .block("K", ComponentKind::Constant, value(command))
            .block("PWM", ComponentKind::PwmGenerator, Params::new())
            .wire(("K", "OUT"), ("PWM", "DUTY"))
            .build();
        let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
        ev.advance(0.0);
        assert_eq!(ev.output("PWM"), Some(expected));
    }
}

#[test]
fn unconnected_pwm_uses_static_duty() {
    let s = Builder::new()
        .block(
            "PWM",
            ComponentKind::PwmGenerator,
            Params::new().with("duty", 0.25),
        )
        .build();
    let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
    ev.advance(0.0);
    assert_eq!(ev.output("PWM"), Some(0.25));
}

#[test]
fn unknown_block_type_passes_first_input() {
    let s = Builder::new()
        .block("K", ComponentKind::Constant, value(4.2))
        .block("X", ComponentKind::from_tag("NOTCH_FILTER"), Params::new())
        .wire(("K", "OUT"), ("X", "IN"))
        .build();
    let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
    ev.advance(0.0);
    assert_eq!(ev.output("X"), Some(4.2));
}

#[test]
fn cycle_error_names_blocks_by_display_name() {
    let mut s = Builder::new()
        .block("G1", ComponentKind::Gain, gain(1.0))
        .block("G2", ComponentKind::Gain, gain(1.0))
        .wire(("G1", "OUT"), ("G2", "IN"))
        .wire(("G2", "OUT"), ("G1", "IN"))
        .build();
    s.component_mut("G1").unwrap().name = "Outer gain".to_string();

    let err = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Outer gain"), "{msg}");
    assert!(msg.contains("G2"), "{msg}");
}

/// Ring of `n` gains fed by a constant, with a tail hanging off the ring.
fn ring(n: usize, closed: bool) -> Schematic {
    let mut b = Builder::new().block("K", ComponentKind::Constant, value(1.0));
    for i in 0..n {
        b = b.block(&format!("R{i}"), ComponentKind::Sum, Params::new());
    }
    b = b
        .block("Tail", ComponentKind::Gain, gain(1.0))
        .wire(("K", "OUT"), ("R0", "IN1"))
        .wire((&format!("R{}", n - 1), "OUT"), ("Tail", "IN"));
    for i in 1..n {
        b = b.wire((&format!("R{}", i - 1), "OUT"), (&format!("R{i}"), "IN2"));
    }
    if closed {
        b = b.wire((&format!("R{}", n - 1), "OUT"), ("R0", "IN2"));
    }
    b.build()
}

proptest! {
    #[test]
    fn rings_of_any_length_are_detected(n in 1usize..9) {
        let err = BlockEvaluator::build(&ring(n, true), EvaluatorOptions::default()).unwrap_err();
        let ControlError::Cycle(cycle) = err else {
            panic!("expected cycle error");
        };
        prop_assert_eq!(cycle.members.len(), n);
        for i in 0..n {
            let id = format!("R{i}");
            prop_assert!(cycle.contains(&id));
        }
        prop_assert!(!cycle.contains("K"));
        prop_assert!(!cycle.contains("Tail"));
    }

    #[test]
    fn open_chains_never_report_cycles(n in 1usize..9) {
        let ev = BlockEvaluator::build(&ring(n, false), EvaluatorOptions::default()).unwrap();
        prop_assert_eq!(ev.order().count(), n + 2);
    }

    #[test]
    fn pwm_duty_stays_in_unit_interval(command in -1e6f64..1e6) {
        let s = Builder::new()
            .block("K", ComponentKind::Constant, value(command))
            .block("PWM", ComponentKind::PwmGenerator, Params::new())
            .wire(("K", "OUT"), ("PWM", "DUTY"))
            .build();
        let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
        ev.advance(0.0);
        let duty = ev.output("PWM").unwrap();
        prop_assert!((0.0..=1.0).contains(&duty));
    }

    #[test]
    fn pi_output_respects_bounds(e in -1e3f64..1e3, ki in 0.0f64..1e3) {
        let s = Builder::new()
            .block("E", ComponentKind::Constant, value(e))
            .block(
                "PI",
                ComponentKind::PiController,
                Params::new()
                    .with("kp", 3.0)
                    .with("ki", ki)
                    .with("out_min", -2.0)
                    .with("out_max", 2.0),
            )
            .wire(("E", "OUT"), ("PI", "IN"))
            .build();
        let mut ev = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
        for k in 0..5 {
            ev.advance(k as f64 * 1e-3);
            let out = ev.output("PI").unwrap();
            prop_assert!((-2.0..=2.0).contains(&out));
        }
    }
}

#[derive(Debug, Default)]
struct CountingProvider {
    served: Cell<usize>,
}

impl KernelProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn kernel_for(&self, block: &StatefulBlock) -> Option<Box<dyn StatefulKernel>> {
        match block {
            StatefulBlock::RateLimiter(_) => {
                self.served.set(self.served.get() + 1);
                Some(block.builtin_kernel())
            }
            _ => None,
        }
    }
}

#[test]
fn kernel_provider_is_invisible_to_callers() {
    let s = Builder::new()
        .block("VP", ComponentKind::VoltageProbe, Params::new())
        .block(
            "RL",
            ComponentKind::RateLimiter,
            Params::new().with("rising_rate", 100.0).with("falling_rate", 50.0),
        )
        .block("H", ComponentKind::Hysteresis, Params::new())
        .wire(("VP", "OUT"), ("RL", "IN"))
        .wire(("RL", "OUT"), ("H", "IN"))
        .build();

    let provider = Rc::new(CountingProvider::default());
    let mut plain = BlockEvaluator::build(&s, EvaluatorOptions::default()).unwrap();
    let mut provided = BlockEvaluator::build(
        &s,
        EvaluatorOptions::with_kernels(Rc::clone(&provider) as Rc<dyn KernelProvider>),
    )
    .unwrap();
    assert_eq!(provider.served.get(), 1);

    for (k, v) in [0.0, 2.0, 2.0, -3.0, 1.0].into_iter().enumerate() {
        let t = k as f64 * 0.01;
        plain.set_probe("VP", v);
        provided.set_probe("VP", v);
        assert_eq!(plain.step(t), provided.step(t));
    }
}

#[derive(Default)]
struct LiveBackend {
    callbacks: BTreeMap<ComponentId, DutyCallback>,
}

impl SwitchingBackend for LiveBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            live_duty_callback: true,
        }
    }

    fn register_duty_callback(&mut self, block: &ComponentId, _name: &str, callback: DutyCallback) {
        self.callbacks.insert(block.clone(), callback);
    }

    fn set_static_duty(&mut self, _block: &ComponentId, _name: &str, _duty: f64) {
        panic!("live backend should not receive static duties");
    }
}

#[derive(Default)]
struct StaticBackend {
    duties: BTreeMap<ComponentId, f64>,
}

impl SwitchingBackend for StaticBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }

    fn register_duty_callback(&mut self, _block: &ComponentId, _name: &str, _cb: DutyCallback) {
        panic!("static backend cannot take callbacks");
    }

    fn set_static_duty(&mut self, block: &ComponentId, _name: &str, duty: f64) {
        self.duties.insert(block.clone(), duty);
    }
}

/// Voltage regulation loop: setpoint minus measured output into a P
/// controller that drives the PWM duty.
fn regulator() -> Schematic {
    Builder::new()
        .block("SP", ComponentKind::Constant, value(5.0))
        .block("VP", ComponentKind::VoltageProbe, Params::new())
        .block("ERR", ComponentKind::Subtractor, Params::new())
        .block(
            "PI",
            ComponentKind::PiController,
            Params::new()
                .with("kp", 0.1)
                .with("out_min", 0.0)
                .with("out_max", 1.0),
        )
        .block("PWM", ComponentKind::PwmGenerator, Params::new())
        .wire(("SP", "OUT"), ("ERR", "IN1"))
        .wire(("VP", "OUT"), ("ERR", "IN2"))
        .wire(("ERR", "OUT"), ("PI", "IN"))
        .wire(("PI", "OUT"), ("PWM", "DUTY"))
        .build()
}

#[test]
fn live_backend_closes_the_loop() {
    let bridge = SolverBridge::build(&regulator(), EvaluatorOptions::default()).unwrap();
    let mut backend = LiveBackend::default();
    let mode = bridge.attach(&mut backend);
    assert_eq!(mode, BridgeMode::Live { blocks: 1 });

    let cb = backend.callbacks.get_mut(&ComponentId::new("PWM")).unwrap();
    assert!(approx(cb(0.0), 0.5));

    let mut inject = bridge.probe_injector();
    inject(&HashMap::from([(ComponentId::new("VP"), 3.0)]));
    assert!(approx(cb(1e-5), 0.2));

    bridge.update_probe_readings(&[(ComponentId::new("VP"), ProbeReading::from(volts(4.5)))]);
    assert!(approx(cb(2e-5), 0.05));
}

#[test]
fn static_backend_gets_open_loop_duties() {
    let bridge = SolverBridge::build(&duty_chain(0.4), EvaluatorOptions::default()).unwrap();
    let mut backend = StaticBackend::default();
    let mode = bridge.attach(&mut backend);

    let BridgeMode::OpenLoop { duties } = mode else {
        panic!("expected open-loop mode");
    };
    assert!(approx(duties[&ComponentId::new("PWM1")], 0.6));
    assert_eq!(backend.duties, duties);
}
