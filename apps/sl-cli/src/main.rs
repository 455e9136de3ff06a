use clap::{Parser, Subcommand};
use sl_controls::{
    BackendCapabilities, BlockEvaluator, ControlError, DutyCallback, EvaluatorOptions,
    SolverBridge, SwitchingBackend,
};
use sl_core::ComponentId;
use sl_netlist::resolve_nets;
use sl_project::ProjectError;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sigloop")]
#[command(about = "Sigloop CLI - schematic connectivity and closed-loop control evaluation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a circuit description and its signal graph
    Validate {
        /// Path to the description file (YAML or JSON)
        path: PathBuf,
    },
    /// Print the net of every component terminal
    Nets {
        /// Path to the description file (YAML or JSON)
        path: PathBuf,
    },
    /// Print the signal block evaluation order
    Order {
        /// Path to the description file (YAML or JSON)
        path: PathBuf,
    },
    /// Evaluate the control loop against a recording backend and print duties as CSV
    Simulate {
        /// Path to the description file (YAML or JSON)
        path: PathBuf,
        /// End time in seconds (defaults to the file's settings)
        #[arg(long)]
        t_end: Option<f64>,
        /// Time step in seconds (defaults to the file's settings)
        #[arg(long)]
        dt: Option<f64>,
        /// Constant probe value injected every step, as ID=VALUE
        #[arg(long = "probe", value_parser = parse_probe)]
        probes: Vec<(String, f64)>,
        /// Use a backend without live duty callbacks
        #[arg(long)]
        open_loop: bool,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("'{0}' is not a probe block")]
    UnknownProbe(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => cmd_validate(&path),
        Commands::Nets { path } => cmd_nets(&path),
        Commands::Order { path } => cmd_order(&path),
        Commands::Simulate {
            path,
            t_end,
            dt,
            probes,
            open_loop,
        } => cmd_simulate(&path, t_end, dt, &probes, open_loop),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_probe(arg: &str) -> Result<(String, f64), String> {
    let (id, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{arg}'"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing probe id in '{arg}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value in '{arg}': {e}"))?;
    if !value.is_finite() {
        return Err(format!("probe value must be finite, got '{arg}'"));
    }
    Ok((id.to_string(), value))
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    println!("Validating description: {}", path.display());
    let desc = sl_project::load(path)?;
    let schematic = desc.to_schematic()?;
    let evaluator = BlockEvaluator::build(&schematic, EvaluatorOptions::default())?;
    println!("✓ Description is valid");
    println!(
        "  {} components, {} wires, {} signal blocks",
        desc.components.len(),
        desc.wires.len(),
        evaluator.graph().len()
    );
    Ok(())
}

fn cmd_nets(path: &Path) -> CliResult<()> {
    let desc = sl_project::load(path)?;
    let schematic = desc.to_schematic()?;
    let nets = resolve_nets(&schematic, &desc.settings.connectivity()?);

    if nets.is_empty() {
        println!("No terminals found");
        return Ok(());
    }
    println!("Nets ({}):", nets.net_count());
    for (net, entries) in nets.nets() {
        let members: Vec<String> = entries
            .iter()
            .map(|e| format!("{}.{}", e.component, e.terminal_name))
            .collect();
        println!("  {:>4}: {}", net, members.join(", "));
    }
    Ok(())
}

fn cmd_order(path: &Path) -> CliResult<()> {
    let desc = sl_project::load(path)?;
    let schematic = desc.to_schematic()?;
    let evaluator = BlockEvaluator::build(&schematic, EvaluatorOptions::default())?;

    let graph = evaluator.graph();
    if graph.is_empty() {
        println!("No signal blocks found");
        return Ok(());
    }
    println!("Evaluation order:");
    for (i, id) in evaluator.order().enumerate() {
        if let Some(block) = graph.block(id.as_str()) {
            println!(
                "  {:>3}. {} - {} ({})",
                i + 1,
                block.id,
                block.name,
                block.component_kind
            );
        }
    }
    Ok(())
}

fn cmd_simulate(
    path: &Path,
    t_end: Option<f64>,
    dt: Option<f64>,
    probes: &[(String, f64)],
    open_loop: bool,
) -> CliResult<()> {
    let desc = sl_project::load(path)?;
    let mut settings = desc.settings;
    if let Some(t_end) = t_end {
        settings.t_end = t_end;
    }
    if let Some(dt) = dt {
        settings.dt = dt;
    }
    sl_project::validate_settings(&settings).map_err(ProjectError::from)?;

    let schematic = desc.to_schematic()?;
    let bridge = SolverBridge::build(&schematic, EvaluatorOptions::default())?;

    let probe_values = probe_values(&bridge, probes)?;
    bridge.update_probes(&probe_values);

    let mut backend = RecordingBackend::new(!open_loop);
    let mode = bridge.attach(&mut backend);
    info!(?mode, dt = settings.dt, t_end = settings.t_end, "simulation started");

    let mut out = io::stdout().lock();
    let header: Vec<&str> = backend.channel_ids().map(ComponentId::as_str).collect();
    writeln!(out, "t,{}", header.join(","))?;
    for t in settings.time_steps() {
        bridge.update_probes(&probe_values);
        let duties: Vec<String> = backend.sample(t).iter().map(f64::to_string).collect();
        writeln!(out, "{t},{}", duties.join(","))?;
    }
    out.flush()?;
    Ok(())
}

fn probe_values(
    bridge: &SolverBridge,
    probes: &[(String, f64)],
) -> CliResult<HashMap<ComponentId, f64>> {
    let evaluator = bridge.evaluator();
    let evaluator = evaluator.borrow();
    let mut values = HashMap::new();
    for (id, value) in probes {
        let is_probe = evaluator
            .graph()
            .block(id)
            .is_some_and(|block| block.is_probe());
        if !is_probe {
            return Err(CliError::UnknownProbe(id.clone()));
        }
        values.insert(ComponentId::from(id.as_str()), *value);
    }
    Ok(values)
}

enum Channel {
    Live(DutyCallback),
    Static(f64),
}

/// Backend that records what the bridge hands it and samples duties on demand.
struct RecordingBackend {
    live: bool,
    channels: BTreeMap<ComponentId, Channel>,
}

impl RecordingBackend {
    fn new(live: bool) -> Self {
        Self {
            live,
            channels: BTreeMap::new(),
        }
    }

    fn channel_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.channels.keys()
    }

    /// Duty of every channel at `t`, in id order.
    fn sample(&mut self, t: f64) -> Vec<f64> {
        self.channels
            .values_mut()
            .map(|channel| match channel {
                Channel::Live(callback) => callback(t),
                Channel::Static(duty) => *duty,
            })
            .collect()
    }
}

impl SwitchingBackend for RecordingBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            live_duty_callback: self.live,
        }
    }

    fn register_duty_callback(&mut self, block: &ComponentId, _name: &str, callback: DutyCallback) {
        self.channels.insert(block.clone(), Channel::Live(callback));
    }

    fn set_static_duty(&mut self, block: &ComponentId, _name: &str, duty: f64) {
        self.channels.insert(block.clone(), Channel::Static(duty));
    }
}
