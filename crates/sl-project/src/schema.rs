//! Circuit description schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

/// Upper bound on `t_end / dt`.
pub const MAX_TIME_STEPS: u64 = 10_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitDescription {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub settings: SimSettings,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub wires: Vec<WireDef>,
}

/// Solver and connectivity settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimSettings {
    /// Merge distance for connectivity, in canvas units.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Simulated end time (s).
    #[serde(default = "default_t_end")]
    pub t_end: f64,
    /// Time step (s).
    #[serde(default = "default_dt")]
    pub dt: f64,
}

fn default_tolerance() -> f64 {
    sl_netlist::DEFAULT_MERGE_TOLERANCE
}

fn default_t_end() -> f64 {
    1e-3
}

fn default_dt() -> f64 {
    1e-5
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            t_end: default_t_end(),
            dt: default_dt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub id: String,
    /// Display name; the id is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type tag, e.g. `RESISTOR` or `PI_CONTROLLER`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub position: [f64; 2],
    /// Degrees, a multiple of 90.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub mirror_h: bool,
    #[serde(default)]
    pub mirror_v: bool,
    /// Explicit terminal layout; the type's default layout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminals: Option<Vec<TerminalDef>>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamDef>,
}

impl ComponentDef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalDef {
    pub name: String,
    #[serde(default)]
    pub offset: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamDef {
    Number(f64),
    Flag(bool),
    List(Vec<f64>),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireDef {
    /// Straight segments as `[[x0, y0], [x1, y1]]`.
    #[serde(default)]
    pub segments: Vec<[[f64; 2]; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TerminalRefDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TerminalRefDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalRefDef {
    pub component: String,
    pub terminal: String,
}
