//! sl-netlist: schematic model and electrical connectivity for sigloop.
//!
//! Provides:
//! - Placement geometry (terminal offsets to absolute positions)
//! - Schematic data structures (Component, Terminal, Wire)
//! - Net resolution by tolerance-merged union-find over wire and terminal points
//!
//! # Example
//!
//! ```
//! use sl_netlist::{Component, ComponentKind, ConnectivityOptions, Schematic, resolve_nets};
//!
//! let mut schematic = Schematic::new();
//! schematic
//!     .add_component(Component::new("R1", ComponentKind::Resistor))
//!     .unwrap();
//! schematic
//!     .add_component(Component::new("GND", ComponentKind::Ground).at((40.0, 0.0)))
//!     .unwrap();
//!
//! let nets = resolve_nets(&schematic, &ConnectivityOptions::default());
//! assert!(nets.net_of_name("R1", "B").unwrap().is_ground());
//! ```

pub mod connectivity;
pub mod error;
pub mod geometry;
pub mod kind;
pub mod params;
pub mod schematic;

// Re-exports for ergonomics
pub use connectivity::{
    ConnectivityOptions, DEFAULT_MERGE_TOLERANCE, NetEntry, NetMap, resolve_nets,
};
pub use error::{NetlistError, NetlistResult};
pub use geometry::{Placement, Point, Rotation};
pub use kind::{ComponentKind, KNOWN_TAGS};
pub use params::{ParamValue, Params};
pub use schematic::{Component, Schematic, Segment, Terminal, TerminalRef, Wire};
