//! Measurement probes.
//!
//! Probes are the feedback path from the electrical solver into the signal
//! domain. The solver measures a quantity and injects it; the probe block's
//! output is whatever was last injected (0 until then).

use sl_core::{Current, Power, Voltage};
use sl_netlist::ComponentKind;
use uom::si::electric_current::ampere;
use uom::si::electric_potential::volt;
use uom::si::power::watt;

/// Quantity measured by a probe block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Voltage,
    Current,
    Power,
}

impl ProbeKind {
    pub fn from_kind(kind: &ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::VoltageProbe => Some(Self::Voltage),
            ComponentKind::CurrentProbe => Some(Self::Current),
            ComponentKind::PowerProbe => Some(Self::Power),
            _ => None,
        }
    }
}

/// A typed measurement reported by the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeReading {
    Voltage(Voltage),
    Current(Current),
    Power(Power),
}

impl ProbeReading {
    pub fn kind(&self) -> ProbeKind {
        match self {
            Self::Voltage(_) => ProbeKind::Voltage,
            Self::Current(_) => ProbeKind::Current,
            Self::Power(_) => ProbeKind::Power,
        }
    }

    /// Value in SI base units (V, A, W).
    pub fn si_value(&self) -> f64 {
        match self {
            Self::Voltage(v) => v.get::<volt>(),
            Self::Current(i) => i.get::<ampere>(),
            Self::Power(p) => p.get::<watt>(),
        }
    }
}

impl From<Voltage> for ProbeReading {
    fn from(v: Voltage) -> Self {
        Self::Voltage(v)
    }
}

impl From<Current> for ProbeReading {
    fn from(i: Current) -> Self {
        Self::Current(i)
    }
}

impl From<Power> for ProbeReading {
    fn from(p: Power) -> Self {
        Self::Power(p)
    }
}
