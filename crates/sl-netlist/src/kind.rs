//! Component type tags and their default terminal layouts.

use core::fmt;

use crate::geometry::Point;
use crate::schematic::Terminal;

/// Closed set of component types known to the co-simulation core.
///
/// Tags are SCREAMING_SNAKE_CASE strings in descriptions. Unrecognised tags
/// are kept as [`ComponentKind::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    // Electrical
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    Diode,
    Mosfet,
    Igbt,
    Switch,
    Ground,

    // Signal domain
    Constant,
    Gain,
    Sum,
    Subtractor,
    Limiter,
    RateLimiter,
    PiController,
    PidController,
    Integrator,
    Differentiator,
    Hysteresis,
    SampleHold,
    PwmGenerator,
    VoltageProbe,
    CurrentProbe,
    PowerProbe,
    SignalMux,
    SignalDemux,
    MathBlock,

    /// A tag this build does not know about.
    Other(String),
}

/// Every tag this build recognises.
pub const KNOWN_TAGS: &[&str] = &[
    "RESISTOR",
    "CAPACITOR",
    "INDUCTOR",
    "VOLTAGE_SOURCE",
    "CURRENT_SOURCE",
    "DIODE",
    "MOSFET",
    "IGBT",
    "SWITCH",
    "GROUND",
    "CONSTANT",
    "GAIN",
    "SUM",
    "SUBTRACTOR",
    "LIMITER",
    "RATE_LIMITER",
    "PI_CONTROLLER",
    "PID_CONTROLLER",
    "INTEGRATOR",
    "DIFFERENTIATOR",
    "HYSTERESIS",
    "SAMPLE_HOLD",
    "PWM_GENERATOR",
    "VOLTAGE_PROBE",
    "CURRENT_PROBE",
    "POWER_PROBE",
    "SIGNAL_MUX",
    "SIGNAL_DEMUX",
    "MATH_BLOCK",
];

impl ComponentKind {
    /// Parse a type tag. Matching is case-insensitive; unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        let trimmed = tag.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "RESISTOR" => Self::Resistor,
            "CAPACITOR" => Self::Capacitor,
            "INDUCTOR" => Self::Inductor,
            "VOLTAGE_SOURCE" => Self::VoltageSource,
            "CURRENT_SOURCE" => Self::CurrentSource,
            "DIODE" => Self::Diode,
            "MOSFET" => Self::Mosfet,
            "IGBT" => Self::Igbt,
            "SWITCH" => Self::Switch,
            "GROUND" => Self::Ground,
            "CONSTANT" => Self::Constant,
            "GAIN" => Self::Gain,
            "SUM" => Self::Sum,
            "SUBTRACTOR" => Self::Subtractor,
            "LIMITER" => Self::Limiter,
            "RATE_LIMITER" => Self::RateLimiter,
            "PI_CONTROLLER" => Self::PiController,
            "PID_CONTROLLER" => Self::PidController,
            "INTEGRATOR" => Self::Integrator,
            "DIFFERENTIATOR" => Self::Differentiator,
            "HYSTERESIS" => Self::Hysteresis,
            "SAMPLE_HOLD" => Self::SampleHold,
            "PWM_GENERATOR" => Self::PwmGenerator,
            "VOLTAGE_PROBE" => Self::VoltageProbe,
            "CURRENT_PROBE" => Self::CurrentProbe,
            "POWER_PROBE" => Self::PowerProbe,
            "SIGNAL_MUX" => Self::SignalMux,
            "SIGNAL_DEMUX" => Self::SignalDemux,
            "MATH_BLOCK" => Self::MathBlock,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Resistor => "RESISTOR",
            Self::Capacitor => "CAPACITOR",
            Self::Inductor => "INDUCTOR",
            Self::VoltageSource => "VOLTAGE_SOURCE",
            Self::CurrentSource => "CURRENT_SOURCE",
            Self::Diode => "DIODE",
            Self::Mosfet => "MOSFET",
            Self::Igbt => "IGBT",
            Self::Switch => "SWITCH",
            Self::Ground => "GROUND",
            Self::Constant => "CONSTANT",
            Self::Gain => "GAIN",
            Self::Sum => "SUM",
            Self::Subtractor => "SUBTRACTOR",
            Self::Limiter => "LIMITER",
            Self::RateLimiter => "RATE_LIMITER",
            Self::PiController => "PI_CONTROLLER",
            Self::PidController => "PID_CONTROLLER",
            Self::Integrator => "INTEGRATOR",
            Self::Differentiator => "DIFFERENTIATOR",
            Self::Hysteresis => "HYSTERESIS",
            Self::SampleHold => "SAMPLE_HOLD",
            Self::PwmGenerator => "PWM_GENERATOR",
            Self::VoltageProbe => "VOLTAGE_PROBE",
            Self::CurrentProbe => "CURRENT_PROBE",
            Self::PowerProbe => "POWER_PROBE",
            Self::SignalMux => "SIGNAL_MUX",
            Self::SignalDemux => "SIGNAL_DEMUX",
            Self::MathBlock => "MATH_BLOCK",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, Self::Ground)
    }

    /// Electrical element handled by the external solver.
    pub fn is_electrical(&self) -> bool {
        matches!(
            self,
            Self::Resistor
                | Self::Capacitor
                | Self::Inductor
                | Self::VoltageSource
                | Self::CurrentSource
                | Self::Diode
                | Self::Mosfet
                | Self::Igbt
                | Self::Switch
                | Self::Ground
        )
    }

    /// Signal-domain block. Unknown tags are treated as signal blocks.
    pub fn is_signal(&self) -> bool {
        !self.is_electrical()
    }

    pub fn is_probe(&self) -> bool {
        matches!(
            self,
            Self::VoltageProbe | Self::CurrentProbe | Self::PowerProbe
        )
    }

    /// Default terminal layout for a freshly placed component.
    pub fn default_terminals(&self) -> Vec<Terminal> {
        match self {
            Self::Resistor | Self::Capacitor | Self::Inductor | Self::Switch => {
                side_layout(&["A"], &["B"])
            }
            Self::Diode => side_layout(&["A"], &["K"]),
            Self::VoltageSource | Self::CurrentSource => explicit(&[
                ("P", Point::new(0.0, -40.0)),
                ("N", Point::new(0.0, 40.0)),
            ]),
            Self::Mosfet => explicit(&[
                ("D", Point::new(0.0, -40.0)),
                ("G", Point::new(-40.0, 0.0)),
                ("S", Point::new(0.0, 40.0)),
            ]),
            Self::Igbt => explicit(&[
                ("C", Point::new(0.0, -40.0)),
                ("G", Point::new(-40.0, 0.0)),
                ("E", Point::new(0.0, 40.0)),
            ]),
            Self::Ground => explicit(&[("GND", Point::new(0.0, 0.0))]),
            Self::Constant => side_layout(&[], &["OUT"]),
            Self::Gain
            | Self::Limiter
            | Self::RateLimiter
            | Self::PiController
            | Self::PidController
            | Self::Integrator
            | Self::Differentiator
            | Self::Hysteresis
            | Self::SampleHold => side_layout(&["IN"], &["OUT"]),
            Self::Sum | Self::MathBlock => side_layout(&["IN1", "IN2", "IN3"], &["OUT"]),
            Self::Subtractor => side_layout(&["IN1", "IN2"], &["OUT"]),
            Self::PwmGenerator => side_layout(&["DUTY"], &["OUT"]),
            Self::VoltageProbe | Self::PowerProbe => side_layout(&["P", "N"], &["OUT"]),
            Self::CurrentProbe => side_layout(&["IN"], &["OUT", "MEAS"]),
            Self::SignalMux => side_layout(&["IN1", "IN2", "IN3", "IN4", "SEL"], &["OUT"]),
            Self::SignalDemux => side_layout(
                &["IN"],
                &["OUT1", "OUT2", "OUT3", "OUT4", "OUT5", "OUT6", "OUT7", "OUT8"],
            ),
            Self::Other(_) => side_layout(&["IN"], &["OUT"]),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<&str> for ComponentKind {
    fn from(tag: &str) -> Self {
        Self::from_tag(tag)
    }
}

const PIN_REACH: f64 = 40.0;
const PIN_PITCH: f64 = 20.0;

/// Inputs on the left edge, outputs on the right, centred vertically.
fn side_layout(left: &[&str], right: &[&str]) -> Vec<Terminal> {
    let column = |names: &[&str], x: f64| -> Vec<(String, Point)> {
        let mid = (names.len() as f64 - 1.0) / 2.0;
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), Point::new(x, (i as f64 - mid) * PIN_PITCH)))
            .collect()
    };
    column(left, -PIN_REACH)
        .into_iter()
        .chain(column(right, PIN_REACH))
        .enumerate()
        .map(|(index, (name, offset))| Terminal::new(index, name, offset))
        .collect()
}

fn explicit(pins: &[(&str, Point)]) -> Vec<Terminal> {
    pins.iter()
        .enumerate()
        .map(|(index, (name, offset))| Terminal::new(index, *name, *offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for tag in KNOWN_TAGS {
            let kind = ComponentKind::from_tag(tag);
            assert!(!matches!(kind, ComponentKind::Other(_)), "{tag}");
            assert_eq!(kind.tag(), *tag);
        }
    }

    #[test]
    fn unknown_tag_is_kept() {
        let kind = ComponentKind::from_tag("LOOKUP_TABLE");
        assert_eq!(kind, ComponentKind::Other("LOOKUP_TABLE".to_string()));
        assert_eq!(kind.tag(), "LOOKUP_TABLE");
        assert!(kind.is_signal());
    }

    #[test]
    fn tag_parsing_is_case_insensitive() {
        assert_eq!(ComponentKind::from_tag("pwm_generator"), ComponentKind::PwmGenerator);
    }

    #[test]
    fn default_layouts_have_sequential_indices() {
        for tag in KNOWN_TAGS {
            let kind = ComponentKind::from_tag(tag);
            let terminals = kind.default_terminals();
            assert!(!terminals.is_empty(), "{kind} has no terminals");
            for (i, t) in terminals.iter().enumerate() {
                assert_eq!(t.index, i);
            }
        }
    }

    #[test]
    fn current_probe_layout() {
        let names: Vec<_> = ComponentKind::CurrentProbe
            .default_terminals()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["IN", "OUT", "MEAS"]);
    }
}
