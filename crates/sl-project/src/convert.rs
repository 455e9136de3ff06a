//! Conversion from a description into the in-memory schematic.

use sl_netlist::{
    Component, ComponentKind, ConnectivityOptions, ParamValue, Params, Placement, Point, Rotation,
    Schematic, Segment, Terminal, TerminalRef, Wire,
};
use tracing::debug;

use crate::ProjectResult;
use crate::schema::{
    CircuitDescription, ComponentDef, MAX_TIME_STEPS, ParamDef, SimSettings, TerminalRefDef,
    WireDef,
};

impl CircuitDescription {
    /// Build the schematic described by this file.
    ///
    /// Components and wires keep their file order, which fixes net numbering
    /// and evaluation tie-breaks.
    pub fn to_schematic(&self) -> ProjectResult<Schematic> {
        let mut schematic = Schematic::new();
        for def in &self.components {
            schematic.add_component(component_from_def(def)?)?;
        }
        for def in &self.wires {
            schematic.add_wire(wire_from_def(def));
        }
        debug!(
            name = self.name.as_str(),
            components = self.components.len(),
            wires = self.wires.len(),
            "schematic built from description"
        );
        Ok(schematic)
    }
}

impl SimSettings {
    pub fn connectivity(&self) -> ProjectResult<ConnectivityOptions> {
        Ok(ConnectivityOptions::with_tolerance(self.tolerance)?)
    }

    /// Evaluation times `0, dt, 2·dt, ...` up to and including `t_end`,
    /// at most [`MAX_TIME_STEPS`] steps past zero.
    pub fn time_steps(&self) -> impl Iterator<Item = f64> + use<> {
        let (dt, t_end) = (self.dt, self.t_end);
        let steps = if dt > 0.0 && t_end.is_finite() {
            ((t_end / dt + 1e-9).floor() as u64).min(MAX_TIME_STEPS)
        } else {
            0
        };
        (0..=steps).map(move |k| k as f64 * dt)
    }
}

fn component_from_def(def: &ComponentDef) -> ProjectResult<Component> {
    let rotation = Rotation::from_degrees(def.rotation as i32)?;
    let placement = Placement::at(def.position)
        .rotated(rotation)
        .mirrored(def.mirror_h, def.mirror_v);
    let params: Params = def
        .params
        .iter()
        .map(|(name, value)| (name.clone(), param_value(value)))
        .collect();

    let mut component = Component::new(def.id.as_str(), ComponentKind::from_tag(&def.kind))
        .named(def.display_name())
        .placed(placement)
        .with_params(params);
    if let Some(terminals) = &def.terminals {
        component = component.with_terminals(
            terminals
                .iter()
                .enumerate()
                .map(|(i, t)| Terminal::new(i, t.name.as_str(), Point::from(t.offset)))
                .collect(),
        )?;
    }
    Ok(component)
}

fn param_value(def: &ParamDef) -> ParamValue {
    match def {
        ParamDef::Number(v) => ParamValue::Number(*v),
        ParamDef::Flag(b) => ParamValue::Flag(*b),
        ParamDef::List(v) => ParamValue::List(v.clone()),
        ParamDef::Text(s) => ParamValue::Text(s.clone()),
    }
}

fn terminal_ref(def: &TerminalRefDef) -> TerminalRef {
    TerminalRef::new(def.component.as_str(), def.terminal.as_str())
}

fn wire_from_def(def: &WireDef) -> Wire {
    Wire {
        segments: def
            .segments
            .iter()
            .map(|[a, b]| Segment::new(*a, *b))
            .collect(),
        start: def.start.as_ref().map(terminal_ref),
        end: def.end.as_ref().map(terminal_ref),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_yaml_str;

    #[test]
    fn time_steps_include_end() {
        let settings = SimSettings {
            tolerance: 5.0,
            t_end: 1e-3,
            dt: 1e-4,
        };
        let steps: Vec<f64> = settings.time_steps().collect();
        assert_eq!(steps.len(), 11);
        assert_eq!(steps[0], 0.0);
        assert!((steps[10] - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn time_steps_are_capped() {
        let settings = SimSettings {
            tolerance: 5.0,
            t_end: 1.0,
            dt: 1e-300,
        };
        let mut steps = settings.time_steps();
        assert_eq!(steps.size_hint().0 as u64, MAX_TIME_STEPS + 1);
        assert_eq!(steps.next(), Some(0.0));
    }

    #[test]
    fn rotation_and_mirror_are_applied() {
        let desc = from_yaml_str(
            r#"
version: 1
name: placement
components:
  - id: R1
    type: RESISTOR
    position: [100, 50]
    rotation: 90
  - id: D1
    type: DIODE
    mirror_h: true
"#,
        )
        .unwrap();
        let s = desc.to_schematic().unwrap();
        let r1 = s.component("R1").unwrap();
        let a = r1.terminal_by_name("A").unwrap();
        assert_eq!(r1.placement.transform(a.offset), Point::new(100.0, 10.0));
        let d1 = s.component("D1").unwrap();
        let k = d1.terminal_by_name("K").unwrap();
        assert_eq!(d1.placement.transform(k.offset), Point::new(-40.0, 0.0));
    }

    #[test]
    fn explicit_terminals_replace_defaults() {
        let desc = from_yaml_str(
            r#"
version: 1
name: custom
components:
  - id: X1
    type: TRANSFORMER
    name: Main transformer
    terminals:
      - { name: P1, offset: [-40, -20] }
      - { name: P2, offset: [-40, 20] }
      - { name: S1, offset: [40, -20] }
      - { name: S2, offset: [40, 20] }
"#,
        )
        .unwrap();
        let s = desc.to_schematic().unwrap();
        let x1 = s.component("X1").unwrap();
        assert_eq!(x1.name, "Main transformer");
        assert_eq!(x1.kind, ComponentKind::Other("TRANSFORMER".into()));
        let names: Vec<&str> = x1.terminals().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["P1", "P2", "S1", "S2"]);
    }
}
