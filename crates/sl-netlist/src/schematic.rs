//! Placed components, terminals and wires.

use std::collections::HashMap;

use sl_core::ComponentId;

use crate::error::{NetlistError, NetlistResult};
use crate::geometry::{Placement, Point};
use crate::kind::ComponentKind;
use crate::params::Params;

/// A connection point of a component.
///
/// `index` is stable and is what wiring and input ordering refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub index: usize,
    pub name: String,
    /// Offset from the component origin, before placement.
    pub offset: Point,
}

impl Terminal {
    pub fn new(index: usize, name: impl Into<String>, offset: Point) -> Self {
        Self {
            index,
            name: name.into(),
            offset,
        }
    }
}

/// A placed circuit element or control block.
///
/// Terminals are fixed at instantiation; placement and parameters may be edited.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: ComponentId,
    /// Display name shown to the user (defaults to the id).
    pub name: String,
    pub kind: ComponentKind,
    pub placement: Placement,
    pub params: Params,
    terminals: Vec<Terminal>,
}

impl Component {
    /// Instantiate a component with its kind's default terminal layout.
    pub fn new(id: impl Into<ComponentId>, kind: ComponentKind) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            terminals: kind.default_terminals(),
            id,
            kind,
            placement: Placement::default(),
            params: Params::default(),
        }
    }

    /// Replace the default layout with an explicit terminal list.
    pub fn with_terminals(mut self, terminals: Vec<Terminal>) -> NetlistResult<Self> {
        for (i, t) in terminals.iter().enumerate() {
            if terminals[..i].iter().any(|other| other.name == t.name) {
                return Err(NetlistError::DuplicateTerminal {
                    component: self.id.clone(),
                    terminal: t.name.clone(),
                });
            }
        }
        self.terminals = terminals;
        Ok(self)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at(mut self, position: impl Into<Point>) -> Self {
        self.placement.position = position.into();
        self
    }

    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::params::ParamValue>,
    ) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn terminal(&self, index: usize) -> Option<&Terminal> {
        self.terminals.iter().find(|t| t.index == index)
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<&Terminal> {
        self.terminals.iter().find(|t| t.name == name)
    }

    /// Absolute position of the terminal with the given index.
    pub fn terminal_position(&self, index: usize) -> Option<Point> {
        self.terminal(index)
            .map(|t| self.placement.transform(t.offset))
    }

    /// All terminals with their absolute positions, in declaration order.
    pub fn terminal_positions(&self) -> impl Iterator<Item = (&Terminal, Point)> + '_ {
        self.terminals
            .iter()
            .map(|t| (t, self.placement.transform(t.offset)))
    }
}

/// Named reference from a wire end to a component terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerminalRef {
    pub component: ComponentId,
    pub terminal: String,
}

impl TerminalRef {
    pub fn new(component: impl Into<ComponentId>, terminal: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            terminal: terminal.into(),
        }
    }
}

/// Straight piece of a wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }
}

/// An undirected wire: a run of segments with optional terminal references
/// at either end. A wire without segments carries no connectivity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wire {
    pub segments: Vec<Segment>,
    pub start: Option<TerminalRef>,
    pub end: Option<TerminalRef>,
}

impl Wire {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    /// Wire through consecutive points.
    pub fn polyline<P: Into<Point> + Copy>(points: &[P]) -> Self {
        Self::new(
            points
                .windows(2)
                .map(|w| Segment::new(w[0], w[1]))
                .collect(),
        )
    }

    pub fn from_terminal(mut self, component: impl Into<ComponentId>, terminal: &str) -> Self {
        self.start = Some(TerminalRef::new(component, terminal));
        self
    }

    pub fn to_terminal(mut self, component: impl Into<ComponentId>, terminal: &str) -> Self {
        self.end = Some(TerminalRef::new(component, terminal));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Start of the first segment and end of the last one.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some((first.start, last.end))
    }
}

/// The placed components and wires of one circuit, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Schematic {
    components: Vec<Component>,
    index: HashMap<ComponentId, usize>,
    wires: Vec<Wire>,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, component: Component) -> NetlistResult<()> {
        if self.index.contains_key(&component.id) {
            return Err(NetlistError::DuplicateComponent {
                id: component.id.clone(),
            });
        }
        self.index
            .insert(component.id.clone(), self.components.len());
        self.components.push(component);
        Ok(())
    }

    /// Delete a component. Wires that referenced it keep their geometry;
    /// their stale references are ignored downstream.
    pub fn remove_component(&mut self, id: &str) -> NetlistResult<Component> {
        let pos = self
            .index
            .remove(id)
            .ok_or_else(|| NetlistError::UnknownComponent { id: id.into() })?;
        let removed = self.components.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(removed)
    }

    pub fn add_wire(&mut self, wire: Wire) {
        self.wires.push(wire);
    }

    /// Draw a straight wire between two terminals, referencing both ends.
    pub fn connect(&mut self, from: (&str, &str), to: (&str, &str)) -> NetlistResult<()> {
        let a = self.terminal_point(from.0, from.1)?;
        let b = self.terminal_point(to.0, to.1)?;
        self.add_wire(
            Wire::new(vec![Segment::new(a, b)])
                .from_terminal(from.0, from.1)
                .to_terminal(to.0, to.1),
        );
        Ok(())
    }

    fn terminal_point(&self, component: &str, terminal: &str) -> NetlistResult<Point> {
        let comp = self
            .component(component)
            .ok_or_else(|| NetlistError::UnknownComponent {
                id: component.into(),
            })?;
        let t = comp
            .terminal_by_name(terminal)
            .ok_or_else(|| NetlistError::UnknownTerminal {
                component: comp.id.clone(),
                terminal: terminal.to_string(),
            })?;
        Ok(comp.placement.transform(t.offset))
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.index.get(id).map(|&i| &self.components[i])
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        let i = *self.index.get(id)?;
        self.components.get_mut(i)
    }

    /// Insertion position of a component.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Resolve a wire-end reference to its component and terminal.
    pub fn resolve(&self, r: &TerminalRef) -> Option<(&Component, &Terminal)> {
        let comp = self.component(r.component.as_str())?;
        let terminal = comp.terminal_by_name(&r.terminal)?;
        Some((comp, terminal))
    }
}
