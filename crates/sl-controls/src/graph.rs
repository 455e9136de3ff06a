//! Control signal graph structure.
//!
//! The signal graph is derived from the schematic:
//! - Every signal-domain component becomes a [`SignalBlock`]
//! - Every wire whose two ends reference signal-block terminals becomes a
//!   directed [`SignalEdge`], oriented away from the end that is an output
//! - Evaluation order is a topological sort; cycles are reported by name

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use sl_core::ComponentId;
use sl_netlist::{Schematic, TerminalRef};
use tracing::{debug, trace};

use crate::block::{SignalBlock, is_output};
use crate::error::{ControlResult, CycleError, CycleMember};

/// Directed edge from one block's output to another block's input terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEdge {
    pub from: ComponentId,
    /// Output terminal on the source block.
    pub from_terminal: String,
    pub to: ComponentId,
    /// Input terminal on the destination block.
    pub to_terminal: String,
}

/// Signal blocks in schematic insertion order plus the edges between them.
#[derive(Debug, Clone, Default)]
pub struct SignalGraph {
    blocks: Vec<SignalBlock>,
    index: HashMap<ComponentId, usize>,
    edges: Vec<SignalEdge>,
}

impl SignalGraph {
    /// Extract the signal domain of a schematic.
    ///
    /// Wires that are not referenced at both ends, that touch an electrical
    /// component, or whose ends are both inputs or both outputs are ignored.
    pub fn from_schematic(schematic: &Schematic) -> Self {
        let mut graph = Self::default();
        for component in schematic.components() {
            if let Some(block) = SignalBlock::from_component(component) {
                graph.index.insert(block.id.clone(), graph.blocks.len());
                graph.blocks.push(block);
            }
        }

        for wire in schematic.wires() {
            let (Some(start), Some(end)) = (&wire.start, &wire.end) else {
                continue;
            };
            match graph.orient(schematic, start, end) {
                Some(edge) => graph.edges.push(edge),
                None => trace!(
                    from = %start.component,
                    to = %end.component,
                    "wire does not form a signal edge"
                ),
            }
        }

        debug!(
            blocks = graph.blocks.len(),
            edges = graph.edges.len(),
            "signal graph built"
        );
        graph
    }

    fn orient(
        &self,
        schematic: &Schematic,
        start: &TerminalRef,
        end: &TerminalRef,
    ) -> Option<SignalEdge> {
        let (a, ta) = schematic.resolve(start)?;
        let (b, tb) = schematic.resolve(end)?;
        if !self.index.contains_key(&a.id) || !self.index.contains_key(&b.id) {
            return None;
        }
        let a_out = is_output(&a.kind, &ta.name);
        let b_out = is_output(&b.kind, &tb.name);
        let (src, src_t, dst, dst_t) = match (a_out, b_out) {
            (true, false) => (a, ta, b, tb),
            (false, true) => (b, tb, a, ta),
            _ => return None,
        };
        Some(SignalEdge {
            from: src.id.clone(),
            from_terminal: src_t.name.clone(),
            to: dst.id.clone(),
            to_terminal: dst_t.name.clone(),
        })
    }

    pub fn blocks(&self) -> &[SignalBlock] {
        &self.blocks
    }

    pub fn edges(&self) -> &[SignalEdge] {
        &self.edges
    }

    pub fn block(&self, id: &str) -> Option<&SignalBlock> {
        self.index.get(id).map(|&i| &self.blocks[i])
    }

    /// Insertion position of a block.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Edges as `(source, destination)` block positions.
    fn edge_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().filter_map(|e| {
            let from = self.position_of(e.from.as_str())?;
            let to = self.position_of(e.to.as_str())?;
            Some((from, to))
        })
    }

    /// Topological order as block positions.
    ///
    /// Among blocks that are ready at the same time, the one inserted first
    /// goes first, so the order is stable across runs.
    pub fn evaluation_positions(&self) -> ControlResult<Vec<usize>> {
        let n = self.blocks.len();
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        for (from, to) in self.edge_positions() {
            adj[from].push(to);
            in_degree[to] += 1;
        }

        // Kahn's algorithm with an ordered ready set
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &j in &adj[i] {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() != n {
            return Err(self.cycle_error().into());
        }
        Ok(order)
    }

    /// Compute a topological evaluation order for the blocks.
    ///
    /// Returns block ids such that every block comes after all blocks that
    /// feed it.
    pub fn evaluation_order(&self) -> ControlResult<Vec<ComponentId>> {
        Ok(self
            .evaluation_positions()?
            .into_iter()
            .map(|i| self.blocks[i].id.clone())
            .collect())
    }

    /// Name every block that lies on a cycle.
    ///
    /// A strongly connected component is a loop if it has more than one
    /// block or a block wired to itself. Blocks that are merely downstream
    /// of a loop are not reported.
    fn cycle_error(&self) -> CycleError {
        let mut graph = DiGraph::<usize, ()>::with_capacity(self.blocks.len(), self.edges.len());
        let nodes: Vec<NodeIndex> = (0..self.blocks.len()).map(|i| graph.add_node(i)).collect();
        for (from, to) in self.edge_positions() {
            graph.add_edge(nodes[from], nodes[to], ());
        }

        let mut loops: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<usize> = scc.into_iter().map(|n| graph[n]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        loops.sort_unstable_by_key(|members| members[0]);

        let mut all: Vec<usize> = loops.iter().flatten().copied().collect();
        all.sort_unstable();

        CycleError {
            members: all
                .into_iter()
                .map(|i| CycleMember {
                    id: self.blocks[i].id.clone(),
                    name: self.blocks[i].name.clone(),
                })
                .collect(),
            loops: loops
                .into_iter()
                .map(|members| members.into_iter().map(|i| self.blocks[i].id.clone()).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use sl_netlist::{Component, ComponentKind};

    fn schematic(blocks: &[(&str, ComponentKind)], wires: &[((&str, &str), (&str, &str))]) -> Schematic {
        let mut s = Schematic::new();
        for (i, (id, kind)) in blocks.iter().enumerate() {
            s.add_component(Component::new(*id, kind.clone()).at((i as f64 * 200.0, 0.0)))
                .unwrap();
        }
        for (from, to) in wires {
            s.connect(*from, *to).unwrap();
        }
        s
    }

    #[test]
    fn empty_graph() {
        let graph = SignalGraph::from_schematic(&Schematic::new());
        assert!(graph.is_empty());
        assert!(graph.edges().is_empty());
        assert!(graph.evaluation_order().unwrap().is_empty());
    }

    #[test]
    fn electrical_components_are_skipped() {
        let s = schematic(
            &[("R1", ComponentKind::Resistor), ("K1", ComponentKind::Constant)],
            &[],
        );
        let graph = SignalGraph::from_schematic(&s);
        assert_eq!(graph.len(), 1);
        assert!(graph.block("R1").is_none());
    }

    #[test]
    fn wire_drawn_backwards_is_reoriented() {
        let s = schematic(
            &[("K1", ComponentKind::Constant), ("G1", ComponentKind::Gain)],
            &[(("G1", "IN"), ("K1", "OUT"))],
        );
        let graph = SignalGraph::from_schematic(&s);
        assert_eq!(
            graph.edges(),
            [SignalEdge {
                from: "K1".into(),
                from_terminal: "OUT".into(),
                to: "G1".into(),
                to_terminal: "IN".into(),
            }]
        );
    }

    #[test]
    fn input_to_input_wire_is_ignored() {
        let s = schematic(
            &[("G1", ComponentKind::Gain), ("G2", ComponentKind::Gain)],
            &[(("G1", "IN"), ("G2", "IN"))],
        );
        assert!(SignalGraph::from_schematic(&s).edges().is_empty());
    }

    #[test]
    fn current_probe_series_pins_do_not_feed_back() {
        // G drives the probe's series input; the probe's series output is
        // wired back to G's input, which joins two inputs.
        let s = schematic(
            &[("G", ComponentKind::Gain), ("CP", ComponentKind::CurrentProbe)],
            &[(("G", "OUT"), ("CP", "IN")), (("CP", "OUT"), ("G", "IN"))],
        );
        let graph = SignalGraph::from_schematic(&s);
        assert_eq!(graph.edges().len(), 1);
        let order = graph.evaluation_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["G", "CP"]);
    }

    #[test]
    fn evaluation_order_simple() {
        // Inserted in reverse of dataflow.
        let s = schematic(
            &[
                ("b3", ComponentKind::Gain),
                ("b2", ComponentKind::Gain),
                ("b1", ComponentKind::Constant),
            ],
            &[(("b1", "OUT"), ("b2", "IN")), (("b2", "OUT"), ("b3", "IN"))],
        );
        let order = SignalGraph::from_schematic(&s).evaluation_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["b1", "b2", "b3"]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let s = schematic(
            &[
                ("K2", ComponentKind::Constant),
                ("S", ComponentKind::Sum),
                ("K1", ComponentKind::Constant),
            ],
            &[(("K1", "OUT"), ("S", "IN1")), (("K2", "OUT"), ("S", "IN2"))],
        );
        let order = SignalGraph::from_schematic(&s).evaluation_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["K2", "K1", "S"]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let s = schematic(
            &[("K", ComponentKind::Constant), ("G", ComponentKind::Gain)],
            &[(("G", "OUT"), ("G", "IN"))],
        );
        let err = SignalGraph::from_schematic(&s).evaluation_order().unwrap_err();
        let ControlError::Cycle(cycle) = err else {
            panic!("expected cycle error");
        };
        assert_eq!(cycle.loops, vec![vec![ComponentId::new("G")]]);
        assert!(!cycle.contains("K"));
    }

    #[test]
    fn downstream_blocks_are_not_reported() {
        let s = schematic(
            &[
                ("A", ComponentKind::Gain),
                ("B", ComponentKind::Gain),
                ("Sink", ComponentKind::Gain),
            ],
            &[
                (("A", "OUT"), ("B", "IN")),
                (("B", "OUT"), ("A", "IN")),
                (("B", "OUT"), ("Sink", "IN")),
            ],
        );
        let err = SignalGraph::from_schematic(&s).evaluation_order().unwrap_err();
        let ControlError::Cycle(cycle) = err else {
            panic!("expected cycle error");
        };
        assert_eq!(cycle.names().collect::<Vec<_>>(), ["A", "B"]);
        assert!(!cycle.contains("Sink"));
    }
}
