//! Net resolution from wire geometry.
//!
//! Every terminal position and every wire segment endpoint becomes a point.
//! Points are merged with a disjoint-set forest when they are:
//! - the two ends of one segment, or consecutive segments of one wire
//! - within the merge tolerance of each other (terminal-to-wire and wire-to-wire)
//! - a wire end and the terminal that end explicitly references
//!
//! Each resulting set that contains a terminal is a net. Sets touching a
//! ground terminal become net `"0"`; the rest are numbered in the order their
//! first terminal is met (components in insertion order, terminals by index).

use std::collections::{HashMap, HashSet};

use sl_core::{ComponentId, NetId};

use crate::error::{NetlistError, NetlistResult};
use crate::geometry::Point;
use crate::schematic::Schematic;

/// Default distance under which two points are the same electrical point.
pub const DEFAULT_MERGE_TOLERANCE: f64 = 5.0;

/// Options controlling net resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectivityOptions {
    /// Points closer than or equal to this distance are merged.
    pub tolerance: f64,
}

impl Default for ConnectivityOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_MERGE_TOLERANCE,
        }
    }
}

impl ConnectivityOptions {
    pub fn with_tolerance(tolerance: f64) -> NetlistResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(NetlistError::InvalidTolerance { value: tolerance });
        }
        Ok(Self { tolerance })
    }
}

/// One (component, terminal) assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct NetEntry {
    pub component: ComponentId,
    pub terminal_index: usize,
    pub terminal_name: String,
    pub net: NetId,
}

/// Mapping from every (component, terminal) pair to its net.
#[derive(Debug, Clone, Default)]
pub struct NetMap {
    entries: Vec<NetEntry>,
    lookup: HashMap<(ComponentId, usize), usize>,
    /// Nets in assignment order.
    net_order: Vec<NetId>,
}

impl NetMap {
    pub fn net_of(&self, component: &str, terminal_index: usize) -> Option<&NetId> {
        self.lookup
            .get(&(ComponentId::new(component), terminal_index))
            .map(|&i| &self.entries[i].net)
    }

    pub fn net_of_name(&self, component: &str, terminal_name: &str) -> Option<&NetId> {
        self.entries
            .iter()
            .find(|e| e.component.as_str() == component && e.terminal_name == terminal_name)
            .map(|e| &e.net)
    }

    /// All assignments, components in insertion order and terminals by index.
    pub fn iter(&self) -> impl Iterator<Item = &NetEntry> {
        self.entries.iter()
    }

    /// Distinct nets in assignment order (ground first if it was met first).
    pub fn net_ids(&self) -> &[NetId] {
        &self.net_order
    }

    pub fn members<'a>(&'a self, net: &'a NetId) -> impl Iterator<Item = &'a NetEntry> + 'a {
        self.entries.iter().filter(move |e| &e.net == net)
    }

    /// Members of every net, nets in assignment order.
    pub fn nets(&self) -> impl Iterator<Item = (&NetId, Vec<&NetEntry>)> {
        self.net_order
            .iter()
            .map(|net| (net, self.members(net).collect()))
    }

    pub fn net_count(&self) -> usize {
        self.net_order.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve nets for every terminal of every placed component.
pub fn resolve_nets(schematic: &Schematic, options: &ConnectivityOptions) -> NetMap {
    let mut points: Vec<Point> = Vec::new();
    // (component position, terminal index, point id)
    let mut terminal_points: Vec<(usize, usize, usize)> = Vec::new();
    let mut terminal_lookup: HashMap<(usize, usize), usize> = HashMap::new();

    for (ci, comp) in schematic.components().iter().enumerate() {
        for (terminal, pos) in comp.terminal_positions() {
            let id = points.len();
            points.push(pos);
            terminal_points.push((ci, terminal.index, id));
            terminal_lookup.insert((ci, terminal.index), id);
        }
    }

    let mut dsu = DisjointSet::new(points.len());
    let mut ignored_wires = 0usize;

    for (wi, wire) in schematic.wires().iter().enumerate() {
        let segments: Vec<_> = wire.segments.iter().filter(|s| s.is_finite()).collect();
        if segments.is_empty() {
            ignored_wires += 1;
            tracing::trace!(wire = wi, "wire has no usable segments, ignored");
            continue;
        }

        let mut previous_end: Option<usize> = None;
        let mut first_start = None;
        let mut last_end = None;
        for seg in segments {
            let a = dsu.push();
            points.push(seg.start);
            let b = dsu.push();
            points.push(seg.end);
            dsu.union(a, b);
            if let Some(prev) = previous_end {
                dsu.union(prev, a);
            }
            previous_end = Some(b);
            first_start.get_or_insert(a);
            last_end = Some(b);
        }

        for (reference, point) in [(&wire.start, first_start), (&wire.end, last_end)] {
            let (Some(reference), Some(point)) = (reference, point) else {
                continue;
            };
            let target = schematic
                .position_of(reference.component.as_str())
                .and_then(|ci| {
                    let comp = &schematic.components()[ci];
                    let t = comp.terminal_by_name(&reference.terminal)?;
                    terminal_lookup.get(&(ci, t.index)).copied()
                });
            match target {
                Some(terminal_point) => dsu.union(point, terminal_point),
                None => tracing::trace!(
                    wire = wi,
                    component = %reference.component,
                    terminal = %reference.terminal,
                    "wire references an unknown terminal, reference ignored"
                ),
            }
        }
    }

    merge_nearby(&points, options.tolerance, &mut dsu);

    // Roots touching a ground terminal.
    let grounded: HashSet<usize> = terminal_points
        .iter()
        .filter(|(ci, _, _)| schematic.components()[*ci].kind.is_ground())
        .map(|&(_, _, id)| dsu.find(id))
        .collect();

    let mut map = NetMap::default();
    let mut root_to_net: HashMap<usize, NetId> = HashMap::new();
    let mut next_net = 1u32;

    for &(ci, terminal_index, id) in &terminal_points {
        let root = dsu.find(id);
        let net = root_to_net
            .entry(root)
            .or_insert_with(|| {
                let net = if grounded.contains(&root) {
                    NetId::ground()
                } else {
                    let net = NetId::numbered(next_net);
                    next_net += 1;
                    net
                };
                map.net_order.push(net.clone());
                net
            })
            .clone();

        let comp = &schematic.components()[ci];
        let terminal_name = comp
            .terminal(terminal_index)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        map.lookup
            .insert((comp.id.clone(), terminal_index), map.entries.len());
        map.entries.push(NetEntry {
            component: comp.id.clone(),
            terminal_index,
            terminal_name,
            net,
        });
    }

    tracing::debug!(
        points = points.len(),
        terminals = map.entries.len(),
        nets = map.net_order.len(),
        ignored_wires,
        "resolved nets"
    );

    map
}

/// Union every pair of points within `tolerance`, using a uniform grid so
/// only neighbouring cells are compared.
///
/// Cell keys saturate for coordinates far outside the `i64` range; the
/// neighbour walk skips cells past the edge of the key space.
fn merge_nearby(points: &[Point], tolerance: f64, dsu: &mut DisjointSet) {
    let cell = if tolerance > 0.0 { tolerance } else { 1.0 };
    let key = |p: Point| ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, &p) in points.iter().enumerate() {
        grid.entry(key(p)).or_default().push(i);
    }

    for (i, &p) in points.iter().enumerate() {
        let (cx, cy) = key(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let (Some(nx), Some(ny)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                let Some(bucket) = grid.get(&(nx, ny)) else {
                    continue;
                };
                for &j in bucket {
                    if j > i && p.distance(points[j]) <= tolerance {
                        dsu.union(i, j);
                    }
                }
            }
        }
    }
}

/// Disjoint-set forest with path halving and union by size.
#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Add a singleton and return its id.
    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.size.push(1);
        id
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }
}
