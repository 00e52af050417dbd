//! Types for the dependency graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

/// Identifier of a unit within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub(crate) usize);

impl UnitId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit_{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    order_index: usize,
}

/// Directed graph of data dependencies between units.
///
/// Edges go from producer to consumer.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<UnitId, ()>,
    node_indices: Vec<NodeIndex>,
    nodes: Vec<Node>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit. Ids are assigned densely in insertion order.
    pub fn add_unit(&mut self, name: impl Into<String>, order_index: usize) -> UnitId {
        let id = UnitId::new(self.nodes.len());
        let idx = self.graph.add_node(id);
        self.node_indices.push(idx);
        self.nodes.push(Node {
            name: name.into(),
            order_index,
        });
        id
    }

    /// Record that `consumer` depends on `producer`.
    ///
    /// Self edges and repeated edges are ignored.
    pub fn add_edge(&mut self, producer: UnitId, consumer: UnitId) {
        if producer == consumer {
            return;
        }
        let (from, to) = (self.node_indices[producer.0], self.node_indices[consumer.0]);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Fail with the first cycle found, listed in cycle order starting
    /// from its earliest unit.
    pub fn check_acyclic(&self) -> Result<()> {
        use petgraph::algo::kosaraju_scc;

        let mut cycles: Vec<Vec<NodeIndex>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .collect();
        cycles.sort_by_key(|scc| scc.iter().map(|&idx| self.order_of(idx)).min());

        match cycles.first() {
            Some(scc) => Err(Error::CyclicDependency {
                cycle: self.cycle_path(scc),
            }),
            None => Ok(()),
        }
    }

    /// Walk one strongly connected component into a concrete cycle.
    fn cycle_path(&self, scc: &[NodeIndex]) -> Vec<String> {
        let members: FxHashSet<NodeIndex> = scc.iter().copied().collect();
        let Some(&start) = scc.iter().min_by_key(|&&idx| self.order_of(idx)) else {
            return Vec::new();
        };

        let mut parent: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        let mut queue = VecDeque::from([start]);
        let mut visited = FxHashSet::from_iter([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.sorted_neighbors(node, Direction::Outgoing) {
                if next == start {
                    let mut path = vec![node];
                    let mut current = node;
                    while current != start {
                        current = parent[&current];
                        path.push(current);
                    }
                    path.reverse();
                    return path
                        .into_iter()
                        .map(|idx| self.nodes[self.graph[idx].0].name.clone())
                        .collect();
                }
                if members.contains(&next) && visited.insert(next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        scc.iter()
            .map(|&idx| self.nodes[self.graph[idx].0].name.clone())
            .collect()
    }

    /// Units in dependency order.
    ///
    /// Among the units that are ready at any point, the one with the
    /// smallest `order_index` comes first, so a source that is already
    /// topologically sorted keeps its order.
    pub fn topological_order(&self) -> Result<Vec<UnitId>> {
        self.check_acyclic()?;

        let mut in_degree: Vec<usize> = self
            .node_indices
            .iter()
            .map(|&idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(id, _)| Reverse((self.nodes[id].order_index, id)))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, id))) = ready.pop() {
            order.push(UnitId(id));
            for next in self.graph.neighbors(self.node_indices[id]) {
                let next_id = self.graph[next].0;
                in_degree[next_id] -= 1;
                if in_degree[next_id] == 0 {
                    ready.push(Reverse((self.nodes[next_id].order_index, next_id)));
                }
            }
        }

        Ok(order)
    }

    pub fn name(&self, id: UnitId) -> &str {
        &self.nodes[id.0].name
    }

    /// Get the number of units.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn order_of(&self, idx: NodeIndex) -> usize {
        self.nodes[self.graph[idx].0].order_index
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_by_key(|&n| (self.order_of(n), self.graph[n].0));
        neighbors
    }
}
