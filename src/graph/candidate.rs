//! Candidate graph: directed, weighted edges `anchor → candidate` over entity indices.
//!
//! Uses a `petgraph` [`StableDiGraph`] so node indices survive pruning, with a
//! `BTreeMap` from entity index to node index for O(log n) lookups and
//! deterministic iteration order.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Bfs, Reversed};

/// Data carried on an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateEdge {
    /// Accumulated score.
    pub weight: f64,
    /// Number of matcher writes merged into this edge.
    pub support: usize,
}

/// Weighted candidate graph, owned by a single grounding call.
#[derive(Debug, Clone, Default)]
pub struct CandidateGraph {
    graph: StableDiGraph<usize, CandidateEdge>,
    /// Entity index → node index.
    node_index: BTreeMap<usize, NodeIndex>,
}

impl CandidateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a node exists for `entity`, returning its index.
    pub fn ensure_node(&mut self, entity: usize) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&entity) {
            return idx;
        }
        let idx = self.graph.add_node(entity);
        self.node_index.insert(entity, idx);
        idx
    }

    /// Add `weight` to the edge `from → to`, creating nodes and edge as needed.
    ///
    /// Repeated writes accumulate into one edge, so in-degree counts distinct
    /// anchors. Self-loops are ignored; returns whether the edge was written.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: f64) -> bool {
        if from == to {
            return false;
        }
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        match self.graph.find_edge(a, b) {
            Some(e) => {
                if let Some(edge) = self.graph.edge_weight_mut(e) {
                    edge.weight += weight;
                    edge.support += 1;
                }
            }
            None => {
                self.graph.add_edge(a, b, CandidateEdge { weight, support: 1 });
            }
        }
        true
    }

    pub fn contains(&self, entity: usize) -> bool {
        self.node_index.contains_key(&entity)
    }

    /// Edge data for `from → to`, if present.
    pub fn edge(&self, from: usize, to: usize) -> Option<CandidateEdge> {
        let a = *self.node_index.get(&from)?;
        let b = *self.node_index.get(&to)?;
        let e = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(e).copied()
    }

    /// All entity nodes in ascending order.
    pub fn nodes(&self) -> Vec<usize> {
        self.node_index.keys().copied().collect()
    }

    /// All edges as `(from, to, weight)`, sorted by endpoints.
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        let mut edges: Vec<(usize, usize, f64)> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                let weight = self.graph.edge_weight(e)?.weight;
                Some((self.graph[a], self.graph[b], weight))
            })
            .collect();
        edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        edges
    }

    pub fn in_degree(&self, entity: usize) -> usize {
        self.degree(entity, Direction::Incoming)
    }

    pub fn out_degree(&self, entity: usize) -> usize {
        self.degree(entity, Direction::Outgoing)
    }

    fn degree(&self, entity: usize, dir: Direction) -> usize {
        self.node_index
            .get(&entity)
            .map(|&idx| self.graph.edges_directed(idx, dir).count())
            .unwrap_or(0)
    }

    /// Sum of incoming edge weights.
    pub fn incoming_weight(&self, entity: usize) -> f64 {
        self.node_index
            .get(&entity)
            .map(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| e.weight().weight)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// `entity` and every entity with a path into it.
    ///
    /// An edge from `entity` to any of these would close a cycle.
    pub fn ancestors(&self, entity: usize) -> BTreeSet<usize> {
        let mut found = BTreeSet::from([entity]);
        let Some(&start) = self.node_index.get(&entity) else {
            return found;
        };
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        while let Some(node) = bfs.next(reversed) {
            found.insert(self.graph[node]);
        }
        found
    }

    /// Nodes with no outgoing edges, ascending.
    pub fn leaves(&self) -> Vec<usize> {
        self.node_index
            .iter()
            .filter(|&(_, &idx)| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|(&entity, _)| entity)
            .collect()
    }

    /// Remove a node and its edges. Returns whether it existed.
    pub fn remove_node(&mut self, entity: usize) -> bool {
        match self.node_index.remove(&entity) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_index.is_empty()
    }
}

impl std::fmt::Display for CandidateGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CandidateGraph({} nodes, {} edges)",
            self.node_count(),
            self.edge_count()
        )
    }
}
