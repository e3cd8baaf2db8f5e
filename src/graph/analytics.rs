//! Relation-pattern uniqueness over a scene's ground-truth relation graph.
//!
//! The relation graph has one node per entity and an edge `i → j` for every
//! related pair, labelled with the relations holding for it (`j` is `label` of
//! `i`). An entity is easy to single out in language when some relation
//! pattern touching it occurs exactly once:
//!
//! - **1-edge**: an incoming or outgoing label that appears on exactly one edge.
//! - **2-edge**: an incoming path `p → q → e` whose inverted label pair
//!   `(inv(l1), inv(l2))` occurs exactly once among all paths ending at `e`.
//!
//! All results are sorted by entity index.

use std::collections::BTreeMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::relation::SpatialRelation;
use crate::scene::Scene;

/// Build the relation graph. Node `n` carries entity index `n`.
pub fn relation_graph(scene: &Scene) -> DiGraph<usize, Vec<SpatialRelation>> {
    let mut graph = DiGraph::with_capacity(scene.len(), scene.relations().len());
    for entity in scene.entities() {
        graph.add_node(entity.index);
    }
    for ((i, j), labels) in scene.relations().iter() {
        graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), labels.to_vec());
    }
    graph
}

// ---------------------------------------------------------------------------
// 1-edge uniqueness
// ---------------------------------------------------------------------------

/// Labels occurring exactly once on an entity's incoming or outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeUniqueness {
    pub entity: usize,
    pub unique_incoming: Vec<SpatialRelation>,
    pub unique_outgoing: Vec<SpatialRelation>,
}

impl EdgeUniqueness {
    pub fn is_unique(&self) -> bool {
        !self.unique_incoming.is_empty() || !self.unique_outgoing.is_empty()
    }
}

fn labels_occurring_once<'a>(
    labels: impl Iterator<Item = &'a SpatialRelation>,
) -> Vec<SpatialRelation> {
    let mut counts: BTreeMap<SpatialRelation, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .map(|(label, _)| label)
        .collect()
}

/// 1-edge uniqueness for every entity.
pub fn one_edge_uniqueness(graph: &DiGraph<usize, Vec<SpatialRelation>>) -> Vec<EdgeUniqueness> {
    graph
        .node_indices()
        .map(|n| {
            let labels_in = |dir| {
                labels_occurring_once(graph.edges_directed(n, dir).flat_map(|e| e.weight().iter()))
            };
            EdgeUniqueness {
                entity: graph[n],
                unique_incoming: labels_in(Direction::Incoming),
                unique_outgoing: labels_in(Direction::Outgoing),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 2-edge uniqueness
// ---------------------------------------------------------------------------

/// An incoming two-edge path `start → via → end` and its inverted label pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathPattern {
    pub labels: (SpatialRelation, SpatialRelation),
    pub start: usize,
    pub via: usize,
}

/// Path patterns unique among those ending at `entity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathUniqueness {
    pub entity: usize,
    pub unique_paths: Vec<PathPattern>,
}

/// How often a label pair occurs over all incoming two-edge paths of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CombinationCount {
    pub labels: (SpatialRelation, SpatialRelation),
    pub count: usize,
}

fn incoming_paths(graph: &DiGraph<usize, Vec<SpatialRelation>>, end: NodeIndex) -> Vec<PathPattern> {
    let mut paths = Vec::new();
    let mut vias: Vec<NodeIndex> = graph.neighbors_directed(end, Direction::Incoming).collect();
    vias.sort_unstable();
    for via in vias {
        let Some(second) = graph.find_edge(via, end).map(|e| &graph[e]) else {
            continue;
        };
        let mut starts: Vec<NodeIndex> =
            graph.neighbors_directed(via, Direction::Incoming).collect();
        starts.sort_unstable();
        for start in starts {
            if start == end {
                continue;
            }
            let Some(first) = graph.find_edge(start, via).map(|e| &graph[e]) else {
                continue;
            };
            for l1 in first {
                for l2 in second {
                    paths.push(PathPattern {
                        labels: (l1.inverse(), l2.inverse()),
                        start: graph[start],
                        via: graph[via],
                    });
                }
            }
        }
    }
    paths
}

/// 2-edge uniqueness per entity, plus global label-pair counts (sorted by pair).
pub fn two_edge_uniqueness(
    graph: &DiGraph<usize, Vec<SpatialRelation>>,
) -> (Vec<PathUniqueness>, Vec<CombinationCount>) {
    let mut global: BTreeMap<(SpatialRelation, SpatialRelation), usize> = BTreeMap::new();
    let mut per_entity = Vec::with_capacity(graph.node_count());

    for end in graph.node_indices() {
        let paths = incoming_paths(graph, end);
        let mut local: BTreeMap<(SpatialRelation, SpatialRelation), usize> = BTreeMap::new();
        for path in &paths {
            *local.entry(path.labels).or_default() += 1;
            *global.entry(path.labels).or_default() += 1;
        }
        per_entity.push(PathUniqueness {
            entity: graph[end],
            unique_paths: paths
                .into_iter()
                .filter(|p| local.get(&p.labels) == Some(&1))
                .collect(),
        });
    }

    let counts = global
        .into_iter()
        .map(|(labels, count)| CombinationCount { labels, count })
        .collect();
    (per_entity, counts)
}

// ---------------------------------------------------------------------------
// Combined
// ---------------------------------------------------------------------------

/// Full uniqueness report of a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniquenessReport {
    pub one_edge: Vec<EdgeUniqueness>,
    pub two_edge: Vec<PathUniqueness>,
    pub combination_counts: Vec<CombinationCount>,
    /// Entities with both 1-edge and 2-edge uniqueness.
    pub both: Vec<usize>,
    pub only_one_edge: Vec<usize>,
    pub only_two_edge: Vec<usize>,
    pub neither: Vec<usize>,
}

/// Run both analyses and partition entities by which kinds of uniqueness they have.
pub fn analyze(scene: &Scene) -> UniquenessReport {
    let graph = relation_graph(scene);
    let one_edge = one_edge_uniqueness(&graph);
    let (two_edge, combination_counts) = two_edge_uniqueness(&graph);

    let mut both = Vec::new();
    let mut only_one_edge = Vec::new();
    let mut only_two_edge = Vec::new();
    let mut neither = Vec::new();
    for (one, two) in one_edge.iter().zip(&two_edge) {
        match (one.is_unique(), !two.unique_paths.is_empty()) {
            (true, true) => both.push(one.entity),
            (true, false) => only_one_edge.push(one.entity),
            (false, true) => only_two_edge.push(one.entity),
            (false, false) => neither.push(one.entity),
        }
    }

    tracing::debug!(
        entities = scene.len(),
        both = both.len(),
        neither = neither.len(),
        "uniqueness analysis"
    );

    UniquenessReport {
        one_edge,
        two_edge,
        combination_counts,
        both,
        only_one_edge,
        only_two_edge,
        neither,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::fixtures;
    use SpatialRelation::*;

    #[test]
    fn relation_graph_mirrors_table() {
        let scene = fixtures::three_objects();
        let graph = relation_graph(&scene);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), scene.relations().len());
        let e = graph.find_edge(NodeIndex::new(1), NodeIndex::new(2)).unwrap();
        assert_eq!(graph[e], vec![Left, Front]);
    }

    #[test]
    fn one_edge_counts_labels() {
        let scene = fixtures::three_objects();
        let results = one_edge_uniqueness(&relation_graph(&scene));
        // Sphere (1): front of it are the cube and the cylinder; left only the cylinder.
        assert_eq!(results[1].unique_outgoing, vec![Left]);
        // Cylinder (2) is left of the cube and left of the sphere.
        assert_eq!(results[2].unique_incoming, vec![Front]);
        assert_eq!(results[0].unique_outgoing, vec![Left, Behind]);
    }

    #[test]
    fn two_edge_paths_use_inverted_labels() {
        let scene = fixtures::three_objects();
        let (per_entity, counts) = two_edge_uniqueness(&relation_graph(&scene));
        let cube = &per_entity[0];
        // Path cylinder → sphere → cube: cylinder→sphere is [Right, Behind], sphere→cube is [Front].
        assert!(cube.unique_paths.contains(&PathPattern {
            labels: (Left, Behind),
            start: 2,
            via: 1,
        }));
        let total: usize = counts.iter().map(|c| c.count).sum();
        let enumerated: usize = per_entity
            .iter()
            .map(|p| incoming_paths(&relation_graph(&scene), NodeIndex::new(p.entity)).len())
            .sum();
        assert_eq!(total, enumerated);
    }

    #[test]
    fn two_objects_have_no_two_edge_paths() {
        let scene = fixtures::scene(&[
            ("cube", "red", [0.0, 0.0, 0.0]),
            ("sphere", "blue", [0.0, 2.0, 0.0]),
        ]);
        let report = analyze(&scene);
        assert!(report.combination_counts.is_empty());
        assert_eq!(report.only_one_edge, vec![0, 1]);
        assert!(report.both.is_empty());
        assert!(report.neither.is_empty());
    }

    #[test]
    fn partition_covers_every_entity() {
        let scene = fixtures::scene(&[
            ("cube", "red", [-2.93, -1.75, 0.7]),
            ("cube", "blue", [0.441, 2.99, 0.7]),
            ("cylinder", "gray", [-1.37, 2.08, 0.7]),
            ("sphere", "green", [1.55, 0.68, 0.35]),
        ]);
        let report = analyze(&scene);
        let mut all: Vec<usize> = report
            .both
            .iter()
            .chain(&report.only_one_edge)
            .chain(&report.only_two_edge)
            .chain(&report.neither)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_scene() {
        let scene = fixtures::scene(&[]);
        let report = analyze(&scene);
        assert!(report.one_edge.is_empty());
        assert!(report.neither.is_empty());
    }
}
