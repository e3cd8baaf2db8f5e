//! Pruning and ranking of the candidate graph.

use serde::Serialize;

use crate::graph::CandidateGraph;

/// A surviving leaf with its aggregate incoming weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub entity: usize,
    pub score: f64,
    pub in_degree: usize,
}

/// Result of pruning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Survivors, best first.
    pub ranked: Vec<RankedCandidate>,
    /// Leaves removed for having less support than the best-supported leaf.
    pub removed: Vec<usize>,
    pub max_in_degree: usize,
}

impl Ranking {
    pub fn best(&self) -> Option<&RankedCandidate> {
        self.ranked.first()
    }
}

/// Keep only the best-supported leaves and rank them.
///
/// Leaves are nodes without outgoing edges. Leaves whose in-degree is below the
/// maximum leaf in-degree are removed from `graph`; the rest are ranked by the sum
/// of their incoming weights, descending, ties broken by ascending entity index.
/// An empty graph, or one without leaves, yields an empty ranking.
pub fn prune(graph: &mut CandidateGraph) -> Ranking {
    let leaves = graph.leaves();
    let Some(max_in_degree) = leaves.iter().map(|&l| graph.in_degree(l)).max() else {
        return Ranking::default();
    };

    let mut removed = Vec::new();
    let mut ranked = Vec::new();
    for leaf in leaves {
        let in_degree = graph.in_degree(leaf);
        if in_degree < max_in_degree {
            removed.push(leaf);
        } else {
            ranked.push(RankedCandidate {
                entity: leaf,
                score: graph.incoming_weight(leaf),
                in_degree,
            });
        }
    }
    for &leaf in &removed {
        graph.remove_node(leaf);
    }

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.entity.cmp(&b.entity))
    });

    tracing::debug!(
        survivors = ranked.len(),
        removed = removed.len(),
        max_in_degree,
        "pruned candidate graph"
    );

    Ranking {
        ranked,
        removed,
        max_in_degree,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CandidateGraph {
        let mut g = CandidateGraph::new();
        g.add_edge(0, 5, 0.4);
        g.add_edge(1, 5, 0.3);
        g.add_edge(0, 6, 0.9);
        g.add_edge(1, 7, 0.2);
        g.add_edge(2, 7, 0.6);
        g.add_edge(3, 8, 0.1);
        g
    }

    #[test]
    fn keeps_max_in_degree_leaves() {
        let mut g = sample();
        let ranking = prune(&mut g);
        assert_eq!(ranking.max_in_degree, 2);
        assert_eq!(ranking.removed, vec![6, 8]);
        for r in &ranking.ranked {
            assert_eq!(r.in_degree, ranking.max_in_degree);
        }
        assert!(!g.contains(6));
        assert!(!g.contains(8));
    }

    #[test]
    fn ranks_by_aggregate_weight() {
        let mut g = sample();
        let ranking = prune(&mut g);
        let order: Vec<usize> = ranking.ranked.iter().map(|r| r.entity).collect();
        assert_eq!(order, vec![7, 5]);
        assert!((ranking.ranked[0].score - 0.8).abs() < 1e-12);
        assert!((ranking.ranked[1].score - 0.7).abs() < 1e-12);
        assert_eq!(ranking.best().unwrap().entity, 7);
    }

    #[test]
    fn ties_break_on_entity_index() {
        let mut g = CandidateGraph::new();
        g.add_edge(0, 9, 0.5);
        g.add_edge(0, 4, 0.5);
        let ranking = prune(&mut g);
        let order: Vec<usize> = ranking.ranked.iter().map(|r| r.entity).collect();
        assert_eq!(order, vec![4, 9]);
    }

    #[test]
    fn empty_graph_has_no_ranking() {
        let mut g = CandidateGraph::new();
        let ranking = prune(&mut g);
        assert!(ranking.best().is_none());
    }

    #[test]
    fn cycle_without_leaves_has_no_ranking() {
        let mut g = CandidateGraph::new();
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 0, 1.0);
        let ranking = prune(&mut g);
        assert!(ranking.ranked.is_empty());
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn isolated_nodes_are_leaves() {
        let mut g = CandidateGraph::new();
        g.ensure_node(3);
        g.ensure_node(1);
        let ranking = prune(&mut g);
        let order: Vec<usize> = ranking.ranked.iter().map(|r| r.entity).collect();
        assert_eq!(order, vec![1, 3]);
        assert_eq!(ranking.max_in_degree, 0);
    }
}
