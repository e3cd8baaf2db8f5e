//! Decomposition of the ternary "between" relation.
//!
//! For anchors `a2`, `a3` an entity `c` related to both is accepted when the
//! vectors `a2 → c` and `a3 → c` point in roughly opposite directions
//! (`cos ≤ 0`). Accepted entities are scored by closeness to the anchors'
//! midpoint and by how opposed the two vectors are.

use nalgebra::Vector3;

use crate::config::ScoringConfig;
use crate::graph::CandidateGraph;
use crate::scene::Scene;

use super::Candidate;
use super::matcher::{MatchFilter, l2_normalize};

/// Cosine of the angle between `a2 → c` and `a3 → c`, `None` when either vector
/// has zero length.
pub fn between_cosine(c: &Vector3<f64>, a2: &Vector3<f64>, a3: &Vector3<f64>) -> Option<f64> {
    let v2 = c - a2;
    let v3 = c - a3;
    let n2 = v2.norm();
    let n3 = v3.norm();
    if n2 == 0.0 || n3 == 0.0 {
        return None;
    }
    Some((v2.dot(&v3) / (n2 * n3)).clamp(-1.0, 1.0))
}

/// Entities between `a2` and `a3`, with normalized scores.
///
/// Each accepted entity also receives two edges, `a2 → c` and `a3 → c`, each
/// carrying half its score.
pub fn decompose(
    scene: &Scene,
    scoring: &ScoringConfig,
    a2: usize,
    a3: usize,
    filter: &MatchFilter<'_>,
    graph: &mut CandidateGraph,
) -> Vec<Candidate> {
    let (Some(p2), Some(p3)) = (scene.position(a2), scene.position(a3)) else {
        return vec![];
    };
    if a2 == a3 {
        return vec![];
    }
    let midpoint = (p2 + p3) / 2.0;
    let relations = scene.relations();

    let mut accepted: Vec<(usize, f64)> = Vec::new();
    for entity in scene.entities() {
        let c = entity.index;
        if c == a2 || c == a3 || !filter.admits(entity) {
            continue;
        }
        if !relations.related(a2, c) || !relations.related(a3, c) {
            continue;
        }
        let Some(cos) = between_cosine(&entity.position, p2, p3) else {
            continue;
        };
        if cos > 0.0 {
            continue;
        }
        let distance = (entity.position - midpoint).norm();
        accepted.push((c, scoring.dist_scale * distance + scoring.ratio_scale * -cos));
    }

    let mut scores: Vec<f64> = accepted.iter().map(|&(_, s)| s).collect();
    l2_normalize(&mut scores);

    let candidates: Vec<Candidate> = accepted
        .iter()
        .zip(scores)
        .map(|(&(entity, _), score)| {
            graph.add_edge(a2, entity, score / 2.0);
            graph.add_edge(a3, entity, score / 2.0);
            Candidate {
                entity,
                score,
                anchor: a2,
                second_anchor: Some(a3),
            }
        })
        .collect();

    tracing::debug!(a2, a3, accepted = candidates.len(), "decomposed between");
    candidates
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::mention::ObjectMention;
    use crate::scene::fixtures;

    fn row() -> Scene {
        fixtures::scene(&[
            ("cube", "red", [0.0, 0.0, 0.0]),
            ("cube", "blue", [0.0, 4.0, 0.0]),
            ("sphere", "green", [0.0, 2.0, 0.0]),
            ("sphere", "yellow", [2.0, 6.0, 0.0]),
            ("sphere", "gray", [1.0, 2.0, 0.0]),
        ])
    }

    #[test]
    fn accepts_only_opposing_directions() {
        let scene = row();
        let excluded = BTreeSet::from([0, 1]);
        let mut graph = CandidateGraph::new();
        let found = decompose(
            &scene,
            &ScoringConfig::default(),
            0,
            1,
            &MatchFilter::excluding(&excluded),
            &mut graph,
        );
        let entities: Vec<usize> = found.iter().map(|c| c.entity).collect();
        assert_eq!(entities, vec![2, 4]);
        for c in &found {
            let cos = between_cosine(
                scene.position(c.entity).unwrap(),
                scene.position(0).unwrap(),
                scene.position(1).unwrap(),
            )
            .unwrap();
            assert!(cos <= 0.0);
        }
        // The sphere on the midpoint beats the one off to the side.
        assert!(found[0].score > found[1].score);
    }

    #[test]
    fn writes_half_weight_edges_from_both_anchors() {
        let scene = row();
        let excluded = BTreeSet::new();
        let mut graph = CandidateGraph::new();
        let found = decompose(
            &scene,
            &ScoringConfig::default(),
            0,
            1,
            &MatchFilter::excluding(&excluded),
            &mut graph,
        );
        let green = found.iter().find(|c| c.entity == 2).unwrap();
        assert_eq!(green.second_anchor, Some(1));
        let w0 = graph.edge(0, 2).unwrap().weight;
        let w1 = graph.edge(1, 2).unwrap().weight;
        assert!((w0 - green.score / 2.0).abs() < 1e-12);
        assert_eq!(w0, w1);
        assert_eq!(graph.in_degree(2), 2);
    }

    #[test]
    fn target_filter_applies() {
        let scene = row();
        let excluded = BTreeSet::new();
        let target = ObjectMention::new(1, "sphere", Some("gray"));
        let mut graph = CandidateGraph::new();
        let found = decompose(
            &scene,
            &ScoringConfig::default(),
            0,
            1,
            &MatchFilter::excluding(&excluded).with_target(Some(&target)),
            &mut graph,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity, 4);
    }

    #[test]
    fn same_anchor_yields_nothing() {
        let scene = row();
        let excluded = BTreeSet::new();
        let mut graph = CandidateGraph::new();
        let found = decompose(
            &scene,
            &ScoringConfig::default(),
            0,
            0,
            &MatchFilter::excluding(&excluded),
            &mut graph,
        );
        assert!(found.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn zero_length_vector_has_no_cosine() {
        let p = Vector3::new(1.0, 1.0, 0.0);
        assert!(between_cosine(&p, &p, &Vector3::zeros()).is_none());
        let cos = between_cosine(&Vector3::zeros(), &Vector3::new(-1.0, 0.0, 0.0), &Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(cos, Some(-1.0));
    }
}
