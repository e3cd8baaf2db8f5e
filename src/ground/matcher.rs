//! Relation matching and scoring.
//!
//! Given an anchor entity and a relation, the matcher finds every entity whose
//! offset from the anchor satisfies the relation's axis/sign constraint, scores
//! the matches, L2-normalizes the scores of the call, and writes one edge
//! `anchor → match` per match into the candidate graph.

use std::collections::BTreeSet;

use crate::config::ScoringConfig;
use crate::geometry::OffsetRecord;
use crate::graph::CandidateGraph;
use crate::mention::ObjectMention;
use crate::relation::SpatialRelation;
use crate::scene::{Entity, Scene};

use super::Candidate;

/// Which entities a match may produce.
#[derive(Debug, Clone, Copy)]
pub struct MatchFilter<'a> {
    /// Committed groundings that must not reappear as candidates.
    pub excluded: &'a BTreeSet<usize>,
    /// Mention being resolved; its descriptor, if any, must match.
    pub target: Option<&'a ObjectMention>,
}

impl<'a> MatchFilter<'a> {
    pub fn excluding(excluded: &'a BTreeSet<usize>) -> Self {
        Self {
            excluded,
            target: None,
        }
    }

    pub fn with_target(mut self, target: Option<&'a ObjectMention>) -> Self {
        self.target = target;
        self
    }

    pub fn admits(&self, entity: &Entity) -> bool {
        if self.excluded.contains(&entity.index) {
            return false;
        }
        match self.target {
            Some(mention) if mention.has_descriptor() => mention.matches(entity),
            _ => true,
        }
    }
}

/// Output of one matcher call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Matches with their normalized scores, by ascending entity index.
    pub matches: Vec<Candidate>,
    /// Pairs skipped because their offset record is degenerate.
    pub degenerate: Vec<(usize, usize)>,
}

impl MatchOutcome {
    pub fn entities(&self) -> impl Iterator<Item = usize> + '_ {
        self.matches.iter().map(|c| c.entity)
    }
}

/// Score of a qualifying pair: `dist_scale * distance + ratio_scale * alignment`.
///
/// `alignment` is the fraction of the distance lying along the relation's axis,
/// in `[0, 1]`. With a negative `dist_scale` nearer and better aligned objects
/// score higher.
pub fn relation_score(record: &OffsetRecord, relation: SpatialRelation, scoring: &ScoringConfig) -> f64 {
    let distance = record.distance();
    if distance == 0.0 {
        return 0.0;
    }
    let alignment = record.delta[relation.axis().index()].abs() / distance;
    scoring.dist_scale * distance + scoring.ratio_scale * alignment
}

/// Scale `scores` to unit L2 norm. All-zero input is left untouched.
pub fn l2_normalize(scores: &mut [f64]) {
    let norm = scores.iter().map(|s| s * s).sum::<f64>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for s in scores.iter_mut() {
            *s /= norm;
        }
    }
}

/// Finds and scores entities standing in a relation to an anchor.
#[derive(Debug, Clone, Copy)]
pub struct RelationMatcher<'a> {
    scene: &'a Scene,
    scoring: ScoringConfig,
}

impl<'a> RelationMatcher<'a> {
    pub fn new(scene: &'a Scene, scoring: ScoringConfig) -> Self {
        Self { scene, scoring }
    }

    /// Entities `j` with `direction(anchor, j)[axis] == sign` admitted by `filter`,
    /// ascending, together with their offset records.
    fn qualifying(
        &self,
        anchor: usize,
        relation: SpatialRelation,
        filter: &MatchFilter<'_>,
        degenerate: &mut Vec<(usize, usize)>,
    ) -> Vec<(usize, &'a OffsetRecord)> {
        let offsets = self.scene.offsets();
        let mut found = Vec::new();
        for entity in self.scene.entities() {
            let j = entity.index;
            if j == anchor {
                continue;
            }
            let Some(record) = offsets.get(anchor, j) else {
                if offsets.is_degenerate(anchor, j) {
                    degenerate.push((anchor, j));
                }
                continue;
            };
            if relation.holds(&record.direction) && filter.admits(entity) {
                found.push((j, record));
            }
        }
        found
    }

    /// Match `relation` from `anchor` and write normalized edges into `graph`.
    pub fn match_relation(
        &self,
        anchor: usize,
        relation: SpatialRelation,
        filter: &MatchFilter<'_>,
        graph: &mut CandidateGraph,
    ) -> MatchOutcome {
        let mut degenerate = Vec::new();
        let found = self.qualifying(anchor, relation, filter, &mut degenerate);

        let mut scores: Vec<f64> = found
            .iter()
            .map(|(_, record)| relation_score(record, relation, &self.scoring))
            .collect();
        l2_normalize(&mut scores);

        let matches: Vec<Candidate> = found
            .iter()
            .zip(&scores)
            .map(|(&(entity, _), &score)| {
                graph.add_edge(anchor, entity, score);
                Candidate {
                    entity,
                    score,
                    anchor,
                    second_anchor: None,
                }
            })
            .collect();

        tracing::debug!(
            anchor,
            relation = %relation,
            matches = matches.len(),
            degenerate = degenerate.len(),
            "matched relation"
        );

        MatchOutcome { matches, degenerate }
    }
}
