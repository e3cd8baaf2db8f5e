//! Multi-round propagation of relation mentions.
//!
//! Each round walks the pending relations in order. A binary relation resolves
//! as soon as either endpoint has candidates: from `o1` directly, or from `o2`
//! with the endpoints swapped and the label inverted. A "between" relation
//! resolves once both anchor mentions have candidates and some entity lies
//! between them. Candidates found earlier in a round are visible to later
//! relations of the same round.
//!
//! No match may point back at an anchor's own ancestors in the candidate
//! graph, so the graph stays acyclic and always has leaves to rank.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::GroundConfig;
use crate::graph::CandidateGraph;
use crate::mention::{MentionId, MentionSet, RelationMention};
use crate::relation::SpatialRelation;
use crate::scene::Scene;

use super::matcher::{MatchFilter, RelationMatcher};
use super::seed::SeedGrounding;
use super::{Candidate, GroundingIssue, between};

enum Step {
    Resolved,
    Deferred,
}

/// State left behind by propagation.
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    pub graph: CandidateGraph,
    /// Mention → candidate entities, seed matches included.
    pub candidates: BTreeMap<MentionId, BTreeSet<usize>>,
    /// Every match written into the graph, in discovery order.
    pub matches: Vec<Candidate>,
    pub issues: Vec<GroundingIssue>,
    /// Rounds executed.
    pub rounds: usize,
}

struct Propagator<'a> {
    scene: &'a Scene,
    mentions: &'a MentionSet,
    seeds: &'a SeedGrounding,
    config: &'a GroundConfig,
    matcher: RelationMatcher<'a>,
    state: Propagation,
    degenerate: BTreeSet<(usize, usize)>,
}

impl<'a> Propagator<'a> {
    fn has_candidates(&self, mention: MentionId) -> bool {
        self.state
            .candidates
            .get(&mention)
            .is_some_and(|c| !c.is_empty())
    }

    fn candidates_of(&self, mention: MentionId) -> Vec<usize> {
        self.state
            .candidates
            .get(&mention)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True nodes, minus the seed matches of `target` itself.
    fn excluded_for(&self, target: MentionId) -> BTreeSet<usize> {
        let own = self.seeds.matches_of(target);
        self.seeds
            .true_nodes
            .iter()
            .copied()
            .filter(|e| !own.contains(e))
            .collect()
    }

    /// `excluded` plus every entity that reaches one of `anchors` in the graph.
    fn blocked_from(&self, excluded: &BTreeSet<usize>, anchors: &[usize]) -> BTreeSet<usize> {
        let mut blocked = excluded.clone();
        for &anchor in anchors {
            blocked.extend(self.state.graph.ancestors(anchor));
        }
        blocked
    }

    fn resolve(&mut self, relation: &RelationMention) -> Step {
        match *relation {
            RelationMention::Binary { o1, o2, label } => self.resolve_binary(o1, o2, label),
            RelationMention::Ternary { o1, o2, o3, .. } => self.resolve_between(o1, o2, o3),
        }
    }

    fn resolve_binary(&mut self, o1: MentionId, o2: MentionId, label: SpatialRelation) -> Step {
        let (from, to, relation) = if self.has_candidates(o1) {
            (o1, o2, label)
        } else if self.has_candidates(o2) {
            tracing::debug!(from = %o2, to = %o1, relation = %label.inverse(), "swapped relation");
            (o2, o1, label.inverse())
        } else {
            return Step::Deferred;
        };

        let mentions = self.mentions;
        let excluded = self.excluded_for(to);

        let mut found = BTreeSet::new();
        for anchor in self.candidates_of(from) {
            let blocked = self.blocked_from(&excluded, &[anchor]);
            let filter = MatchFilter::excluding(&blocked).with_target(mentions.object(to));
            let outcome = self
                .matcher
                .match_relation(anchor, relation, &filter, &mut self.state.graph);
            found.extend(outcome.entities());
            self.degenerate.extend(outcome.degenerate);
            self.state.matches.extend(outcome.matches);
        }
        self.state.candidates.entry(to).or_default().extend(found);
        Step::Resolved
    }

    fn resolve_between(&mut self, o1: MentionId, o2: MentionId, o3: MentionId) -> Step {
        if !self.has_candidates(o2) || !self.has_candidates(o3) {
            return Step::Deferred;
        }

        let mentions = self.mentions;
        let excluded = self.excluded_for(o1);

        let mut pairs = BTreeSet::new();
        let mut found = BTreeSet::new();
        for a2 in self.candidates_of(o2) {
            for a3 in self.candidates_of(o3) {
                if a2 == a3 || !pairs.insert((a2.min(a3), a2.max(a3))) {
                    continue;
                }
                let blocked = self.blocked_from(&excluded, &[a2, a3]);
                let filter = MatchFilter::excluding(&blocked).with_target(mentions.object(o1));
                let accepted = between::decompose(
                    self.scene,
                    &self.config.scoring,
                    a2,
                    a3,
                    &filter,
                    &mut self.state.graph,
                );
                found.extend(accepted.iter().map(|c| c.entity));
                self.state.matches.extend(accepted);
            }
        }

        if found.is_empty() {
            return Step::Deferred;
        }
        self.state.candidates.entry(o1).or_default().extend(found);
        Step::Resolved
    }

    fn run(mut self) -> Propagation {
        let max_rounds = self.config.max_rounds;
        let mut pending: Vec<RelationMention> = self.mentions.relations().to_vec();

        while !pending.is_empty() {
            if self.state.rounds == max_rounds {
                tracing::warn!(max_rounds, pending = pending.len(), "propagation round limit reached");
                self.state
                    .issues
                    .push(GroundingIssue::RoundLimitReached { max_rounds });
                self.give_up(pending);
                break;
            }
            self.state.rounds += 1;

            let before = pending.len();
            let mut deferred = Vec::new();
            for relation in pending {
                if let Step::Deferred = self.resolve(&relation) {
                    deferred.push(relation);
                }
            }

            tracing::debug!(
                round = self.state.rounds,
                resolved = before - deferred.len(),
                deferred = deferred.len(),
                "propagation round"
            );

            if deferred.len() == before {
                self.give_up(deferred);
                break;
            }
            pending = deferred;
        }

        let degenerate = std::mem::take(&mut self.degenerate);
        self.state.issues.extend(
            degenerate
                .into_iter()
                .map(|(first, second)| GroundingIssue::DegenerateGeometry { first, second }),
        );
        self.state
    }

    fn give_up(&mut self, relations: Vec<RelationMention>) {
        let rounds = self.state.rounds;
        for relation in relations {
            tracing::warn!(relation = %relation, rounds, "unresolvable relation");
            self.state
                .issues
                .push(GroundingIssue::UnresolvableRelation { relation, rounds });
        }
    }
}

/// Resolve every relation mention of `mentions`, starting from `seeds`.
pub fn propagate(
    scene: &Scene,
    mentions: &MentionSet,
    seeds: &SeedGrounding,
    config: &GroundConfig,
) -> Propagation {
    let candidates = seeds
        .matches
        .iter()
        .map(|(&id, entities)| (id, entities.iter().copied().collect()))
        .collect();

    Propagator {
        scene,
        mentions,
        seeds,
        config,
        matcher: RelationMatcher::new(scene, config.scoring),
        state: Propagation {
            candidates,
            ..Propagation::default()
        },
        degenerate: BTreeSet::new(),
    }
    .run()
}
