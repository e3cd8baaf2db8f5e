//! Spatial grounding: resolve mentions to scene entities.
//!
//! A grounding call runs four stages:
//!
//! 1. **Seeds** ([`seed`]): object mentions are matched by descriptor; uniquely
//!    matched entities become *true nodes*.
//! 2. **Propagation** ([`propagate`]): relation mentions are resolved round by
//!    round with the [`matcher`] and the ternary [`between`] decomposition, writing
//!    weighted edges into a [`CandidateGraph`](crate::graph::CandidateGraph).
//! 3. **Pruning** ([`prune`]): only the best-supported leaves survive.
//! 4. **Report**: the best entity, the ranking, the graph and every
//!    [`GroundingIssue`] met on the way.
//!
//! A call never fails on partial input: problems are collected as issues next to
//! whatever could be grounded.

pub mod between;
pub mod matcher;
pub mod propagate;
pub mod prune;
pub mod seed;

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::GroundConfig;
use crate::error::GroundResult;
use crate::export::GraphExport;
use crate::mention::{MentionId, MentionSet, RelationMention};
use crate::scene::Scene;

pub use prune::{RankedCandidate, Ranking};
pub use seed::SeedGrounding;

/// An entity proposed as a mention's referent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub entity: usize,
    /// Normalized score of the matcher call that produced it.
    pub score: f64,
    /// Entity the relation was evaluated from.
    pub anchor: usize,
    /// Second anchor of a "between" match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_anchor: Option<usize>,
}

/// Final answer of a grounding call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroundingOutcome {
    Found { entity: usize, score: f64 },
    NoGroundingFound,
}

impl GroundingOutcome {
    pub fn entity(&self) -> Option<usize> {
        match self {
            GroundingOutcome::Found { entity, .. } => Some(*entity),
            GroundingOutcome::NoGroundingFound => None,
        }
    }
}

/// A non-fatal problem met during grounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundingIssue {
    /// The mention's descriptor matched no entity.
    UngroundedMention {
        mention: MentionId,
        /// Whether relation propagation found candidates for it anyway.
        grounded_later: bool,
    },
    /// The relation could not be resolved before propagation stopped.
    UnresolvableRelation {
        relation: RelationMention,
        rounds: usize,
    },
    /// A pair was skipped because its offset record is undefined.
    DegenerateGeometry { first: usize, second: usize },
    /// Propagation hit the configured round limit.
    RoundLimitReached { max_rounds: usize },
}

impl std::fmt::Display for GroundingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroundingIssue::UngroundedMention {
                mention,
                grounded_later,
            } => {
                write!(f, "mention {mention} matched no entity")?;
                if *grounded_later {
                    write!(f, " (grounded through relations)")?;
                }
                Ok(())
            }
            GroundingIssue::UnresolvableRelation { relation, rounds } => {
                write!(f, "relation {relation} unresolved after {rounds} round(s)")
            }
            GroundingIssue::DegenerateGeometry { first, second } => {
                write!(f, "degenerate geometry for pair ({first}, {second})")
            }
            GroundingIssue::RoundLimitReached { max_rounds } => {
                write!(f, "propagation stopped at the {max_rounds}-round limit")
            }
        }
    }
}

/// Everything a grounding call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingReport {
    pub outcome: GroundingOutcome,
    /// Surviving leaves, best first.
    pub ranked: Vec<RankedCandidate>,
    /// Pruned candidate graph.
    pub graph: GraphExport,
    /// Seed matches per mention.
    pub seeds: BTreeMap<MentionId, Vec<usize>>,
    pub true_nodes: Vec<usize>,
    /// Final candidate set per mention.
    pub candidates: BTreeMap<MentionId, Vec<usize>>,
    /// Every scored match, in discovery order.
    pub matches: Vec<Candidate>,
    pub issues: Vec<GroundingIssue>,
    pub rounds: usize,
}

impl GroundingReport {
    pub fn best(&self) -> Option<usize> {
        self.outcome.entity()
    }
}

/// Grounds mention sets against scenes with one configuration.
#[derive(Debug, Clone)]
pub struct Grounder {
    config: GroundConfig,
}

impl Grounder {
    /// Create a grounder, validating the configuration.
    pub fn new(config: GroundConfig) -> GroundResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GroundConfig {
        &self.config
    }

    /// Ground `mentions` against `scene`.
    pub fn ground(&self, scene: &Scene, mentions: &MentionSet) -> GroundingReport {
        let seeds = seed::ground_seeds(scene, mentions, self.config.max_seed_matches);
        let mut state = propagate::propagate(scene, mentions, &seeds, &self.config);

        if mentions.relations().is_empty() {
            // Nothing to propagate: the seed matches are the answer.
            for &entity in seeds.matches.values().flatten() {
                state.graph.ensure_node(entity);
            }
        }

        let ranking = prune::prune(&mut state.graph);
        let outcome = match ranking.best() {
            Some(best) => GroundingOutcome::Found {
                entity: best.entity,
                score: best.score,
            },
            None => GroundingOutcome::NoGroundingFound,
        };

        let mut issues: Vec<GroundingIssue> = seeds
            .ungrounded
            .iter()
            .map(|&mention| GroundingIssue::UngroundedMention {
                mention,
                grounded_later: state
                    .candidates
                    .get(&mention)
                    .is_some_and(|c| !c.is_empty()),
            })
            .collect();
        issues.append(&mut state.issues);

        tracing::info!(
            objects = scene.len(),
            mentions = mentions.objects().len(),
            relations = mentions.relations().len(),
            rounds = state.rounds,
            survivors = ranking.ranked.len(),
            best = ?outcome.entity(),
            issues = issues.len(),
            "grounding complete"
        );

        GroundingReport {
            outcome,
            graph: GraphExport::from_graph(&state.graph, scene, outcome.entity()),
            ranked: ranking.ranked,
            seeds: seeds.matches.clone(),
            true_nodes: seeds.true_nodes.iter().copied().collect(),
            candidates: state
                .candidates
                .into_iter()
                .map(|(id, set)| (id, set.into_iter().collect()))
                .collect(),
            matches: state.matches,
            issues,
            rounds: state.rounds,
        }
    }

    /// Ground independent jobs in parallel. Reports come back in job order.
    pub fn ground_batch(&self, jobs: &[(&Scene, &MentionSet)]) -> Vec<GroundingReport> {
        jobs.par_iter()
            .map(|(scene, mentions)| self.ground(scene, mentions))
            .collect()
    }
}

/// Mentions that never matched an entity, not even through relations.
pub fn unresolved_mentions(report: &GroundingReport) -> Vec<MentionId> {
    report
        .issues
        .iter()
        .filter_map(|issue| match issue {
            GroundingIssue::UngroundedMention {
                mention,
                grounded_later: false,
            } => Some(*mention),
            _ => None,
        })
        .collect()
}
