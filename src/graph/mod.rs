//! Graphs over scene entities.
//!
//! - [`CandidateGraph`]: the per-call weighted graph built while grounding
//!   relation mentions, consumed by pruning and ranking.
//! - [`analytics`]: relation-pattern uniqueness over a scene's ground-truth
//!   relation graph.

pub mod analytics;
pub mod candidate;

pub use candidate::{CandidateEdge, CandidateGraph};
