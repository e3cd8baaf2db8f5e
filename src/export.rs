//! Export types for serializing grounding state.
//!
//! These types provide label-resolved views of the candidate graph, offset
//! table and relation table, suitable for JSON export to a visualizer.

use serde::{Deserialize, Serialize};

use crate::geometry::OffsetStats;
use crate::graph::CandidateGraph;
use crate::relation::SpatialRelation;
use crate::scene::Scene;

/// Exported candidate-graph node with resolved label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    /// Entity index.
    pub entity: usize,
    /// Human-readable label, e.g. `red cube (0)`.
    pub label: String,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Exported weighted edge `from → to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeExport {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Exported candidate graph with its best node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
    pub best: Option<usize>,
}

impl GraphExport {
    pub fn from_graph(graph: &CandidateGraph, scene: &Scene, best: Option<usize>) -> Self {
        let nodes = graph
            .nodes()
            .into_iter()
            .map(|entity| NodeExport {
                entity,
                label: scene
                    .entity(entity)
                    .map(|e| e.describe())
                    .unwrap_or_else(|| entity.to_string()),
                in_degree: graph.in_degree(entity),
                out_degree: graph.out_degree(entity),
            })
            .collect();
        let edges = graph
            .edges()
            .into_iter()
            .map(|(from, to, weight)| EdgeExport { from, to, weight })
            .collect();
        Self { nodes, edges, best }
    }
}

/// Exported offset record for one ordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetExport {
    pub first: usize,
    pub second: usize,
    /// `first - second`, per axis.
    pub delta: [f64; 3],
    /// Sign of the displacement `first → second`, per axis.
    pub direction: [i8; 3],
    pub distance: f64,
    pub cos_theta: f64,
    pub theta_degrees: f64,
}

/// Exported offset table: every record plus the value-range summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetTableExport {
    pub records: Vec<OffsetExport>,
    pub degenerate: Vec<(usize, usize)>,
    pub stats: OffsetStats,
}

impl OffsetTableExport {
    pub fn from_scene(scene: &Scene) -> Self {
        let offsets = scene.offsets();
        let records = (0..scene.len())
            .flat_map(|first| {
                offsets
                    .get_pairs(first)
                    .into_iter()
                    .map(move |(second, r)| OffsetExport {
                        first,
                        second,
                        delta: [r.delta.x, r.delta.y, r.delta.z],
                        direction: r.direction,
                        distance: r.distance(),
                        cos_theta: r.cos_theta,
                        theta_degrees: r.theta_degrees(),
                    })
            })
            .collect();
        Self {
            records,
            degenerate: offsets.degenerate_pairs().iter().copied().collect(),
            stats: offsets.stats(),
        }
    }
}

/// Exported relation-table row: `second` is each of `labels` of `first`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationExport {
    pub first: usize,
    pub first_label: String,
    pub second: usize,
    pub second_label: String,
    pub labels: Vec<SpatialRelation>,
}

/// Export the combined relation table in pair order.
pub fn relation_table(scene: &Scene) -> Vec<RelationExport> {
    let label = |i: usize| {
        scene
            .entity(i)
            .map(|e| e.describe())
            .unwrap_or_else(|| i.to_string())
    };
    scene
        .relations()
        .iter()
        .map(|((first, second), labels)| RelationExport {
            first,
            first_label: label(first),
            second,
            second_label: label(second),
            labels: labels.to_vec(),
        })
        .collect()
}
