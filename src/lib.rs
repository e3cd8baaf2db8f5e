// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # spatial-ground
//!
//! Grounds structured referring expressions ("the object left of the red cube")
//! to objects of synthetic 3-D scenes.
//!
//! ## Architecture
//!
//! - **Geometry** (`geometry`): camera-relative offset records for every ordered object pair
//! - **Scene model** (`scene`): entities, ground-truth relation table, CLEVR-style documents
//! - **Mentions** (`mention`): object and relation mentions produced by an expression parser
//! - **Grounding** (`ground`): seed matching, relation propagation, "between"
//!   decomposition, pruning and ranking over a `petgraph` candidate graph
//! - **Analytics** (`graph::analytics`): relation-pattern uniqueness per object
//!
//! ## Library usage
//!
//! ```no_run
//! use spatial_ground::config::GroundConfig;
//! use spatial_ground::ground::Grounder;
//! use spatial_ground::mention::MentionDocument;
//! use spatial_ground::scene::{Scene, SceneDocument};
//!
//! let config = GroundConfig::default();
//! let doc = SceneDocument::from_json(&std::fs::read_to_string("scene.json").unwrap()).unwrap();
//! let scene = Scene::from_document(&doc, config.camera.to_camera()).unwrap();
//! let mentions = MentionDocument::from_json(
//!     r#"{"objects": [{"id": 1, "label": "cube", "color": "red"}, {"id": 2, "label": "object"}],
//!         "relations": [{"o1": 1, "o2": 2, "label": "left"}]}"#,
//! )
//! .unwrap()
//! .to_mentions()
//! .unwrap();
//!
//! let report = Grounder::new(config).unwrap().ground(&scene, &mentions);
//! println!("{:?}", report.outcome);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod graph;
pub mod ground;
pub mod mention;
pub mod relation;
pub mod scene;
