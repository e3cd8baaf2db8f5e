//! CLEVR-style scene documents.
//!
//! ```json
//! {
//!   "objects": [{"shape": "cube", "color": "red", "size": "large",
//!                "3d_coords": [0.0, 0.0, 0.7], "rotation": 12.0}],
//!   "relationships": {"left": [[]], "right": [[]], "front": [[]], "behind": [[]]}
//! }
//! ```
//!
//! A file may also hold a collection `{"scenes": [...]}`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::error::SceneError;
use crate::relation::SpatialRelation;

/// One object as emitted by the scene generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDocument {
    pub shape: String,
    pub color: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(rename = "3d_coords")]
    pub coords: [f64; 3],
    #[serde(default)]
    pub rotation: f64,
}

/// Per-object neighbor lists, one list per object for each relation.
///
/// `left[i]` holds the indices of objects that are left of object `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLists {
    #[serde(default)]
    pub left: Vec<Vec<usize>>,
    #[serde(default)]
    pub right: Vec<Vec<usize>>,
    #[serde(default)]
    pub front: Vec<Vec<usize>>,
    #[serde(default)]
    pub behind: Vec<Vec<usize>>,
}

impl RelationshipLists {
    pub fn get(&self, relation: SpatialRelation) -> &[Vec<usize>] {
        match relation {
            SpatialRelation::Left => &self.left,
            SpatialRelation::Right => &self.right,
            SpatialRelation::Front => &self.front,
            SpatialRelation::Behind => &self.behind,
        }
    }
}

/// A complete scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub objects: Vec<ObjectDocument>,
    #[serde(default)]
    pub relationships: RelationshipLists,
    /// Overrides the configured camera when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SceneFile {
    Collection { scenes: Vec<SceneDocument> },
    Single(SceneDocument),
}

impl SceneDocument {
    /// Parse a single scene document.
    pub fn from_json(content: &str) -> Result<Self, SceneError> {
        serde_json::from_str(content).map_err(|e| SceneError::Parse {
            message: e.to_string(),
        })
    }

    /// Parse either a single scene or a `{"scenes": [...]}` collection.
    pub fn all_from_json(content: &str) -> Result<Vec<Self>, SceneError> {
        let file: SceneFile = serde_json::from_str(content).map_err(|e| SceneError::Parse {
            message: e.to_string(),
        })?;
        Ok(match file {
            SceneFile::Collection { scenes } => scenes,
            SceneFile::Single(scene) => vec![scene],
        })
    }

    /// Load every scene in a JSON file.
    pub fn load_all(path: &Path) -> Result<Vec<Self>, SceneError> {
        let content = std::fs::read_to_string(path).map_err(|e| SceneError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::all_from_json(&content)
    }
}
