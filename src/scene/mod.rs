//! Scene model: entities, ground-truth relations and the offset table.
//!
//! A [`Scene`] is built once from a [`SceneDocument`] (or directly from
//! [`Entity`] values) and stays immutable while mentions are grounded against it.

pub mod document;

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::Serialize;

use crate::error::SceneError;
use crate::geometry::{Camera, OffsetTable};
use crate::relation::SpatialRelation;

pub use document::{ObjectDocument, RelationshipLists, SceneDocument};

pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// Ground-truth neighbor lists of one entity.
///
/// `left` holds the indices of entities that are left of this one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Neighbors {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub front: Vec<usize>,
    pub behind: Vec<usize>,
}

impl Neighbors {
    pub fn get(&self, relation: SpatialRelation) -> &[usize] {
        match relation {
            SpatialRelation::Left => &self.left,
            SpatialRelation::Right => &self.right,
            SpatialRelation::Front => &self.front,
            SpatialRelation::Behind => &self.behind,
        }
    }

    pub fn get_mut(&mut self, relation: SpatialRelation) -> &mut Vec<usize> {
        match relation {
            SpatialRelation::Left => &mut self.left,
            SpatialRelation::Right => &mut self.right,
            SpatialRelation::Front => &mut self.front,
            SpatialRelation::Behind => &mut self.behind,
        }
    }
}

/// An object in a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// Zero-based position in the scene's object list.
    pub index: usize,
    pub shape: String,
    pub color: String,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    pub position: Vector3<f64>,
    pub rotation: f64,
    pub neighbors: Neighbors,
}

impl Entity {
    /// Entity with no neighbors, default size and no rotation.
    pub fn new(
        index: usize,
        shape: impl Into<String>,
        color: impl Into<String>,
        position: [f64; 3],
    ) -> Self {
        Self {
            index,
            shape: shape.into(),
            color: color.into(),
            size: String::new(),
            material: None,
            position: position.into(),
            rotation: 0.0,
            neighbors: Neighbors::default(),
        }
    }

    /// Short human-readable description, e.g. `red cube (0)`.
    pub fn describe(&self) -> String {
        format!("{} {} ({})", self.color, self.shape, self.index)
    }
}

/// Combined relation table: ordered entity pair → labels that hold for it.
///
/// `(i, j) → [left, front]` means `j` is left of and in front of `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationTable {
    pairs: BTreeMap<(usize, usize), Vec<SpatialRelation>>,
}

impl RelationTable {
    fn from_entities(entities: &[Entity]) -> Self {
        let mut pairs: BTreeMap<(usize, usize), Vec<SpatialRelation>> = BTreeMap::new();
        for entity in entities {
            for relation in SpatialRelation::ALL {
                for &other in entity.neighbors.get(relation) {
                    if other == entity.index {
                        continue;
                    }
                    let labels = pairs.entry((entity.index, other)).or_default();
                    if !labels.contains(&relation) {
                        labels.push(relation);
                    }
                }
            }
        }
        Self { pairs }
    }

    /// Labels holding for `(i, j)`; empty when the pair is unrelated.
    pub fn get(&self, i: usize, j: usize) -> &[SpatialRelation] {
        self.pairs.get(&(i, j)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any relation holds for `(i, j)`.
    pub fn related(&self, i: usize, j: usize) -> bool {
        !self.get(i, j).is_empty()
    }

    /// All related pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &[SpatialRelation])> {
        self.pairs.iter().map(|(&pair, labels)| (pair, labels.as_slice()))
    }

    /// Number of related pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A scene ready for grounding.
#[derive(Debug, Clone)]
pub struct Scene {
    entities: Vec<Entity>,
    relations: RelationTable,
    offsets: OffsetTable,
}

impl Scene {
    /// Build a scene from entities whose `index` fields match their positions.
    ///
    /// Validates neighbor indices and inverse consistency of the neighbor lists,
    /// then derives the relation table and the offset table for `camera`.
    pub fn new(entities: Vec<Entity>, camera: Camera) -> SceneResult<Self> {
        for (pos, entity) in entities.iter().enumerate() {
            if entity.index != pos {
                return Err(SceneError::IndexOutOfRange {
                    index: entity.index,
                    count: entities.len(),
                });
            }
        }
        validate_neighbors(&entities)?;

        let relations = RelationTable::from_entities(&entities);
        let positions: Vec<Vector3<f64>> = entities.iter().map(|e| e.position).collect();
        let offsets = OffsetTable::new(&positions, camera);

        tracing::debug!(
            objects = entities.len(),
            related_pairs = relations.len(),
            "built scene"
        );

        Ok(Self {
            entities,
            relations,
            offsets,
        })
    }

    /// Build a scene from a document. The document's camera wins over `default_camera`.
    pub fn from_document(doc: &SceneDocument, default_camera: Camera) -> SceneResult<Self> {
        let count = doc.objects.len();
        for relation in SpatialRelation::ALL {
            let lists = doc.relationships.get(relation);
            if !lists.is_empty() && lists.len() != count {
                return Err(SceneError::ListLength {
                    relation: relation.to_string(),
                    expected: count,
                    actual: lists.len(),
                });
            }
        }

        let entities = doc
            .objects
            .iter()
            .enumerate()
            .map(|(index, obj)| {
                let mut neighbors = Neighbors::default();
                for relation in SpatialRelation::ALL {
                    if let Some(list) = doc.relationships.get(relation).get(index) {
                        *neighbors.get_mut(relation) = list.clone();
                    }
                }
                Entity {
                    index,
                    shape: obj.shape.clone(),
                    color: obj.color.clone(),
                    size: obj.size.clone(),
                    material: obj.material.clone(),
                    position: obj.coords.into(),
                    rotation: obj.rotation,
                    neighbors,
                }
            })
            .collect();

        let camera = doc
            .camera
            .map(|c| c.to_camera())
            .unwrap_or(default_camera);
        Self::new(entities, camera)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Position of entity `index`.
    pub fn position(&self, index: usize) -> Option<&Vector3<f64>> {
        self.entities.get(index).map(|e| &e.position)
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn camera(&self) -> &Camera {
        self.offsets.camera()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn validate_neighbors(entities: &[Entity]) -> SceneResult<()> {
    let count = entities.len();
    for entity in entities {
        for relation in SpatialRelation::ALL {
            for &other in entity.neighbors.get(relation) {
                if other >= count {
                    return Err(SceneError::NeighborOutOfRange {
                        entity: entity.index,
                        neighbor: other,
                        relation: relation.to_string(),
                        count,
                    });
                }
                if other == entity.index {
                    continue;
                }
                let inverse = relation.inverse();
                if !entities[other].neighbors.get(inverse).contains(&entity.index) {
                    return Err(SceneError::InconsistentRelation {
                        entity: entity.index,
                        neighbor: other,
                        relation: relation.to_string(),
                        inverse: inverse.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(relationships: RelationshipLists) -> SceneDocument {
        SceneDocument {
            objects: vec![
                ObjectDocument {
                    shape: "cube".into(),
                    color: "red".into(),
                    size: "large".into(),
                    material: None,
                    coords: [0.0, 0.0, 0.0],
                    rotation: 0.0,
                },
                ObjectDocument {
                    shape: "sphere".into(),
                    color: "blue".into(),
                    size: "small".into(),
                    material: Some("metal".into()),
                    coords: [0.0, 2.0, 0.0],
                    rotation: 45.0,
                },
            ],
            relationships,
            camera: None,
            image_filename: None,
            image_index: None,
            split: None,
        }
    }

    #[test]
    fn builds_combined_relation_table() {
        let doc = doc_with(RelationshipLists {
            left: vec![vec![1], vec![]],
            right: vec![vec![], vec![0]],
            front: vec![vec![1], vec![]],
            behind: vec![vec![], vec![0]],
        });
        let scene = Scene::from_document(&doc, Camera::default()).unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(
            scene.relations().get(0, 1),
            &[SpatialRelation::Left, SpatialRelation::Front]
        );
        assert_eq!(
            scene.relations().get(1, 0),
            &[SpatialRelation::Right, SpatialRelation::Behind]
        );
        assert!(scene.relations().related(0, 1));
        assert_eq!(scene.relations().len(), 2);
        assert_eq!(scene.offsets().len(), 2);
        assert_eq!(scene.position(1), Some(&Vector3::new(0.0, 2.0, 0.0)));
        assert_eq!(scene.entity(1).unwrap().material.as_deref(), Some("metal"));
    }

    #[test]
    fn inconsistent_lists_rejected() {
        let doc = doc_with(RelationshipLists {
            left: vec![vec![1], vec![]],
            right: vec![vec![], vec![]],
            front: vec![],
            behind: vec![],
        });
        let err = Scene::from_document(&doc, Camera::default()).unwrap_err();
        assert!(matches!(
            err,
            SceneError::InconsistentRelation { entity: 0, neighbor: 1, .. }
        ));
    }

    #[test]
    fn out_of_range_neighbor_rejected() {
        let doc = doc_with(RelationshipLists {
            left: vec![vec![5], vec![]],
            ..Default::default()
        });
        let err = Scene::from_document(&doc, Camera::default()).unwrap_err();
        assert!(matches!(err, SceneError::NeighborOutOfRange { neighbor: 5, .. }));
    }

    #[test]
    fn wrong_list_length_rejected() {
        let doc = doc_with(RelationshipLists {
            left: vec![vec![]],
            ..Default::default()
        });
        let err = Scene::from_document(&doc, Camera::default()).unwrap_err();
        assert!(matches!(err, SceneError::ListLength { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn self_reference_ignored() {
        let doc = doc_with(RelationshipLists {
            left: vec![vec![0], vec![]],
            ..Default::default()
        });
        let scene = Scene::from_document(&doc, Camera::default()).unwrap();
        assert!(scene.relations().is_empty());
    }

    #[test]
    fn document_camera_overrides_default() {
        let mut doc = doc_with(RelationshipLists::default());
        doc.camera = Some(crate::config::CameraConfig {
            position: [0.0, 0.0, 10.0],
            ..Default::default()
        });
        let scene = Scene::from_document(&doc, Camera::default()).unwrap();
        assert_eq!(scene.camera().position, Vector3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn fixture_relations_are_inverse_consistent() {
        let scene = fixtures::scene(&[
            ("cube", "red", [-2.93, -1.75, 0.7]),
            ("cube", "blue", [0.441, 2.99, 0.7]),
            ("cylinder", "gray", [-1.37, 2.08, 0.7]),
            ("sphere", "green", [1.55, 0.68, 0.35]),
        ]);
        for ((i, j), labels) in scene.relations().iter() {
            for label in labels {
                assert!(
                    scene.relations().get(j, i).contains(&label.inverse()),
                    "{j} should be {} of {i}",
                    label.inverse()
                );
            }
        }
    }

    #[test]
    fn misnumbered_entities_rejected() {
        let entities = vec![Entity::new(1, "cube", "red", [0.0, 0.0, 0.0])];
        let err = Scene::new(entities, Camera::default()).unwrap_err();
        assert!(matches!(err, SceneError::IndexOutOfRange { index: 1, .. }));
    }
}
