//! Structured mentions produced by the expression parser.
//!
//! A [`MentionSet`] holds the object mentions of one referring expression and the
//! relation mentions linking them. Relations refer to mention ids, never to scene
//! entity indices.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MentionError;
use crate::relation::SpatialRelation;
use crate::scene::Entity;

/// Label that matches any shape.
pub const WILDCARD: &str = "object";

/// Identifier of an object mention within one expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MentionId(pub u32);

impl std::fmt::Display for MentionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// A mentioned object: optional shape and optional color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMention {
    pub id: MentionId,
    /// `None` for the wildcard label.
    pub shape: Option<String>,
    pub color: Option<String>,
}

impl ObjectMention {
    /// Build a mention from a parser label, treating `"object"` and empty labels as wildcards.
    pub fn new(id: u32, label: &str, color: Option<&str>) -> Self {
        let label = label.trim();
        let shape = if label.is_empty() || label.eq_ignore_ascii_case(WILDCARD) {
            None
        } else {
            Some(label.to_ascii_lowercase())
        };
        Self {
            id: MentionId(id),
            shape,
            color: color
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_ascii_lowercase),
        }
    }

    /// Whether the mention says anything about the object beyond "an object".
    pub fn has_descriptor(&self) -> bool {
        self.shape.is_some() || self.color.is_some()
    }

    /// Descriptor match: shape (unless wildcard) and color (if given) must agree.
    ///
    /// A bare wildcard never matches; such mentions are only reachable through
    /// relations.
    pub fn matches(&self, entity: &Entity) -> bool {
        if !self.has_descriptor() {
            return false;
        }
        let shape_ok = self
            .shape
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case(&entity.shape));
        let color_ok = self
            .color
            .as_deref()
            .is_none_or(|c| c.eq_ignore_ascii_case(&entity.color));
        shape_ok && color_ok
    }
}

impl std::fmt::Display for ObjectMention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = self.shape.as_deref().unwrap_or(WILDCARD);
        match &self.color {
            Some(color) => write!(f, "{}: {color} {shape}", self.id),
            None => write!(f, "{}: {shape}", self.id),
        }
    }
}

/// The only ternary relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TernaryRelation {
    Between,
}

/// A relation between object mentions.
///
/// `Binary { o1, o2, label }` places `o2` at `label` of `o1`; `Ternary` asserts
/// `o1` lies between `o2` and `o3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "arity", rename_all = "lowercase")]
pub enum RelationMention {
    Binary {
        o1: MentionId,
        o2: MentionId,
        label: SpatialRelation,
    },
    Ternary {
        o1: MentionId,
        o2: MentionId,
        o3: MentionId,
        label: TernaryRelation,
    },
}

impl RelationMention {
    pub fn binary(o1: u32, o2: u32, label: SpatialRelation) -> Self {
        RelationMention::Binary {
            o1: MentionId(o1),
            o2: MentionId(o2),
            label,
        }
    }

    pub fn between(o1: u32, o2: u32, o3: u32) -> Self {
        RelationMention::Ternary {
            o1: MentionId(o1),
            o2: MentionId(o2),
            o3: MentionId(o3),
            label: TernaryRelation::Between,
        }
    }

    /// Mention ids the relation refers to.
    pub fn endpoints(&self) -> Vec<MentionId> {
        match *self {
            RelationMention::Binary { o1, o2, .. } => vec![o1, o2],
            RelationMention::Ternary { o1, o2, o3, .. } => vec![o1, o2, o3],
        }
    }
}

impl std::fmt::Display for RelationMention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationMention::Binary { o1, o2, label } => write!(f, "{o1} -{label}-> {o2}"),
            RelationMention::Ternary { o1, o2, o3, .. } => {
                write!(f, "{o1} between {o2} and {o3}")
            }
        }
    }
}

/// Validated mentions of one referring expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionSet {
    objects: Vec<ObjectMention>,
    relations: Vec<RelationMention>,
}

impl MentionSet {
    /// Validate that ids are unique and every relation endpoint is a known mention.
    pub fn new(
        objects: Vec<ObjectMention>,
        relations: Vec<RelationMention>,
    ) -> Result<Self, MentionError> {
        let mut ids = BTreeSet::new();
        for object in &objects {
            if !ids.insert(object.id) {
                return Err(MentionError::DuplicateId { id: object.id.0 });
            }
        }
        for relation in &relations {
            if let Some(unknown) = relation.endpoints().into_iter().find(|id| !ids.contains(id)) {
                return Err(MentionError::UnknownMention { id: unknown.0 });
            }
        }
        Ok(Self { objects, relations })
    }

    pub fn objects(&self) -> &[ObjectMention] {
        &self.objects
    }

    pub fn relations(&self) -> &[RelationMention] {
        &self.relations
    }

    pub fn object(&self, id: MentionId) -> Option<&ObjectMention> {
        self.objects.iter().find(|o| o.id == id)
    }
}

// ---------------------------------------------------------------------------
// Interchange documents
// ---------------------------------------------------------------------------

/// An object mention as written by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMentionDocument {
    /// Defaults to the one-based position in the `objects` array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub label: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A relation mention as written by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDocument {
    pub o1: u32,
    pub o2: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o3: Option<u32>,
    pub label: String,
}

impl TryFrom<&RelationDocument> for RelationMention {
    type Error = MentionError;

    fn try_from(doc: &RelationDocument) -> Result<Self, Self::Error> {
        let label = doc.label.trim().to_ascii_lowercase();
        if label == "between" {
            let o3 = doc.o3.ok_or_else(|| MentionError::Malformed {
                label: doc.label.clone(),
                message: "missing o3".into(),
            })?;
            return Ok(RelationMention::between(doc.o1, doc.o2, o3));
        }
        let relation: SpatialRelation = label.parse().map_err(|_| MentionError::UnknownLabel {
            label: doc.label.clone(),
        })?;
        if doc.o3.is_some() {
            return Err(MentionError::Malformed {
                label: doc.label.clone(),
                message: "binary relation with o3".into(),
            });
        }
        Ok(RelationMention::binary(doc.o1, doc.o2, relation))
    }
}

/// Object and relation mentions of one expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionDocument {
    pub objects: Vec<ObjectMentionDocument>,
    #[serde(default)]
    pub relations: Vec<RelationDocument>,
}

impl MentionDocument {
    pub fn from_json(content: &str) -> Result<Self, MentionError> {
        serde_json::from_str(content).map_err(|e| MentionError::Parse {
            message: e.to_string(),
        })
    }

    /// Convert into a validated [`MentionSet`].
    pub fn to_mentions(&self) -> Result<MentionSet, MentionError> {
        let objects = self
            .objects
            .iter()
            .enumerate()
            .map(|(pos, obj)| {
                let id = obj.id.unwrap_or(pos as u32 + 1);
                ObjectMention::new(id, &obj.label, obj.color.as_deref())
            })
            .collect();
        let relations = self
            .relations
            .iter()
            .map(RelationMention::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        MentionSet::new(objects, relations)
    }
}

/// A sentence with its parsed mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub sentence: String,
    pub mentions: MentionDocument,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MentionFile {
    Expressions(Vec<Expression>),
    Single(MentionDocument),
}

/// Parse a list of expressions or a bare mention document (returned with an empty sentence).
pub fn expressions_from_json(content: &str) -> Result<Vec<Expression>, MentionError> {
    let file: MentionFile = serde_json::from_str(content).map_err(|e| MentionError::Parse {
        message: e.to_string(),
    })?;
    Ok(match file {
        MentionFile::Expressions(list) => list,
        MentionFile::Single(mentions) => vec![Expression {
            sentence: String::new(),
            mentions,
        }],
    })
}

/// Load expressions from a JSON file.
pub fn load_expressions(path: &Path) -> Result<Vec<Expression>, MentionError> {
    let content = std::fs::read_to_string(path).map_err(|e| MentionError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    expressions_from_json(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(shape: &str, color: &str) -> Entity {
        Entity::new(0, shape, color, [0.0, 0.0, 0.0])
    }

    #[test]
    fn shape_and_color_must_both_match() {
        let m = ObjectMention::new(1, "cube", Some("red"));
        assert!(m.matches(&entity("cube", "red")));
        assert!(!m.matches(&entity("cube", "blue")));
        assert!(!m.matches(&entity("sphere", "red")));
    }

    #[test]
    fn wildcard_with_color_matches_on_color() {
        let m = ObjectMention::new(1, "object", Some("green"));
        assert!(m.shape.is_none());
        assert!(m.matches(&entity("cylinder", "green")));
        assert!(m.matches(&entity("cube", "green")));
        assert!(!m.matches(&entity("cube", "red")));
    }

    #[test]
    fn bare_wildcard_matches_nothing() {
        let m = ObjectMention::new(1, "Object", None);
        assert!(!m.has_descriptor());
        assert!(!m.matches(&entity("cube", "red")));
    }

    #[test]
    fn labels_are_case_insensitive() {
        let m = ObjectMention::new(1, "Cube", Some(" RED "));
        assert!(m.matches(&entity("cube", "red")));
        assert_eq!(m.to_string(), "m1: red cube");
    }

    #[test]
    fn unknown_endpoint_rejected() {
        let err = MentionSet::new(
            vec![ObjectMention::new(1, "cube", None)],
            vec![RelationMention::binary(1, 2, SpatialRelation::Left)],
        )
        .unwrap_err();
        assert!(matches!(err, MentionError::UnknownMention { id: 2 }));
    }

    #[test]
    fn duplicate_id_rejected() {
        let err = MentionSet::new(
            vec![
                ObjectMention::new(1, "cube", None),
                ObjectMention::new(1, "sphere", None),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, MentionError::DuplicateId { id: 1 }));
    }

    #[test]
    fn document_dispatches_on_label() {
        let doc = MentionDocument::from_json(
            r#"{
                "objects": [
                    {"id": 1, "label": "cube", "type": "object", "color": "red"},
                    {"id": 2, "label": "object"},
                    {"id": 3, "label": "sphere"}
                ],
                "relations": [
                    {"o1": 1, "o2": 2, "label": "left"},
                    {"o1": 2, "o2": 1, "o3": 3, "label": "between"}
                ]
            }"#,
        )
        .unwrap();
        let set = doc.to_mentions().unwrap();
        assert_eq!(set.objects().len(), 3);
        assert_eq!(
            set.relations()[0],
            RelationMention::binary(1, 2, SpatialRelation::Left)
        );
        assert_eq!(set.relations()[1], RelationMention::between(2, 1, 3));
        assert_eq!(set.object(MentionId(1)).unwrap().color.as_deref(), Some("red"));
    }

    #[test]
    fn ids_default_to_position() {
        let doc = MentionDocument::from_json(
            r#"{"objects": [{"label": "cube"}, {"label": "sphere"}],
                "relations": [{"o1": 1, "o2": 2, "label": "front"}]}"#,
        )
        .unwrap();
        let set = doc.to_mentions().unwrap();
        assert_eq!(set.objects()[1].id, MentionId(2));
    }

    #[test]
    fn between_without_o3_is_malformed() {
        let doc = RelationDocument {
            o1: 1,
            o2: 2,
            o3: None,
            label: "between".into(),
        };
        assert!(matches!(
            RelationMention::try_from(&doc),
            Err(MentionError::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_label_rejected() {
        let doc = RelationDocument {
            o1: 1,
            o2: 2,
            o3: None,
            label: "above".into(),
        };
        assert!(matches!(
            RelationMention::try_from(&doc),
            Err(MentionError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn expression_list_and_bare_document_both_parse() {
        let list = r#"[{"sentence": "the red cube", "mentions": {"objects": [{"id": 1, "label": "cube", "color": "red"}], "relations": []}}]"#;
        let parsed = expressions_from_json(list).unwrap();
        assert_eq!(parsed[0].sentence, "the red cube");

        let bare = r#"{"objects": [{"label": "cube"}]}"#;
        let parsed = expressions_from_json(bare).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].sentence.is_empty());
    }

    #[test]
    fn relation_display() {
        assert_eq!(
            RelationMention::binary(1, 2, SpatialRelation::Behind).to_string(),
            "m1 -behind-> m2"
        );
        assert_eq!(RelationMention::between(1, 2, 3).to_string(), "m1 between m2 and m3");
    }
}
