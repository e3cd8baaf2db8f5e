//! Rich diagnostic error types for spatial-ground.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Problems that do not stop a
//! grounding call (ungrounded mentions, unresolvable relations) are reported as
//! [`GroundingIssue`](crate::ground::GroundingIssue) data instead.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for spatial-ground.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum GroundError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mention(#[from] MentionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Geometry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GeometryError {
    #[error("degenerate geometry: object at {position:?} coincides with the camera")]
    #[diagnostic(
        code(spground::geometry::degenerate),
        help(
            "The camera-to-object vector has zero length, so no viewing angle exists. \
             Check the camera calibration or the object's 3d_coords."
        )
    )]
    DegenerateGeometry { position: [f64; 3] },

    #[error("non-finite coordinate in {position:?}")]
    #[diagnostic(
        code(spground::geometry::non_finite),
        help("Object and camera coordinates must be finite numbers (no NaN or infinity).")
    )]
    NonFinite { position: [f64; 3] },
}

// ---------------------------------------------------------------------------
// Scene errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SceneError {
    #[error("relationship list \"{relation}\" has {actual} entries for {expected} objects")]
    #[diagnostic(
        code(spground::scene::list_length),
        help("Every relationship list must hold exactly one neighbor list per object.")
    )]
    ListLength {
        relation: String,
        expected: usize,
        actual: usize,
    },

    #[error("object {entity} lists neighbor {neighbor} under \"{relation}\", but the scene has {count} objects")]
    #[diagnostic(
        code(spground::scene::neighbor_out_of_range),
        help("Neighbor lists hold zero-based object indices into the scene's object list.")
    )]
    NeighborOutOfRange {
        entity: usize,
        neighbor: usize,
        relation: String,
        count: usize,
    },

    #[error("inconsistent relations: {neighbor} is \"{relation}\" of {entity}, but {entity} is not \"{inverse}\" of {neighbor}")]
    #[diagnostic(
        code(spground::scene::inconsistent),
        help(
            "Ground-truth relations must be inverse-consistent: if j is in i's left \
             list then i must be in j's right list (likewise front/behind)."
        )
    )]
    InconsistentRelation {
        entity: usize,
        neighbor: usize,
        relation: String,
        inverse: String,
    },

    #[error("unknown relation label: \"{label}\"")]
    #[diagnostic(
        code(spground::scene::unknown_relation),
        help("Spatial relation labels are: left, right, front, behind.")
    )]
    UnknownRelation { label: String },

    #[error("entity index {index} out of range for a scene of {count} objects")]
    #[diagnostic(code(spground::scene::index_out_of_range))]
    IndexOutOfRange { index: usize, count: usize },

    #[error("failed to read scene document: {path}")]
    #[diagnostic(
        code(spground::scene::read),
        help("Ensure the scene file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene document: {message}")]
    #[diagnostic(
        code(spground::scene::parse),
        help("Scene documents are CLEVR-style JSON with `objects` and `relationships`.")
    )]
    Parse { message: String },
}

// ---------------------------------------------------------------------------
// Mention errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MentionError {
    #[error("relation refers to unknown object mention {id}")]
    #[diagnostic(
        code(spground::mention::unknown_mention),
        help("Relation endpoints (o1, o2, o3) must be ids of object mentions in the same document.")
    )]
    UnknownMention { id: u32 },

    #[error("duplicate object mention id {id}")]
    #[diagnostic(code(spground::mention::duplicate_id))]
    DuplicateId { id: u32 },

    #[error("unknown relation label: \"{label}\"")]
    #[diagnostic(
        code(spground::mention::unknown_label),
        help("Binary relations use left, right, front or behind; ternary relations use between.")
    )]
    UnknownLabel { label: String },

    #[error("relation \"{label}\" is malformed: {message}")]
    #[diagnostic(
        code(spground::mention::malformed),
        help("A \"between\" relation needs o1, o2 and o3; every other relation needs exactly o1 and o2.")
    )]
    Malformed { label: String, message: String },

    #[error("failed to read mention document: {path}")]
    #[diagnostic(code(spground::mention::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mention document: {message}")]
    #[diagnostic(
        code(spground::mention::parse),
        help("Mention documents are JSON with `objects` and `relations` arrays.")
    )]
    Parse { message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(spground::config::invalid),
        help("Check the GroundConfig fields. {message}")
    )]
    Invalid { message: String },

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(spground::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(spground::config::parse),
        help("Check the TOML syntax in the config file. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(spground::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning spatial-ground results.
pub type GroundResult<T> = std::result::Result<T, GroundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_error_converts_to_ground_error() {
        let err = SceneError::IndexOutOfRange { index: 7, count: 3 };
        let top: GroundError = err.into();
        assert!(matches!(top, GroundError::Scene(SceneError::IndexOutOfRange { .. })));
    }

    #[test]
    fn inconsistent_relation_message_names_both_sides() {
        let err = SceneError::InconsistentRelation {
            entity: 0,
            neighbor: 2,
            relation: "left".into(),
            inverse: "right".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("left"));
        assert!(msg.contains("right"));
        assert!(msg.contains('2'));
    }
}
