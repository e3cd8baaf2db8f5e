//! Spatial relation labels and their geometric constraints.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geometry::Axis;

/// A binary, camera-relative spatial relation.
///
/// Each relation is tested along one world axis against a required sign of the
/// anchor-to-object displacement:
///
/// | relation | axis | sign |
/// |----------|------|------|
/// | left     | y    | +1   |
/// | right    | y    | -1   |
/// | front    | x    | -1   |
/// | behind   | x    | +1   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialRelation {
    Left,
    Right,
    Front,
    Behind,
}

impl SpatialRelation {
    /// All relations, in neighbor-list order.
    pub const ALL: [SpatialRelation; 4] = [
        SpatialRelation::Left,
        SpatialRelation::Right,
        SpatialRelation::Front,
        SpatialRelation::Behind,
    ];

    /// The relation seen from the other object (left ↔ right, front ↔ behind).
    pub fn inverse(self) -> Self {
        match self {
            SpatialRelation::Left => SpatialRelation::Right,
            SpatialRelation::Right => SpatialRelation::Left,
            SpatialRelation::Front => SpatialRelation::Behind,
            SpatialRelation::Behind => SpatialRelation::Front,
        }
    }

    /// Axis the relation is tested along.
    pub fn axis(self) -> Axis {
        match self {
            SpatialRelation::Left | SpatialRelation::Right => Axis::Y,
            SpatialRelation::Front | SpatialRelation::Behind => Axis::X,
        }
    }

    /// Required sign of the displacement along [`axis`](Self::axis).
    pub fn sign(self) -> i8 {
        match self {
            SpatialRelation::Left | SpatialRelation::Behind => 1,
            SpatialRelation::Right | SpatialRelation::Front => -1,
        }
    }

    /// Whether a direction vector satisfies this relation.
    pub fn holds(self, direction: &[i8; 3]) -> bool {
        direction[self.axis().index()] == self.sign()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpatialRelation::Left => "left",
            SpatialRelation::Right => "right",
            SpatialRelation::Front => "front",
            SpatialRelation::Behind => "behind",
        }
    }
}

impl std::fmt::Display for SpatialRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpatialRelation {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(SpatialRelation::Left),
            "right" => Ok(SpatialRelation::Right),
            "front" => Ok(SpatialRelation::Front),
            "behind" => Ok(SpatialRelation::Behind),
            _ => Err(SceneError::UnknownRelation {
                label: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_table() {
        assert_eq!(SpatialRelation::Left.axis(), Axis::Y);
        assert_eq!(SpatialRelation::Left.sign(), 1);
        assert_eq!(SpatialRelation::Right.axis(), Axis::Y);
        assert_eq!(SpatialRelation::Right.sign(), -1);
        assert_eq!(SpatialRelation::Front.axis(), Axis::X);
        assert_eq!(SpatialRelation::Front.sign(), -1);
        assert_eq!(SpatialRelation::Behind.axis(), Axis::X);
        assert_eq!(SpatialRelation::Behind.sign(), 1);
    }

    #[test]
    fn inverse_flips_sign_on_same_axis() {
        for rel in SpatialRelation::ALL {
            let inv = rel.inverse();
            assert_eq!(inv.inverse(), rel);
            assert_eq!(inv.axis(), rel.axis());
            assert_eq!(inv.sign(), -rel.sign());
        }
    }

    #[test]
    fn holds_checks_the_right_component() {
        assert!(SpatialRelation::Left.holds(&[0, 1, 0]));
        assert!(!SpatialRelation::Left.holds(&[1, 0, 0]));
        assert!(SpatialRelation::Front.holds(&[-1, 1, 1]));
        assert!(!SpatialRelation::Behind.holds(&[0, 1, 1]));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Left".parse::<SpatialRelation>().unwrap(), SpatialRelation::Left);
        assert_eq!(" behind ".parse::<SpatialRelation>().unwrap(), SpatialRelation::Behind);
        assert!(matches!(
            "above".parse::<SpatialRelation>(),
            Err(SceneError::UnknownRelation { .. })
        ));
    }

    #[test]
    fn serde_uses_lowercase_labels() {
        let json = serde_json::to_string(&SpatialRelation::Front).unwrap();
        assert_eq!(json, "\"front\"");
        let back: SpatialRelation = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(back, SpatialRelation::Right);
    }
}
