//! Camera-relative scene geometry.
//!
//! - [`Camera`]: calibrated viewpoint the offsets are measured from
//! - [`offset`]: per-pair [`OffsetRecord`]s and the all-pairs [`OffsetTable`]

pub mod offset;

use nalgebra::Vector3;

pub use offset::{OffsetRecord, OffsetStats, OffsetTable, ValueRange};

/// Camera position used by the CLEVR-style scene generator.
pub const DEFAULT_CAMERA_POSITION: [f64; 3] = [7.21, -6.83, 5.12];

/// Horizontal field-of-view angle of the default calibration (radians, ~49 degrees).
pub const DEFAULT_CAMERA_ANGLE: f64 = 0.857_556_045_055_389_4;

/// A calibrated camera.
///
/// Passed explicitly into every [`OffsetTable`] so scenes rendered with different
/// camera setups can be processed side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space camera position.
    pub position: Vector3<f64>,
    /// Euler rotation (radians).
    pub rotation: Vector3<f64>,
    /// Field-of-view angle (radians).
    pub angle: f64,
}

impl Camera {
    /// Camera at `position` with zero rotation and the default field of view.
    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position: Vector3::from(position),
            ..Self::default()
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector3::from(DEFAULT_CAMERA_POSITION),
            rotation: Vector3::zeros(),
            angle: DEFAULT_CAMERA_ANGLE,
        }
    }
}

/// World axis a spatial relation is tested along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index into a 3-vector.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Sign of `v` as -1, 0 or 1.
pub(crate) fn signum(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}
