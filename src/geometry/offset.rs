//! Pairwise camera-relative offsets.
//!
//! For every ordered pair of scene objects `(i, j)` the [`OffsetTable`] stores an
//! [`OffsetRecord`]: the camera-to-object vectors, the viewing angle between them,
//! the per-axis delta `coord_i - coord_j`, and the sign vector of the displacement
//! from `i` to `j` that spatial predicates are tested against.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector3;
use serde::Serialize;

use crate::error::GeometryError;

use super::{Camera, signum};

/// Geometric relationship between an ordered pair of objects.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetRecord {
    /// Camera → first object.
    pub camera_to_first: Vector3<f64>,
    /// Camera → second object.
    pub camera_to_second: Vector3<f64>,
    /// Dot product of the two camera vectors.
    pub dot: f64,
    /// Length of `camera_to_first`.
    pub magnitude_first: f64,
    /// Length of `camera_to_second`.
    pub magnitude_second: f64,
    /// Cosine of the viewing angle, clamped to [-1, 1].
    pub cos_theta: f64,
    /// Viewing angle in radians.
    pub theta: f64,
    /// Sine of the viewing angle.
    pub sin_theta: f64,
    /// Per-axis signed delta `coord_first - coord_second`.
    pub delta: Vector3<f64>,
    /// Sign of the displacement from the first object to the second, per axis.
    pub direction: [i8; 3],
}

impl OffsetRecord {
    /// Viewing angle in degrees.
    pub fn theta_degrees(&self) -> f64 {
        self.theta.to_degrees()
    }

    /// Euclidean distance between the two objects.
    pub fn distance(&self) -> f64 {
        self.delta.norm()
    }
}

/// Compute the offset record for objects at `first` and `second` seen from `camera`.
///
/// Returns [`GeometryError::DegenerateGeometry`] when either object coincides with
/// the camera, since the viewing angle is undefined there.
pub fn compute(
    first: &Vector3<f64>,
    second: &Vector3<f64>,
    camera: &Vector3<f64>,
) -> Result<OffsetRecord, GeometryError> {
    for p in [first, second, camera] {
        if !p.iter().all(|c| c.is_finite()) {
            return Err(GeometryError::NonFinite {
                position: [p.x, p.y, p.z],
            });
        }
    }

    let camera_to_first = first - camera;
    let camera_to_second = second - camera;
    let magnitude_first = camera_to_first.norm();
    let magnitude_second = camera_to_second.norm();

    for (mag, p) in [(magnitude_first, first), (magnitude_second, second)] {
        if mag == 0.0 {
            return Err(GeometryError::DegenerateGeometry {
                position: [p.x, p.y, p.z],
            });
        }
    }

    let dot = camera_to_first.dot(&camera_to_second);
    let cos_theta = (dot / (magnitude_first * magnitude_second)).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();

    let delta = first - second;
    let displacement = second - first;

    Ok(OffsetRecord {
        camera_to_first,
        camera_to_second,
        dot,
        magnitude_first,
        magnitude_second,
        cos_theta,
        theta,
        sin_theta: theta.sin(),
        delta,
        direction: [
            signum(displacement.x),
            signum(displacement.y),
            signum(displacement.z),
        ],
    })
}

/// Closed interval of observed values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    fn extend(range: &mut Option<ValueRange>, v: f64) {
        match range {
            Some(r) => {
                r.min = r.min.min(v);
                r.max = r.max.max(v);
            }
            None => *range = Some(ValueRange { min: v, max: v }),
        }
    }
}

/// Observed ranges over every record in an [`OffsetTable`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OffsetStats {
    /// Number of records summarized.
    pub pairs: usize,
    /// Number of pairs skipped as degenerate.
    pub degenerate: usize,
    pub x_offset: Option<ValueRange>,
    pub y_offset: Option<ValueRange>,
    pub theta_degrees: Option<ValueRange>,
    pub theta_radians: Option<ValueRange>,
    pub cos_theta: Option<ValueRange>,
    pub sin_theta: Option<ValueRange>,
}

/// All-pairs offset table for one scene and one camera.
///
/// Immutable once built; shared freely between grounding calls.
#[derive(Debug, Clone)]
pub struct OffsetTable {
    camera: Camera,
    records: BTreeMap<(usize, usize), OffsetRecord>,
    degenerate: BTreeSet<(usize, usize)>,
    object_count: usize,
}

impl OffsetTable {
    /// Compute records for every ordered pair `i != j` of `positions`.
    ///
    /// Degenerate pairs are logged and left out; look them up with
    /// [`degenerate_pairs`](Self::degenerate_pairs).
    pub fn new(positions: &[Vector3<f64>], camera: Camera) -> Self {
        let mut records = BTreeMap::new();
        let mut degenerate = BTreeSet::new();

        for (i, first) in positions.iter().enumerate() {
            for (j, second) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                match compute(first, second, &camera.position) {
                    Ok(record) => {
                        records.insert((i, j), record);
                    }
                    Err(e) => {
                        tracing::warn!(first = i, second = j, error = %e, "skipping degenerate pair");
                        degenerate.insert((i, j));
                    }
                }
            }
        }

        tracing::debug!(
            objects = positions.len(),
            records = records.len(),
            degenerate = degenerate.len(),
            "built offset table"
        );

        Self {
            camera,
            records,
            degenerate,
            object_count: positions.len(),
        }
    }

    /// Record for the ordered pair `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Option<&OffsetRecord> {
        self.records.get(&(i, j))
    }

    /// Records for all pairs starting at `i`, keyed by the other object's index.
    pub fn get_pairs(&self, i: usize) -> BTreeMap<usize, &OffsetRecord> {
        self.records
            .range((i, 0)..(i + 1, 0))
            .map(|(&(_, j), record)| (j, record))
            .collect()
    }

    /// Ordered pairs whose geometry was degenerate, ascending.
    pub fn degenerate_pairs(&self) -> &BTreeSet<(usize, usize)> {
        &self.degenerate
    }

    /// Whether `(i, j)` was skipped as degenerate.
    pub fn is_degenerate(&self, i: usize, j: usize) -> bool {
        self.degenerate.contains(&(i, j))
    }

    /// The camera the table was computed for.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Number of objects the table covers.
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Summarize the value ranges across all records.
    pub fn stats(&self) -> OffsetStats {
        let mut stats = OffsetStats {
            pairs: self.records.len(),
            degenerate: self.degenerate.len(),
            ..Default::default()
        };
        for record in self.records.values() {
            ValueRange::extend(&mut stats.x_offset, record.delta.x);
            ValueRange::extend(&mut stats.y_offset, record.delta.y);
            ValueRange::extend(&mut stats.theta_degrees, record.theta_degrees());
            ValueRange::extend(&mut stats.theta_radians, record.theta);
            ValueRange::extend(&mut stats.cos_theta, record.cos_theta);
            ValueRange::extend(&mut stats.sin_theta, record.sin_theta);
        }
        stats
    }
}
