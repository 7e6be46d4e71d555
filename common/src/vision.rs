//! Measurement types produced by the vision pipeline: camera-to-target poses, detected corners and
//! the per-frame results that bundle them together.

use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::math::rotation_angles;

/// A corner of a detected target in image coordinates (pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct TargetCorner {
    pub x: f64,
    pub y: f64,
}

impl TargetCorner {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A pose in 3D space: a translation in meters and an orientation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "PoseRecord")]
pub struct Pose3 {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose3 {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl Pose3 {
    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Builds a pose from a translation and roll/pitch/yaw angles in radians.
    pub fn from_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::new(
            Vector3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        )
    }

    /// `[x, y, z, roll, pitch, yaw]` with the angles in degrees.
    pub fn to_array_deg(&self) -> [f64; 6] {
        let angles = rotation_angles(&self.rotation);
        [
            self.translation.x,
            self.translation.y,
            self.translation.z,
            angles.x.to_degrees(),
            angles.y.to_degrees(),
            angles.z.to_degrees(),
        ]
    }
}

/// How poses are written in recordings and config files, angles in degrees.
#[derive(Deserialize)]
struct PoseRecord {
    translation: [f64; 3],
    #[serde(default)]
    rotation_deg: [f64; 3],
}

impl From<PoseRecord> for Pose3 {
    fn from(value: PoseRecord) -> Self {
        let [x, y, z] = value.translation;
        let [roll, pitch, yaw] = value.rotation_deg.map(f64::to_radians);
        Pose3::from_euler(x, y, z, roll, pitch, yaw)
    }
}

/// A single fiducial seen by the camera.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackedTarget {
    pub fiducial_id: i32,
    pub camera_to_target: Pose3,
    #[serde(default)]
    pub corners: Vec<TargetCorner>,
}

/// A robot pose solved from several fiducials at once.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultiTargetEstimate {
    pub pose: Pose3,
    pub fiducials_used: Vec<i32>,
}

/// Everything the pipeline reports for one camera frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineResult {
    /// Capture time in seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub targets: Vec<TrackedTarget>,
    #[serde(default)]
    pub estimate: Option<MultiTargetEstimate>,
}

impl PipelineResult {
    /// The targets that contributed to the fused estimate, empty without one.
    pub fn targets_used(&self) -> Vec<&TrackedTarget> {
        match &self.estimate {
            Some(estimate) => self
                .targets
                .iter()
                .filter(|t| estimate.fiducials_used.contains(&t.fiducial_id))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// A fused pose estimate that reports its corners as a flat `[x0, y0, x1, y1, ...]` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatEstimate {
    pub timestamp: f64,
    #[serde(default)]
    pub pose: Option<Pose3>,
    #[serde(default)]
    pub tcornxy: Vec<f64>,
}

/// Converts a flat `[x0, y0, x1, y1, ...]` array into corners. Empty or odd-length input gives no corners.
pub fn corners_from_flat(tcornxy: &[f64]) -> Vec<TargetCorner> {
    if tcornxy.is_empty() || tcornxy.len() % 2 != 0 {
        return Vec::new();
    }
    tcornxy
        .chunks_exact(2)
        .map(|xy| TargetCorner::new(xy[0], xy[1]))
        .collect()
}

/// Inverse of [`corners_from_flat`].
pub fn corners_to_flat(corners: &[TargetCorner]) -> Vec<f64> {
    corners.iter().flat_map(|c| [c.x, c.y]).collect()
}

/// All corners of the given targets concatenated, ordered by fiducial id.
pub fn all_target_corners<'a>(
    targets: impl IntoIterator<Item = &'a TrackedTarget>,
) -> Vec<TargetCorner> {
    let mut targets: Vec<&TrackedTarget> = targets.into_iter().collect();
    targets.sort_by_key(|t| t.fiducial_id);
    targets
        .into_iter()
        .flat_map(|t| t.corners.iter().copied())
        .collect()
}
