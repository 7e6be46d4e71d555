//! Mean and standard deviation of the different sample types.
//!
//! Everything here uses the population divisor (N, not N-1). Empty input gives zero (or the
//! identity rotation).

use common::{
    math::{angle_diff, rotation_angles},
    vision::{Pose3, TargetCorner},
};
use nalgebra::{Matrix4, Quaternion, SymmetricEigen, UnitQuaternion, Vector3};

//----- Scalar

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sq_error_sum(mean: f64, values: &[f64]) -> f64 {
    values.iter().map(|v| (v - mean) * (v - mean)).sum()
}

pub fn std_dev(mean: f64, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (sq_error_sum(mean, values) / values.len() as f64).sqrt()
}

//----- Translation

/// Per axis mean of the translations.
pub fn translation_mean(values: &[Vector3<f64>]) -> Vector3<f64> {
    if values.is_empty() {
        return Vector3::zeros();
    }
    values.iter().fold(Vector3::zeros(), |acc, v| acc + v) / values.len() as f64
}

pub fn translation_sq_error_sum(mean: &Vector3<f64>, values: &[Vector3<f64>]) -> Vector3<f64> {
    values.iter().fold(Vector3::zeros(), |acc, v| {
        let diff = v - mean;
        acc + diff.component_mul(&diff)
    })
}

pub fn translation_std_dev(mean: &Vector3<f64>, values: &[Vector3<f64>]) -> Vector3<f64> {
    if values.is_empty() {
        return Vector3::zeros();
    }
    (translation_sq_error_sum(mean, values) / values.len() as f64).map(f64::sqrt)
}

//----- Rotation

/// Least squares mean of the orientations under the chordal metric.
///
/// Accumulates `M = sum(q * q^T)` over the quaternions and returns the eigenvector of `M` with the
/// largest eigenvalue. Since `q` and `-q` give the same outer product the sign of the inputs does
/// not matter. See <https://math.stackexchange.com/a/3435296>.
pub fn rotation_mean(values: &[UnitQuaternion<f64>]) -> UnitQuaternion<f64> {
    if values.is_empty() {
        return UnitQuaternion::identity();
    }

    // coords are ordered (x, y, z, w)
    let accum = values.iter().fold(Matrix4::<f64>::zeros(), |acc, q| {
        acc + q.coords * q.coords.transpose()
    });

    let eigen = SymmetricEigen::new(accum);
    let largest = eigen.eigenvalues.imax();
    let v = eigen.eigenvectors.column(largest);

    UnitQuaternion::from_quaternion(Quaternion::new(v[3], v[0], v[1], v[2]))
}

/// Cheaper approximation of [`rotation_mean`] that averages roll, pitch and yaw independently as
/// angles on the circle.
pub fn rotation_mean_circular(values: &[UnitQuaternion<f64>]) -> UnitQuaternion<f64> {
    if values.is_empty() {
        return UnitQuaternion::identity();
    }

    let (cos, sin) = values.iter().map(rotation_angles).fold(
        (Vector3::<f64>::zeros(), Vector3::<f64>::zeros()),
        |(cos, sin), a| (cos + a.map(f64::cos), sin + a.map(f64::sin)),
    );
    let n = values.len() as f64;
    let angles = sin.zip_map(&cos, |s, c| f64::atan2(s / n, c / n));

    UnitQuaternion::from_euler_angles(angles.x, angles.y, angles.z)
}

/// Squared roll, pitch and yaw errors against `mean`, each wrapped into (-PI, PI] before squaring.
pub fn rotation_sq_error_sum(
    mean: &UnitQuaternion<f64>,
    values: &[UnitQuaternion<f64>],
) -> Vector3<f64> {
    let mean = rotation_angles(mean);
    values.iter().map(rotation_angles).fold(Vector3::zeros(), |acc, a| {
        let diff = mean.zip_map(&a, angle_diff);
        acc + diff.component_mul(&diff)
    })
}

/// Standard deviation of roll, pitch and yaw in radians.
pub fn rotation_std_dev(mean: &UnitQuaternion<f64>, values: &[UnitQuaternion<f64>]) -> Vector3<f64> {
    if values.is_empty() {
        return Vector3::zeros();
    }
    (rotation_sq_error_sum(mean, values) / values.len() as f64).map(f64::sqrt)
}

//----- Pose

pub fn pose_mean(values: &[Pose3]) -> Pose3 {
    let translations: Vec<Vector3<f64>> = values.iter().map(|p| p.translation).collect();
    let rotations: Vec<UnitQuaternion<f64>> = values.iter().map(|p| p.rotation).collect();
    Pose3::new(translation_mean(&translations), rotation_mean(&rotations))
}

//----- TargetCorner

pub fn corner_mean(values: &[TargetCorner]) -> TargetCorner {
    if values.is_empty() {
        return TargetCorner::default();
    }
    let n = values.len() as f64;
    let (x, y) = values
        .iter()
        .fold((0.0, 0.0), |(x, y), c| (x + c.x, y + c.y));
    TargetCorner::new(x / n, y / n)
}

pub fn corner_sq_error_sum(mean: &TargetCorner, values: &[TargetCorner]) -> TargetCorner {
    let (x, y) = values.iter().fold((0.0, 0.0), |(x, y), c| {
        let dx = c.x - mean.x;
        let dy = c.y - mean.y;
        (x + dx * dx, y + dy * dy)
    });
    TargetCorner::new(x, y)
}

pub fn corner_std_dev(mean: &TargetCorner, values: &[TargetCorner]) -> TargetCorner {
    pooled_std_dev(&corner_sq_error_sum(mean, values), values.len())
}

/// Standard deviation from squared errors summed over several groups of samples, divided by the total
/// sample count of all groups.
pub fn pooled_std_dev(total_sq_error: &TargetCorner, total_count: usize) -> TargetCorner {
    if total_count == 0 {
        return TargetCorner::default();
    }
    let n = total_count as f64;
    TargetCorner::new((total_sq_error.x / n).sqrt(), (total_sq_error.y / n).sqrt())
}
