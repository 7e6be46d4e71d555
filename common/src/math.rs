use std::f64::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

/// Wraps an angle in radians into the range (-PI, PI].
pub fn angle_modulus(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Computes the shortest signed distance from `alpha` to `beta` in radians and returns the result in the
/// range (-PI, PI].
pub fn angle_diff(alpha: f64, beta: f64) -> f64 {
    angle_modulus(beta - alpha)
}

/// The (roll, pitch, yaw) angles of a rotation in radians, i.e. the rotations about the X, Y and Z axes
/// such that `R = Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn rotation_angles(rotation: &UnitQuaternion<f64>) -> Vector3<f64> {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vector3::new(roll, pitch, yaw)
}
