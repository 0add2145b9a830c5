//! Spherical angles and helper frames.

use nalgebra::Vector3;

use crate::error::{OrientError, Result};

/// Unit vector (scaled by `r`) for polar angle `theta` and azimuth `phi`, in radians.
pub fn spherical_to_cartesian(theta: f64, phi: f64, r: f64) -> Vector3<f64> {
    Vector3::new(
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    )
}

/// A unit vector perpendicular to `vector`.
///
/// Crosses with the z axis, or with the x axis when `vector` lies along z.
pub fn perpendicular_vector(vector: &Vector3<f64>) -> Result<Vector3<f64>> {
    let helper = if vector.x.abs() > 1e-8 || vector.y.abs() > 1e-8 {
        Vector3::z()
    } else {
        Vector3::x()
    };
    vector
        .cross(&helper)
        .try_normalize(f64::EPSILON)
        .ok_or(OrientError::ZeroVector)
}

/// Principal and secondary axes for a fiber given by spherical angles.
pub fn frame_from_angles(theta: f64, phi: f64) -> Result<([f64; 3], [f64; 3])> {
    let principal = spherical_to_cartesian(theta, phi, 1.0);
    let secondary = perpendicular_vector(&principal)?;
    Ok((principal.into(), secondary.into()))
}
