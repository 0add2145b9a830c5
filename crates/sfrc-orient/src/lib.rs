//! Fiber orientation estimation for short-fiber composite meshes.
//!
//! This crate provides:
//! - **Robust covariance** (minimum covariance determinant) of node clouds
//! - **Principal-axis frames** with run-scoped `Ori-<family>-<n>` identifiers
//! - **Validation** of estimated axes against reference orientations
//! - **Spherical-angle helpers** for orientations given as `theta`/`phi`

pub mod compare;
pub mod error;
pub mod estimator;
pub mod mcd;
pub mod vector;

pub use compare::{AxisError, ComparisonReport, compare, orientation_tensor};
pub use error::{OrientError, Result};
pub use estimator::{Orientation, OrientationIds, PrincipalAxes, estimate, estimate_many};
pub use mcd::{RobustCovariance, min_cov_det};
pub use vector::{frame_from_angles, perpendicular_vector, spherical_to_cartesian};
