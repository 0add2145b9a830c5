//! Minimum covariance determinant (MCD) robust covariance for 3D clouds.
//!
//! A deterministic variant of FAST-MCD: a few robust starting subsets are
//! refined with concentration steps, the subset with the smallest covariance
//! determinant wins, and the raw estimate is consistency-corrected and
//! reweighted. Stray nodes far from the fiber body therefore do not tilt the
//! principal axes.

use nalgebra::{Matrix3, Vector3};

use crate::error::{OrientError, Result};

const DIM: usize = 3;
const MAX_C_STEPS: usize = 100;

/// Median of the chi-squared distribution with 3 degrees of freedom.
pub const CHI2_3_MEDIAN: f64 = 2.365_973_884_375_338;
/// 0.975 quantile of the chi-squared distribution with 3 degrees of freedom.
pub const CHI2_3_Q975: f64 = 9.348_403_604_496_146;

#[derive(Debug, Clone, PartialEq)]
pub struct RobustCovariance {
    pub location: Vector3<f64>,
    pub covariance: Matrix3<f64>,
    /// Determinant of the best raw h-subset covariance.
    pub raw_determinant: f64,
    /// Points that contributed to the final estimate.
    pub support: Vec<bool>,
}

impl RobustCovariance {
    pub fn support_size(&self) -> usize {
        self.support.iter().filter(|s| **s).count()
    }
}

#[derive(Debug, Clone)]
struct Subset {
    indices: Vec<usize>,
    location: Vector3<f64>,
    covariance: Matrix3<f64>,
    determinant: f64,
}

impl Subset {
    fn fit(points: &[Vector3<f64>], indices: Vec<usize>) -> Self {
        let (location, covariance) = mean_and_covariance(points, &indices);
        Self {
            determinant: covariance.determinant(),
            indices,
            location,
            covariance,
        }
    }
}

/// Robust location and covariance of `points`.
pub fn min_cov_det(points: &[Vector3<f64>]) -> Result<RobustCovariance> {
    let n = points.len();
    if n < 2 {
        return Err(OrientError::TooFewPoints {
            required: 2,
            found: n,
        });
    }

    let h = (n + DIM + 1).div_ceil(2);
    if n <= DIM || h >= n {
        let all: Vec<usize> = (0..n).collect();
        let classical = Subset::fit(points, all);
        return Ok(RobustCovariance {
            location: classical.location,
            covariance: classical.covariance,
            raw_determinant: classical.determinant,
            support: vec![true; n],
        });
    }

    let raw = initial_subsets(points, h)
        .into_iter()
        .map(|start| concentrate(points, start, h))
        .min_by(|a, b| a.determinant.total_cmp(&b.determinant))
        .ok_or(OrientError::TooFewPoints {
            required: DIM + 1,
            found: n,
        })?;

    let mut support = vec![false; n];
    for &idx in &raw.indices {
        support[idx] = true;
    }

    let Some(inverse) = invert(&raw.covariance) else {
        log::debug!("MCD exact fit on {} of {n} points, skipping reweighting", h);
        return Ok(RobustCovariance {
            location: raw.location,
            covariance: raw.covariance,
            raw_determinant: raw.determinant,
            support,
        });
    };

    let mut distances = mahalanobis_sq(points, &raw.location, &inverse);
    let correction = median(distances.clone()) / CHI2_3_MEDIAN;
    if correction > 0.0 {
        distances.iter_mut().for_each(|d| *d /= correction);
    }

    let inliers: Vec<usize> = distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d <= CHI2_3_Q975)
        .map(|(idx, _)| idx)
        .collect();

    if inliers.len() <= DIM {
        return Ok(RobustCovariance {
            location: raw.location,
            covariance: raw.covariance * correction.max(f64::MIN_POSITIVE),
            raw_determinant: raw.determinant,
            support,
        });
    }

    let (location, covariance) = mean_and_covariance(points, &inliers);
    let mut support = vec![false; n];
    for &idx in &inliers {
        support[idx] = true;
    }
    log::trace!(
        "MCD kept {} of {n} points (h = {h}, correction = {correction:.4})",
        inliers.len()
    );

    Ok(RobustCovariance {
        location,
        covariance,
        raw_determinant: raw.determinant,
        support,
    })
}

/// Mean and biased (divide-by-count) covariance of the selected points.
pub fn mean_and_covariance(
    points: &[Vector3<f64>],
    indices: &[usize],
) -> (Vector3<f64>, Matrix3<f64>) {
    let count = indices.len().max(1) as f64;
    let mean = indices
        .iter()
        .fold(Vector3::zeros(), |acc, &idx| acc + points[idx])
        / count;
    let covariance = indices.iter().fold(Matrix3::zeros(), |acc, &idx| {
        let d = points[idx] - mean;
        acc + d * d.transpose()
    }) / count;
    (mean, covariance)
}

fn concentrate(points: &[Vector3<f64>], start: Vec<usize>, h: usize) -> Subset {
    let mut current = Subset::fit(points, start);
    for _ in 0..MAX_C_STEPS {
        let Some(inverse) = invert(&current.covariance) else {
            break;
        };
        let distances = mahalanobis_sq(points, &current.location, &inverse);
        let next = Subset::fit(points, smallest(&distances, h));
        if next.indices == current.indices || next.determinant >= current.determinant {
            break;
        }
        current = next;
    }
    current
}

fn initial_subsets(points: &[Vector3<f64>], h: usize) -> Vec<Vec<usize>> {
    let all: Vec<usize> = (0..points.len()).collect();
    let (mean, covariance) = mean_and_covariance(points, &all);
    let mut starts = Vec::new();

    if let Some(inverse) = invert(&covariance) {
        starts.push(smallest(&mahalanobis_sq(points, &mean, &inverse), h));
    }

    let mut center = Vector3::zeros();
    let mut scale = Vector3::zeros();
    for axis in 0..DIM {
        let values: Vec<f64> = points.iter().map(|p| p[axis]).collect();
        center[axis] = median(values.clone());
        let mad = median(values.iter().map(|v| (v - center[axis]).abs()).collect());
        scale[axis] = if mad > 0.0 { mad } else { 1.0 };
    }
    let scaled: Vec<f64> = points
        .iter()
        .map(|p| (p - center).component_div(&scale).norm_squared())
        .collect();
    starts.push(smallest(&scaled, h));

    let euclidean: Vec<f64> = points.iter().map(|p| (p - mean).norm_squared()).collect();
    starts.push(smallest(&euclidean, h));

    starts.sort();
    starts.dedup();
    starts
}

fn mahalanobis_sq(
    points: &[Vector3<f64>],
    location: &Vector3<f64>,
    inverse: &Matrix3<f64>,
) -> Vec<f64> {
    points
        .iter()
        .map(|p| {
            let d = p - location;
            d.dot(&(inverse * d))
        })
        .collect()
}

/// Indices of the `h` smallest distances, sorted ascending by index.
fn smallest(distances: &[f64], h: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..distances.len()).collect();
    order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(a.cmp(&b)));
    order.truncate(h);
    order.sort_unstable();
    order
}

fn invert(covariance: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let scale = covariance.trace() / DIM as f64;
    if scale <= 0.0 || covariance.determinant() <= 1e-12 * scale.powi(DIM as i32) {
        return None;
    }
    covariance.try_inverse()
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::SymmetricEigen;

    use super::*;

    fn rod_with_outliers() -> Vec<Vector3<f64>> {
        let mut points: Vec<Vector3<f64>> = (0..40)
            .map(|i| {
                let y = ((i * 7 % 5) as f64 - 2.0) * 0.05;
                let z = ((i * 3 % 7) as f64 - 3.0) * 0.05;
                Vector3::new(i as f64 * 0.5, y, z)
            })
            .collect();
        points.push(Vector3::new(10.0, 50.0, 0.0));
        points.push(Vector3::new(10.0, 55.0, 1.0));
        points.push(Vector3::new(9.0, 60.0, -1.0));
        points
    }

    fn dominant_axis(covariance: &Matrix3<f64>) -> Vector3<f64> {
        let eigen = SymmetricEigen::new(*covariance);
        eigen.eigenvectors.column(eigen.eigenvalues.imax()).into_owned()
    }

    #[test]
    fn outliers_do_not_tilt_the_dominant_axis() {
        let points = rod_with_outliers();
        let all: Vec<usize> = (0..points.len()).collect();

        let (_, classical) = mean_and_covariance(&points, &all);
        assert!(dominant_axis(&classical).y.abs() > 0.9);

        let robust = min_cov_det(&points).expect("mcd should succeed");
        let axis = dominant_axis(&robust.covariance);
        assert!(axis.x.abs() > 0.99, "robust axis was {axis:?}");
        assert!(!robust.support[40] && !robust.support[41] && !robust.support[42]);
        assert!(robust.support_size() >= (points.len() + 4).div_ceil(2));
    }

    #[test]
    fn small_clouds_fall_back_to_classical_estimate() {
        let points = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)];
        let robust = min_cov_det(&points).unwrap();
        assert_eq!(robust.location, Vector3::new(1.0, 0.0, 0.0));
        assert!((robust.covariance[(0, 0)] - 1.0).abs() < 1e-12);
        assert_eq!(robust.support_size(), 2);
    }

    #[test]
    fn single_point_is_rejected() {
        let err = min_cov_det(&[Vector3::zeros()]).unwrap_err();
        assert_eq!(err, OrientError::TooFewPoints { required: 2, found: 1 });
    }

    #[test]
    fn planar_cloud_is_an_exact_fit() {
        let points: Vec<Vector3<f64>> = (0..30)
            .map(|i| Vector3::new((i % 6) as f64 * 3.0, (i / 6) as f64, 0.0))
            .collect();
        let robust = min_cov_det(&points).unwrap();
        assert!(robust.covariance[(2, 2)].abs() < 1e-12);
        assert!(robust.covariance[(0, 0)] > robust.covariance[(1, 1)]);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(Vec::new()), 0.0);
    }
}
