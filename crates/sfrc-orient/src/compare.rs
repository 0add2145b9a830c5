//! Validation of estimated axes against recorded reference orientations.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Vectors shorter than this cannot be compared.
pub const MIN_MAGNITUDE: f64 = 1e-8;

/// Angular error of one fiber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisError {
    pub name: String,
    pub degrees: f64,
    /// Estimate as a unit vector, sign chosen to match the reference.
    pub estimate: [f64; 3],
    pub reference: [f64; 3],
}

/// Aggregate of all comparable fibers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub errors: Vec<AxisError>,
    /// Fibers left out because one of their vectors had near-zero length.
    pub skipped: Vec<String>,
    pub mean_degrees: Option<f64>,
    pub min_degrees: Option<f64>,
    pub max_degrees: Option<f64>,
    pub estimated_tensor: [[f64; 3]; 3],
    pub actual_tensor: [[f64; 3]; 3],
}

impl ComparisonReport {
    pub fn error_for(&self, name: &str) -> Option<&AxisError> {
        self.errors.iter().find(|e| e.name == name)
    }
}

/// Angle in radians between two unit vectors.
pub fn angle_between(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    u.dot(v).clamp(-1.0, 1.0).acos()
}

/// Compare one estimate with its reference, ignoring axis direction.
///
/// Returns `None` when either vector is too short to normalize.
pub fn axis_error(estimate: [f64; 3], reference: [f64; 3]) -> Option<(f64, Vector3<f64>, Vector3<f64>)> {
    let estimate = Vector3::from(estimate);
    let reference = Vector3::from(reference);
    let (est_norm, ref_norm) = (estimate.norm(), reference.norm());
    if est_norm < MIN_MAGNITUDE || ref_norm < MIN_MAGNITUDE {
        return None;
    }

    let unit_estimate = estimate / est_norm;
    let unit_reference = reference / ref_norm;

    let direct = angle_between(&unit_reference, &unit_estimate);
    let flipped = angle_between(&unit_reference, &-unit_estimate);
    if direct < flipped {
        Some((direct, unit_estimate, unit_reference))
    } else {
        Some((flipped, -unit_estimate, unit_reference))
    }
}

/// Mean of the outer products of a set of unit vectors.
pub fn orientation_tensor(vectors: &[Vector3<f64>]) -> Matrix3<f64> {
    if vectors.is_empty() {
        return Matrix3::zeros();
    }
    vectors
        .iter()
        .fold(Matrix3::zeros(), |acc, p| acc + p * p.transpose())
        / vectors.len() as f64
}

/// Compare every `(name, estimate, reference)` triple.
pub fn compare<'a, I>(items: I) -> ComparisonReport
where
    I: IntoIterator<Item = (&'a str, [f64; 3], [f64; 3])>,
{
    let mut errors = Vec::new();
    let mut skipped = Vec::new();
    let mut estimates = Vec::new();
    let mut actuals = Vec::new();

    for (name, estimate, reference) in items {
        let Some((radians, unit_estimate, unit_reference)) = axis_error(estimate, reference)
        else {
            log::warn!("zero magnitude orientation for fiber {name}, skipping comparison");
            skipped.push(name.to_string());
            continue;
        };

        estimates.push(unit_estimate);
        actuals.push(unit_reference);
        errors.push(AxisError {
            name: name.to_string(),
            degrees: radians.to_degrees(),
            estimate: unit_estimate.into(),
            reference: unit_reference.into(),
        });
    }

    let degrees: Vec<f64> = errors.iter().map(|e| e.degrees).collect();
    let mean_degrees =
        (!degrees.is_empty()).then(|| degrees.iter().sum::<f64>() / degrees.len() as f64);
    let min_degrees = degrees.iter().copied().reduce(f64::min);
    let max_degrees = degrees.iter().copied().reduce(f64::max);

    let report = ComparisonReport {
        errors,
        skipped,
        mean_degrees,
        min_degrees,
        max_degrees,
        estimated_tensor: orientation_tensor(&estimates).into(),
        actual_tensor: orientation_tensor(&actuals).into(),
    };

    if let (Some(mean), Some(min), Some(max)) = (mean_degrees, min_degrees, max_degrees) {
        log::debug!("orientation difference (degrees): mean {mean:.3}, min {min:.3}, max {max:.3}");
        log::debug!("estimated orientation tensor: {:?}", report.estimated_tensor);
        log::debug!("actual orientation tensor: {:?}", report.actual_tensor);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_estimate_has_no_error() {
        let report = compare([("Fiber_0", [0.0, 0.0, -2.0], [0.0, 0.0, 1.0])]);
        let err = report.error_for("Fiber_0").unwrap();
        assert!(err.degrees.abs() < 1e-9);
        assert_eq!(err.estimate, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn identical_vectors_compare_to_zero() {
        let v = [0.6, 0.0, 0.8];
        let report = compare([("a", v, v), ("b", [1.0, 0.0, 0.0], [3.0, 0.0, 0.0])]);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.degrees.abs() < 1e-5));
        assert!(report.max_degrees.unwrap() < 1e-5);
    }

    #[test]
    fn perpendicular_axes_are_ninety_degrees_apart() {
        let report = compare([("a", [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])]);
        assert!((report.mean_degrees.unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vectors_are_skipped_and_excluded_from_statistics() {
        let report = compare([
            ("zero", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ("ok", [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ]);
        assert_eq!(report.skipped, vec!["zero".to_string()]);
        assert_eq!(report.errors.len(), 1);
        assert!((report.mean_degrees.unwrap() - 45.0).abs() < 1e-9);
        assert_eq!(report.min_degrees, report.max_degrees);
    }

    #[test]
    fn empty_input_has_no_statistics() {
        let report = compare(Vec::<(&str, [f64; 3], [f64; 3])>::new());
        assert!(report.mean_degrees.is_none());
        assert_eq!(report.actual_tensor, [[0.0; 3]; 3]);
    }

    #[test]
    fn tensor_of_aligned_axes_is_a_projector() {
        let tensor = orientation_tensor(&[Vector3::x(), -Vector3::x()]);
        assert_eq!(tensor[(0, 0)], 1.0);
        assert_eq!(tensor.trace(), 1.0);
    }
}
