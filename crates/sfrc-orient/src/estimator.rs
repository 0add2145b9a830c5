//! Principal-axis orientation of a fiber node cloud.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{OrientError, Result};
use crate::mcd::min_cov_det;

/// A fiber's material frame: dominant axis plus a secondary axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub id: String,
    pub principal: [f64; 3],
    pub secondary: [f64; 3],
}

impl Orientation {
    /// The six `*Orientation` data fields, principal axis first.
    pub fn fields(&self) -> [f64; 6] {
        let [a, b, c] = self.principal;
        let [d, e, f] = self.secondary;
        [a, b, c, d, e, f]
    }
}

/// Issues `Ori-<family>-<n>` identifiers, counting from zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrientationIds {
    family: String,
    next: u32,
}

impl OrientationIds {
    pub fn new(family: impl Into<String>) -> Self {
        Self::starting_at(family, 0)
    }

    pub fn starting_at(family: impl Into<String>, next: u32) -> Self {
        Self {
            family: family.into(),
            next,
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("Ori-{}-{}", self.family, self.next);
        self.next += 1;
        id
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// Eigen decomposition of the robust covariance of a cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalAxes {
    pub mean: Vector3<f64>,
    /// One eigenvector per row, in decomposition order.
    pub eigenvectors: Matrix3<f64>,
    pub eigenvalues: Vector3<f64>,
    /// Row of the largest eigenvalue.
    pub dominant: usize,
}

impl PrincipalAxes {
    pub fn from_cloud(cloud: &[[f64; 3]]) -> Result<Self> {
        if cloud.len() < 2 {
            return Err(OrientError::TooFewPoints {
                required: 2,
                found: cloud.len(),
            });
        }

        let points: Vec<Vector3<f64>> = cloud.iter().map(|p| Vector3::from(*p)).collect();
        let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / points.len() as f64;
        let centered: Vec<Vector3<f64>> = points.iter().map(|p| p - mean).collect();

        let robust = min_cov_det(&centered)?;
        let eigen = SymmetricEigen::new(robust.covariance);

        Ok(Self {
            mean,
            eigenvectors: eigen.eigenvectors.transpose(),
            eigenvalues: eigen.eigenvalues,
            dominant: eigen.eigenvalues.imax(),
        })
    }

    /// Express the canonical axes in the eigenvector basis.
    ///
    /// Returns the solution for the dominant axis and the first of the two
    /// remaining ones.
    pub fn rectangle(&self) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let lu = self.eigenvectors.lu();
        let mut solutions = Vec::with_capacity(3);
        for axis in 0..3 {
            let canonical = Vector3::ith(axis, 1.0);
            let solution = lu
                .solve(&canonical)
                .ok_or(OrientError::SingularBasis(axis))?;
            solutions.push(solution);
        }

        let principal = solutions.remove(self.dominant);
        Ok((principal, solutions[0]))
    }
}

/// Estimate the frame of one cloud and label it with the next identifier.
pub fn estimate(cloud: &[[f64; 3]], ids: &mut OrientationIds) -> Result<Orientation> {
    estimate_with_id(cloud, ids.next_id())
}

/// Estimate many clouds in parallel; identifiers follow input order.
pub fn estimate_many<C>(clouds: &[C], ids: &mut OrientationIds) -> Result<Vec<Orientation>>
where
    C: AsRef<[[f64; 3]]> + Sync,
{
    let labels: Vec<String> = clouds.iter().map(|_| ids.next_id()).collect();
    clouds
        .par_iter()
        .zip(labels.into_par_iter())
        .map(|(cloud, id)| estimate_with_id(cloud.as_ref(), id))
        .collect()
}

fn estimate_with_id(cloud: &[[f64; 3]], id: String) -> Result<Orientation> {
    let axes = PrincipalAxes::from_cloud(cloud)?;
    let (principal, secondary) = axes.rectangle()?;
    log::trace!(
        "{id}: {} points, eigenvalues {:?}",
        cloud.len(),
        axes.eigenvalues.as_slice()
    );
    Ok(Orientation {
        id,
        principal: principal.into(),
        secondary: secondary.into(),
    })
}
