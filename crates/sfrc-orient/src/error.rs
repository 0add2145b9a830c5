//! Error types for sfrc-orient

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrientError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrientError {
    #[error("at least {required} points are needed, got {found}")]
    TooFewPoints { required: usize, found: usize },

    #[error("eigenvector matrix is singular, cannot express canonical axis {0}")]
    SingularBasis(usize),

    #[error("zero-length vector")]
    ZeroVector,
}
