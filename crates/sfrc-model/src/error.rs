//! Error types for sfrc-model

use sfrc_inp::InpError;
use sfrc_orient::OrientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Inp(#[from] InpError),

    #[error(transparent)]
    Orient(#[from] OrientError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}
