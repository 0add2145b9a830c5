//! Error types for sfrc-io

use sfrc_inp::InpError;
use sfrc_model::ModelError;
use sfrc_orient::OrientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Orientation table is missing columns {missing:?} (found {found:?})")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Orientation table has no data rows")]
    EmptyTable,

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Inp(#[from] InpError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Orient(#[from] OrientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
