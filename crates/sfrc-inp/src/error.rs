//! Error types for sfrc-inp

use thiserror::Error;

use crate::index::EntityKind;

pub type Result<T> = std::result::Result<T, InpError>;

#[derive(Error, Debug)]
pub enum InpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind} '{name}' is not present in the index")]
    NotIndexed { kind: EntityKind, name: String },

    #[error("line {line} is past the end of the file ({total} lines)")]
    LineOutOfRange { line: usize, total: usize },

    #[error("line {line}: expected id {expected}, found {found}")]
    IdMismatch {
        line: usize,
        expected: u32,
        found: String,
    },

    #[error("line {line}: invalid integer '{token}'")]
    Resolve { line: usize, token: String },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Unsupported element type: {0}")]
    UnsupportedElement(String),

    #[error("invalid face label '{0}' for a 4-node tetrahedron")]
    InvalidFace(String),
}
