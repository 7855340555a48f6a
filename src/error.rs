//! Error types for Guardar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown layer type: {0}")]
    UnknownLayerType(String),

    #[error("Shape mismatch for `{name}`: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Missing weights for `{0}`")]
    MissingWeights(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Unrecognized artifact format: {0}")]
    UnrecognizedFormat(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
