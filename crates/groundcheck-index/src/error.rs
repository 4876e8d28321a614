use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Similarity index is empty or not loaded")]
    Unavailable,

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("Index references unknown passage id: {0}")]
    UnknownPassage(String),

    #[error("Failed to read index file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed index file at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
