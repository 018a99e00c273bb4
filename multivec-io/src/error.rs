use std::io;
use thiserror::Error;

/// Error type for the chunked matrix container.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File is not a valid store, or its index is damaged.
    #[error("File doesn't appear to be a valid multivec store: {0}")]
    InvalidStore(String),

    /// No dataset with this name exists in the store.
    #[error("Dataset not found in store: {0}")]
    UnknownDataset(String),

    /// A dataset with this name was already added.
    #[error("Dataset already exists in store: {0}")]
    DuplicateDataset(String),

    /// Block column count differs from the store's.
    #[error("Block has {found} columns, store expects {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    /// More rows were appended than the dataset was declared with.
    #[error("Writing {rows} more rows to {name} would exceed its {capacity} rows")]
    Overfull { name: String, rows: u64, capacity: u64 },

    /// Requested rows are outside the dataset.
    #[error("Rows {start}-{end} are out of range for {name} ({rows} rows)")]
    OutOfRange {
        name: String,
        start: u64,
        end: u64,
        rows: u64,
    },

    /// Attributes could not be encoded or decoded.
    #[error("Invalid store attributes: {0}")]
    Attrs(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
