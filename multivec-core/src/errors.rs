use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a conversion run. None of them are retried.
#[derive(Error, Debug)]
pub enum MultivecError {
    #[error("No input files were supplied")]
    EmptyInput,

    #[error("Input file is not a valid bigWig file: {path} ({reason})")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error(
        "Interval {start}-{end} on {chrom} in {path} exceeds the reconciled chromosome size ({size})"
    )]
    ChromosomeOverflow {
        path: PathBuf,
        chrom: String,
        start: u32,
        end: u32,
        size: u32,
    },

    #[error("Failed to write matrix data for {chrom}: {source}")]
    StorageWrite {
        chrom: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read intervals of {chrom} from {path}: {reason}")]
    TrackRead {
        path: PathBuf,
        chrom: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MultivecError {
    /// Wrap any displayable storage failure into a [`MultivecError::StorageWrite`].
    pub fn storage<E: std::fmt::Display>(chrom: &str, err: E) -> Self {
        MultivecError::StorageWrite {
            chrom: chrom.to_owned(),
            source: std::io::Error::other(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MultivecError>;
