use thiserror::Error;

use bincode::error::{DecodeError, EncodeError};

pub type Result<T> = std::result::Result<T, PbfError>;

#[derive(Error, Debug)]
pub enum PbfError {
    #[error("Invalid number of ways: {ways}, expected 4..=8")]
    InvalidWays { ways: usize },

    #[error("Page level {page_level} out of {min}..=13 for {ways} ways")]
    InvalidPageLevel {
        page_level: u32,
        ways: usize,
        min: u32,
    },

    #[error("Invalid page count: {page_count}")]
    InvalidPageCount { page_count: u64 },

    #[error("Data size mismatch: expected {expected} bytes, got {actual}")]
    DataSize { expected: usize, actual: usize },

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EncodeError> for PbfError {
    fn from(err: EncodeError) -> Self {
        PbfError::Serialization(err.to_string())
    }
}

impl From<DecodeError> for PbfError {
    fn from(err: DecodeError) -> Self {
        PbfError::Serialization(err.to_string())
    }
}
