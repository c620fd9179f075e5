use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;
use zip::result::ZipError;

use crate::parsing::error::ParsingError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("File {file}, at line {line_number}: {line}. Parsing error: {error:?}")]
    Parsing {
        error: ParsingError,
        file: String,
        line: String,
        line_number: usize,
    },
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("The base feed has no agency")]
    MissingAgency,
    #[error("Missing file {0} in the base feed")]
    MissingFeedFile(String),
    #[error("Failed to read snapshot: {0}")]
    ReadSnapshot(#[from] DecodeError),
    #[error("Failed to write snapshot: {0}")]
    WriteSnapshot(#[from] EncodeError),
    #[error("Failed to decompress data: {0}")]
    Decompress(#[from] ZipError),
}

pub type RResult<T> = Result<T, ReconcileError>;
