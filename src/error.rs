//! Error types for WIB Flux

use thiserror::Error;

/// Errors that can occur during ingestion or computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Duplicate timestamps found in session {session_id}")]
    DuplicateTimestamps { session_id: String },

    #[error("Either an event log or pre-extracted traces must be provided")]
    MissingInput,

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Trace too short for computation: {0}")]
    EmptyTrace(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse event log: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
