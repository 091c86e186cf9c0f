//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::QuestionError;

/// Errors emitted while fetching or decoding the question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("question bank request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed question bank: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid question #{index}: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

/// Errors emitted by the quiz engine.
///
/// Persistence failures never appear here: the engine logs them and keeps
/// running in memory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("could not load question bank: {0}")]
    Load(#[from] LoadError),
    #[error("answer {index} does not exist (question has {available} answers)")]
    InvalidSelection { index: usize, available: usize },
}
