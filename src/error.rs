use thiserror::Error;

/// Errors raised while parsing a signal stream from its string form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid symbol {symbol:?} at offset {offset}")]
    InvalidSymbol { symbol: char, offset: usize },
}

/// Failures at the document store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("field {field:?} of {key} is not a number")]
    NotANumber { key: String, field: String },

    #[error("store lock was poisoned")]
    LockPoisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid keyer timing {0:?}: expected <press_ms>:<gap_ms>")]
    InvalidTiming(String),

    #[error("no lesson with id {0:?}")]
    UnknownLesson(String),
}

pub type Result<T> = std::result::Result<T, CoachError>;
