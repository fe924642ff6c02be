use thiserror::Error as ThisError;

/// Failures surfaced by the round engine and its collaborators.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// Durable I/O failed. Nothing retries synchronously; the next natural
    /// operation tries again.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("result already recorded for round {0}")]
    DuplicateRound(u64),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Stable machine-readable code used in error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Error::DuplicateRound(_) => "DUPLICATE_ROUND",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
