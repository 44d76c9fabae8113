use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The candidate lacks data the active strategy needs. Recovered per candidate.
    #[error("Candidate '{id}' cannot be scored: {reason}")]
    UnscorableCandidate { id: String, reason: String },

    #[error("Requested top {requested} but only {available} results are available")]
    InvalidRange { requested: usize, available: usize },

    #[error("Embedding unavailable for '{text}': {reason}")]
    EmbeddingUnavailable { text: String, reason: String },

    /// A score mapping references a candidate the set does not hold.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification so callers can branch without matching payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfig,
    NotFound,
    InvalidRecord,
    InvalidQuery,
    UnscorableCandidate,
    InvalidRange,
    EmbeddingUnavailable,
    InconsistentState,
    Io,
    Json,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidRecord(_) => ErrorKind::InvalidRecord,
            Error::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Error::UnscorableCandidate { .. } => ErrorKind::UnscorableCandidate,
            Error::InvalidRange { .. } => ErrorKind::InvalidRange,
            Error::EmbeddingUnavailable { .. } => ErrorKind::EmbeddingUnavailable,
            Error::InconsistentState(_) => ErrorKind::InconsistentState,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Json,
        }
    }

    /// Query-level failures abort the whole request; the rest are local.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnscorableCandidate { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
