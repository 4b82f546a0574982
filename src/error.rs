use thiserror::Error;

use crate::ua::StatusCode;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the runtime.
///
/// Variants map onto the error handling design's categories: parameter errors, resource
/// errors, transport errors, and subscription errors. Per-item service errors are plain
/// [`StatusCode`] values carried inside responses, not variants of this enum — they never
/// short-circuit a batch.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller passed a malformed argument: unknown node-path grammar, missing required field,
    /// mismatched builder state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A bounded resource (send queue, continuation-point table) is exhausted.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The transport reported a failure: reset, decoding error, or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request timed out waiting for its response.
    #[error("request timed out")]
    Timeout,

    /// The session was closed while the request was outstanding.
    #[error("session closed")]
    SessionClosed,

    /// Operation addressed a session that the manager does not know about.
    #[error("no such session for endpoint {0}")]
    NoSuchSession(String),

    /// A service or per-item operation failed with a status code.
    #[error("{0}")]
    StatusCode(StatusCode),
}

impl Error {
    /// Builds an [`Error::InvalidArgument`] from anything displayable.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Builds an [`Error::ResourceUnavailable`] from anything displayable.
    pub fn resource_unavailable(message: impl Into<String>) -> Self {
        Self::ResourceUnavailable(message.into())
    }

    /// Builds an [`Error::Transport`] from anything displayable.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns the best-effort [`StatusCode`] for this error, for callers that need to report a
    /// single status back to a caller expecting the OPC UA status code vocabulary.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_INVALID_ARGUMENT,
            Self::ResourceUnavailable(_) => StatusCode::BAD_RESOURCE_UNAVAILABLE,
            Self::Transport(_) => StatusCode::BAD_COMMUNICATION_ERROR,
            Self::Timeout => StatusCode::BAD_TIMEOUT,
            Self::SessionClosed => StatusCode::BAD_SESSION_CLOSED,
            Self::NoSuchSession(_) => StatusCode::BAD_INVALID_ARGUMENT,
            Self::StatusCode(status_code) => *status_code,
        }
    }
}

impl From<StatusCode> for Error {
    fn from(status_code: StatusCode) -> Self {
        Self::StatusCode(status_code)
    }
}
