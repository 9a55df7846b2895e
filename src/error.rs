use http::StatusCode;
use thiserror::Error;

/// Terminal failure for a single webhook exchange.
///
/// None of these are retried or defaulted: the exchange stops and no command
/// is sent back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// No body was received.
    #[error("empty request")]
    EmptyRequest,

    /// A body was received but it is not a well-formed call event object.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A required call event field is absent.
    #[error("missing property [{0}]")]
    MissingProperty(String),

    /// The application handler did not produce a usable command object.
    #[error("invalid callback result: {0}")]
    InvalidCallbackResult(String),
}

impl ServerError {
    /// Status the HTTP host answers with when the exchange fails.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::EmptyRequest
            | ServerError::InvalidRequest(_)
            | ServerError::MissingProperty(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidCallbackResult(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
