//! Application layer errors

use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error raised by application-supplied handlers and behaviors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of every mediator operation
pub type MediatorResult<T> = Result<T, MediatorError>;

/// Which handler contract a lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Request,
    Stream,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Request => write!(f, "request"),
            HandlerKind::Stream => write!(f, "stream"),
        }
    }
}

/// Mediator errors
#[derive(Error, Debug)]
pub enum MediatorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No {kind} handler registered for ({message_type}, {response_type})")]
    NotFound {
        kind: HandlerKind,
        message_type: &'static str,
        response_type: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Handler error: {0}")]
    Handler(#[source] BoxError),

    #[error("{} notification handlers failed", .0.len())]
    Aggregate(Vec<MediatorError>),
}

impl MediatorError {
    /// Wrap an application error raised inside a handler or behavior
    pub fn handler(error: impl Into<BoxError>) -> Self {
        MediatorError::Handler(error.into())
    }

    pub fn not_found<T: ?Sized>(kind: HandlerKind, message_type: &'static str) -> Self {
        MediatorError::NotFound {
            kind,
            message_type,
            response_type: std::any::type_name::<T>(),
        }
    }

    /// True when the operation was abandoned rather than failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediatorError::Cancelled)
    }

    /// Every individual failure carried by this error
    pub fn failures(&self) -> Vec<&MediatorError> {
        match self {
            MediatorError::Aggregate(errors) => errors.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }
}

impl From<ConfigError> for MediatorError {
    fn from(error: ConfigError) -> Self {
        MediatorError::Config(error.to_string())
    }
}

/// Fail with [`MediatorError::Cancelled`] once the token has been cancelled
pub fn check_cancelled(token: &CancellationToken) -> MediatorResult<()> {
    if token.is_cancelled() {
        return Err(MediatorError::Cancelled);
    }
    Ok(())
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
