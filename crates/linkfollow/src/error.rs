//! Link errors

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while parsing or expanding a URI template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` without a matching `}`
    #[error("Unclosed placeholder starting at offset {0}")]
    Unclosed(usize),
    /// A `}` without a preceding `{`
    #[error("Unexpected '}}' at offset {0}")]
    UnexpectedClose(usize),
    /// `{}` or an operator with no variable names
    #[error("Empty placeholder at offset {0}")]
    Empty(usize),
    /// Operator this expander does not implement
    #[error("Unsupported template operator '{0}'")]
    UnsupportedOperator(char),
    /// Variable name with illegal characters or a modifier
    #[error("Invalid variable name '{0}'")]
    InvalidName(String),
}

/// Errors reported by a [`Transport`](crate::Transport)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request timeout
    #[error("Request timeout")]
    Timeout,
    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced to the caller of an exchange
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed URI template
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    /// The request could not be built
    #[error("Request build error: {0}")]
    RequestBuild(String),
    /// The transport failed before a response was received
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// Status code the selected handler chain does not accept
    #[error("Unexpected status ({code}): {reason}")]
    UnexpectedStatus {
        /// HTTP status code
        code: u16,
        /// Reason phrase
        reason: String,
    },
    /// Exchange cancelled before a response was received
    #[error("Exchange cancelled")]
    Cancelled,
    /// Error raised by a response handler, passed through untouched
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),
    /// Settings could not be loaded
    #[error(transparent)]
    Settings(#[from] config::ConfigError),
}

impl Error {
    /// Wrap a domain error raised inside a response handler
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(Box::new(err))
    }

    /// Build a [`Error::RequestBuild`] from anything printable
    pub fn request_build(message: impl Into<String>) -> Self {
        Self::RequestBuild(message.into())
    }
}
