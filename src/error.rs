//! Error types.
//!
//! Two families, never mixed:
//!
//! - [`Error`] — infrastructure failures: binding a port, accepting a
//!   connection. Returned from [`Server::serve`](crate::Server::serve).
//! - [`ApiError`] — the conditions a request can end in. Handlers and
//!   extractors return them; the [`ErrorMapper`](crate::ErrorMapper) is the
//!   only place that turns them into status codes and bodies.

use std::fmt;

/// The error type returned by carlot's fallible server operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Where in the request a binding failure happened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputSource {
    Path,
    Query,
    Body,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path  => "path",
            Self::Query => "query",
            Self::Body  => "body",
        })
    }
}

/// A typed request condition.
///
/// Only the success case is built by handlers themselves. Everything else is
/// returned as one of these and rendered by the error mapper.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be bound to the declared input model.
    #[error("invalid {location}: {message}")]
    MalformedInput { location: InputSource, message: String },

    /// A lookup by identifier found nothing.
    #[error("{0}")]
    NotFound(String),

    /// A gated route was called without valid credentials.
    #[error("authentication required")]
    Unauthenticated { realm: String },

    /// Anything else. The detail is logged, never sent.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// The kind of an [`ApiError`], used as the key of error-mapping rules.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConditionKind {
    MalformedInput,
    NotFound,
    Unauthenticated,
    Unexpected,
}

impl ApiError {
    pub fn malformed(location: InputSource, message: impl Into<String>) -> Self {
        Self::MalformedInput { location, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unexpected(message: impl fmt::Display) -> Self {
        Self::Unexpected(anyhow::anyhow!("{message}"))
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            Self::MalformedInput { .. } => ConditionKind::MalformedInput,
            Self::NotFound(_)           => ConditionKind::NotFound,
            Self::Unauthenticated { .. } => ConditionKind::Unauthenticated,
            Self::Unexpected(_)         => ConditionKind::Unexpected,
        }
    }
}
