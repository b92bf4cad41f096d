//! Domain error model shared by every aggregate.

use thiserror::Error;

/// Failure of a stream fold.
///
/// `Transition` carries the aggregate's own error untouched so callers can
/// match on business failures without unwrapping strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FoldError<E> {
    /// The stream contained no events, so there is no state to return.
    #[error("stream was not found")]
    StreamNotFound,

    /// A transition rejected an event; the fold stopped at that event.
    #[error("{0}")]
    Transition(E),
}

impl<E> FoldError<E> {
    /// Map the transition error, keeping `StreamNotFound` as-is.
    pub fn map_transition<F>(self, f: impl FnOnce(E) -> F) -> FoldError<F> {
        match self {
            FoldError::StreamNotFound => FoldError::StreamNotFound,
            FoldError::Transition(e) => FoldError::Transition(f(e)),
        }
    }
}

/// An identifier could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid identifier: {0}")]
pub struct InvalidId(pub String);
