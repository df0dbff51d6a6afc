//! Error types shared by every stage of the pipeline

use thiserror::Error;

/// Category of a user input error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A character that starts no known token
    UnrecognizedCharacter,
    /// A punctuation character or operator sequence outside the grammar
    UnrecognizedSymbol,
    /// A backslash followed by anything but `\`, `'` or `"`
    InvalidEscape,
    /// A quote without a matching closing quote
    UnterminatedString,
    /// A token in a position the grammar does not allow
    UnexpectedToken,
    /// Unmatched bracket or parenthesis
    UnbalancedGroup,
    /// Unknown method name or wrong argument count
    UnsupportedMethod,
    /// Property name that is not a valid unescaped identifier
    InvalidPropertyName,
    /// Malformed array accessor body
    InvalidArrayAccess,
}

/// A malformed path or filter expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at position {position}, {message}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, position: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    pub(crate) fn unexpected(position: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedToken, position, message)
    }
}

/// A broken internal invariant or an exceeded recursion/iteration ceiling.
///
/// Never caused by a merely malformed query; it means the library itself
/// could not finish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error type for JSONPath operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

impl Error {
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    /// The user input error, if this is one
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Internal(_) => None,
        }
    }
}
