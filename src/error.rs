use std::fmt::{Debug, Display};

use crate::{
    frontend::{Span, TokenError},
    runtime,
};

/// Attaches a source position to a stage error.
pub trait IntoSpanned: Display + Sized {
    fn at(self, span: Span) -> SpannedError<Self> {
        SpannedError { kind: self, span }
    }
}

impl<T: Display> IntoSpanned for T {}

/// A stage error together with where in the source it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedError<T: Display> {
    pub kind: T,
    pub span: Span,
}

impl<T: Display> Display for SpannedError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl<T: Display + Debug> std::error::Error for SpannedError<T> {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),
    #[error("TokenError: {0}")]
    Lex(#[from] TokenError),
    #[error("SerializeError: {0}")]
    Serialize(#[from] ron::Error),
    #[error("RuntimeError: {0}")]
    Runtime(#[from] runtime::Error),
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::IO(_) => Span::default(),
            Error::Lex(e) => e.span,
            Error::Serialize(_) => Span::default(),
            Error::Runtime(_) => Span::default(),
        }
    }
}
