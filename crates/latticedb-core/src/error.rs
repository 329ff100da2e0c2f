use std::backtrace::Backtrace;
use std::fmt;

use thiserror::Error;

/// What went wrong, without the capture-site baggage.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("cannot cast {value} to {target} destination")]
    Cast { value: String, target: &'static str },
    #[error("optional contains no value")]
    OptionalNil,
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// An error with the stack captured where it was first raised.
///
/// Re-wrapping appends context instead of replacing the origin, so the
/// original capture site survives however many layers report it.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    context: Vec<String>,
    backtrace: Backtrace,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Append a layer of context. The origin kind and backtrace are kept.
    pub fn context(mut self, msg: impl Into<String>) -> Self {
        self.context.push(msg.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for ctx in &self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_appends_without_replacing_kind() {
        let err = Error::new(ErrorKind::OptionalNil)
            .context("reading field `a`")
            .context("decoding row 3");
        assert!(matches!(err.kind(), ErrorKind::OptionalNil));
        assert_eq!(
            err.to_string(),
            "optional contains no value: reading field `a`: decoding row 3"
        );
    }

    #[test]
    fn cast_error_names_both_sides() {
        let err: Error = ErrorKind::Cast {
            value: "Int8(\"5\")".to_string(),
            target: "bool",
        }
        .into();
        assert_eq!(err.to_string(), "cannot cast Int8(\"5\") to bool destination");
    }
}
