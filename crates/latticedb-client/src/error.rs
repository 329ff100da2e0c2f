use std::backtrace::Backtrace;
use std::fmt;

use thiserror::Error;

/// Failure kinds surfaced by discovery and balancing.
#[derive(Debug, Error)]
pub enum ClientErrorKind {
    #[error("discovery error: {0}")]
    Discovery(String),
    /// Advisory: every balancer element is banned. Selection still returns
    /// a connection so in-flight traffic can drain.
    #[error("all endpoints are banned")]
    AllBanned,
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation timed out")]
    Timeout,
}

/// A client error with the stack captured where it was first raised;
/// re-wrapping appends context without replacing the origin.
#[derive(Debug)]
pub struct ClientError {
    kind: ClientErrorKind,
    context: Vec<String>,
    backtrace: Backtrace,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind) -> Self {
        Self {
            kind,
            context: Vec::new(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn context(mut self, msg: impl Into<String>) -> Self {
        self.context.push(msg.into());
        self
    }

    pub fn kind(&self) -> &ClientErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for ctx in &self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ClientErrorKind> for ClientError {
    fn from(kind: ClientErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
