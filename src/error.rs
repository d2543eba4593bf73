use std::fmt::{Display, Formatter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    EnvWrite(#[from] EnvWriteError),
    /// The persistence worker hung up before reporting a result.
    #[error("persistence worker is not running")]
    PersisterStopped,
}

/// Offending lines found by a strict parse, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    pub issues: Vec<LineIssue>,
}

impl ParseError {
    pub(crate) fn new(issues: Vec<LineIssue>) -> Self {
        Self { issues }
    }

    /// Line numbers (1-based) of every offending line.
    pub fn lines(&self) -> Vec<u32> {
        self.issues.iter().map(|issue| issue.line).collect()
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error on {} line(s):", self.issues.len())?;
        for issue in &self.issues {
            write!(f, " line {} ({})", issue.line, issue.kind)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineIssue {
    pub line: u32,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("missing `=` separator")]
    MissingSeparator,
    #[error("missing key")]
    EmptyKey,
}

/// The host environment refused a variable assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot set environment variable {key:?}: {kind}")]
pub struct EnvWriteError {
    pub key: String,
    pub kind: EnvWriteErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvWriteErrorKind {
    #[error("key is empty")]
    EmptyKey,
    #[error("key contains `=`")]
    KeyContainsEquals,
    #[error("key contains a NUL byte")]
    KeyContainsNul,
    #[error("value contains a NUL byte")]
    ValueContainsNul,
}
