//! Crate error type.
//!
//! A single hand-rolled enum rather than a derive-macro error, matching the
//! idiom used elsewhere in this pack for project-local error types: a plain
//! `enum` with a manual `Display` impl and `From` conversions for the
//! failure modes that cross an I/O or (de)serialization boundary.

use std::fmt;

#[derive(Debug)]
pub enum SbtError {
    /// Caller mixed a node variant and hash-function count incompatibly
    /// (SSBT/HowDe require exactly one hash function), or asked for a
    /// fast/faster query on a tree configured with more than one.
    InvalidConfiguration(String),
    /// A query was issued before any sequence had been inserted.
    EmptyTree,
    /// A node or filter of the wrong bit length was supplied.
    DimensionMismatch { expected: usize, found: usize },
    /// Failure reading or writing a save file.
    Io(std::io::Error),
    /// Failure encoding or decoding the binary save format.
    Serde(String),
}

impl fmt::Display for SbtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Self::EmptyTree => write!(f, "query issued against an empty tree"),
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "filter dimension mismatch: expected {expected} bits, found {found}"
            ),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Serde(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SbtError {}

impl From<std::io::Error> for SbtError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<bincode::Error> for SbtError {
    fn from(value: bincode::Error) -> Self {
        Self::Serde(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SbtError>;
