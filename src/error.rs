use crate::{Bounds, Timestamp};

/// Error type
#[derive(Debug)]
pub enum Error {
    /// An IO error.
    Io(std::io::Error),

    /// Error in storage engine.
    Storage(fjall::Error),

    /// Bounds with `end <= start` or a zero step size.
    InvalidBounds {
        /// Start of the grid
        start: Timestamp,

        /// End of the grid (exclusive)
        end: Timestamp,

        /// Step size
        step_size: Timestamp,
    },

    /// A series or namespace block does not agree with the canonical bounds.
    BoundsMismatch {
        /// Series key of the offending series
        series: String,

        /// Namespace of the offending namespace block, if any
        namespace: Option<String>,

        /// Bounds that were expected
        expected: Bounds,

        /// Bounds that were found
        actual: Bounds,
    },

    /// Series metadata is missing or malformed.
    InvalidSeriesMeta {
        /// Position of the series in the block
        index: usize,

        /// What is wrong with it
        reason: &'static str,
    },

    /// Two series of a block share the same series key.
    DuplicateSeries(String),

    /// Namespace name contains unsupported characters.
    InvalidNamespace(String),

    /// Datapoints of a raw source are not ordered by timestamp.
    UnorderedDatapoints {
        /// Timestamp of the earlier datapoint
        prev: Timestamp,

        /// Timestamp of the datapoint that followed it
        next: Timestamp,
    },

    /// A stored key or value could not be decoded.
    Decode(&'static str),

    /// The block was already released.
    Released,
}

impl From<fjall::Error> for Error {
    fn from(value: fjall::Error) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => {
                write!(f, "{e}")
            }
            Self::Io(e) => {
                write!(f, "{e}")
            }
            Self::InvalidBounds {
                start,
                end,
                step_size,
            } => {
                write!(f, "InvalidBounds([{start}..{end}) step {step_size})")
            }
            Self::BoundsMismatch {
                series,
                namespace,
                expected,
                actual,
            } => match namespace {
                Some(ns) => write!(
                    f,
                    "BoundsMismatch({series} in {ns}: expected {expected}, got {actual})"
                ),
                None => write!(
                    f,
                    "BoundsMismatch({series}: expected {expected}, got {actual})"
                ),
            },
            Self::InvalidSeriesMeta { index, reason } => {
                write!(f, "InvalidSeriesMeta(#{index}: {reason})")
            }
            Self::DuplicateSeries(key) => {
                write!(f, "DuplicateSeries({key})")
            }
            Self::InvalidNamespace(name) => {
                write!(f, "InvalidNamespace({name:?})")
            }
            Self::UnorderedDatapoints { prev, next } => {
                write!(f, "UnorderedDatapoints({next} after {prev})")
            }
            Self::Decode(what) => {
                write!(f, "Decode({what})")
            }
            Self::Released => {
                write!(f, "Released")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

/// Result helper type
pub type Result<T> = std::result::Result<T, Error>;
