// shared/src/lib.rs

use std::fmt;

/// Errors produced by a single store or cache call, or reported for a single key.
///
/// Errors are `Clone` because a whole-batch failure gets broadcast into every
/// position of a positional result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no such entity")]
    NoSuchEntity,
    #[error("entity already exists")]
    AlreadyExists,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("call cancelled")]
    Cancelled,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("store: {0}")]
    Store(String),
    #[error("cache: {0}")]
    Cache(String),
    #[error("internal: {0}")]
    Internal(String),
    #[error("{context}: {source}")]
    Wrapped {
        context: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach a static context string, keeping the original error as the source.
    pub fn wrap(self, context: &'static str) -> Self {
        Error::Wrapped {
            context,
            source: Box::new(self),
        }
    }

    /// Strip any `Wrapped` layers and return the innermost error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Wrapped { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A positional error container: entry `i` describes the outcome for input `i`.
/// `None` means the key at that position succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiError(pub Vec<Option<Error>>);

impl MultiError {
    /// An all-success container of the given length.
    pub fn new(len: usize) -> Self {
        Self(vec![None; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Error> {
        self.0.get(index).and_then(Option::as_ref)
    }

    /// Positions that carry an error, with the error.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.0.iter().filter(|e| e.is_some()).count()
    }

    pub fn into_inner(self) -> Vec<Option<Error>> {
        self.0
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut failures = self.failures();
        match failures.next() {
            None => write!(f, "(0 errors)"),
            Some((_, first)) => match failures.count() {
                0 => write!(f, "{first}"),
                1 => write!(f, "{first} (and 1 other error)"),
                n => write!(f, "{first} (and {n} other errors)"),
            },
        }
    }
}

impl std::error::Error for MultiError {}

impl From<Vec<Option<Error>>> for MultiError {
    fn from(errors: Vec<Option<Error>>) -> Self {
        Self(errors)
    }
}

/// Result of a batched call: either the whole call failed with one error, or
/// some keys failed and the positional container says which.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error(transparent)]
    Single(#[from] Error),
    #[error(transparent)]
    Multi(#[from] MultiError),
}

impl BatchError {
    /// Collapse the outcome of a one-key batch into a plain error.
    ///
    /// A one-element positional error yields its only entry, which may be
    /// `None` if the store reported success for that key.
    pub fn into_single_key_error(self) -> Option<Error> {
        match self {
            BatchError::Single(err) => Some(err),
            BatchError::Multi(multi) => multi.0.into_iter().flatten().next(),
        }
    }
}

pub type BatchResult<T = ()> = std::result::Result<T, BatchError>;

pub mod config;
