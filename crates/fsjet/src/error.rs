//! Error type shared by every fsjet operation.

use std::io;
use std::path::{Path, PathBuf};

use fsjet_glob::PatternError;
use thiserror::Error;

/// Result type for fsjet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A path that had to exist is absent.
    NotFound,
    /// A path that had to be a directory is something else.
    NotADirectory,
    /// A destination exists and overwriting was not allowed.
    AlreadyExists,
    /// Any other OS-level failure.
    IoFailure,
    /// Rejected option values or patterns. Raised before any I/O.
    MalformedInput,
}

/// Errors from fsjet operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}: {}", path.display())]
    NotFound { path: PathBuf, message: String },
    #[error("{message}: {}", path.display())]
    NotADirectory { path: PathBuf, message: String },
    #[error("{message}: {}", path.display())]
    AlreadyExists { path: PathBuf, message: String },
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl Error {
    /// Wrap an OS error with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn not_found(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Error::NotFound {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn not_a_directory(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Error::NotADirectory {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn already_exists(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Error::AlreadyExists {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::NotADirectory { .. } => ErrorKind::NotADirectory,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::Io { .. } => ErrorKind::IoFailure,
            Error::MalformedInput(_) | Error::Pattern(_) => ErrorKind::MalformedInput,
        }
    }

    /// POSIX-style code for the error kind (`ENOENT`, `EEXIST`, ...).
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "ENOENT",
            ErrorKind::NotADirectory => "ENOTDIR",
            ErrorKind::AlreadyExists => "EEXIST",
            ErrorKind::IoFailure => "EIO",
            ErrorKind::MalformedInput => "EINVAL",
        }
    }

    /// The offending path, if the error concerns one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::NotFound { path, .. }
            | Error::NotADirectory { path, .. }
            | Error::AlreadyExists { path, .. }
            | Error::Io { path, .. } => Some(path),
            Error::MalformedInput(_) | Error::Pattern(_) => None,
        }
    }
}

impl From<fsjet_types::ParseAlgorithmError> for Error {
    fn from(err: fsjet_types::ParseAlgorithmError) -> Self {
        Error::MalformedInput(err.to_string())
    }
}
