//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// {0} is not a valid archive
    #[error("{0} is not a valid archive")]
    InvalidArchive(String),

    /// BTDX archive with an unknown payload tag
    #[error("unsupported archive payload tag {0:#010x}")]
    UnsupportedDialect(u32),

    /// unexpected end of stream while reading {0}
    #[error("unexpected end of stream while reading {0}")]
    TruncatedArchive(String),

    /// unable to decompress {0}
    #[error("unable to decompress {0}")]
    CorruptEntry(String),

    /// {0} can not be placed under the destination
    #[error("{0:?} can not be placed under the destination")]
    InvalidEntryPath(String),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

impl Error {
    /// Whether this error was caused by running out of input.
    pub fn is_eof(&self) -> bool {
        match self {
            Error::IOError(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            Error::BinRWError(e) => e.is_eof(),
            Error::TruncatedArchive(_) => true,
            _ => false,
        }
    }

    /// Replace end of stream failures with [`Error::TruncatedArchive`] naming `source`.
    pub(crate) fn truncated(self, source: &str) -> Self {
        match self {
            Error::TruncatedArchive(_) => self,
            e if e.is_eof() => Error::TruncatedArchive(source.to_owned()),
            e => e,
        }
    }

    /// Classify an IO failure that happened while reading the entry at `path`.
    pub(crate) fn for_entry(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::TruncatedArchive(path.to_owned()),
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
                Error::CorruptEntry(path.to_owned())
            }
            _ => Error::IOError(err),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;

        match err {
            Error::IOError(e) => e,
            err @ Error::TruncatedArchive(_) => std::io::Error::new(ErrorKind::UnexpectedEof, err),
            err @ Error::CorruptEntry(_) => std::io::Error::new(ErrorKind::InvalidData, err),
            err => std::io::Error::other(err),
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
