//! Error types for colorlogger.
//!
//! The storage lifecycle has one error type per operation family so the
//! acquisition loop can map each failure to a status notification. All of them
//! convert into the crate-wide [`Error`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::sample::RowParseError;

/// Failure to mount the removable volume.
#[derive(Error, Debug)]
pub enum MountError {
    /// The volume does not know a drive by that name.
    #[error("unknown logical drive '{0}'")]
    UnknownDrive(String),

    /// A drive is already mounted.
    #[error("drive '{0}' is already mounted")]
    AlreadyMounted(String),

    /// The underlying mount call failed.
    #[error("failed to mount drive '{drive}': {source}")]
    Failed {
        /// Drive name.
        drive: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Failure to unmount the removable volume.
#[derive(Error, Debug)]
pub enum UnmountError {
    /// The named drive is not the one currently mounted.
    #[error("drive '{0}' is not mounted")]
    NotMounted(String),

    /// A recording session still holds a file open on the volume.
    #[error("cannot unmount '{0}' while a recording session is open")]
    SessionOpen(String),

    /// The underlying unmount call failed.
    #[error("failed to unmount drive '{drive}': {source}")]
    Failed {
        /// Drive name.
        drive: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// Failure to start a recording session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A session is already open.
    #[error("a recording session is already open on '{0}'")]
    AlreadyOpen(String),

    /// No volume is mounted.
    #[error("cannot open '{0}': no volume mounted")]
    NotMounted(String),

    /// The log file could not be created or truncated.
    #[error("failed to create log file '{file}': {source}")]
    Create {
        /// File name.
        file: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The CSV header could not be written.
    #[error("failed to write header to '{file}': {source}")]
    Header {
        /// File name.
        file: String,
        /// The underlying error.
        #[source]
        source: WriteError,
    },
}

/// Failure while writing to the open log file.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Nothing to write to.
    #[error("no recording session is open")]
    NoSession,

    /// Writing bytes failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// Forcing data to stable storage failed.
    #[error("sync failed: {0}")]
    Sync(#[source] io::Error),
}

/// The main error type for colorlogger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Mounting failed.
    #[error(transparent)]
    Mount(#[from] MountError),

    /// Unmounting failed.
    #[error(transparent)]
    Unmount(#[from] UnmountError),

    /// Starting a session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Writing a row failed.
    #[error(transparent)]
    Write(#[from] WriteError),

    // === Log File Errors ===
    /// A log file line could not be parsed.
    #[error("{path}:{line}: {source}")]
    LogParse {
        /// File being read.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        #[source]
        source: RowParseError,
    },

    /// A log file did not start with the expected header.
    #[error("{path}: missing or unexpected header")]
    LogHeader {
        /// File being read.
        path: PathBuf,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for colorlogger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Check if this error came from the storage lifecycle.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::Mount(_) | Self::Unmount(_) | Self::Session(_) | Self::Write(_)
        )
    }
}
