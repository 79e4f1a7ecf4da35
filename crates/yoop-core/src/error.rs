//! Error types for yoop core operations.
//!
//! Errors are grouped by domain and wrapped by the top-level [`Error`]:
//!
//! - [`ValidationError`]: a parameter was rejected before any external call
//! - [`UnavailableError`]: the requested resource or audio data does not exist
//! - [`ToolError`]: an external process could not be spawned or reported failure
//!
//! Metadata lookups have their own variants ([`Error::FieldLookup`] and
//! [`Error::UnexpectedValue`]) because callers such as `available` and
//! `length` degrade on them instead of propagating.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating parameters.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Bitrate must be a positive number of kilobits per second.
    #[error("Bitrate must be positive, got {0}")]
    Bitrate(i64),

    /// An unbounded bitrate cannot be handed to the encoder.
    #[error("Unbounded bitrate cannot be used for encoding")]
    UnboundedBitrate,

    /// Samplerate must be a positive number of samples per second.
    #[error("Samplerate must be positive, got {0}")]
    Samplerate(i64),

    /// Channel count outside the supported set.
    #[error("Unsupported channel count: {0}")]
    Channels(String),

    /// Split count must be positive.
    #[error("Split count must be positive, got {0}")]
    SplitCount(usize),

    /// Part number outside `1..=total`.
    #[error("Invalid part number {current}/{total}")]
    PartNumber {
        /// Current ordinal.
        current: usize,
        /// Total part count.
        total: usize,
    },

    /// Range step must be non-zero.
    #[error("Range step cannot be zero")]
    ZeroStep,

    /// The locator is not a well-formed absolute URL.
    #[error("Invalid locator '{value}': {reason}")]
    Locator {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The audio tool reported diagnostics while decoding the buffer.
    #[error("Audio data failed verification: {0}")]
    Diagnostics(String),
}

/// Errors raised when a resource or its data is not available.
#[derive(Debug, Error)]
pub enum UnavailableError {
    /// No audio bytes were provided or produced.
    #[error("No audio data provided (empty buffer)")]
    EmptyAudio,

    /// The locator matches no known source family or shape.
    #[error("Cannot classify locator: {0}")]
    Unclassifiable(String),

    /// The listing reported an entry the tool could not resolve.
    #[error("Playlist {playlist} contains an unavailable entry")]
    Entry {
        /// The playlist being listed.
        playlist: String,
    },

    /// A page dump did not contain the expected payload.
    #[error("Page dump for {0} contained no payload")]
    PageDump(String),
}

/// Errors raised by external tool invocations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be started.
    #[error("Failed to spawn {program}: {reason}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying reason.
        reason: String,
    },

    /// The process exited unsuccessfully.
    #[error("{program} exited with status {status}: {stderr}")]
    Failed {
        /// Program that failed.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured diagnostic output.
        stderr: String,
    },
}

/// Errors that can occur in yoop core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A resource or its data is unavailable.
    #[error(transparent)]
    Unavailable(#[from] UnavailableError),

    /// External tool failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A metadata field was not reported by the tool.
    #[error("Field not found: {field}")]
    FieldLookup {
        /// Requested field name.
        field: String,
    },

    /// A metadata or probe field holds a value that cannot be interpreted.
    #[error("Unexpected value for {field}: '{value}'")]
    UnexpectedValue {
        /// Field name.
        field: String,
        /// Raw value reported by the tool.
        value: String,
    },

    /// Index outside the collection.
    #[error("Index {index} out of range")]
    IndexOutOfRange {
        /// The requested index.
        index: isize,
    },

    /// Embedded tag container could not be read or written.
    #[error("Tag error: {0}")]
    Tag(#[from] id3::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File system operation failed.
    #[error("File system error at {path}: {message}")]
    FileSystem {
        /// Path where the error occurred.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Validation`].
    Validation,
    /// See [`Error::Unavailable`].
    Unavailable,
    /// See [`Error::Tool`].
    Tool,
    /// See [`Error::FieldLookup`] and [`Error::UnexpectedValue`].
    Metadata,
    /// See [`Error::IndexOutOfRange`].
    Index,
    /// See [`Error::Tag`].
    Tag,
    /// See [`Error::Http`].
    Http,
    /// Configuration, file system, IO and serialization errors.
    Environment,
}

impl Error {
    /// Shorthand for [`Error::FieldLookup`].
    pub fn field_lookup(field: impl Into<String>) -> Self {
        Self::FieldLookup {
            field: field.into(),
        }
    }

    /// Shorthand for [`Error::UnexpectedValue`].
    pub fn unexpected(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The error's category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Tool(_) => ErrorKind::Tool,
            Self::FieldLookup { .. } | Self::UnexpectedValue { .. } => ErrorKind::Metadata,
            Self::IndexOutOfRange { .. } => ErrorKind::Index,
            Self::Tag(_) => ErrorKind::Tag,
            Self::Http(_) => ErrorKind::Http,
            Self::Configuration(_)
            | Self::FileSystem { .. }
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Environment,
        }
    }

    /// Whether this is a missing-field lookup failure.
    #[must_use]
    pub const fn is_field_lookup(&self) -> bool {
        matches!(self, Self::FieldLookup { .. })
    }
}
