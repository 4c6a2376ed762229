//! Error types for the signature pipeline.

use crate::database::DatabaseError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline step.
///
/// Missing input and unresolved symbols are not errors; they are reported
/// through logging and the step reports.
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata file is not `{dexInfo: {class: [{mangle, ret, args}]}}`.
    #[error("malformed metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The analysis database rejected an operation.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The interface struct is not among the parsed types.
    #[error("interface struct {0} not found in parsed types")]
    InterfaceStructMissing(String),

    /// The interface struct has fewer members than the reserved prefix.
    #[error("interface struct {name} has {members} members, expected at least {required}")]
    InterfaceStructTooSmall {
        name: String,
        members: usize,
        required: usize,
    },
}

impl Error {
    /// Returns true for errors confined to the dispatch stub fixer.
    pub fn is_interface_error(&self) -> bool {
        matches!(
            self,
            Self::InterfaceStructMissing(_) | Self::InterfaceStructTooSmall { .. }
        )
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
