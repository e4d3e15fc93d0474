//! Error types shared by the JSON-file storage implementation.

use std::path::PathBuf;

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`JsonDaoError`] failures.
pub type JsonResult<T> = Result<T, JsonDaoError>;

/// Failures that can occur while reading or writing the data directory.
#[derive(Debug, Error)]
pub enum JsonDaoError {
    /// Data directory could not be created.
    #[error("failed to create data directory `{path}`")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Data directory could not be listed.
    #[error("failed to list data directory `{path}`")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record file could not be read.
    #[error("failed to read record `{path}`")]
    ReadRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record file could not be written.
    #[error("failed to write record `{path}`")]
    WriteRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A record file could not be removed.
    #[error("failed to remove record `{path}`")]
    RemoveRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Record contents were not valid JSON for the expected model.
    #[error("failed to decode record `{path}`")]
    DecodeRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A record could not be serialized to JSON.
    #[error("failed to encode record `{path}`")]
    EncodeRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A file name did not parse as a document id.
    #[error("invalid document id `{doc_id}`: {kind}")]
    InvalidDocId { doc_id: String, kind: &'static str },
}

impl From<JsonDaoError> for StorageError {
    fn from(err: JsonDaoError) -> Self {
        StorageError::unavailable("json store operation failed", err)
    }
}
