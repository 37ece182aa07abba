use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiaryError {
    #[error("Failed to write to remote store: {0}")]
    RemoteWrite(String),

    #[error("Failed to read from remote store: {0}")]
    RemoteRead(String),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("Index file {} is not valid JSON: {source}", path.display())]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not read index file {}: {source}", path.display())]
    IndexRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write index file {}: {source}", path.display())]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No entry titled \"{0}\"")]
    EntryNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DiaryError>;
