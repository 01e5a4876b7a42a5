use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeckError>;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store operation ran before a storage folder was attached.
    #[error("No storage folder attached")]
    StorageUnattached,

    /// The index file exists but cannot be parsed. Never silently replaced
    /// with an empty index: a mutation on top of a fresh index would orphan
    /// every existing media file.
    #[error("Card index {path} exists but could not be parsed: {source}")]
    IndexCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No card with id {0}")]
    CardNotFound(u64),

    /// The remembered storage folder no longer grants read-write access.
    /// Surfaced as a reconnect condition, not a crash.
    #[error("Storage folder {0} is no longer accessible; reconnect it")]
    PermissionRevoked(PathBuf),

    #[error("{0}")]
    Store(String),
}
