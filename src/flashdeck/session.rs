//! Directory session: owns the storage-root capability.
//!
//! The user's chosen deck folder is remembered across runs in a small JSON
//! file under the app config dir, separate from the deck data itself. On
//! startup the session silently re-opens the folder when access still
//! holds, or degrades to a "needs reconnect" state that only an explicit
//! user-driven [`DirectorySession::reconnect`] (or a fresh
//! [`DirectorySession::attach`]) can leave. Nothing else in the crate holds
//! the root: the store is only reachable through the session.

use crate::error::{DeckError, Result};
use crate::store::fs::FsBackend;
use crate::store::CardStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the persisted-handle file inside the config dir.
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    directory: PathBuf,
}

enum SessionInner {
    Detached,
    NeedsReconnect(PathBuf),
    Attached(CardStore<FsBackend>),
}

/// Where the session currently stands, for display.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionState<'a> {
    Detached,
    NeedsReconnect(&'a Path),
    Attached(&'a Path),
}

pub struct DirectorySession {
    config_dir: PathBuf,
    inner: SessionInner,
}

impl DirectorySession {
    /// Restore the persisted handle. A remembered folder that can still be
    /// opened read-write reattaches silently; one that cannot leaves the
    /// session waiting for an explicit reconnect.
    pub fn restore(config_dir: PathBuf) -> Self {
        let inner = match read_session_file(&config_dir) {
            None => SessionInner::Detached,
            Some(root) => match probe(&root) {
                Ok(store) => SessionInner::Attached(store),
                Err(err) => {
                    tracing::info!(root = %root.display(), %err, "stored folder needs reconnect");
                    SessionInner::NeedsReconnect(root)
                }
            },
        };
        Self { config_dir, inner }
    }

    /// Attach a folder (created if missing) and persist the handle.
    pub fn attach(&mut self, root: PathBuf) -> Result<()> {
        fs::create_dir_all(&root)?;
        let store = probe(&root)?;
        self.persist(&root)?;
        self.inner = SessionInner::Attached(store);
        Ok(())
    }

    /// User-driven reconnect of the remembered folder.
    pub fn reconnect(&mut self) -> Result<()> {
        let root = match &self.inner {
            SessionInner::Attached(_) => return Ok(()),
            SessionInner::NeedsReconnect(root) => root.clone(),
            SessionInner::Detached => return Err(DeckError::StorageUnattached),
        };
        match probe(&root) {
            Ok(store) => {
                self.inner = SessionInner::Attached(store);
                Ok(())
            }
            Err(_) => Err(DeckError::PermissionRevoked(root)),
        }
    }

    pub fn state(&self) -> SessionState<'_> {
        match &self.inner {
            SessionInner::Detached => SessionState::Detached,
            SessionInner::NeedsReconnect(root) => SessionState::NeedsReconnect(root),
            SessionInner::Attached(store) => SessionState::Attached(store.backend().root()),
        }
    }

    /// The attached store, or `StorageUnattached`.
    pub fn store(&mut self) -> Result<&mut CardStore<FsBackend>> {
        match &mut self.inner {
            SessionInner::Attached(store) => Ok(store),
            _ => Err(DeckError::StorageUnattached),
        }
    }

    /// Take ownership of the attached store (for long-running consumers
    /// like the review sequencer).
    pub fn take_store(self) -> Result<CardStore<FsBackend>> {
        match self.inner {
            SessionInner::Attached(store) => Ok(store),
            _ => Err(DeckError::StorageUnattached),
        }
    }

    fn persist(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let file = SessionFile {
            directory: root.to_path_buf(),
        };
        let text = serde_json::to_string_pretty(&file)?;
        fs::write(self.config_dir.join(SESSION_FILE), text)?;
        Ok(())
    }
}

/// Open a root read-write. The root must already exist (attach creates it,
/// restore must not resurrect a deleted deck); creating the media subfolders
/// doubles as the permission probe.
fn probe(root: &Path) -> Result<CardStore<FsBackend>> {
    if !root.is_dir() {
        return Err(DeckError::Store(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let backend = FsBackend::new(root.to_path_buf());
    backend.ensure_layout()?;
    Ok(CardStore::new(backend))
}

fn read_session_file(config_dir: &Path) -> Option<PathBuf> {
    let text = fs::read_to_string(config_dir.join(SESSION_FILE)).ok()?;
    match serde_json::from_str::<SessionFile>(&text) {
        Ok(file) => Some(file.directory),
        Err(err) => {
            tracing::warn!(%err, "unreadable session file; starting detached");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_detached_without_a_persisted_handle() {
        let config = tempfile::tempdir().unwrap();
        let session = DirectorySession::restore(config.path().to_path_buf());
        assert_eq!(session.state(), SessionState::Detached);
    }

    #[test]
    fn store_on_detached_session_is_an_error() {
        let config = tempfile::tempdir().unwrap();
        let mut session = DirectorySession::restore(config.path().to_path_buf());
        assert!(matches!(
            session.store().unwrap_err(),
            DeckError::StorageUnattached
        ));
    }

    #[test]
    fn attach_persists_and_survives_restart() {
        let config = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();

        let mut session = DirectorySession::restore(config.path().to_path_buf());
        session.attach(root.path().to_path_buf()).unwrap();
        assert_eq!(session.state(), SessionState::Attached(root.path()));

        let mut restored = DirectorySession::restore(config.path().to_path_buf());
        assert_eq!(restored.state(), SessionState::Attached(root.path()));
        assert!(restored.store().is_ok());
    }

    #[test]
    fn attach_creates_the_folder_and_layout() {
        let config = tempfile::tempdir().unwrap();
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("deck");

        let mut session = DirectorySession::restore(config.path().to_path_buf());
        session.attach(root.clone()).unwrap();
        assert!(root.join("images").is_dir());
        assert!(root.join("audio").is_dir());
        assert!(root.join("recordings").is_dir());
    }

    #[test]
    fn vanished_folder_degrades_to_needs_reconnect() {
        let config = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();

        let mut session = DirectorySession::restore(config.path().to_path_buf());
        session.attach(root_path.clone()).unwrap();
        drop(root);

        let mut restored = DirectorySession::restore(config.path().to_path_buf());
        // restore never recreates a deleted deck folder
        match restored.state() {
            SessionState::NeedsReconnect(p) => assert_eq!(p, root_path.as_path()),
            other => panic!("expected NeedsReconnect, got {:?}", other),
        }
        assert!(matches!(
            restored.store().unwrap_err(),
            DeckError::StorageUnattached
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_folder_needs_reconnect_until_access_returns() {
        use std::os::unix::fs::PermissionsExt;

        let config = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();

        let mut session = DirectorySession::restore(config.path().to_path_buf());
        session.attach(root.path().to_path_buf()).unwrap();

        fs::set_permissions(root.path(), fs::Permissions::from_mode(0o000)).unwrap();
        let mut locked = DirectorySession::restore(config.path().to_path_buf());
        assert!(matches!(locked.state(), SessionState::NeedsReconnect(_)));
        assert!(matches!(
            locked.reconnect().unwrap_err(),
            DeckError::PermissionRevoked(_)
        ));

        fs::set_permissions(root.path(), fs::Permissions::from_mode(0o755)).unwrap();
        locked.reconnect().unwrap();
        assert!(matches!(locked.state(), SessionState::Attached(_)));
    }

    #[test]
    fn garbage_session_file_starts_detached() {
        let config = tempfile::tempdir().unwrap();
        fs::write(config.path().join(SESSION_FILE), "not json").unwrap();
        let session = DirectorySession::restore(config.path().to_path_buf());
        assert_eq!(session.state(), SessionState::Detached);
    }
}
