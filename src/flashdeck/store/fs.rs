//! File-tree storage backend.
//!
//! The index commit is a write to `cards.json.tmp` followed by a rename
//! over `cards.json`; a reader can only ever see the old document or the
//! new one, never a half-written file.

use super::{index, StorageBackend};
use crate::error::{DeckError, Result};
use crate::model::{IndexDocument, MediaClass};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media subfolders. Doubles as the read-write probe when a
    /// remembered folder is re-opened: a root that cannot take new entries
    /// fails here instead of mid-mutation.
    pub fn ensure_layout(&self) -> Result<()> {
        for class in [MediaClass::Images, MediaClass::Audio, MediaClass::Recordings] {
            fs::create_dir_all(self.class_dir(class))?;
        }
        Ok(())
    }

    fn class_dir(&self, class: MediaClass) -> PathBuf {
        self.root.join(class.dir_name())
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(index::INDEX_FILE)
    }
}

impl StorageBackend for FsBackend {
    fn load_index(&self) -> Result<IndexDocument> {
        let path = self.index_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(IndexDocument::default());
            }
            Err(e) => return Err(e.into()),
        };
        index::parse(&text).map_err(|source| DeckError::IndexCorrupt { path, source })
    }

    fn save_index(&mut self, doc: &IndexDocument) -> Result<()> {
        let text = index::render(doc)?;
        let tmp = self.root.join(format!("{}.tmp", index::INDEX_FILE));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.index_path())?;
        Ok(())
    }

    fn write_media(&mut self, class: MediaClass, name: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.class_dir(class);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(name), bytes)?;
        Ok(())
    }

    fn read_media(&self, class: MediaClass, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.class_dir(class).join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_media(&mut self, class: MediaClass, name: &str) -> Result<()> {
        match fs::remove_file(self.class_dir(class).join(name)) {
            Ok(()) => Ok(()),
            // missing file: deletion is idempotent
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
