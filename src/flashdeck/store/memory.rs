//! In-memory storage backend for tests.
//!
//! Behaves like the file backend without touching a filesystem, and exposes
//! a fail point so tests can simulate a crash between writing a media file
//! and committing the index.

use super::{index, StorageBackend};
use crate::error::{DeckError, Result};
use crate::model::{IndexDocument, MediaClass};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryBackend {
    index: Option<String>,
    media: HashMap<(MediaClass, String), Vec<u8>>,
    fail_next_save: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save_index` fail, leaving the stored document as-is.
    pub fn fail_next_save(&mut self) {
        self.fail_next_save = true;
    }

    pub fn has_media(&self, class: MediaClass, name: &str) -> bool {
        self.media.contains_key(&(class, name.to_string()))
    }

    /// All stored names in one media class, sorted.
    pub fn media_names(&self, class: MediaClass) -> Vec<String> {
        let mut names: Vec<String> = self
            .media
            .keys()
            .filter(|(c, _)| *c == class)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop a media file behind the store's back (simulates external loss).
    pub fn remove_media(&mut self, class: MediaClass, name: &str) {
        self.media.remove(&(class, name.to_string()));
    }
}

impl StorageBackend for MemoryBackend {
    fn load_index(&self) -> Result<IndexDocument> {
        match &self.index {
            None => Ok(IndexDocument::default()),
            Some(text) => index::parse(text).map_err(|source| DeckError::IndexCorrupt {
                path: index::INDEX_FILE.into(),
                source,
            }),
        }
    }

    fn save_index(&mut self, doc: &IndexDocument) -> Result<()> {
        if self.fail_next_save {
            self.fail_next_save = false;
            return Err(DeckError::Store("simulated index save failure".into()));
        }
        self.index = Some(index::render(doc)?);
        Ok(())
    }

    fn write_media(&mut self, class: MediaClass, name: &str, bytes: &[u8]) -> Result<()> {
        self.media.insert((class, name.to_string()), bytes.to_vec());
        Ok(())
    }

    fn read_media(&self, class: MediaClass, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.media.get(&(class, name.to_string())).cloned())
    }

    fn delete_media(&mut self, class: MediaClass, name: &str) -> Result<()> {
        // idempotent by design
        self.media.remove(&(class, name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_index_defaults_when_never_saved() {
        let backend = MemoryBackend::new();
        let doc = backend.load_index().unwrap();
        assert!(doc.cards.is_empty());
        assert_eq!(doc.next_card_no, 1);
    }

    #[test]
    fn save_then_load_round_trips_through_serialization() {
        let mut backend = MemoryBackend::new();
        let mut doc = IndexDocument::default();
        doc.next_card_no = 7;
        backend.save_index(&doc).unwrap();
        assert_eq!(backend.load_index().unwrap().next_card_no, 7);
    }

    #[test]
    fn delete_missing_media_is_ok() {
        let mut backend = MemoryBackend::new();
        backend
            .delete_media(MediaClass::Images, "000001_gone.png")
            .unwrap();
    }
}
