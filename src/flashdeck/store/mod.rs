//! # Persistence layer
//!
//! The deck lives in a plain directory tree the user picked:
//!
//! ```text
//! <deck root>/
//! ├── cards.json      # index document, the single source of truth
//! ├── images/         # <seq>_<sanitizedName>
//! ├── audio/          # <seq>_<sanitizedName>
//! └── recordings/     # <paddedId>-<stamp>.<ext>
//! ```
//!
//! Storage is abstracted behind the [`StorageBackend`] trait:
//!
//! - [`fs::FsBackend`]: production file-tree storage with atomic index
//!   replacement (temp-write-then-rename).
//! - [`memory::MemoryBackend`]: in-memory storage for tests, including a
//!   fail point to simulate a crash between media write and index save.
//!
//! [`CardStore`] layers the card operations on top. Every mutation is one
//! read-modify-write cycle over the index document and takes `&mut self`,
//! so two mutations can never interleave their loads and saves; sharing a
//! store across tasks goes through a single async mutex. Media files are
//! always written before the index save that references them: an interrupted
//! mutation leaves at worst an orphaned file, never an index entry pointing
//! at a file that was never written.

use crate::error::{DeckError, Result};
use crate::model::{
    CardProjection, CardRecord, IndexDocument, MediaBlob, MediaClass, RecordingRecord,
    ResolvedMedia,
};
use crate::naming;
use chrono::Utc;

pub mod fs;
pub mod index;
pub mod memory;

/// Abstract interface to the deck's directory tree.
///
/// `load_index` tolerates a missing document (first run) by returning the
/// empty default; a document that exists but cannot be parsed is an error,
/// never silently replaced. `delete_media` is idempotent: deleting a name
/// that is not on disk succeeds.
pub trait StorageBackend {
    fn load_index(&self) -> Result<IndexDocument>;

    /// Persist the document with replace-then-commit semantics.
    fn save_index(&mut self, doc: &IndexDocument) -> Result<()>;

    /// Write a blob into a media class folder, creating the folder if absent.
    fn write_media(&mut self, class: MediaClass, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a media file back, `None` if the folder or file is missing.
    fn read_media(&self, class: MediaClass, name: &str) -> Result<Option<Vec<u8>>>;

    fn delete_media(&mut self, class: MediaClass, name: &str) -> Result<()>;
}

/// Everything `update` may change about a card. `images_keep` lists the
/// on-disk filenames to retain, in the order the caller wants them; images
/// of the card not listed there are deleted from disk. `new_audio: None`
/// keeps the existing clip.
#[derive(Debug, Clone, Default)]
pub struct CardEdit {
    pub word: String,
    pub tags: Vec<String>,
    pub images_keep: Vec<String>,
    pub new_images: Vec<MediaBlob>,
    pub new_audio: Option<MediaBlob>,
}

/// The public persistence API for one deck.
#[derive(Debug)]
pub struct CardStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> CardStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Create a card. Media files are written before the index is saved; a
    /// failed write aborts the whole operation with the index untouched.
    pub fn create(
        &mut self,
        word: &str,
        tags: Vec<String>,
        images: Vec<MediaBlob>,
        audio: Option<MediaBlob>,
    ) -> Result<CardProjection> {
        let mut doc = self.backend.load_index()?;
        let id = doc.take_card_no();
        let now = Utc::now();

        let mut image_files = Vec::with_capacity(images.len());
        for blob in &images {
            let name = naming::media_filename(doc.take_media_no(), &blob.name);
            self.backend
                .write_media(MediaClass::Images, &name, &blob.bytes)?;
            image_files.push(name);
        }

        let mut audio_file = None;
        if let Some(blob) = &audio {
            let name = naming::media_filename(doc.take_media_no(), &blob.name);
            self.backend
                .write_media(MediaClass::Audio, &name, &blob.bytes)?;
            audio_file = Some(name);
        }

        let record = CardRecord {
            id,
            word: word.to_string(),
            image_files,
            audio_file,
            tags,
            recordings: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        doc.cards.push(record.clone());
        self.save(&mut doc)?;

        tracing::debug!(id, word, "card created");
        self.hydrate(&record)
    }

    /// Edit a card's word, tags, images and audio. Images dropped from the
    /// keep set are deleted from disk first; new images land after the kept
    /// ones. The recording log is carried over untouched.
    pub fn update(&mut self, id: u64, edit: CardEdit) -> Result<CardProjection> {
        let mut doc = self.backend.load_index()?;
        let existing = doc.find_card(id).ok_or(DeckError::CardNotFound(id))?;

        for name in existing.image_files.clone() {
            if !edit.images_keep.contains(&name) {
                self.backend.delete_media(MediaClass::Images, &name)?;
            }
        }

        let mut appended = Vec::with_capacity(edit.new_images.len());
        for blob in &edit.new_images {
            let name = naming::media_filename(doc.take_media_no(), &blob.name);
            self.backend
                .write_media(MediaClass::Images, &name, &blob.bytes)?;
            appended.push(name);
        }

        let mut audio_file = doc.find_card(id).and_then(|c| c.audio_file.clone());
        if let Some(blob) = &edit.new_audio {
            if let Some(old) = &audio_file {
                self.backend.delete_media(MediaClass::Audio, old)?;
            }
            let name = naming::media_filename(doc.take_media_no(), &blob.name);
            self.backend
                .write_media(MediaClass::Audio, &name, &blob.bytes)?;
            audio_file = Some(name);
        }

        // find_card above guarantees the card is present
        let card = doc.find_card_mut(id).ok_or(DeckError::CardNotFound(id))?;
        card.word = edit.word;
        card.tags = edit.tags;
        card.image_files = edit
            .images_keep
            .iter()
            .cloned()
            .chain(appended.into_iter())
            .collect();
        card.audio_file = audio_file;
        card.updated_at = Utc::now();
        let record = card.clone();
        self.save(&mut doc)?;

        tracing::debug!(id, "card updated");
        self.hydrate(&record)
    }

    /// Append a pronunciation recording, newest first. Empty bytes are a
    /// deliberate no-op (an interrupted recording with nothing captured),
    /// returning `Ok(None)`.
    pub fn append_recording(
        &mut self,
        id: u64,
        bytes: Vec<u8>,
        mime: Option<String>,
        ext: &str,
    ) -> Result<Option<RecordingRecord>> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let mut doc = self.backend.load_index()?;
        if doc.find_card(id).is_none() {
            return Err(DeckError::CardNotFound(id));
        }

        let ts = Utc::now();
        let name = naming::recording_filename(id, ts, ext);
        self.backend
            .write_media(MediaClass::Recordings, &name, &bytes)?;

        let rec = RecordingRecord {
            file: name,
            ts,
            bytes: Some(bytes.len() as u64),
            mime,
        };
        // find_card above guarantees the card is present
        let card = doc.find_card_mut(id).ok_or(DeckError::CardNotFound(id))?;
        card.recordings.insert(0, rec.clone());
        card.updated_at = Utc::now();
        self.save(&mut doc)?;

        tracing::debug!(id, file = %rec.file, "recording appended");
        Ok(Some(rec))
    }

    /// Hydrate every card in creation order.
    pub fn load_cards(&self) -> Result<Vec<CardProjection>> {
        let doc = self.backend.load_index()?;
        doc.cards.iter().map(|c| self.hydrate(c)).collect()
    }

    /// Hydrate one card.
    pub fn get_card(&self, id: u64) -> Result<CardProjection> {
        let doc = self.backend.load_index()?;
        let record = doc.find_card(id).ok_or(DeckError::CardNotFound(id))?;
        self.hydrate(record)
    }

    /// The raw index document, for listings that do not need media bytes.
    pub fn load_index(&self) -> Result<IndexDocument> {
        self.backend.load_index()
    }

    fn save(&mut self, doc: &mut IndexDocument) -> Result<()> {
        doc.updated_at = Utc::now();
        self.backend.save_index(doc)
    }

    /// Resolve a record's media references by reading the files back. A
    /// missing file drops that one reference from the projection; the
    /// durable filename lists keep it.
    fn hydrate(&self, record: &CardRecord) -> Result<CardProjection> {
        let mut images = Vec::with_capacity(record.image_files.len());
        for name in &record.image_files {
            match self.backend.read_media(MediaClass::Images, name)? {
                Some(bytes) => images.push(ResolvedMedia {
                    file: name.clone(),
                    bytes,
                }),
                None => tracing::warn!(card = record.id, file = %name, "image missing on disk"),
            }
        }

        let mut audio = None;
        if let Some(name) = &record.audio_file {
            match self.backend.read_media(MediaClass::Audio, name)? {
                Some(bytes) => {
                    audio = Some(ResolvedMedia {
                        file: name.clone(),
                        bytes,
                    })
                }
                None => tracing::warn!(card = record.id, file = %name, "audio missing on disk"),
            }
        }

        Ok(CardProjection {
            id: record.id,
            word: record.word.clone(),
            images,
            image_files: record.image_files.clone(),
            audio,
            audio_file: record.audio_file.clone(),
            tags: record.tags.clone(),
            recordings: record.recordings.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
