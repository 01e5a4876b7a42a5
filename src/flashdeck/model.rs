use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media classes stored under the deck root. Each class is one subfolder;
/// generated filenames share a single sequence space across classes, so a
/// name can never collide even if a file later moves between classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaClass {
    Images,
    Audio,
    Recordings,
}

impl MediaClass {
    pub fn dir_name(self) -> &'static str {
        match self {
            MediaClass::Images => "images",
            MediaClass::Audio => "audio",
            MediaClass::Recordings => "recordings",
        }
    }
}

/// One pronunciation attempt. `ts` is also embedded in the filename so the
/// recordings folder stays human-sortable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRecord {
    pub file: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

/// Durable representation of one flashcard, as stored in the index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: u64,
    pub word: String,
    #[serde(default)]
    pub image_files: Vec<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Newest first.
    #[serde(default)]
    pub recordings: Vec<RecordingRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The single authoritative document (`cards.json` at the deck root).
/// Counters only ever move forward; they are never reused after a removal,
/// which is what makes generated filenames collision-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "first_counter")]
    pub next_card_no: u64,
    #[serde(default = "first_counter")]
    pub next_media_no: u64,
    #[serde(default)]
    pub cards: Vec<CardRecord>,
}

fn first_counter() -> u64 {
    1
}

impl Default for IndexDocument {
    fn default() -> Self {
        Self {
            updated_at: Utc::now(),
            next_card_no: 1,
            next_media_no: 1,
            cards: Vec::new(),
        }
    }
}

impl IndexDocument {
    pub fn find_card(&self, id: u64) -> Option<&CardRecord> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn find_card_mut(&mut self, id: u64) -> Option<&mut CardRecord> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    /// Mint the next card id.
    pub fn take_card_no(&mut self) -> u64 {
        let no = self.next_card_no;
        self.next_card_no += 1;
        no
    }

    /// Mint the next media sequence number (shared across media classes).
    pub fn take_media_no(&mut self) -> u64 {
        let no = self.next_media_no;
        self.next_media_no += 1;
        no
    }
}

/// Caller-supplied media bytes with an advisory original name.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl MediaBlob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A media reference resolved to its bytes during hydration.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub file: String,
    pub bytes: Vec<u8>,
}

/// UI-ready view of a card: the durable record's fields plus resolved media.
/// Rebuilt from disk on every load or mutation, never persisted. A referenced
/// file that is missing on disk is simply absent from `images`/`audio`; the
/// durable filename lists stay untouched.
#[derive(Debug, Clone)]
pub struct CardProjection {
    pub id: u64,
    pub word: String,
    pub images: Vec<ResolvedMedia>,
    pub image_files: Vec<String>,
    pub audio: Option<ResolvedMedia>,
    pub audio_file: Option<String>,
    pub tags: Vec<String>,
    pub recordings: Vec<RecordingRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_counters_start_at_one() {
        let doc = IndexDocument::default();
        assert_eq!(doc.next_card_no, 1);
        assert_eq!(doc.next_media_no, 1);
        assert!(doc.cards.is_empty());
    }

    #[test]
    fn counters_mint_strictly_increasing() {
        let mut doc = IndexDocument::default();
        assert_eq!(doc.take_card_no(), 1);
        assert_eq!(doc.take_card_no(), 2);
        assert_eq!(doc.take_media_no(), 1);
        assert_eq!(doc.take_media_no(), 2);
        assert_eq!(doc.next_card_no, 3);
        assert_eq!(doc.next_media_no, 3);
    }

    #[test]
    fn index_json_uses_camel_case_keys() {
        let doc = IndexDocument::default();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"updatedAt\""));
        assert!(json.contains("\"nextCardNo\""));
        assert!(json.contains("\"nextMediaNo\""));
    }

    #[test]
    fn card_record_tolerates_missing_optional_fields() {
        let json = r#"{
            "id": 3,
            "word": "dog",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let card: CardRecord = serde_json::from_str(json).unwrap();
        assert!(card.image_files.is_empty());
        assert!(card.audio_file.is_none());
        assert!(card.tags.is_empty());
        assert!(card.recordings.is_empty());
    }

    #[test]
    fn recording_record_omits_absent_byte_count_and_mime() {
        let rec = RecordingRecord {
            file: "000001-20240101-000000.webm".into(),
            ts: Utc::now(),
            bytes: None,
            mime: None,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("bytes"));
        assert!(!json.contains("mime"));
    }
}
