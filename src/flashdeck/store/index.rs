//! The index document, serialized form.
//!
//! `cards.json` at the deck root is the single source of truth for which
//! cards exist. A media file on disk that no card references is an orphan
//! and is ignored by every read path. Backends persist the rendered text
//! with replace-then-commit semantics so a reader can never observe a
//! partial document.

use crate::model::IndexDocument;

/// Name of the index document at the deck root.
pub const INDEX_FILE: &str = "cards.json";

/// Parse a raw index document. Unknown-but-missing fields are filled with
/// defaults (empty card list, counters at 1), matching documents written by
/// older versions of the app.
pub fn parse(text: &str) -> serde_json::Result<IndexDocument> {
    serde_json::from_str(text)
}

/// Render the document for persistence. Pretty-printed so the user can read
/// and hand-edit their own deck folder.
pub fn render(doc: &IndexDocument) -> serde_json::Result<String> {
    serde_json::to_string_pretty(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fills_defaults_for_sparse_document() {
        let doc = parse(r#"{ "cards": [] }"#).unwrap();
        assert_eq!(doc.next_card_no, 1);
        assert_eq!(doc.next_media_no, 1);
    }

    #[test]
    fn parse_rejects_wrong_shape() {
        assert!(parse("[1, 2, 3]").is_err());
        assert!(parse("not json").is_err());
    }

    #[test]
    fn render_is_pretty_printed() {
        let doc = IndexDocument::default();
        let text = render(&doc).unwrap();
        assert!(text.contains('\n'));
        assert!(parse(&text).is_ok());
    }
}
