//! Filename allocation.
//!
//! On-disk names are derived from user-supplied names, never trusted as-is.
//! Uniqueness does not come from the name itself but from the monotonic
//! sequence number prefixed to it: the index document's media counter is
//! never reused, so two generated names can only collide if the counter went
//! backwards.

use chrono::{DateTime, Utc};

/// Cap on the sanitized part of a generated filename.
pub const MAX_NAME_LEN: usize = 80;

/// Zero-padded sequence/card number, e.g. `7` -> `"000007"`.
pub fn pad6(n: u64) -> String {
    format!("{:06}", n)
}

/// Derive a safe filename component from a user-supplied name:
/// keep only the final path component (either separator style), trim and
/// collapse whitespace runs, replace anything outside `[A-Za-z0-9_.+ -]`
/// with `-`, and cap the length.
pub fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let mut out = String::with_capacity(base.len());
    let mut pending_space = false;
    for ch in base.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-' | '+') {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    out.chars().take(MAX_NAME_LEN).collect()
}

/// Filename for an image or audio file: `<seq>_<sanitizedName>`.
pub fn media_filename(seq: u64, original: &str) -> String {
    format!("{}_{}", pad6(seq), sanitize_name(original))
}

/// Filename for a pronunciation recording: `<paddedId>-<YYYYMMDD>-<HHMMSS>.<ext>`.
/// Second resolution; two recordings for one card within the same second
/// overwrite each other, which is accepted.
pub fn recording_filename(card_id: u64, ts: DateTime<Utc>, ext: &str) -> String {
    format!("{}-{}.{}", pad6(card_id), ts.format("%Y%m%d-%H%M%S"), ext)
}
