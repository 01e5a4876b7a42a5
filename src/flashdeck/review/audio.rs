//! Playback and capture seams.
//!
//! Real audio hardware lives outside the core: the sequencer only knows
//! these traits. The microphone is modeled as one long-lived capture-device
//! handle (acquired once, reused across cards so the user is not re-prompted)
//! that hands out short-lived recording sessions, one per cycle.

use crate::error::Result;
use crate::model::ResolvedMedia;
use async_trait::async_trait;

/// Bytes captured by one recording session.
#[derive(Debug, Clone, Default)]
pub struct CapturedClip {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
    pub ext: String,
}

impl CapturedClip {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Plays one clip and resolves when it ends. An implementation that cannot
/// start playback (no output device, autoplay refused) returns immediately,
/// which the sequencer treats as instantly-complete playback.
#[async_trait]
pub trait ClipPlayer: Send + Sync {
    async fn play_to_end(&self, clip: &ResolvedMedia);
}

/// Long-lived capture-device handle.
pub trait Microphone: Send + Sync {
    type Session: RecorderSession;

    /// Open a recording session, or `None` when capture is unavailable
    /// (permission denied, no device). The sequencer then skips Recording
    /// for that cycle without surfacing an error into the card flow.
    fn open_session(&self) -> Option<Self::Session>;
}

/// One in-flight recording. Dropping a session discards its audio; the
/// sequencer always goes through `finish` so partial captures survive.
pub trait RecorderSession: Send {
    /// Stop capturing and hand back whatever was recorded so far.
    fn finish(self) -> CapturedClip;
}

/// Where finished recordings go.
#[async_trait]
pub trait RecordingSink: Send + Sync {
    async fn append(&self, card_id: u64, clip: CapturedClip) -> Result<()>;
}

/// Playback for environments without an output device: every clip completes
/// instantly. The no-audio substitute wait still paces the cycle.
pub struct SilentPlayer;

#[async_trait]
impl ClipPlayer for SilentPlayer {
    async fn play_to_end(&self, _clip: &ResolvedMedia) {}
}

/// A microphone that never grants a session, for mic-disabled runs.
pub struct NoMicrophone;

pub struct NoSession;

impl RecorderSession for NoSession {
    fn finish(self) -> CapturedClip {
        CapturedClip::default()
    }
}

impl Microphone for NoMicrophone {
    type Session = NoSession;

    fn open_session(&self) -> Option<NoSession> {
        None
    }
}
