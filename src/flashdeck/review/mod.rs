//! # Review sequencer
//!
//! A timed, cancellable state machine over the hydrated card list. Per
//! active card it drives
//!
//! ```text
//! Playing -> Waiting(delay) -> [Recording flush] -> repeat xN -> Advance
//! ```
//!
//! where a card without an audio clip substitutes a wait of the same length
//! for Playing, so every card paces the same.
//!
//! Cancellation is a monotonically increasing generation token: activating
//! a card, navigating, replaying or tearing down bumps it, and every timed
//! continuation re-checks its captured token afterwards, becoming a no-op
//! when stale. Cancelling additionally stops the open recorder and persists
//! the partial capture through the sink, unless nothing was captured.
//!
//! Presentation layers get state through [`ReviewSequencer::subscribe`]
//! (a watch channel carrying the active card index) rather than through
//! any implicit re-rendering.

pub mod audio;

use crate::config::{RecordTiming, ReviewOptions};
use crate::model::CardProjection;
use crate::store::{CardStore, StorageBackend};
use audio::{CapturedClip, ClipPlayer, Microphone, RecorderSession, RecordingSink};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;

/// Drill mode loops `repeats` cycles and auto-advances with wrap-around.
/// Study mode runs a single listen-and-repeat window and leaves navigation
/// to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    Drill,
    Study,
}

struct Shared<P, M: Microphone, S> {
    cards: Vec<CardProjection>,
    options: ReviewOptions,
    mode: ReviewMode,
    player: P,
    mic: M,
    sink: S,
    generation: AtomicU64,
    current: AtomicUsize,
    recorder: Mutex<Option<M::Session>>,
    active_tx: watch::Sender<usize>,
}

impl<P, M, S> Shared<P, M, S>
where
    P: ClipPlayer,
    M: Microphone,
    S: RecordingSink,
{
    fn stale(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != token
    }

    /// Invalidate every in-flight continuation and return the new token.
    fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_index(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Move the active index by `delta` with wrap-around at both ends.
    fn step_current(&self, delta: isize) -> usize {
        let len = self.cards.len() as isize;
        let cur = self.current.load(Ordering::SeqCst) as isize;
        let next = (((cur + delta) % len) + len) % len;
        self.current.store(next as usize, Ordering::SeqCst);
        self.active_tx.send_replace(next as usize);
        next as usize
    }

    /// Open a recording session unless one is already open, the run is
    /// stale, or capture is unavailable.
    async fn open_recorder(&self, token: u64) {
        if self.stale(token) {
            return;
        }
        let mut slot = self.recorder.lock().await;
        if slot.is_none() {
            *slot = self.mic.open_session();
        }
    }

    /// Stop the open recorder (if any) and persist what it captured. A
    /// partial recording is still a recording; only an empty capture is
    /// discarded.
    async fn flush_recorder(&self, card_id: u64) {
        let session = self.recorder.lock().await.take();
        let Some(session) = session else { return };
        let clip = session.finish();
        if clip.is_empty() {
            return;
        }
        if let Err(err) = self.sink.append(card_id, clip).await {
            tracing::warn!(card_id, %err, "failed to persist recording");
        }
    }
}

pub struct ReviewSequencer<P, M: Microphone, S> {
    shared: Arc<Shared<P, M, S>>,
}

impl<P, M, S> ReviewSequencer<P, M, S>
where
    P: ClipPlayer + 'static,
    M: Microphone + 'static,
    M::Session: 'static,
    S: RecordingSink + 'static,
{
    pub fn new(
        cards: Vec<CardProjection>,
        options: ReviewOptions,
        mode: ReviewMode,
        player: P,
        mic: M,
        sink: S,
    ) -> Self {
        let (active_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                cards,
                options,
                mode,
                player,
                mic,
                sink,
                generation: AtomicU64::new(0),
                current: AtomicUsize::new(0),
                recorder: Mutex::new(None),
                active_tx,
            }),
        }
    }

    pub fn card_count(&self) -> usize {
        self.shared.cards.len()
    }

    pub fn current_index(&self) -> usize {
        self.shared.current_index()
    }

    pub fn current_card(&self) -> Option<&CardProjection> {
        self.shared.cards.get(self.current_index())
    }

    /// Active-card notifications for a presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.shared.active_tx.subscribe()
    }

    /// Begin reviewing at the current card.
    pub fn start(&self) {
        if self.shared.cards.is_empty() {
            return;
        }
        let token = self.shared.invalidate();
        tokio::spawn(run(self.shared.clone(), token, self.shared.current_index()));
    }

    pub async fn next(&self) {
        self.navigate(1).await;
    }

    pub async fn prev(&self) {
        self.navigate(-1).await;
    }

    /// Manual repeat: restart the cycle for the current card immediately,
    /// cancelling whatever was in flight.
    pub async fn replay(&self) {
        if self.shared.cards.is_empty() {
            return;
        }
        let token = self.shared.invalidate();
        let idx = self.shared.current_index();
        self.shared.flush_recorder(self.shared.cards[idx].id).await;
        tokio::spawn(run(self.shared.clone(), token, idx));
    }

    /// Tear down: cancel the active run and persist any partial capture.
    pub async fn stop(&self) {
        if self.shared.cards.is_empty() {
            return;
        }
        self.shared.invalidate();
        let idx = self.shared.current_index();
        self.shared.flush_recorder(self.shared.cards[idx].id).await;
    }

    async fn navigate(&self, delta: isize) {
        if self.shared.cards.is_empty() {
            return;
        }
        let token = self.shared.invalidate();
        let leaving = self.shared.current_index();
        self.shared
            .flush_recorder(self.shared.cards[leaving].id)
            .await;
        let idx = self.shared.step_current(delta);
        tokio::spawn(run(self.shared.clone(), token, idx));
    }
}

/// Drive cards starting at `idx` until cancelled or (in study mode) the
/// single window completes. Auto-advance re-arms the token atomically so a
/// run that lost a race with external navigation stops instead of stepping.
async fn run<P, M, S>(shared: Arc<Shared<P, M, S>>, mut token: u64, mut idx: usize)
where
    P: ClipPlayer,
    M: Microphone,
    S: RecordingSink,
{
    loop {
        if !run_card(&shared, token, idx).await {
            return;
        }
        match shared.generation.compare_exchange(
            token,
            token + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                token += 1;
                idx = shared.step_current(1);
            }
            Err(_) => return,
        }
    }
}

/// One card's cycles. Returns whether the run should auto-advance.
async fn run_card<P, M, S>(shared: &Arc<Shared<P, M, S>>, token: u64, idx: usize) -> bool
where
    P: ClipPlayer,
    M: Microphone,
    S: RecordingSink,
{
    let Some(card) = shared.cards.get(idx) else {
        return false;
    };
    let delay = shared.options.delay();
    let cycles = match shared.mode {
        ReviewMode::Drill => shared.options.cycles(),
        ReviewMode::Study => 1,
    };
    let mic_on = shared.options.mic_enabled;
    let full_cycle = shared.options.record_timing == RecordTiming::FullCycle;

    if mic_on && full_cycle {
        shared.open_recorder(token).await;
    }

    for cycle in 0..cycles {
        if shared.stale(token) {
            return false;
        }

        match &card.audio {
            Some(clip) => shared.player.play_to_end(clip).await,
            // no clip: equal-length substitute keeps the pace consistent
            None => sleep(delay).await,
        }
        if shared.stale(token) {
            return false;
        }

        if mic_on && !full_cycle {
            shared.open_recorder(token).await;
        }
        sleep(delay).await;
        if shared.stale(token) {
            return false;
        }

        if mic_on {
            shared.flush_recorder(card.id).await;
            if full_cycle && cycle + 1 < cycles {
                shared.open_recorder(token).await;
            }
        }
    }

    matches!(shared.mode, ReviewMode::Drill)
}

/// Production sink: appends through the shared card store. The async mutex
/// is the store's mutation queue; a second append cannot start its
/// read-modify-write until the first one's save has committed.
pub struct StoreSink<B: StorageBackend>(Arc<Mutex<CardStore<B>>>);

impl<B: StorageBackend> StoreSink<B> {
    pub fn new(store: CardStore<B>) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }
}

impl<B: StorageBackend> Clone for StoreSink<B> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[async_trait]
impl<B> RecordingSink for StoreSink<B>
where
    B: StorageBackend + Send + 'static,
{
    async fn append(&self, card_id: u64, clip: CapturedClip) -> crate::error::Result<()> {
        let mut store = self.0.lock().await;
        store
            .append_recording(card_id, clip.bytes, clip.mime, &clip.ext)
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::audio::{NoMicrophone, SilentPlayer};
    use super::*;
    use crate::error::Result;
    use crate::model::ResolvedMedia;
    use chrono::Utc;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn card(id: u64, with_audio: bool) -> CardProjection {
        let now = Utc::now();
        CardProjection {
            id,
            word: format!("word-{}", id),
            images: vec![],
            image_files: vec![],
            audio: with_audio.then(|| ResolvedMedia {
                file: format!("{:06}_clip.mp3", id),
                bytes: vec![1, 2, 3],
            }),
            audio_file: with_audio.then(|| format!("{:06}_clip.mp3", id)),
            tags: vec![],
            recordings: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn options(mic: bool, delay: u64, repeats: u32, timing: RecordTiming) -> ReviewOptions {
        ReviewOptions {
            mic_enabled: mic,
            delay_seconds: delay,
            repeats,
            record_timing: timing,
        }
    }

    struct FakePlayer {
        duration: Duration,
        plays: Arc<StdMutex<u32>>,
    }

    #[async_trait]
    impl ClipPlayer for FakePlayer {
        async fn play_to_end(&self, _clip: &ResolvedMedia) {
            *self.plays.lock().unwrap() += 1;
            sleep(self.duration).await;
        }
    }

    struct FakeMic {
        payload: Vec<u8>,
        opened: Arc<AtomicUsize>,
    }

    struct FakeSession {
        payload: Vec<u8>,
    }

    impl RecorderSession for FakeSession {
        fn finish(self) -> CapturedClip {
            CapturedClip {
                bytes: self.payload,
                mime: Some("audio/webm".into()),
                ext: "webm".into(),
            }
        }
    }

    impl Microphone for FakeMic {
        type Session = FakeSession;

        fn open_session(&self) -> Option<FakeSession> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Some(FakeSession {
                payload: self.payload.clone(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct FakeSink {
        appends: Arc<StdMutex<Vec<u64>>>,
    }

    #[async_trait]
    impl RecordingSink for FakeSink {
        async fn append(&self, card_id: u64, _clip: CapturedClip) -> Result<()> {
            self.appends.lock().unwrap().push(card_id);
            Ok(())
        }
    }

    fn counts(appends: &Arc<StdMutex<Vec<u64>>>, id: u64) -> usize {
        appends.lock().unwrap().iter().filter(|&&c| c == id).count()
    }

    #[tokio::test(start_paused = true)]
    async fn drill_auto_advances_and_wraps() {
        let seq = ReviewSequencer::new(
            vec![card(1, false), card(2, false)],
            options(false, 1, 1, RecordTiming::FullCycle),
            ReviewMode::Drill,
            SilentPlayer,
            NoMicrophone,
            FakeSink::default(),
        );
        let mut active = seq.subscribe();
        seq.start();

        // one cycle without audio = substitute wait + speaking window = 2s
        sleep(Duration::from_millis(2100)).await;
        assert_eq!(seq.current_index(), 1);
        assert!(active.has_changed().unwrap());

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(seq.current_index(), 0, "advance past the end wraps");

        seq.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn study_mode_runs_one_window_and_stays_put() {
        let appends = FakeSink::default();
        let opened = Arc::new(AtomicUsize::new(0));
        let seq = ReviewSequencer::new(
            vec![card(7, false), card(8, false)],
            options(true, 1, 5, RecordTiming::WaitOnly),
            ReviewMode::Study,
            SilentPlayer,
            FakeMic {
                payload: b"attempt".to_vec(),
                opened: opened.clone(),
            },
            appends.clone(),
        );
        seq.start();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(seq.current_index(), 0, "study mode never auto-advances");
        assert_eq!(counts(&appends.appends, 7), 1, "exactly one window");
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_cards_persists_at_most_one_partial_recording() {
        let appends = FakeSink::default();
        let opened = Arc::new(AtomicUsize::new(0));
        let seq = ReviewSequencer::new(
            vec![card(1, false), card(2, false)],
            options(true, 5, 2, RecordTiming::FullCycle),
            ReviewMode::Drill,
            SilentPlayer,
            FakeMic {
                payload: b"partial".to_vec(),
                opened: opened.clone(),
            },
            appends.clone(),
        );
        seq.start();
        // let the run open its recorder, but complete no wait
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        seq.next().await;
        assert_eq!(seq.current_index(), 1);
        assert_eq!(counts(&appends.appends, 1), 1, "partial persisted once");

        // a fresh, independent cycle began for the next card
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(opened.load(Ordering::SeqCst) >= 2);
        seq.stop().await;
        assert_eq!(counts(&appends.appends, 1), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_capture_is_never_persisted() {
        let appends = FakeSink::default();
        let seq = ReviewSequencer::new(
            vec![card(1, false), card(2, false)],
            options(true, 5, 2, RecordTiming::FullCycle),
            ReviewMode::Drill,
            SilentPlayer,
            FakeMic {
                payload: Vec::new(),
                opened: Arc::new(AtomicUsize::new(0)),
            },
            appends.clone(),
        );
        seq.start();
        tokio::task::yield_now().await;
        seq.next().await;
        seq.stop().await;
        assert!(appends.appends.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_microphone_skips_recording_silently() {
        let appends = FakeSink::default();
        let seq = ReviewSequencer::new(
            vec![card(1, false)],
            options(true, 1, 1, RecordTiming::FullCycle),
            ReviewMode::Drill,
            SilentPlayer,
            NoMicrophone,
            appends.clone(),
        );
        seq.start();
        sleep(Duration::from_secs(3)).await;
        seq.stop().await;
        assert!(appends.appends.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drill_flushes_one_recording_per_cycle() {
        let appends = FakeSink::default();
        let opened = Arc::new(AtomicUsize::new(0));
        let seq = ReviewSequencer::new(
            vec![card(1, false), card(2, false)],
            options(true, 1, 2, RecordTiming::FullCycle),
            ReviewMode::Drill,
            SilentPlayer,
            FakeMic {
                payload: b"attempt".to_vec(),
                opened: opened.clone(),
            },
            appends.clone(),
        );
        seq.start();

        // two cycles of 2s each, then the advance to card 2
        sleep(Duration::from_millis(4100)).await;
        seq.stop().await;
        assert_eq!(counts(&appends.appends, 1), 2);
        assert_eq!(seq.current_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_cancels_the_inflight_cycle() {
        let plays = Arc::new(StdMutex::new(0));
        let seq = ReviewSequencer::new(
            vec![card(1, true)],
            options(false, 8, 2, RecordTiming::FullCycle),
            ReviewMode::Drill,
            FakePlayer {
                duration: Duration::from_secs(10),
                plays: plays.clone(),
            },
            NoMicrophone,
            FakeSink::default(),
        );
        seq.start();
        sleep(Duration::from_secs(1)).await;
        assert_eq!(*plays.lock().unwrap(), 1);

        // mid-playback replay starts over without waiting for the cycle
        seq.replay().await;
        sleep(Duration::from_secs(1)).await;
        assert_eq!(*plays.lock().unwrap(), 2);
        seq.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn wait_only_timing_opens_one_session_per_window() {
        let appends = FakeSink::default();
        let opened = Arc::new(AtomicUsize::new(0));
        let seq = ReviewSequencer::new(
            vec![card(1, false), card(2, false)],
            options(true, 1, 2, RecordTiming::WaitOnly),
            ReviewMode::Drill,
            SilentPlayer,
            FakeMic {
                payload: b"attempt".to_vec(),
                opened: opened.clone(),
            },
            appends.clone(),
        );
        seq.start();
        sleep(Duration::from_millis(4100)).await;
        seq.stop().await;
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert_eq!(counts(&appends.appends, 1), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_deck_is_inert() {
        let seq = ReviewSequencer::new(
            Vec::new(),
            ReviewOptions::default(),
            ReviewMode::Drill,
            SilentPlayer,
            NoMicrophone,
            FakeSink::default(),
        );
        seq.start();
        seq.next().await;
        seq.prev().await;
        seq.replay().await;
        seq.stop().await;
        assert_eq!(seq.card_count(), 0);
        assert!(seq.current_card().is_none());
    }
}
