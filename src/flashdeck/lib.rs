//! # Flashdeck Architecture
//!
//! Flashdeck is a **UI-agnostic flashcard library**. This is not a CLI
//! application that happens to have some library code—it's a library that
//! happens to have a CLI client.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (args.rs, wired by main.rs)                      │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session Layer (session.rs)                                 │
//! │  - Owns the deck-folder capability across runs              │
//! │  - attach / restore / reconnect lifecycle                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Store Layer (store/)                                       │
//! │  - CardStore: index + media mutations, hydration            │
//! │  - Abstract StorageBackend trait                            │
//! │  - FsBackend (production), MemoryBackend (testing)          │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Review Layer (review/)                                     │
//! │  - ReviewSequencer: timed play/wait/record cycles           │
//! │  - Audio seams: ClipPlayer, Microphone, RecordingSink       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `session.rs` inward (session, store, review), code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types (`Result<T>`)
//! - **Never** writes to stdout/stderr
//! - **Never** calls `std::process::exit`
//! - **Never** assumes a terminal environment
//!
//! The same core could serve a GUI, a web app, or any other client. Audio
//! hardware in particular stays behind the traits in [`review::audio`], so
//! the sequencer is fully testable on a paused clock.
//!
//! ## Durability
//!
//! `cards.json` is the single source of truth for the deck. Media files are
//! written before the index references them, and the index itself commits
//! by temp-file-plus-rename, so a crash at any point leaves a readable deck
//! whose every reference resolves (at worst with unreferenced media, which
//! edits clean up as they go).
//!
//! ## Module Overview
//!
//! - [`session`]: Deck-folder handle persisted across runs
//! - [`store`]: Card index + media persistence
//! - [`review`]: The timed review sequencer and its audio seams
//! - [`model`]: Core data types (`CardRecord`, `IndexDocument`, ...)
//! - [`naming`]: Collision-free media and recording filenames
//! - [`config`]: Review options persistence
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod model;
pub mod naming;
pub mod review;
pub mod session;
pub mod store;
