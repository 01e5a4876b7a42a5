use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use flashdeck::config::ReviewOptions;
use flashdeck::error::{DeckError, Result};
use flashdeck::model::MediaBlob;
use flashdeck::review::audio::{NoMicrophone, SilentPlayer};
use flashdeck::review::{ReviewMode, ReviewSequencer, StoreSink};
use flashdeck::session::{DirectorySession, SessionState};
use flashdeck::store::CardEdit;
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "flashdeck=debug" } else { "flashdeck=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_dir = resolve_config_dir(cli.config_dir.clone())?;
    let mut session = DirectorySession::restore(config_dir.clone());

    match cli.command {
        Some(Commands::Attach { directory }) => handle_attach(&mut session, directory),
        Some(Commands::Reconnect) => handle_reconnect(&mut session),
        Some(Commands::Status) => handle_status(&mut session),
        Some(Commands::Add {
            word,
            image,
            audio,
            tags,
        }) => handle_add(&mut session, word, image, audio, tags),
        Some(Commands::Edit {
            id,
            word,
            image,
            drop_image,
            audio,
            tags,
        }) => handle_edit(&mut session, id, word, image, drop_image, audio, tags),
        Some(Commands::List { tag }) => handle_list(&mut session, tag),
        Some(Commands::Show { id }) => handle_show(&mut session, id),
        Some(Commands::Record { id, file }) => handle_record(&mut session, id, file),
        Some(Commands::Config { key, value }) => handle_config(&config_dir, key, value),
        Some(Commands::Review { study }) => handle_review(session, &config_dir, study),
        None => handle_list(&mut session, None),
    }
}

/// Flag wins over FLASHDECK_CONFIG_DIR, which wins over the platform dir.
fn resolve_config_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Ok(dir) = std::env::var("FLASHDECK_CONFIG_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    ProjectDirs::from("com", "flashdeck", "flashdeck")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| DeckError::Store("could not determine a config directory".into()))
}

fn handle_attach(session: &mut DirectorySession, directory: PathBuf) -> Result<()> {
    session.attach(directory)?;
    if let SessionState::Attached(root) = session.state() {
        println!("{} {}", "Attached:".green().bold(), root.display());
    }
    Ok(())
}

fn handle_reconnect(session: &mut DirectorySession) -> Result<()> {
    session.reconnect()?;
    if let SessionState::Attached(root) = session.state() {
        println!("{} {}", "Reconnected:".green().bold(), root.display());
    }
    Ok(())
}

fn handle_status(session: &mut DirectorySession) -> Result<()> {
    match session.state() {
        SessionState::Detached => {
            println!("{}", "No deck folder attached. Run `flashdeck attach <dir>`.".yellow());
            return Ok(());
        }
        SessionState::NeedsReconnect(root) => {
            println!(
                "{} {} (run `flashdeck reconnect`)",
                "Lost access to:".yellow().bold(),
                root.display()
            );
            return Ok(());
        }
        SessionState::Attached(root) => {
            println!("{} {}", "Deck:".bold(), root.display());
        }
    }
    let doc = session.store()?.load_index()?;
    println!("{} {}", "Cards:".bold(), doc.cards.len());
    Ok(())
}

fn handle_add(
    session: &mut DirectorySession,
    word: String,
    images: Vec<PathBuf>,
    audio: Option<PathBuf>,
    tags: Option<String>,
) -> Result<()> {
    let images = images
        .iter()
        .map(|p| read_blob(p))
        .collect::<Result<Vec<_>>>()?;
    let audio = audio.as_deref().map(read_blob).transpose()?;
    let card = session
        .store()?
        .create(&word, parse_tags(tags.as_deref()), images, audio)?;
    println!(
        "{} {} {}",
        "Added".green().bold(),
        format!("#{}", card.id).cyan(),
        card.word.bold()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_edit(
    session: &mut DirectorySession,
    id: u64,
    word: Option<String>,
    images: Vec<PathBuf>,
    drop_image: Vec<String>,
    audio: Option<PathBuf>,
    tags: Option<String>,
) -> Result<()> {
    let store = session.store()?;
    let existing = store.get_card(id)?;

    let edit = CardEdit {
        word: word.unwrap_or(existing.word),
        tags: match tags {
            Some(t) => parse_tags(Some(&t)),
            None => existing.tags,
        },
        images_keep: existing
            .image_files
            .into_iter()
            .filter(|name| !drop_image.contains(name))
            .collect(),
        new_images: images
            .iter()
            .map(|p| read_blob(p))
            .collect::<Result<Vec<_>>>()?,
        new_audio: audio.as_deref().map(read_blob).transpose()?,
    };
    let card = store.update(id, edit)?;
    println!(
        "{} {} {}",
        "Updated".green().bold(),
        format!("#{}", card.id).cyan(),
        card.word.bold()
    );
    Ok(())
}

fn handle_list(session: &mut DirectorySession, tag: Option<String>) -> Result<()> {
    if session.state() == SessionState::Detached {
        println!("{}", "No deck folder attached. Run `flashdeck attach <dir>`.".yellow());
        return Ok(());
    }
    let doc = session.store()?.load_index()?;
    let cards: Vec<_> = doc
        .cards
        .iter()
        .filter(|c| tag.as_ref().map_or(true, |t| c.tags.contains(t)))
        .collect();
    if cards.is_empty() {
        println!("{}", "No cards.".dimmed());
        return Ok(());
    }
    for card in cards {
        let mut extras = Vec::new();
        if !card.image_files.is_empty() {
            extras.push(format!("{} img", card.image_files.len()));
        }
        if card.audio_file.is_some() {
            extras.push("audio".into());
        }
        if !card.recordings.is_empty() {
            extras.push(format!("{} rec", card.recordings.len()));
        }
        let extras = if extras.is_empty() {
            String::new()
        } else {
            format!(" ({})", extras.join(", "))
        };
        let tags = if card.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", card.tags.join(", "))
        };
        println!(
            "{:>5}  {}{}{}",
            format!("#{}", card.id).cyan(),
            card.word.bold(),
            tags.dimmed(),
            extras.dimmed()
        );
    }
    Ok(())
}

fn handle_show(session: &mut DirectorySession, id: u64) -> Result<()> {
    let card = session.store()?.get_card(id)?;
    println!("{} {}", format!("#{}", card.id).cyan().bold(), card.word.bold());
    if !card.tags.is_empty() {
        println!("{} {}", "Tags:".bold(), card.tags.join(", "));
    }
    for name in &card.image_files {
        let present = card.images.iter().any(|m| &m.file == name);
        let marker = if present { "image".normal() } else { "image (missing)".red() };
        println!("  {} {}", marker, name);
    }
    if let Some(name) = &card.audio_file {
        let marker = if card.audio.is_some() { "audio".normal() } else { "audio (missing)".red() };
        println!("  {} {}", marker, name);
    }
    for rec in &card.recordings {
        println!(
            "  {} {} ({})",
            "take".normal(),
            rec.file,
            rec.ts.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn handle_record(session: &mut DirectorySession, id: u64, file: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&file)?;
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("webm")
        .to_string();
    let mime = guess_mime(&ext).map(str::to_string);
    match session.store()?.append_recording(id, bytes, mime, &ext)? {
        Some(rec) => println!("{} {}", "Recorded".green().bold(), rec.file),
        None => println!("{}", "Empty file, nothing recorded.".yellow()),
    }
    Ok(())
}

fn handle_config(config_dir: &Path, key: Option<String>, value: Option<String>) -> Result<()> {
    let mut options = ReviewOptions::load(config_dir)?;
    match (key, value) {
        (None, _) => {
            for key in ReviewOptions::keys() {
                // every known key resolves
                if let Some(value) = options.get(key) {
                    println!("{}: {}", key.bold(), value);
                }
            }
        }
        (Some(key), None) => match options.get(&key) {
            Some(value) => println!("{}", value),
            None => return Err(DeckError::Store(format!("unknown option: {}", key))),
        },
        (Some(key), Some(value)) => {
            options.set(&key, &value)?;
            options.save(config_dir)?;
            println!("{} {} = {}", "Set".green().bold(), key, value);
        }
    }
    Ok(())
}

fn handle_review(session: DirectorySession, config_dir: &Path, study: bool) -> Result<()> {
    let store = session.take_store()?;
    let cards = store.load_cards()?;
    if cards.is_empty() {
        println!("{}", "No cards to review.".yellow());
        return Ok(());
    }
    let options = ReviewOptions::load(config_dir)?;
    let mode = if study { ReviewMode::Study } else { ReviewMode::Drill };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(review_loop(cards, options, mode, store))
}

async fn review_loop(
    cards: Vec<flashdeck::model::CardProjection>,
    options: ReviewOptions,
    mode: ReviewMode,
    store: flashdeck::store::CardStore<flashdeck::store::fs::FsBackend>,
) -> Result<()> {
    // No audio devices on a terminal: clips complete instantly and practice
    // takes come in through `flashdeck record`. The pacing is unchanged.
    let seq = ReviewSequencer::new(
        cards,
        options,
        mode,
        SilentPlayer,
        NoMicrophone,
        StoreSink::new(store),
    );
    let mut active = seq.subscribe();

    println!(
        "{}",
        "Commands: [n]ext  [p]rev  [r]eplay  [q]uit".dimmed()
    );
    print_active(&seq);
    seq.start();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = active.changed() => {
                if changed.is_err() {
                    break;
                }
                print_active(&seq);
            }
            line = lines.next_line() => {
                match line?.as_deref().map(str::trim) {
                    Some("n") | Some("next") => seq.next().await,
                    Some("p") | Some("prev") => seq.prev().await,
                    Some("r") | Some("replay") => seq.replay().await,
                    Some("q") | Some("quit") | None => break,
                    Some("") => {}
                    Some(other) => println!("{} {}", "Unknown command:".yellow(), other),
                }
            }
        }
    }
    seq.stop().await;
    println!("{}", "Review over.".green().bold());
    Ok(())
}

fn print_active<P, M, S>(seq: &ReviewSequencer<P, M, S>)
where
    P: flashdeck::review::audio::ClipPlayer + 'static,
    M: flashdeck::review::audio::Microphone + 'static,
    M::Session: 'static,
    S: flashdeck::review::audio::RecordingSink + 'static,
{
    if let Some(card) = seq.current_card() {
        let tags = if card.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", card.tags.join(", "))
        };
        println!(
            "{} {}{}",
            format!("[{}/{}]", seq.current_index() + 1, seq.card_count()).cyan(),
            card.word.bold(),
            tags.dimmed()
        );
    }
}

fn read_blob(path: &Path) -> Result<MediaBlob> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    let blob = MediaBlob::new(&name, bytes);
    let mime = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(guess_mime);
    Ok(match mime {
        Some(mime) => blob.with_mime(mime),
        None => blob,
    })
}

fn guess_mime(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "m4a" => Some("audio/mp4"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}

fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(raw) = raw {
        for tag in raw.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
    }
    tags
}
