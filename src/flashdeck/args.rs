use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flashdeck")]
#[command(about = "Language flashcards with timed spoken review", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config dir (also FLASHDECK_CONFIG_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attach a deck folder (created if missing)
    #[command(alias = "init")]
    Attach {
        /// Path to the deck folder
        directory: PathBuf,
    },

    /// Re-open the remembered deck folder after access was lost
    Reconnect,

    /// Show where the deck lives and how many cards it holds
    Status,

    /// Add a card
    #[command(alias = "n")]
    Add {
        /// The word or phrase on the card
        word: String,

        /// Image files to copy in (repeatable)
        #[arg(short, long, value_name = "FILE")]
        image: Vec<PathBuf>,

        /// Audio clip to copy in
        #[arg(short, long, value_name = "FILE")]
        audio: Option<PathBuf>,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Edit a card
    #[command(alias = "e")]
    Edit {
        /// Card id
        id: u64,

        /// New word or phrase
        #[arg(short, long)]
        word: Option<String>,

        /// Image files to add (repeatable)
        #[arg(short, long, value_name = "FILE")]
        image: Vec<PathBuf>,

        /// Image filenames to drop from the card
        #[arg(long, value_name = "NAME")]
        drop_image: Vec<String>,

        /// Replacement audio clip
        #[arg(short, long, value_name = "FILE")]
        audio: Option<PathBuf>,

        /// Comma-separated tags (replaces the current set)
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// List cards
    #[command(alias = "ls")]
    List {
        /// Only cards carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show one card in full
    #[command(alias = "v")]
    Show {
        /// Card id
        id: u64,
    },

    /// Attach a pre-recorded practice take to a card
    Record {
        /// Card id
        id: u64,

        /// Audio file holding the take
        file: PathBuf,
    },

    /// Get or set review options
    Config {
        /// Option key (e.g., delay-seconds)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },

    /// Run a timed review session
    #[command(alias = "r")]
    Review {
        /// Single pass per card, no auto-advance
        #[arg(long)]
        study: bool,
    },
}
