//! Review options, persisted as `options.json` in the app config dir.

use crate::error::{DeckError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const OPTIONS_FILE: &str = "options.json";

/// When the microphone is open during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordTiming {
    /// Recording starts on card entry and spans playback plus the speaking
    /// window, so speech before or over the prompt is still captured.
    FullCycle,
    /// Recording covers only the post-playback speaking window.
    WaitOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewOptions {
    pub mic_enabled: bool,
    /// Length of the speaking window, and the playback substitute for cards
    /// without an audio clip.
    pub delay_seconds: u64,
    /// Cycles per card before auto-advance.
    pub repeats: u32,
    pub record_timing: RecordTiming,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            mic_enabled: false,
            delay_seconds: 8,
            repeats: 2,
            record_timing: RecordTiming::FullCycle,
        }
    }
}

impl ReviewOptions {
    /// Load from the given config dir, defaults if the file is absent.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let path = config_dir.as_ref().join(OPTIONS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        let text = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(OPTIONS_FILE), text)?;
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Cycle count, always at least one.
    pub fn cycles(&self) -> u32 {
        self.repeats.max(1)
    }

    /// Get one option by CLI key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "mic-enabled" => Some(self.mic_enabled.to_string()),
            "delay-seconds" => Some(self.delay_seconds.to_string()),
            "repeats" => Some(self.repeats.to_string()),
            "record-timing" => Some(
                match self.record_timing {
                    RecordTiming::FullCycle => "full-cycle",
                    RecordTiming::WaitOnly => "wait-only",
                }
                .to_string(),
            ),
            _ => None,
        }
    }

    /// Set one option by CLI key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "mic-enabled" => {
                self.mic_enabled = value
                    .parse()
                    .map_err(|_| DeckError::Store(format!("not a boolean: {}", value)))?;
            }
            "delay-seconds" => {
                self.delay_seconds = value
                    .parse()
                    .map_err(|_| DeckError::Store(format!("not a number: {}", value)))?;
            }
            "repeats" => {
                self.repeats = value
                    .parse()
                    .map_err(|_| DeckError::Store(format!("not a number: {}", value)))?;
            }
            "record-timing" => {
                self.record_timing = match value {
                    "full-cycle" => RecordTiming::FullCycle,
                    "wait-only" => RecordTiming::WaitOnly,
                    other => {
                        return Err(DeckError::Store(format!(
                            "unknown record timing: {} (use full-cycle or wait-only)",
                            other
                        )))
                    }
                };
            }
            other => return Err(DeckError::Store(format!("unknown option: {}", other))),
        }
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &["mic-enabled", "delay-seconds", "repeats", "record-timing"]
    }
}
