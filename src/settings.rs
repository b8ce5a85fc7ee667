use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::reader::{ReadingDirection, ReadingMode};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "tankobon";

/// Reader configuration.
///
/// The session reads these and reacts to changes; it never writes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub reading_mode: ReadingMode,

    #[serde(default)]
    pub reading_direction: ReadingDirection,

    /// Inter-page gap in display units; webtoon mode ignores it
    #[serde(default = "default_page_gap")]
    pub page_gap: u16,

    /// Adjacent chapters kept resolved ahead of/behind the current one
    #[serde(default = "default_chapter_preload")]
    pub chapter_preload: usize,

    /// Minimum interval between last-read-page updates
    #[serde(default = "default_progress_debounce_ms")]
    pub progress_debounce_ms: u64,

    /// Concurrent fetches allowed per remote source
    #[serde(default = "default_source_concurrency")]
    pub source_concurrency: usize,

    /// Collapse all sources into one fetch lane (constrained connection
    /// pools, e.g. HTTP/1.1)
    #[serde(default)]
    pub connections_limited: bool,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_page_gap() -> u16 {
    4
}

fn default_chapter_preload() -> usize {
    1
}

fn default_progress_debounce_ms() -> u64 {
    1_000
}

fn default_source_concurrency() -> usize {
    crate::fetch::DEFAULT_SOURCE_CONCURRENCY
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            reading_mode: ReadingMode::default(),
            reading_direction: ReadingDirection::default(),
            page_gap: default_page_gap(),
            chapter_preload: default_chapter_preload(),
            progress_debounce_ms: default_progress_debounce_ms(),
            source_concurrency: default_source_concurrency(),
            connections_limited: false,
        }
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl ReaderSettings {
    /// Load settings from the user config directory, creating the file
    /// with defaults when missing
    pub fn load() -> Self {
        let Some(path) = preferred_config_path() else {
            log::warn!("Could not determine config directory, using default settings");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from a specific path, falling back to defaults on
    /// missing or unparseable files
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            settings.save_to(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Self>(&content) {
                Ok(mut settings) => {
                    debug!("Loaded settings from {path:?}");
                    if settings.version < CURRENT_VERSION {
                        settings.migrate();
                        settings.save_to(path);
                    }
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file {path:?}: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file {path:?}: {e}");
                Self::default()
            }
        }
    }

    /// Persist to the user config directory
    pub fn save(&self) {
        let Some(path) = preferred_config_path() else {
            log::warn!("Could not determine config directory, cannot save settings");
            return;
        };
        self.save_to(&path);
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Failed to create config directory {parent:?}: {e}");
                    return;
                }
            }
        }

        match serde_yaml::to_string(self) {
            Ok(content) => match fs::write(path, content) {
                Ok(()) => debug!("Saved settings to {path:?}"),
                Err(e) => error!("Failed to save settings to {path:?}: {e}"),
            },
            Err(e) => error!("Failed to serialize settings: {e}"),
        }
    }

    fn migrate(&mut self) {
        info!(
            "Migrating settings from v{} to v{}",
            self.version, CURRENT_VERSION
        );

        // Future migrations go here:
        // if self.version < 2 {
        //     migrate_v1_to_v2(self);
        // }

        self.version = CURRENT_VERSION;
    }
}
