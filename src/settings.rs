//! Drive settings persistence

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Storage key for the settings bundle
pub const SETTINGS_KEY: &str = "streetwalk_settings";

/// The persisted settings bundle for the drive view. Absent keys fall
/// back to these defaults on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveSettings {
    #[serde(default)]
    pub autopilot: bool,
    #[serde(default)]
    pub night_mode: bool,
    #[serde(default = "default_true")]
    pub shake: bool,
    #[serde(default = "default_true")]
    pub sound_effects: bool,
    #[serde(default = "default_true")]
    pub video_audio: bool,
    #[serde(default = "default_volume")]
    pub volume: u32,
}

fn default_true() -> bool { true }
fn default_volume() -> u32 { 70 }

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            autopilot: false,
            night_mode: false,
            shake: true,
            sound_effects: true,
            video_audio: true,
            volume: 70,
        }
    }
}

/// Key-value persistence seam. The app takes any store implementation so
/// the settings logic runs in tests without touching the filesystem.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

impl DriveSettings {
    /// Restore from the store; any missing or unparseable bundle yields
    /// the defaults.
    pub fn load(store: &dyn SettingsStore) -> Self {
        if let Some(content) = store.get(SETTINGS_KEY) {
            if let Ok(settings) = serde_json::from_str(&content) {
                return settings;
            }
        }
        Self::default()
    }

    pub fn save(&self, store: &mut dyn SettingsStore) {
        if let Ok(content) = serde_json::to_string_pretty(self) {
            store.set(SETTINGS_KEY, &content);
        }
    }

    /// Clear the stored bundle and return the defaults, effective
    /// immediately (no reload required).
    pub fn reset(store: &mut dyn SettingsStore) -> Self {
        store.remove(SETTINGS_KEY);
        Self::default()
    }
}

/// File-backed store under the platform config directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new() -> Self {
        let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push("streetwalk");
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        let _ = fs::write(self.path_for(key), value);
    }

    fn remove(&mut self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}
