// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! User settings persisted through the key-value store

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::warn;

use crate::store::KvStore;

/// Store key holding the settings record
pub const SETTINGS_KEY: &str = "app-settings";

/// Display font size preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    /// Scale factor applied by the presentation layer
    pub fn scale(self) -> f32 {
        match self {
            FontSize::Small => 0.85,
            FontSize::Medium => 1.0,
            FontSize::Large => 1.15,
        }
    }
}

/// Process-wide configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Analysis server endpoint; empty means unconfigured
    pub server_url: String,
    pub font_size: FontSize,
    /// The user's dark-mode switch; the wire name is historical
    pub system_dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            font_size: FontSize::Medium,
            system_dark_mode: false,
        }
    }
}

/// Partial update merged onto the current settings
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub server_url: Option<String>,
    pub font_size: Option<FontSize>,
    pub system_dark_mode: Option<bool>,
}

/// Holds the loaded settings and persists every change in full.
/// Constructed once at startup and passed to whoever needs it.
pub struct SettingsStore {
    store: KvStore,
    current: Mutex<Settings>,
}

impl SettingsStore {
    /// Load settings once, merging the stored record over the defaults.
    /// Missing fields are backfilled; an unreadable record means defaults.
    pub fn load(store: KvStore) -> Self {
        let current = match store.get(SETTINGS_KEY) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Stored settings are unreadable ({}), using defaults", e);
                    Settings::default()
                }
            },
            None => Settings::default(),
        };

        Self {
            store,
            current: Mutex::new(current),
        }
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> Settings {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Merge a patch, persist the full record, and return the new snapshot
    pub fn update(&self, patch: SettingsPatch) -> Settings {
        let updated = {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(url) = patch.server_url {
                current.server_url = url;
            }
            if let Some(size) = patch.font_size {
                current.font_size = size;
            }
            if let Some(dark) = patch.system_dark_mode {
                current.system_dark_mode = dark;
            }
            current.clone()
        };

        self.persist(&updated);
        updated
    }

    /// Replace everything with the defaults and persist them
    pub fn reset_to_defaults(&self) -> Settings {
        let defaults = Settings::default();
        {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *current = defaults.clone();
        }
        self.persist(&defaults);
        defaults
    }

    fn persist(&self, settings: &Settings) {
        match serde_json::to_string(settings) {
            Ok(json) => self.store.set(SETTINGS_KEY, &json),
            Err(e) => warn!("Failed to serialize settings: {}", e),
        }
    }
}
