//! Display preferences: theme and font size

use crate::config::keys;
use foliocore::storage::{self, SharedStore};
use foliocore::ThemeName;
use serde::{Deserialize, Serialize};

pub const MIN_FONT_SIZE: u32 = 14;
pub const MAX_FONT_SIZE: u32 = 28;
pub const FONT_SIZE_STEP: u32 = 2;
pub const DEFAULT_FONT_SIZE: u32 = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: ThemeName,
    pub font_size: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeName::Dark,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// A partial change; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub theme: Option<ThemeName>,
    pub font_size: Option<u32>,
}

impl PreferencesUpdate {
    pub fn theme(theme: ThemeName) -> Self {
        Self { theme: Some(theme), ..Self::default() }
    }

    pub fn font_size(size: u32) -> Self {
        Self { font_size: Some(size), ..Self::default() }
    }
}

/// Clamp into `[MIN_FONT_SIZE, MAX_FONT_SIZE]` and round down onto the step grid.
pub fn snap_font_size(size: u32) -> u32 {
    let clamped = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    clamped - (clamped - MIN_FONT_SIZE) % FONT_SIZE_STEP
}

pub struct PreferenceManager {
    store: SharedStore,
}

impl PreferenceManager {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Stored fields over the defaults. Each field is read on its own so one
    /// bad value does not discard the others.
    pub fn get(&self) -> Preferences {
        let mut prefs = Preferences::default();
        let raw: serde_json::Value = storage::load_or_default(&*self.store, keys::SETTINGS);
        let Some(fields) = raw.as_object() else {
            return prefs;
        };

        if let Some(value) = fields.get("theme") {
            match serde_json::from_value::<ThemeName>(value.clone()) {
                Ok(theme) => prefs.theme = theme,
                Err(_) => log::warn!("ignoring unknown theme {value}"),
            }
        }
        if let Some(size) = fields.get("fontSize").and_then(serde_json::Value::as_u64) {
            prefs.font_size = snap_font_size(u32::try_from(size).unwrap_or(MAX_FONT_SIZE));
        }
        prefs
    }

    pub fn set(&self, update: PreferencesUpdate) -> Preferences {
        let mut prefs = self.get();
        if let Some(theme) = update.theme {
            prefs.theme = theme;
        }
        if let Some(size) = update.font_size {
            prefs.font_size = snap_font_size(size);
        }
        if let Err(e) = storage::save(&*self.store, keys::SETTINGS, &prefs) {
            log::warn!("could not save preferences: {e}");
        }
        prefs
    }

    pub fn larger_font(&self) -> Preferences {
        let size = self.get().font_size;
        self.set(PreferencesUpdate::font_size(size.saturating_add(FONT_SIZE_STEP)))
    }

    pub fn smaller_font(&self) -> Preferences {
        let size = self.get().font_size;
        self.set(PreferencesUpdate::font_size(size.saturating_sub(FONT_SIZE_STEP)))
    }
}
