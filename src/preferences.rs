use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::store::{load_merged, save, Storage, PREFERENCES_KEY};
use crate::text::Difficulty;

/// Session lengths offered to the user, in seconds
pub const ALLOWED_DURATIONS: [u32; 4] = [30, 60, 120, 300];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub game_duration: u32,
    pub difficulty: Difficulty,
    pub theme: Theme,
    pub sound_effects: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            game_duration: 60,
            difficulty: Difficulty::Medium,
            theme: Theme::Light,
            sound_effects: true,
        }
    }
}

/// User preferences, written through to storage after every successful change
pub struct PreferencesStore<S: Storage> {
    storage: S,
    prefs: Preferences,
}

impl<S: Storage> PreferencesStore<S> {
    /// Load from storage. Absent or malformed fields fall back to their
    /// defaults independently; an out-of-range duration does too.
    pub fn load(storage: S) -> Self {
        let mut prefs: Preferences = load_merged(&storage, PREFERENCES_KEY);
        if !ALLOWED_DURATIONS.contains(&prefs.game_duration) {
            log::warn!(
                "stored game duration {} is not supported, using default",
                prefs.game_duration
            );
            prefs.game_duration = Preferences::default().game_duration;
        }
        Self { storage, prefs }
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    pub fn set_game_duration(&mut self, secs: u32) -> Result<()> {
        if !ALLOWED_DURATIONS.contains(&secs) {
            bail!("unsupported game duration {secs}s, expected one of {ALLOWED_DURATIONS:?}");
        }
        self.prefs.game_duration = secs;
        self.persist()
    }

    /// Step to the next allowed duration, wrapping around.
    pub fn cycle_duration(&mut self) -> Result<()> {
        let idx = ALLOWED_DURATIONS
            .iter()
            .position(|&d| d == self.prefs.game_duration)
            .map_or(0, |i| (i + 1) % ALLOWED_DURATIONS.len());
        self.set_game_duration(ALLOWED_DURATIONS[idx])
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<()> {
        self.prefs.difficulty = difficulty;
        self.persist()
    }

    pub fn cycle_difficulty(&mut self) -> Result<()> {
        self.set_difficulty(self.prefs.difficulty.next())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.prefs.theme = theme;
        self.persist()
    }

    pub fn set_sound_effects(&mut self, enabled: bool) -> Result<()> {
        self.prefs.sound_effects = enabled;
        self.persist()
    }

    pub fn toggle_sound_effects(&mut self) -> Result<()> {
        self.set_sound_effects(!self.prefs.sound_effects)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.prefs = Preferences::default();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        save(&self.storage, PREFERENCES_KEY, &self.prefs)
    }
}
