use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

use crate::celebration::Celebration;
use crate::clock::Clock;
use crate::preferences::PreferencesStore;
use crate::runtime::SecondTimer;
use crate::session::{Session, SessionResult, SessionStatus};
use crate::stats::StatsStore;
use crate::store::Storage;
use crate::text::{Difficulty, TextProvider};

/// Which view the presentation layer renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Game,
    Result,
    Stats,
    Settings,
}

/// Per-run session settings from the command line; never persisted
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub duration_secs: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub prompt: Option<String>,
}

/// Top-level context owning the session, stats and preferences
pub struct App<S: Storage + Clone, C: Clock + Clone> {
    pub screen: Screen,
    pub session: Session<C>,
    pub stats: StatsStore<S, C>,
    pub prefs: PreferencesStore<S>,
    pub timer: SecondTimer,
    pub celebration: Celebration,
    pub last_result: Option<SessionResult>,
    pub status_message: Option<String>,
    pub should_quit: bool,
    /// `X` on the stats screen arms this; only `y` then clears the stats.
    pub confirm_reset: bool,
    bell_pending: bool,
    overrides: SessionOverrides,
}

impl<S: Storage + Clone, C: Clock + Clone> App<S, C> {
    pub fn new(storage: S, clock: C, texts: TextProvider, overrides: SessionOverrides) -> Self {
        let prefs = PreferencesStore::load(storage.clone());
        let stats = StatsStore::load(storage, clock.clone());
        let duration = overrides
            .duration_secs
            .unwrap_or(prefs.get().game_duration);

        Self {
            screen: Screen::Home,
            session: Session::new(texts, clock, duration),
            stats,
            prefs,
            timer: SecondTimer::new(),
            celebration: Celebration::new(),
            last_result: None,
            status_message: None,
            should_quit: false,
            confirm_reset: false,
            bell_pending: false,
            overrides,
        }
    }

    pub fn duration_secs(&self) -> u32 {
        self.overrides
            .duration_secs
            .unwrap_or(self.prefs.get().game_duration)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.overrides
            .difficulty
            .unwrap_or(self.prefs.get().difficulty)
    }

    /// Returns and clears a pending terminal bell request.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell_pending)
    }

    pub fn start_game(&mut self, now: Instant) {
        let duration = self.duration_secs();
        let difficulty = self.difficulty();
        let started = match self.overrides.prompt.clone() {
            Some(prompt) => self.session.start_with_text(duration, prompt),
            None => self.session.start(duration, difficulty),
        };
        if started {
            self.timer.arm(now);
            self.celebration.stop();
            self.screen = Screen::Game;
        }
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.session.status() {
            SessionStatus::Running => {
                self.session.pause();
                self.timer.cancel();
            }
            SessionStatus::Paused => {
                self.session.resume();
                self.timer.arm(now);
            }
            _ => {}
        }
    }

    pub fn reset_game(&mut self) {
        let duration = self.duration_secs();
        self.timer.cancel();
        self.session.reset(duration);
    }

    pub fn open_stats(&mut self) {
        self.refresh_today();
        self.confirm_reset = false;
        self.screen = Screen::Stats;
    }

    /// Back to the home screen, which shows today's best.
    pub fn go_home(&mut self) {
        self.refresh_today();
        self.screen = Screen::Home;
    }

    fn refresh_today(&mut self) {
        if let Err(e) = self.stats.refresh_today() {
            log::error!("failed to save stats: {e:#}");
        }
    }

    /// Advance the countdown by however many whole seconds have passed.
    pub fn on_tick(&mut self, now: Instant) {
        if self.session.is_running() {
            for _ in 0..self.timer.poll(now) {
                if let Some(result) = self.session.tick() {
                    self.finish(result, now);
                    break;
                }
            }
        } else {
            self.timer.cancel();
        }
        self.celebration.update(now);
    }

    /// Hand a finished session to the stats store and navigate to the results.
    fn finish(&mut self, result: SessionResult, now: Instant) {
        self.timer.cancel();
        self.last_result = Some(result);

        match self.stats.record_session(&result) {
            Ok(stats) => {
                let records = stats.new_records(&result);
                self.celebration.start_if_record(records, now);
            }
            Err(e) => {
                log::error!("failed to save stats: {e:#}");
                self.status_message = Some("could not save stats".to_string());
            }
        }

        self.bell_pending = self.prefs.get().sound_effects;
        self.screen = Screen::Result;
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        match self.screen {
            Screen::Home => self.on_home_key(key, now),
            Screen::Game => self.on_game_key(key, now),
            Screen::Result => self.on_result_key(key, now),
            Screen::Stats => self.on_stats_key(key),
            Screen::Settings => self.on_settings_key(key),
        }
    }

    fn on_home_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('g') => {
                self.reset_game();
                self.screen = Screen::Game;
                self.start_game(now);
            }
            KeyCode::Char('s') => self.open_stats(),
            KeyCode::Char('o') => self.screen = Screen::Settings,
            KeyCode::Esc | KeyCode::Char('q') => self.quit(),
            _ => {}
        }
    }

    fn on_game_key(&mut self, key: KeyEvent, now: Instant) {
        match (self.session.status(), key.code) {
            (_, KeyCode::Esc) => {
                self.reset_game();
                self.go_home();
            }
            (_, KeyCode::Char('r')) if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_game();
            }
            (SessionStatus::Idle | SessionStatus::Ended, KeyCode::Enter) => self.start_game(now),
            (SessionStatus::Running | SessionStatus::Paused, KeyCode::Tab) => {
                self.toggle_pause(now)
            }
            (SessionStatus::Running, KeyCode::Backspace) => {
                if let Some(result) = self.session.backspace() {
                    self.finish(result, now);
                }
            }
            (SessionStatus::Running, KeyCode::Char(c)) => {
                if let Some(result) = self.session.type_char(c) {
                    self.finish(result, now);
                }
            }
            _ => {}
        }
    }

    fn on_result_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Enter => {
                self.reset_game();
                self.start_game(now);
            }
            KeyCode::Char('s') => self.open_stats(),
            KeyCode::Char('h') | KeyCode::Esc => {
                self.reset_game();
                self.go_home();
            }
            _ => {}
        }
    }

    fn on_stats_key(&mut self, key: KeyEvent) {
        if std::mem::take(&mut self.confirm_reset) {
            if key.code == KeyCode::Char('y') {
                if let Err(e) = self.stats.reset() {
                    log::error!("failed to reset stats: {e:#}");
                    self.status_message = Some("could not reset stats".to_string());
                }
            } else {
                log::debug!("stats reset cancelled");
            }
            return;
        }

        match key.code {
            KeyCode::Char('X') => self.confirm_reset = true,
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('h') => self.go_home(),
            _ => {}
        }
    }

    fn on_settings_key(&mut self, key: KeyEvent) {
        let outcome = match key.code {
            KeyCode::Char('d') => self.prefs.cycle_duration(),
            KeyCode::Char('l') => self.prefs.cycle_difficulty(),
            KeyCode::Char('t') => {
                let theme = self.prefs.get().theme.toggled();
                self.prefs.set_theme(theme)
            }
            KeyCode::Char('b') => self.prefs.toggle_sound_effects(),
            KeyCode::Char('r') => self.prefs.reset(),
            KeyCode::Esc | KeyCode::Char('h') => {
                self.go_home();
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = outcome {
            log::error!("failed to save preferences: {e:#}");
            self.status_message = Some("could not save preferences".to_string());
        } else if self.session.status() == SessionStatus::Idle {
            self.reset_game();
        }
    }

    /// Teardown: the countdown must not outlive the app.
    pub fn quit(&mut self) {
        self.timer.cancel();
        self.should_quit = true;
    }
}
