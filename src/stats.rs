use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::clock::Clock;
use crate::session::SessionResult;
use crate::store::{load_merged, merge_value_over_defaults, save, Storage, STATS_KEY};
use crate::util::{mean, percentage, round_half_up};

/// Maximum number of games kept in the recent history
pub const RECENT_GAMES_LIMIT: usize = 10;
/// Window size used by the recent average and the progress rate
pub const AVERAGE_WINDOW: usize = 5;

/// Calendar-day key, e.g. `Fri Oct 16 2026`
pub fn day_key(at: &DateTime<Local>) -> String {
    at.format("%a %b %d %Y").to_string()
}

/// Best result of the current calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodayBest {
    pub wpm: u32,
    pub accuracy: u32,
    pub score: u32,
    pub date: String,
}

impl Default for TodayBest {
    fn default() -> Self {
        Self::empty(&Local::now())
    }
}

impl TodayBest {
    pub fn empty(at: &DateTime<Local>) -> Self {
        Self {
            wpm: 0,
            accuracy: 0,
            score: 0,
            date: day_key(at),
        }
    }
}

/// A finished game as kept in the recent history
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGame {
    #[serde(flatten)]
    pub result: SessionResult,
    /// ISO-8601 timestamp of when the game was recorded
    pub timestamp: String,
    pub date: String,
}

/// Merge each stored game over defaults on its own so one damaged entry
/// does not cost the rest of the history. Non-object entries are dropped.
fn recent_games_lenient<'de, D>(deserializer: D) -> Result<Vec<RecentGame>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.is_object())
        .map(|entry| {
            let mut game: RecentGame = merge_value_over_defaults("stats.recentGames", entry);
            if game.date.is_empty() {
                if let Ok(at) = DateTime::parse_from_rfc3339(&game.timestamp) {
                    game.date = day_key(&at.with_timezone(&Local));
                }
            }
            game
        })
        .collect())
}

/// Which all-time bests a result matches after it has been recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewRecords {
    pub wpm: bool,
    pub accuracy: bool,
    pub score: bool,
}

impl NewRecords {
    pub fn any(&self) -> bool {
        self.wpm || self.accuracy || self.score
    }
}

/// Durable aggregate over every recorded session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateStats {
    #[serde(rename = "totalGames")]
    pub total_sessions: u64,
    #[serde(rename = "totalTime")]
    pub total_time_ms: u64,
    #[serde(rename = "totalChars")]
    pub total_chars_typed: u64,
    pub total_correct_chars: u64,
    pub total_errors: u64,
    pub best_wpm: u32,
    pub best_accuracy: u32,
    pub best_score: u32,
    pub today_best: TodayBest,
    #[serde(deserialize_with = "recent_games_lenient")]
    pub recent_games: Vec<RecentGame>,
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self {
            total_sessions: 0,
            total_time_ms: 0,
            total_chars_typed: 0,
            total_correct_chars: 0,
            total_errors: 0,
            best_wpm: 0,
            best_accuracy: 0,
            best_score: 0,
            today_best: TodayBest::default(),
            recent_games: Vec::new(),
        }
    }
}

impl AggregateStats {
    /// Fold a finished session into the aggregate.
    ///
    /// The three bests are independent running maxima and need not come
    /// from the same session. On a new day the first result becomes the
    /// day's best whatever its magnitude.
    pub fn record(&mut self, result: &SessionResult, now: &DateTime<Local>) -> &Self {
        let correct = result.correct_chars as u64;
        let errors = result.errors as u64;

        self.total_sessions += 1;
        self.total_time_ms += result.duration_ms;
        self.total_chars_typed += correct + errors;
        self.total_correct_chars += correct;
        self.total_errors += errors;

        self.best_wpm = self.best_wpm.max(result.wpm);
        self.best_accuracy = self.best_accuracy.max(result.accuracy);
        self.best_score = self.best_score.max(result.score);

        let today = day_key(now);
        self.recent_games.insert(
            0,
            RecentGame {
                result: *result,
                timestamp: now.to_rfc3339(),
                date: today.clone(),
            },
        );
        self.recent_games.truncate(RECENT_GAMES_LIMIT);

        if self.today_best.date != today || result.score > self.today_best.score {
            self.today_best = TodayBest {
                wpm: result.wpm,
                accuracy: result.accuracy,
                score: result.score,
                date: today,
            };
        }

        self
    }

    /// Zero `today_best` if it belongs to an earlier day. Returns whether it was stale.
    pub fn refresh_today(&mut self, now: &DateTime<Local>) -> bool {
        if self.today_best.date == day_key(now) {
            return false;
        }
        self.today_best = TodayBest::empty(now);
        true
    }

    /// Rounded mean WPM over the most recent `k` games, 0 when there are none.
    pub fn average_wpm_recent(&self, k: usize) -> u32 {
        let wpms = self.recent_wpms(0, k);
        mean(&wpms).map_or(0, |avg| round_half_up(avg) as u32)
    }

    pub fn overall_accuracy(&self) -> u32 {
        percentage(self.total_correct_chars, self.total_chars_typed).unwrap_or(100)
    }

    pub fn error_rate(&self) -> u32 {
        percentage(self.total_errors, self.total_chars_typed).unwrap_or(0)
    }

    /// Percentage change of the last five games' mean WPM against the five
    /// before them. Zero until both windows are complete.
    pub fn progress_rate(&self) -> i32 {
        if self.recent_games.len() < AVERAGE_WINDOW * 2 {
            return 0;
        }

        let recent = mean(&self.recent_wpms(0, AVERAGE_WINDOW));
        let previous = mean(&self.recent_wpms(AVERAGE_WINDOW, AVERAGE_WINDOW));

        match (recent, previous) {
            (Some(recent), Some(previous)) if previous > 0.0 => {
                round_half_up((recent - previous) / previous * 100.0) as i32
            }
            _ => 0,
        }
    }

    /// Compare a result with the bests; call after it has been recorded.
    pub fn new_records(&self, result: &SessionResult) -> NewRecords {
        NewRecords {
            wpm: result.wpm == self.best_wpm,
            accuracy: result.accuracy == self.best_accuracy,
            score: result.score == self.best_score,
        }
    }

    fn recent_wpms(&self, skip: usize, take: usize) -> Vec<f64> {
        self.recent_games
            .iter()
            .skip(skip)
            .take(take)
            .map(|g| g.result.wpm as f64)
            .collect()
    }
}

/// Aggregate stats bound to durable storage, written through on every change
pub struct StatsStore<S: Storage, C: Clock> {
    storage: S,
    clock: C,
    stats: AggregateStats,
}

impl<S: Storage, C: Clock> StatsStore<S, C> {
    /// Load from storage, falling back to defaults field by field, and
    /// zero a stale `today_best`.
    pub fn load(storage: S, clock: C) -> Self {
        let mut stats: AggregateStats = load_merged(&storage, STATS_KEY);
        stats.recent_games.truncate(RECENT_GAMES_LIMIT);
        if stats.refresh_today(&clock.now()) {
            log::info!("new day, today's best reset");
        }
        log::debug!("loaded stats: {} games", stats.total_sessions);
        Self {
            storage,
            clock,
            stats,
        }
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    pub fn record_session(&mut self, result: &SessionResult) -> Result<&AggregateStats> {
        let now = self.clock.now();
        self.stats.record(result, &now);
        self.persist()?;
        Ok(&self.stats)
    }

    /// Refresh `today_best` on read; persists only if it was stale.
    pub fn refresh_today(&mut self) -> Result<bool> {
        let now = self.clock.now();
        let stale = self.stats.refresh_today(&now);
        if stale {
            self.persist()?;
        }
        Ok(stale)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.stats = AggregateStats {
            today_best: TodayBest::empty(&self.clock.now()),
            ..AggregateStats::default()
        };
        log::info!("stats reset");
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        save(&self.storage, STATS_KEY, &self.stats)
    }
}
