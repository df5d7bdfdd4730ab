use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::text::{Difficulty, TextProvider};
use crate::util::round_half_up;

/// Lifecycle of a single attempt: `Idle -> Running <-> Paused -> Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Ended,
}

/// Metrics recomputed after every input change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveMetrics {
    pub wpm: u32,
    pub accuracy: u32,
    pub score: u32,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            score: 0,
        }
    }
}

impl LiveMetrics {
    /// Five characters count as one word. Accuracy is perfect until
    /// something has been typed.
    pub fn compute(correct_chars: usize, total_chars: usize, elapsed_ms: i64) -> Self {
        let elapsed_minutes = elapsed_ms as f64 / 60_000.0;
        let wpm = if elapsed_minutes > 0.0 {
            round_half_up(correct_chars as f64 / 5.0 / elapsed_minutes) as u32
        } else {
            0
        };
        let accuracy = if total_chars > 0 {
            round_half_up(correct_chars as f64 / total_chars as f64 * 100.0) as u32
        } else {
            100
        };
        let score = round_half_up(wpm as f64 * accuracy as f64 / 100.0) as u32;

        Self {
            wpm,
            accuracy,
            score,
        }
    }
}

/// Produced exactly once when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub score: u32,
    pub correct_chars: usize,
    pub errors: usize,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

/// Rendering state of one reference character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharState {
    Correct,
    Incorrect,
    Current,
    Pending,
}

/// Fixed set of commands a session understands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { duration_secs: u32, tier: Difficulty },
    StartWithText { duration_secs: u32, text: String },
    Pause,
    Resume,
    Input(String),
    Tick,
    End,
    Reset { duration_secs: u32 },
}

/// One timed typing attempt
#[derive(Debug)]
pub struct Session<C: Clock> {
    clock: C,
    texts: TextProvider,
    status: SessionStatus,
    reference_text: Vec<char>,
    user_input: Vec<char>,
    correct_chars: usize,
    errors: usize,
    time_left: u32,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    live: LiveMetrics,
    result: Option<SessionResult>,
}

impl<C: Clock> Session<C> {
    pub fn new(texts: TextProvider, clock: C, duration_secs: u32) -> Self {
        Self {
            clock,
            texts,
            status: SessionStatus::Idle,
            reference_text: Vec::new(),
            user_input: Vec::new(),
            correct_chars: 0,
            errors: 0,
            time_left: duration_secs,
            started_at: None,
            ended_at: None,
            live: LiveMetrics::default(),
            result: None,
        }
    }

    /// Dispatch a command. Returns the result only when this command ended the session.
    pub fn apply(&mut self, command: Command) -> Option<SessionResult> {
        match command {
            Command::Start {
                duration_secs,
                tier,
            } => {
                self.start(duration_secs, tier);
                None
            }
            Command::StartWithText {
                duration_secs,
                text,
            } => {
                self.start_with_text(duration_secs, text);
                None
            }
            Command::Pause => {
                self.pause();
                None
            }
            Command::Resume => {
                self.resume();
                None
            }
            Command::Input(text) => self.submit_input(&text),
            Command::Tick => self.tick(),
            Command::End => self.end(),
            Command::Reset { duration_secs } => {
                self.reset(duration_secs);
                None
            }
        }
    }

    pub fn start(&mut self, duration_secs: u32, tier: Difficulty) -> bool {
        let text = self.texts.sample(tier);
        self.start_with_text(duration_secs, text)
    }

    /// Start with a caller-chosen reference text. Only valid from `Idle` or `Ended`.
    pub fn start_with_text(&mut self, duration_secs: u32, text: impl Into<String>) -> bool {
        if !matches!(self.status, SessionStatus::Idle | SessionStatus::Ended) {
            log::debug!("ignoring start while {}", self.status);
            return false;
        }

        self.reference_text = text.into().chars().collect();
        self.user_input.clear();
        self.correct_chars = 0;
        self.errors = 0;
        self.live = LiveMetrics::default();
        self.result = None;
        self.ended_at = None;
        self.started_at = Some(self.clock.now());
        self.time_left = duration_secs;
        self.status = SessionStatus::Running;

        log::info!(
            "session started: {}s, {} chars",
            duration_secs,
            self.reference_text.len()
        );
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != SessionStatus::Running {
            log::debug!("ignoring pause while {}", self.status);
            return false;
        }
        self.status = SessionStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != SessionStatus::Paused {
            log::debug!("ignoring resume while {}", self.status);
            return false;
        }
        self.status = SessionStatus::Running;
        true
    }

    /// Replace the whole input and rescore it left to right against the reference.
    /// Characters past the end of the reference always count as errors.
    pub fn submit_input(&mut self, text: &str) -> Option<SessionResult> {
        if self.status != SessionStatus::Running {
            log::debug!("ignoring input while {}", self.status);
            return None;
        }

        self.user_input = text.chars().collect();
        let (correct, errors) = score_input(&self.user_input, &self.reference_text);
        self.correct_chars = correct;
        self.errors = errors;
        self.refresh_live();

        if self.user_input == self.reference_text {
            return self.end();
        }
        None
    }

    /// Append one character, rescoring the whole input.
    pub fn type_char(&mut self, c: char) -> Option<SessionResult> {
        let mut text: String = self.user_input.iter().collect();
        text.push(c);
        self.submit_input(&text)
    }

    pub fn backspace(&mut self) -> Option<SessionResult> {
        let mut chars = self.user_input.clone();
        chars.pop();
        let text: String = chars.into_iter().collect();
        self.submit_input(&text)
    }

    /// One wall-clock second elapsed. Ends the session when the countdown hits zero.
    pub fn tick(&mut self) -> Option<SessionResult> {
        if self.status != SessionStatus::Running {
            return None;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            return self.end();
        }
        None
    }

    /// Finalize the session. `None` when it never started or has already ended.
    pub fn end(&mut self) -> Option<SessionResult> {
        let started_at = match (self.status, self.started_at) {
            (SessionStatus::Running | SessionStatus::Paused, Some(started_at)) => started_at,
            _ => {
                log::debug!("ignoring end while {}", self.status);
                return None;
            }
        };

        let ended_at = self.clock.now();
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        let result = SessionResult {
            wpm: self.live.wpm,
            accuracy: self.live.accuracy,
            score: self.live.score,
            correct_chars: self.correct_chars,
            errors: self.errors,
            duration_ms,
        };

        self.ended_at = Some(ended_at);
        self.result = Some(result);
        self.status = SessionStatus::Ended;

        log::info!(
            "session ended: {} wpm, {}% acc, score {}, {}ms",
            result.wpm,
            result.accuracy,
            result.score,
            result.duration_ms
        );
        Some(result)
    }

    /// Back to `Idle` with the countdown preset to `duration_secs`.
    pub fn reset(&mut self, duration_secs: u32) {
        self.status = SessionStatus::Idle;
        self.reference_text.clear();
        self.user_input.clear();
        self.correct_chars = 0;
        self.errors = 0;
        self.time_left = duration_secs;
        self.started_at = None;
        self.ended_at = None;
        self.live = LiveMetrics::default();
        self.result = None;
    }

    fn refresh_live(&mut self) {
        let elapsed_ms = self
            .started_at
            .map(|started_at| (self.clock.now() - started_at).num_milliseconds())
            .unwrap_or(0);
        self.live = LiveMetrics::compute(self.correct_chars, self.user_input.len(), elapsed_ms);
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn reference_text(&self) -> String {
        self.reference_text.iter().collect()
    }

    pub fn user_input(&self) -> String {
        self.user_input.iter().collect()
    }

    pub fn input_len(&self) -> usize {
        self.user_input.len()
    }

    pub fn correct_chars(&self) -> usize {
        self.correct_chars
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended_at
    }

    pub fn live(&self) -> LiveMetrics {
        self.live
    }

    pub fn result(&self) -> Option<SessionResult> {
        self.result
    }

    /// Fraction of the reference covered by the input, capped at 1.
    pub fn progress(&self) -> f64 {
        match self.reference_text.len() {
            0 => 0.0,
            len => (self.user_input.len() as f64 / len as f64).min(1.0),
        }
    }

    pub fn char_states(&self) -> Vec<(char, CharState)> {
        self.reference_text
            .iter()
            .enumerate()
            .map(|(idx, &expected)| {
                let state = match self.user_input.get(idx) {
                    Some(&typed) if typed == expected => CharState::Correct,
                    Some(_) => CharState::Incorrect,
                    None if idx == self.user_input.len() => CharState::Current,
                    None => CharState::Pending,
                };
                (expected, state)
            })
            .collect()
    }
}

fn score_input(input: &[char], reference: &[char]) -> (usize, usize) {
    input
        .iter()
        .enumerate()
        .fold((0, 0), |(correct, errors), (idx, typed)| {
            if reference.get(idx) == Some(typed) {
                (correct + 1, errors)
            } else {
                (correct, errors + 1)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn session(text: &str) -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let session = Session::new(TextProvider::single(text), clock.clone(), 60);
        (session, clock)
    }

    #[test]
    fn new_session_is_idle() {
        let (session, _) = session("abc");
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.time_left(), 60);
        assert_eq!(session.live(), LiveMetrics::default());
        assert!(session.result().is_none());
    }

    #[test]
    fn start_draws_text_and_runs() {
        let (mut session, clock) = session("hello");
        assert!(session.start(30, Difficulty::Easy));

        assert_eq!(session.status(), SessionStatus::Running);
        assert_eq!(session.reference_text(), "hello");
        assert_eq!(session.time_left(), 30);
        assert_eq!(session.started_at(), Some(clock.now()));
    }

    #[test]
    fn start_rejected_while_running() {
        let (mut session, _) = session("hello");
        session.start(30, Difficulty::Easy);
        session.submit_input("he");

        assert!(!session.start(60, Difficulty::Hard));
        assert_eq!(session.user_input(), "he");
        assert_eq!(session.time_left(), 30);
    }

    #[test]
    fn mismatch_counts_as_error() {
        let (mut session, _) = session("abX");
        session.start(60, Difficulty::Medium);

        session.submit_input("abc");

        assert_eq!(session.correct_chars(), 2);
        assert_eq!(session.errors(), 1);
    }

    #[test]
    fn overflow_chars_are_errors() {
        let (mut session, _) = session("ab");
        session.start(60, Difficulty::Medium);

        session.submit_input("abcd");

        assert_eq!(session.correct_chars(), 2);
        assert_eq!(session.errors(), 2);
        assert_eq!(session.status(), SessionStatus::Running);
    }

    #[test]
    fn counts_always_sum_to_input_len() {
        let (mut session, _) = session("the quick brown fox");
        session.start(60, Difficulty::Medium);

        for input in ["", "t", "tx", "the q", "thE quick", "the quick brown fox!!", "x"] {
            session.submit_input(input);
            assert_eq!(
                session.correct_chars() + session.errors(),
                input.chars().count()
            );
            assert!(session.live().accuracy <= 100);
        }
    }

    #[test]
    fn multibyte_chars_compare_by_scalar() {
        let (mut session, _) = session("こんにちは");
        session.start(60, Difficulty::Medium);

        session.submit_input("こんばん");

        assert_eq!(session.input_len(), 4);
        assert_eq!(session.correct_chars(), 2);
        assert_eq!(session.errors(), 2);
    }

    #[test]
    fn accuracy_is_perfect_with_empty_input() {
        let (mut session, clock) = session("abc");
        session.start(60, Difficulty::Medium);
        clock.advance_secs(5);

        session.submit_input("");

        assert_eq!(session.live().accuracy, 100);
        assert_eq!(session.live().wpm, 0);
    }

    #[test]
    fn wpm_is_zero_without_elapsed_time() {
        let (mut session, _) = session("hello world");
        session.start(60, Difficulty::Medium);

        session.submit_input("hello");

        assert_eq!(session.live().wpm, 0);
        assert_eq!(session.live().accuracy, 100);
        assert_eq!(session.live().score, 0);
    }

    #[test]
    fn live_metrics_follow_formulas() {
        let (mut session, clock) = session("aaaaaaaaaaaaaaaaaaaa");
        session.start(60, Difficulty::Medium);
        clock.advance_secs(30);

        // 10 correct, 2 wrong after half a minute
        session.submit_input("aaaaaaaaaabb");

        let live = session.live();
        assert_eq!(live.wpm, 4); // 10 / 5 / 0.5
        assert_eq!(live.accuracy, 83); // 10 / 12
        assert_eq!(live.score, 3); // 4 * 0.83 = 3.32
    }

    #[test]
    fn metrics_compute_edge_cases() {
        assert_eq!(LiveMetrics::compute(0, 0, 0), LiveMetrics::default());
        assert_eq!(LiveMetrics::compute(10, 10, -5).wpm, 0);
        let m = LiveMetrics::compute(50, 50, 60_000);
        assert_eq!((m.wpm, m.accuracy, m.score), (10, 100, 10));
    }

    #[test]
    fn exact_match_ends_session() {
        let (mut session, clock) = session("hi there");
        session.start(60, Difficulty::Medium);
        clock.advance_secs(6);

        let result = session.submit_input("hi there");

        assert_matches!(result, Some(SessionResult { correct_chars: 8, errors: 0, .. }));
        assert_eq!(session.status(), SessionStatus::Ended);
        assert_eq!(session.result(), result);
        assert_eq!(result.unwrap().duration_ms, 6_000);
    }

    #[test]
    fn completion_and_timeout_yield_same_result() {
        let (mut by_match, match_clock) = session("abcde");
        by_match.start(2, Difficulty::Medium);
        match_clock.advance_secs(2);
        let matched = by_match.submit_input("abcde").unwrap();

        let (mut by_timeout, timeout_clock) = session("abcdef");
        by_timeout.start(2, Difficulty::Medium);
        timeout_clock.advance_secs(2);
        assert!(by_timeout.submit_input("abcde").is_none());
        assert!(by_timeout.tick().is_none());
        let timed_out = by_timeout.tick().unwrap();

        assert_eq!(matched, timed_out);
    }

    #[test]
    fn tick_counts_down_and_ends_at_zero() {
        let (mut session, _) = session("abc");
        session.start(3, Difficulty::Medium);

        assert!(session.tick().is_none());
        assert!(session.tick().is_none());
        assert_eq!(session.time_left(), 1);
        assert_matches!(session.tick(), Some(_));
        assert_eq!(session.time_left(), 0);
        assert_eq!(session.status(), SessionStatus::Ended);

        // stale ticks after the end are ignored
        assert!(session.tick().is_none());
        assert_eq!(session.time_left(), 0);
    }

    #[test]
    fn zero_duration_ends_on_first_tick() {
        let (mut session, _) = session("abc");
        session.start(0, Difficulty::Medium);
        assert_matches!(session.tick(), Some(_));
        assert_eq!(session.time_left(), 0);
    }

    #[test]
    fn pause_stops_time_and_input() {
        let (mut session, _) = session("abc");
        session.start(10, Difficulty::Medium);

        assert!(session.pause());
        assert!(session.tick().is_none());
        assert_eq!(session.time_left(), 10);
        assert!(session.submit_input("abc").is_none());
        assert_eq!(session.user_input(), "");
        assert!(!session.pause());

        assert!(session.resume());
        assert!(!session.resume());
        session.tick();
        assert_eq!(session.time_left(), 9);
    }

    #[test]
    fn input_ignored_outside_running() {
        let (mut session, _) = session("abc");
        assert!(session.submit_input("a").is_none());
        assert_eq!(session.input_len(), 0);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn end_is_set_exactly_once() {
        let (mut session, clock) = session("abc");
        assert!(session.end().is_none());

        session.start(60, Difficulty::Medium);
        session.submit_input("ab");
        clock.advance_secs(1);
        let first = session.end();
        assert!(first.is_some());

        clock.advance_secs(10);
        assert!(session.end().is_none());
        assert_eq!(session.result(), first);
        assert_eq!(session.ended_at(), Some(clock.now() - Duration::seconds(10)));
    }

    #[test]
    fn end_from_paused() {
        let (mut session, _) = session("abc");
        session.start(60, Difficulty::Medium);
        session.pause();
        assert_matches!(session.end(), Some(_));
        assert_eq!(session.status(), SessionStatus::Ended);
    }

    #[test]
    fn reset_returns_to_idle() {
        let (mut session, _) = session("abc");
        session.start(60, Difficulty::Medium);
        session.submit_input("ab");
        session.end();

        session.reset(120);

        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.time_left(), 120);
        assert_eq!(session.input_len(), 0);
        assert_eq!(session.reference_text(), "");
        assert!(session.started_at().is_none());
        assert!(session.ended_at().is_none());
        assert!(session.result().is_none());
    }

    #[test]
    fn restart_after_end() {
        let (mut session, _) = session("abc");
        session.start(60, Difficulty::Medium);
        session.submit_input("abc");
        assert_eq!(session.status(), SessionStatus::Ended);

        assert!(session.start(30, Difficulty::Medium));
        assert_eq!(session.input_len(), 0);
        assert!(session.result().is_none());
    }

    #[test]
    fn apply_dispatches_commands() {
        let (mut session, clock) = session("ok");
        assert!(session
            .apply(Command::StartWithText {
                duration_secs: 5,
                text: "go".into(),
            })
            .is_none());
        assert_eq!(session.reference_text(), "go");
        assert!(session.apply(Command::Pause).is_none());
        assert_eq!(session.status(), SessionStatus::Paused);
        assert!(session.apply(Command::Resume).is_none());
        assert!(session.apply(Command::Tick).is_none());
        assert_eq!(session.time_left(), 4);
        clock.advance_secs(1);
        assert_matches!(session.apply(Command::Input("go".into())), Some(_));
        assert!(session.apply(Command::End).is_none());
        session.apply(Command::Reset { duration_secs: 60 });
        assert_eq!(session.status(), SessionStatus::Idle);
        session.apply(Command::Start {
            duration_secs: 60,
            tier: Difficulty::Hard,
        });
        assert_eq!(session.reference_text(), "ok");
    }

    #[test]
    fn type_char_and_backspace() {
        let (mut session, _) = session("ab");
        session.start(60, Difficulty::Medium);

        session.type_char('x');
        assert_eq!(session.errors(), 1);
        session.backspace();
        assert_eq!(session.input_len(), 0);
        session.type_char('a');
        assert_matches!(session.type_char('b'), Some(_));
    }

    #[test]
    fn char_states_and_progress() {
        let (mut session, _) = session("abcd");
        session.start(60, Difficulty::Medium);
        session.submit_input("aX");

        let states: Vec<CharState> = session.char_states().into_iter().map(|(_, s)| s).collect();
        assert_eq!(
            states,
            vec![
                CharState::Correct,
                CharState::Incorrect,
                CharState::Current,
                CharState::Pending
            ]
        );
        assert_eq!(session.progress(), 0.5);
    }

    #[test]
    fn result_serializes_with_storage_names() {
        let result = SessionResult {
            wpm: 40,
            accuracy: 95,
            score: 38,
            correct_chars: 200,
            errors: 10,
            duration_ms: 60_000,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["correctChars"], 200);
        assert_eq!(json["duration"], 60_000);
    }
}
