use rand::seq::SliceRandom;
use std::time::{Duration, Instant};

use crate::stats::NewRecords;

const SPARKLES: [char; 5] = ['*', '+', '~', 'o', '.'];

/// How long the new-record banner stays on screen
pub const CELEBRATION_DURATION: Duration = Duration::from_secs(3);

/// Timed "new record" banner shown on the results screen
#[derive(Debug, Clone, Default)]
pub struct Celebration {
    pub is_active: bool,
    started_at: Option<Instant>,
    records: NewRecords,
    sparkles: String,
}

impl Celebration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start only when at least one record was matched.
    pub fn start_if_record(&mut self, records: NewRecords, now: Instant) -> bool {
        if !records.any() {
            return false;
        }
        self.is_active = true;
        self.started_at = Some(now);
        self.records = records;
        self.reshuffle();
        true
    }

    /// Advance the animation; deactivates once the banner has expired.
    pub fn update(&mut self, now: Instant) {
        let Some(started_at) = self.started_at else {
            return;
        };
        if now.saturating_duration_since(started_at) >= CELEBRATION_DURATION {
            self.stop();
        } else {
            self.reshuffle();
        }
    }

    pub fn stop(&mut self) {
        self.is_active = false;
        self.started_at = None;
    }

    pub fn records(&self) -> NewRecords {
        self.records
    }

    pub fn banner(&self) -> String {
        let mut labels = Vec::new();
        if self.records.wpm {
            labels.push("WPM");
        }
        if self.records.accuracy {
            labels.push("accuracy");
        }
        if self.records.score {
            labels.push("score");
        }
        format!(
            "{} New record: {}! {}",
            self.sparkles,
            labels.join(", "),
            self.sparkles
        )
    }

    fn reshuffle(&mut self) {
        let rng = &mut rand::thread_rng();
        self.sparkles = (0..3)
            .map(|_| *SPARKLES.choose(rng).unwrap_or(&'*'))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> NewRecords {
        NewRecords {
            wpm: true,
            accuracy: false,
            score: true,
        }
    }

    #[test]
    fn no_record_no_celebration() {
        let mut celebration = Celebration::new();
        assert!(!celebration.start_if_record(NewRecords::default(), Instant::now()));
        assert!(!celebration.is_active);
    }

    #[test]
    fn celebration_expires() {
        let start = Instant::now();
        let mut celebration = Celebration::new();
        assert!(celebration.start_if_record(records(), start));

        celebration.update(start + Duration::from_secs(1));
        assert!(celebration.is_active);

        celebration.update(start + CELEBRATION_DURATION);
        assert!(!celebration.is_active);
    }

    #[test]
    fn banner_lists_records() {
        let mut celebration = Celebration::new();
        celebration.start_if_record(records(), Instant::now());

        let banner = celebration.banner();
        assert!(banner.contains("New record: WPM, score!"));
        assert!(!banner.contains("accuracy"));
    }
}
