//! Human-readable grading of a finished session.

/// Speed bracket derived from WPM
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PerformanceLevel {
    Advanced,
    Intermediate,
    Beginner,
    Practicing,
}

impl PerformanceLevel {
    pub fn from_wpm(wpm: u32) -> Self {
        match wpm {
            60.. => PerformanceLevel::Advanced,
            40..=59 => PerformanceLevel::Intermediate,
            20..=39 => PerformanceLevel::Beginner,
            _ => PerformanceLevel::Practicing,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PerformanceLevel::Advanced => "Outstanding typing speed!",
            PerformanceLevel::Intermediate => "A very good pace!",
            PerformanceLevel::Beginner => "You are improving steadily!",
            PerformanceLevel::Practicing => "Keep practicing, you will get there!",
        }
    }
}

/// Accuracy bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyLevel {
    Excellent,
    Good,
    Fair,
    NeedsWork,
}

impl AccuracyLevel {
    pub fn from_accuracy(accuracy: u32) -> Self {
        match accuracy {
            95.. => AccuracyLevel::Excellent,
            85..=94 => AccuracyLevel::Good,
            75..=84 => AccuracyLevel::Fair,
            _ => AccuracyLevel::NeedsWork,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AccuracyLevel::Excellent => "Very accurate!",
            AccuracyLevel::Good => "Good accuracy!",
            AccuracyLevel::Fair => "Decent accuracy",
            AccuracyLevel::NeedsWork => "Accuracy needs work",
        }
    }
}

/// `1m 5s`, or `42s` under a minute.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {remaining}s")
    } else {
        format!("{remaining}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_thresholds() {
        assert_eq!(PerformanceLevel::from_wpm(0), PerformanceLevel::Practicing);
        assert_eq!(PerformanceLevel::from_wpm(19), PerformanceLevel::Practicing);
        assert_eq!(PerformanceLevel::from_wpm(20), PerformanceLevel::Beginner);
        assert_eq!(PerformanceLevel::from_wpm(40), PerformanceLevel::Intermediate);
        assert_eq!(PerformanceLevel::from_wpm(59), PerformanceLevel::Intermediate);
        assert_eq!(PerformanceLevel::from_wpm(60), PerformanceLevel::Advanced);
        assert_eq!(PerformanceLevel::Advanced.to_string(), "Advanced");
    }

    #[test]
    fn accuracy_thresholds() {
        assert_eq!(AccuracyLevel::from_accuracy(100), AccuracyLevel::Excellent);
        assert_eq!(AccuracyLevel::from_accuracy(95), AccuracyLevel::Excellent);
        assert_eq!(AccuracyLevel::from_accuracy(85), AccuracyLevel::Good);
        assert_eq!(AccuracyLevel::from_accuracy(75), AccuracyLevel::Fair);
        assert_eq!(AccuracyLevel::from_accuracy(74), AccuracyLevel::NeedsWork);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(42_900), "42s");
        assert_eq!(format_duration(65_000), "1m 5s");
        assert_eq!(format_duration(300_000), "5m 0s");
    }
}
