use chrono::{DateTime, Duration, Local};
use std::cell::Cell;
use std::rc::Rc;

/// Wall-clock source injected into the session and stats stores
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually advanced clock for deterministic tests and replays.
///
/// Clones share the same instant, so a test can keep a handle while the
/// session owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Local>) {
        self.now.set(to);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        let before = clock.now();

        handle.advance_secs(90);

        assert_eq!(clock.now() - before, Duration::seconds(90));
    }

    #[test]
    fn manual_clock_set() {
        let clock = ManualClock::default();
        let target = Local::now() + Duration::days(3);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
