use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Where key and resize events come from
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread; key releases are dropped.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    if tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("terminal event reader stopped: {e}");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How long the runner waits for input before yielding a tick
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Event source fed by a channel, for headless runs and replays
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Pulls one event per step, or a tick when the interval passes quietly
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

/// Countdown second source. Armed while a session runs and cancelled
/// whenever it leaves `Running`, so a stale timer never reaches a
/// paused, ended or reset session.
#[derive(Debug, Clone, Default)]
pub struct SecondTimer {
    last_fire: Option<Instant>,
}

impl SecondTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `now`. Re-arming restarts the current second.
    pub fn arm(&mut self, now: Instant) {
        self.last_fire = Some(now);
    }

    pub fn cancel(&mut self) {
        self.last_fire = None;
    }

    pub fn is_armed(&self) -> bool {
        self.last_fire.is_some()
    }

    /// Whole seconds elapsed since the previous fire; 0 while disarmed.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last_fire else {
            return 0;
        };
        let secs = now.saturating_duration_since(last).as_secs();
        if secs > 0 {
            self.last_fire = Some(last + Duration::from_secs(secs));
        }
        secs as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = ChannelEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        assert!(matches!(runner.step(), AppEvent::Tick));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        let es = ChannelEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        assert!(matches!(runner.step(), AppEvent::Resize));
    }

    #[test]
    fn second_timer_fires_whole_seconds() {
        let start = Instant::now();
        let mut timer = SecondTimer::new();
        timer.arm(start);

        assert_eq!(timer.poll(start + Duration::from_millis(900)), 0);
        assert_eq!(timer.poll(start + Duration::from_millis(1_100)), 1);
        assert_eq!(timer.poll(start + Duration::from_millis(1_900)), 0);
        // remainder carries over between polls
        assert_eq!(timer.poll(start + Duration::from_millis(2_000)), 1);
        assert_eq!(timer.poll(start + Duration::from_millis(5_500)), 3);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let start = Instant::now();
        let mut timer = SecondTimer::new();
        timer.arm(start);
        timer.cancel();

        assert!(!timer.is_armed());
        assert_eq!(timer.poll(start + Duration::from_secs(10)), 0);
    }

    #[test]
    fn rearm_restarts_the_second() {
        let start = Instant::now();
        let mut timer = SecondTimer::new();
        timer.arm(start);
        timer.cancel();
        timer.arm(start + Duration::from_millis(1_500));

        assert_eq!(timer.poll(start + Duration::from_millis(2_000)), 0);
        assert_eq!(timer.poll(start + Duration::from_millis(2_500)), 1);
    }
}
