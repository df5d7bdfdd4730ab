mod ui;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use typomaster::{
    app::{App, SessionOverrides},
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    rating::format_duration,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    stats::{AggregateStats, StatsStore, AVERAGE_WINDOW},
    store::{FileStorage, Storage},
    text::{Difficulty, TextProvider},
};

const TICK_RATE_MS: u64 = 100;

/// timed typing practice with live wpm, accuracy and personal records
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed typing practice in the terminal. Type the sentence shown before the clock runs out; words per minute, accuracy and score update as you type and your records are kept between runs."
)]
pub struct Cli {
    /// seconds per session for this run (the saved preference is left alone)
    #[clap(short = 'd', long, value_parser = clap::value_parser!(u32).range(1..=3600))]
    duration: Option<u32>,

    /// difficulty tier to draw sentences from for this run
    #[clap(short = 'l', long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// custom text to type instead of a sampled sentence
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// directory holding preferences, stats and the log file
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// print a summary of stored statistics and exit
    #[clap(long)]
    stats: bool,

    /// clear all stored statistics
    #[clap(long)]
    reset_stats: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl DifficultyArg {
    fn as_difficulty(&self) -> Difficulty {
        match self {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

impl Cli {
    fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            duration_secs: self.duration,
            difficulty: self.difficulty.map(|d| d.as_difficulty()),
            prompt: self.prompt.clone().filter(|p| !p.trim().is_empty()),
        }
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(AppDirs::data_dir)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir();
    init_logging(&data_dir);

    let storage = FileStorage::with_dir(&data_dir);

    if cli.reset_stats {
        let mut stats = StatsStore::load(&storage, SystemClock);
        stats.reset().context("failed to clear statistics")?;
        println!("statistics cleared");
    }

    if cli.stats {
        let stats = StatsStore::load(&storage, SystemClock);
        print!("{}", stats_summary(stats.stats()));
        return Ok(());
    }

    if cli.reset_stats {
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let texts = TextProvider::embedded().context("failed to load embedded texts")?;
    let mut app = App::new(storage, SystemClock, texts, cli.overrides());
    log::info!("starting typomaster with data in {}", data_dir.display());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Log to a file in the data directory; the terminal belongs to the TUI.
fn init_logging(data_dir: &Path) {
    if fs::create_dir_all(data_dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(AppDirs::log_path(data_dir))
    else {
        return;
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}

fn start_tui<B, S, C>(terminal: &mut Terminal<B>, app: &mut App<S, C>) -> Result<()>
where
    B: Backend + Write,
    S: Storage + Clone,
    C: Clock + Clone,
{
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        match runner.step() {
            AppEvent::Key(key) => app.on_key(key, Instant::now()),
            AppEvent::Resize | AppEvent::Tick => {}
        }
        // Keys can starve the tick timeout, so the countdown is polled after every event.
        app.on_tick(Instant::now());

        if app.take_bell() {
            execute!(terminal.backend_mut(), Print("\x07"))?;
        }

        if app.should_quit {
            log::info!("quitting");
            break;
        }
    }

    Ok(())
}

fn stats_summary(stats: &AggregateStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Games played: {}\n", stats.total_sessions));
    out.push_str(&format!(
        "Time typing: {}\n",
        format_duration(stats.total_time_ms)
    ));
    out.push_str(&format!(
        "Characters: {} ({} correct, {} errors)\n",
        stats.total_chars_typed, stats.total_correct_chars, stats.total_errors
    ));
    out.push_str(&format!(
        "Best: {} wpm / {}% accuracy / {} score\n",
        stats.best_wpm, stats.best_accuracy, stats.best_score
    ));
    out.push_str(&format!(
        "Today ({}): {} wpm / {}% accuracy / {} score\n",
        stats.today_best.date,
        stats.today_best.wpm,
        stats.today_best.accuracy,
        stats.today_best.score
    ));
    out.push_str(&format!(
        "Average of last {}: {} wpm\n",
        AVERAGE_WINDOW,
        stats.average_wpm_recent(AVERAGE_WINDOW)
    ));
    out.push_str(&format!(
        "Overall accuracy: {}%\n",
        stats.overall_accuracy()
    ));
    out.push_str(&format!("Progress: {:+}%\n", stats.progress_rate()));
    out
}
