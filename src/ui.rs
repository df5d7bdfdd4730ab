use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use typomaster::{
    app::{App, Screen},
    clock::Clock,
    preferences::{Theme, ALLOWED_DURATIONS},
    rating::{format_duration, AccuracyLevel, PerformanceLevel},
    session::{CharState, SessionStatus},
    stats::AVERAGE_WINDOW,
    store::Storage,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Colors for one theme
struct Palette {
    base: Style,
    dim: Style,
    accent: Style,
    correct: Style,
    incorrect: Style,
    highlight: Style,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        let (fg, bg, accent) = match theme {
            Theme::Light => (Color::Black, Color::White, Color::Blue),
            Theme::Dark => (Color::White, Color::Black, Color::Cyan),
        };
        let base = Style::default().fg(fg).bg(bg);
        Self {
            base,
            dim: base.add_modifier(Modifier::DIM),
            accent: base.fg(accent).add_modifier(Modifier::BOLD),
            correct: base.fg(Color::Green).add_modifier(Modifier::BOLD),
            incorrect: base.fg(Color::Red).add_modifier(Modifier::BOLD),
            highlight: base.fg(Color::Magenta).add_modifier(Modifier::BOLD),
        }
    }
}

pub fn draw<S: Storage + Clone, C: Clock + Clone>(f: &mut Frame, app: &App<S, C>) {
    let palette = Palette::for_theme(app.prefs.get().theme);
    let area = f.area();
    f.render_widget(Block::default().style(palette.base), area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    match app.screen {
        Screen::Home => render_home(f, app, inner[0], &palette),
        Screen::Game => render_game(f, app, inner[0], &palette),
        Screen::Result => render_result(f, app, inner[0], &palette),
        Screen::Stats => render_stats(f, app, inner[0], &palette),
        Screen::Settings => render_settings(f, app, inner[0], &palette),
    }

    let legend = match (app.screen, app.session.status()) {
        (Screen::Home, _) => "(enter) play / (s)tats / (o)ptions / (q)uit",
        (Screen::Game, SessionStatus::Idle) => "(enter) start / (esc) home",
        (Screen::Game, SessionStatus::Paused) => "(tab) resume / (ctrl+r) reset / (esc) home",
        (Screen::Game, _) => "(tab) pause / (ctrl+r) reset / (esc) home",
        (Screen::Result, _) => "(r)etry / (s)tats / (h)ome",
        (Screen::Stats, _) if app.confirm_reset => "clear all stats? (y)es / any other key cancels",
        (Screen::Stats, _) => "(b)ack / (X) clear all stats",
        (Screen::Settings, _) => "(d)uration / (l)evel / (t)heme / (b)ell / (r)eset / (esc) back",
    };
    let legend = match &app.status_message {
        Some(message) => format!("{legend}   [{message}]"),
        None => legend.to_string(),
    };
    f.render_widget(
        Paragraph::new(Span::styled(legend, palette.dim.add_modifier(Modifier::ITALIC))),
        inner[1],
    );
}

fn render_home<S: Storage + Clone, C: Clock + Clone>(
    f: &mut Frame,
    app: &App<S, C>,
    area: Rect,
    palette: &Palette,
) {
    let stats = app.stats.stats();
    let lines = vec![
        Line::from(Span::styled("typomaster", palette.accent)),
        Line::from(""),
        Line::from(Span::styled(
            format!("{}s / {}", app.duration_secs(), app.difficulty()),
            palette.dim,
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "best {} wpm   today {} wpm   {} games",
                stats.best_wpm, stats.today_best.wpm, stats.total_sessions
            ),
            palette.base,
        )),
    ];

    let chunks = centered_rows(area, lines.len() as u16);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), chunks);
}

fn render_game<S: Storage + Clone, C: Clock + Clone>(
    f: &mut Frame,
    app: &App<S, C>,
    area: Rect,
    palette: &Palette,
) {
    let session = &app.session;

    if session.status() == SessionStatus::Idle {
        let lines = vec![
            Line::from(Span::styled("press enter to start", palette.accent)),
            Line::from(Span::styled(
                format!("difficulty {}   time {}s", app.difficulty(), app.duration_secs()),
                palette.dim,
            )),
        ];
        f.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            centered_rows(area, 2),
        );
        return;
    }

    let reference = session.reference_text();
    let max_chars_per_line = area.width.max(1);
    let prompt_lines = if reference.width() <= max_chars_per_line as usize {
        1
    } else {
        (reference.width() as f64 / max_chars_per_line as f64).ceil() as u16 + 1
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(2),            // timer
            Constraint::Length(prompt_lines), // text
            Constraint::Length(1),            // padding
            Constraint::Length(1),            // progress
            Constraint::Length(1),            // counts
            Constraint::Length(1),            // live metrics
            Constraint::Min(0),
        ])
        .split(area);

    let timer_style = if session.time_left() <= 10 {
        palette.incorrect
    } else {
        palette.accent
    };
    let timer_text = match session.status() {
        SessionStatus::Paused => format!("{}s  PAUSED", session.time_left()),
        _ => format!("{}s", session.time_left()),
    };
    f.render_widget(
        Paragraph::new(Span::styled(timer_text, timer_style)).alignment(Alignment::Center),
        chunks[1],
    );

    let spans = session
        .char_states()
        .into_iter()
        .map(|(expected, state)| match state {
            CharState::Correct => Span::styled(expected.to_string(), palette.correct),
            CharState::Incorrect => Span::styled(
                match expected {
                    ' ' => "·".to_owned(),
                    c => c.to_string(),
                },
                palette.incorrect.add_modifier(Modifier::UNDERLINED),
            ),
            CharState::Current => Span::styled(
                expected.to_string(),
                palette.dim.add_modifier(Modifier::UNDERLINED | Modifier::BOLD),
            ),
            CharState::Pending => Span::styled(expected.to_string(), palette.dim),
        })
        .collect_vec();

    f.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(if prompt_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true }),
        chunks[2],
    );

    f.render_widget(
        Gauge::default()
            .gauge_style(palette.accent)
            .ratio(session.progress())
            .label(format!("{:.0}%", session.progress() * 100.0)),
        chunks[4],
    );

    f.render_widget(
        Paragraph::new(Span::styled(
            format!(
                "{} / {} chars ({} correct, {} errors)",
                session.input_len(),
                reference.chars().count(),
                session.correct_chars(),
                session.errors()
            ),
            palette.dim,
        ))
        .alignment(Alignment::Center),
        chunks[5],
    );

    let live = session.live();
    f.render_widget(
        Paragraph::new(Span::styled(
            format!(
                "{} wpm   {}% acc   {} score",
                live.wpm, live.accuracy, live.score
            ),
            palette.base.add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        chunks[6],
    );
}

fn render_result<S: Storage + Clone, C: Clock + Clone>(
    f: &mut Frame,
    app: &App<S, C>,
    area: Rect,
    palette: &Palette,
) {
    let Some(result) = app.last_result else {
        f.render_widget(
            Paragraph::new("no result yet").alignment(Alignment::Center),
            area,
        );
        return;
    };

    let records = app.stats.stats().new_records(&result);
    let performance = PerformanceLevel::from_wpm(result.wpm);
    let accuracy_level = AccuracyLevel::from_accuracy(result.accuracy);
    let badge = |is_new: bool| if is_new { "  NEW!" } else { "" };

    let mut lines = vec![];
    if app.celebration.is_active {
        lines.push(Line::from(Span::styled(app.celebration.banner(), palette.highlight)));
        lines.push(Line::from(""));
    }
    lines.extend([
        Line::from(Span::styled(
            format!("score {}{}", result.score, badge(records.score)),
            palette.accent,
        )),
        Line::from(Span::styled(
            format!("{} - {}", performance, performance.message()),
            palette.base,
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} wpm{}", result.wpm, badge(records.wpm)),
            palette.base.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "{}% accuracy{} - {}",
                result.accuracy,
                badge(records.accuracy),
                accuracy_level.message()
            ),
            palette.base.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "{} correct   {} errors   {}",
                result.correct_chars,
                result.errors,
                format_duration(result.duration_ms)
            ),
            palette.dim,
        )),
    ]);

    let rows = lines.len() as u16;
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        centered_rows(area, rows),
    );
}

fn render_stats<S: Storage + Clone, C: Clock + Clone>(
    f: &mut Frame,
    app: &App<S, C>,
    area: Rect,
    palette: &Palette,
) {
    let stats = app.stats.stats();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // summary
            Constraint::Length(5), // wpm trend
            Constraint::Min(3),    // recent games
        ])
        .split(area);

    let progress = stats.progress_rate();
    let summary = vec![
        Line::from(Span::styled(
            format!(
                "{} games   {} typing   {} chars",
                stats.total_sessions,
                format_duration(stats.total_time_ms),
                stats.total_chars_typed
            ),
            palette.base,
        )),
        Line::from(Span::styled(
            format!(
                "best: {} wpm   {}% acc   {} score",
                stats.best_wpm, stats.best_accuracy, stats.best_score
            ),
            palette.accent,
        )),
        Line::from(Span::styled(
            format!(
                "today ({}): {} wpm   {}% acc   {} score",
                stats.today_best.date,
                stats.today_best.wpm,
                stats.today_best.accuracy,
                stats.today_best.score
            ),
            palette.base,
        )),
        Line::from(Span::styled(
            format!(
                "avg of last {}: {} wpm   accuracy {}%   error rate {}%",
                AVERAGE_WINDOW,
                stats.average_wpm_recent(AVERAGE_WINDOW),
                stats.overall_accuracy(),
                stats.error_rate()
            ),
            palette.base,
        )),
        Line::from(Span::styled(
            format!("progress {progress:+}%"),
            if progress >= 0 {
                palette.correct
            } else {
                palette.incorrect
            },
        )),
    ];
    f.render_widget(
        Paragraph::new(summary).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Stats")
                .style(palette.base),
        ),
        chunks[0],
    );

    let trend = stats
        .recent_games
        .iter()
        .rev()
        .map(|g| g.result.wpm as u64)
        .collect_vec();
    f.render_widget(
        Sparkline::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("wpm, oldest to newest")
                    .style(palette.base),
            )
            .style(palette.highlight)
            .data(&trend),
        chunks[1],
    );

    let header = Row::new(vec![
        Cell::from("when"),
        Cell::from("wpm"),
        Cell::from("acc"),
        Cell::from("score"),
        Cell::from("time"),
    ])
    .style(palette.accent);

    let rows = stats
        .recent_games
        .iter()
        .map(|game| {
            Row::new(vec![
                Cell::from(game.date.clone()),
                Cell::from(game.result.wpm.to_string()),
                Cell::from(format!("{}%", game.result.accuracy)),
                Cell::from(game.result.score.to_string()),
                Cell::from(format_duration(game.result.duration_ms)),
            ])
        })
        .collect_vec();

    f.render_widget(
        Table::new(
            rows,
            [
                Constraint::Length(16),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(8),
            ],
        )
        .header(header)
        .style(palette.base)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recent games")
                .style(palette.base),
        ),
        chunks[2],
    );
}

fn render_settings<S: Storage + Clone, C: Clock + Clone>(
    f: &mut Frame,
    app: &App<S, C>,
    area: Rect,
    palette: &Palette,
) {
    let prefs = app.prefs.get();
    let durations = ALLOWED_DURATIONS
        .iter()
        .map(|d| {
            if *d == prefs.game_duration {
                format!("[{d}s]")
            } else {
                format!("{d}s")
            }
        })
        .join(" ");

    let lines = vec![
        Line::from(Span::styled("Settings", palette.accent)),
        Line::from(""),
        Line::from(format!("(d) duration     {durations}")),
        Line::from(format!("(l) difficulty   {}", prefs.difficulty)),
        Line::from(format!("(t) theme        {}", prefs.theme)),
        Line::from(format!(
            "(b) sound        {}",
            if prefs.sound_effects { "on" } else { "off" }
        )),
    ];

    let rows = lines.len() as u16;
    f.render_widget(
        Paragraph::new(lines)
            .style(palette.base)
            .alignment(Alignment::Left),
        centered_rows(area, rows),
    );
}

/// A horizontal band of `rows` lines centered vertically in `area`.
fn centered_rows(area: Rect, rows: u16) -> Rect {
    let rows = rows.min(area.height);
    let top = (area.height - rows) / 2;
    Rect {
        x: area.x,
        y: area.y + top,
        width: area.width,
        height: rows,
    }
}
