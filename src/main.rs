use std::fs::OpenOptions;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use env_logger::Env;
use log::{info, warn};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use rusqlite::Connection;

use predictor_terminal::api::{self, HttpBackend};
use predictor_terminal::config::{BackendKind, Config};
use predictor_terminal::demo_backend::DemoBackend;
use predictor_terminal::fixtures::Fixture;
use predictor_terminal::ledger::{Prediction, ScoreSide};
use predictor_terminal::persist;
use predictor_terminal::provider;
use predictor_terminal::receipts;
use predictor_terminal::session::{DayView, Session, ViewerZone};
use predictor_terminal::state::{
    AppState, LoginField, NoticeKind, PROPHECY_FIELDS, ProphecyField, ProviderCommand, Screen,
    apply_delta,
};
use predictor_terminal::window::{GRACE_PENALTY_POINTS, WindowState};

struct App {
    state: AppState,
    should_quit: bool,
    show_logs: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    receipts_db: Option<Connection>,
    leaderboard_refresh: Duration,
    last_leaderboard_refresh: Instant,
    view: Vec<DayPanel>,
}

/// One day as drawn this frame.
struct DayPanel {
    day: DayView,
    rows: Vec<FixtureRow>,
}

struct FixtureRow {
    index: usize,
    fixture: Fixture,
    prediction: Prediction,
    joker: bool,
    chip_enabled: bool,
}

impl App {
    fn new(state: AppState, cmd_tx: mpsc::Sender<ProviderCommand>, config: &Config) -> Self {
        let receipts_db = match receipts::default_db_path() {
            Some(path) => match receipts::open_db(&path) {
                Ok(conn) => Some(conn),
                Err(err) => {
                    warn!("receipts disabled: {err:#}");
                    None
                }
            },
            None => None,
        };
        Self {
            state,
            should_quit: false,
            show_logs: false,
            cmd_tx,
            receipts_db,
            leaderboard_refresh: config.leaderboard_refresh,
            last_leaderboard_refresh: Instant::now(),
            view: Vec::new(),
        }
    }

    fn on_key(&mut self, key: KeyEvent, now: DateTime<Utc>) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.state.confirm.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.state.confirm_grace(now),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.state.cancel_confirm()
                }
                _ => {}
            }
            return;
        }
        match self.state.screen {
            Screen::Login => self.on_login_key(key),
            Screen::Fixtures => self.on_fixtures_key(key, now),
            Screen::Prophecies => self.on_prophecies_key(key),
            Screen::Leaderboard => self.on_leaderboard_key(key),
        }
    }

    fn on_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.login_toggle_mode()
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => self.state.login_next_field(),
            KeyCode::Enter => self.state.login_submit(),
            KeyCode::Backspace => self.state.login_backspace(),
            KeyCode::Char(c) => self.state.login_input(c),
            _ => {}
        }
    }

    fn on_fixtures_key(&mut self, key: KeyEvent, now: DateTime<Utc>) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Tab => self.state.switch_side(),
            KeyCode::Left => self.state.side = ScoreSide::Home,
            KeyCode::Right => self.state.side = ScoreSide::Away,
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(d) = c.to_digit(10) {
                    self.state.push_digit(d, now);
                }
            }
            KeyCode::Backspace => self.state.pop_digit(now),
            KeyCode::Char('x') => self.state.clear_score(now),
            KeyCode::Char('c') => self.state.toggle_chip(now),
            KeyCode::Char('s') | KeyCode::Enter => self.state.submit_selected(now),
            KeyCode::Char('e') => self.state.edit_selected(now),
            KeyCode::Char('[') => self.state.change_gameweek(-1),
            KeyCode::Char(']') => self.state.change_gameweek(1),
            KeyCode::Char('p') => self.state.open_prophecies(),
            KeyCode::Char('b') => {
                self.state.screen = Screen::Leaderboard;
                self.request_leaderboard();
            }
            KeyCode::Char('r') => {
                self.state.push_log("[INFO] Manual refresh");
                self.state.refresh();
                self.last_leaderboard_refresh = Instant::now();
            }
            KeyCode::Char('g') => self.state.score_gameweek(),
            KeyCode::Char('l') => self.show_logs = !self.show_logs,
            KeyCode::Char('o') => {
                self.state.logout();
                self.state.notify(NoticeKind::Info, "Logged out.");
            }
            _ => {}
        }
    }

    fn on_prophecies_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.screen = Screen::Fixtures,
            KeyCode::Down | KeyCode::Tab => self.state.prophecy_next_field(),
            KeyCode::Up | KeyCode::BackTab => self.state.prophecy_prev_field(),
            KeyCode::Left => self.state.prophecy_cycle(false),
            KeyCode::Right => self.state.prophecy_cycle(true),
            KeyCode::Enter => self.state.prophecy_submit(),
            KeyCode::Backspace => self.state.prophecy_backspace(),
            KeyCode::Char(c) => self.state.prophecy_input(c),
            _ => {}
        }
    }

    fn on_leaderboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('b') | KeyCode::Esc => self.state.screen = Screen::Fixtures,
            KeyCode::Char('r') => self.request_leaderboard(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn request_leaderboard(&mut self) {
        self.state.request_leaderboard();
        self.last_leaderboard_refresh = Instant::now();
    }

    fn maybe_refresh_leaderboard(&mut self) {
        if self.state.session.is_none() {
            return;
        }
        if self.last_leaderboard_refresh.elapsed() >= self.leaderboard_refresh {
            self.request_leaderboard();
        }
    }

    fn flush_commands(&mut self) {
        for cmd in self.state.take_commands() {
            if self.cmd_tx.send(cmd).is_err() {
                self.state.push_log("[WARN] Provider unavailable");
                break;
            }
        }
    }

    fn persist(&mut self) {
        if self.state.stored_dirty {
            self.state.stored_dirty = false;
            if let Err(err) = persist::save_session(&self.state.stored) {
                warn!("session save failed: {err:#}");
            }
        }

        let fresh = self.state.take_new_receipts();
        let Some(conn) = self.receipts_db.as_ref() else {
            return;
        };
        for receipt in &fresh {
            if let Err(err) = receipts::record(conn, receipt) {
                warn!("receipt not recorded: {err:#}");
            }
        }

        if !self.state.receipts_stale {
            return;
        }
        self.state.receipts_stale = false;
        let Some(session) = self.state.session.as_ref() else {
            return;
        };
        let Some(gameweek) = session.gameweek() else {
            return;
        };
        match receipts::latest_for_gameweek(conn, &session.identity.user_id, gameweek) {
            Ok(rows) => {
                for receipt in rows {
                    self.state.receipts.insert(receipt.day, receipt);
                }
            }
            Err(err) => warn!("receipts load failed: {err:#}"),
        }
    }

    fn rebuild_view(&mut self, now: DateTime<Utc>) {
        self.view = match self.state.session.as_mut() {
            Some(session) => day_panels(session, now),
            None => Vec::new(),
        };
    }
}

fn day_panels(session: &mut Session, now: DateTime<Utc>) -> Vec<DayPanel> {
    let days = session.evaluate(now);
    let grouped: Vec<Vec<Fixture>> = session
        .groups()
        .iter()
        .map(|g| g.fixtures.clone())
        .collect();

    let mut index = 0;
    let mut panels = Vec::with_capacity(days.len());
    for (day, fixtures) in days.into_iter().zip(grouped) {
        let mut rows = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            rows.push(FixtureRow {
                index,
                prediction: session.ledger().prediction(&fixture.id),
                joker: session.chip().holds(&fixture.id),
                chip_enabled: session.chip_button_enabled(&fixture.id, now),
                fixture,
            });
            index += 1;
        }
        panels.push(DayPanel { day, rows });
    }
    panels
}

fn init_logging() {
    let builder_env = Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(builder_env);
    // The terminal belongs to the UI, so records go to a file or nowhere.
    let file = persist::app_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("predictor.log"))
            .ok()
    });
    match file {
        Some(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}

fn make_backend(config: &Config) -> anyhow::Result<Box<dyn api::Backend>> {
    Ok(match config.backend {
        BackendKind::Http => Box::new(
            HttpBackend::new(&config.backend_url, config.request_timeout)
                .context("build http backend")?,
        ),
        BackendKind::Demo => Box::new(DemoBackend::new(Utc::now())),
    })
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let config = Config::from_env();
    info!(
        "starting with {:?} backend at {}",
        config.backend, config.backend_url
    );
    let backend = make_backend(&config)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    provider::spawn_provider(backend, tx, cmd_rx);

    let mut state = AppState::new(ViewerZone::Local, config.submit_policy, persist::load_session());
    if config.backend == BackendKind::Demo {
        state.push_log("[INFO] Demo backend: any email and password will do");
    }
    state.resume();
    let mut app = App::new(state, cmd_tx, &config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let term_backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(term_backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<predictor_terminal::state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        // One clock reading for the deltas and the redraw of this pass.
        let now = Utc::now();

        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta, now);
        }

        app.maybe_refresh_leaderboard();
        app.flush_commands();
        app.persist();
        app.rebuild_view(now);

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // The poll may have waited most of a tick; judge the key at press time.
                    app.on_key(key, Utc::now());
                    app.flush_commands();
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = if app.show_logs && app.state.screen != Screen::Login {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(8)])
            .split(chunks[1]);
        render_logs(frame, split[1], &app.state);
        split[0]
    } else {
        chunks[1]
    };

    match app.state.screen {
        Screen::Login => render_login(frame, body, &app.state),
        Screen::Fixtures => render_fixtures(frame, body, app),
        Screen::Prophecies => render_prophecies(frame, body, &app.state),
        Screen::Leaderboard => render_leaderboard(frame, body, &app.state),
    }

    if let Some(notice) = &app.state.notice {
        let color = match notice.kind {
            NoticeKind::Info => Color::Green,
            NoticeKind::Warn => Color::Yellow,
            NoticeKind::Error => Color::Red,
        };
        let line = Paragraph::new(notice.text.as_str()).style(Style::default().fg(color));
        frame.render_widget(line, chunks[2]);
    }

    let footer =
        Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let Some(session) = state.session.as_ref() else {
        return "  PREDICTOR\n  Log in or register to play".to_string();
    };
    let gameweek = session
        .gameweek()
        .map(|gw| format!("Gameweek {gw}"))
        .unwrap_or_else(|| "Loading...".to_string());
    let joker = if session.chip().used_in_season() {
        "Joker: used"
    } else if session.chip().assigned().is_some() {
        "Joker: placed"
    } else {
        "Joker: available"
    };
    let welcome = state.welcome().unwrap_or_default();
    let screen = match state.screen {
        Screen::Login => "Login",
        Screen::Fixtures => "Fixtures",
        Screen::Prophecies => "Prophecies",
        Screen::Leaderboard => "Leaderboard",
    };
    format!("  PREDICTOR | {screen} | {gameweek} | {joker}\n  {welcome}")
}

fn footer_text(state: &AppState) -> String {
    if state.confirm.is_some() {
        return "y Confirm late change | n/Esc Cancel".to_string();
    }
    match state.screen {
        Screen::Login => {
            "Tab Next field | Enter Submit | Ctrl-R Login/Register | Esc Quit".to_string()
        }
        Screen::Fixtures => {
            "j/k Move | Tab/←/→ Side | 0-9 Score | c Joker | s Submit | e Edit | [ ] Gameweek | p Prophecies | b Leaderboard | ? Help | q Quit".to_string()
        }
        Screen::Prophecies => {
            "↑/↓ Field | ←/→ Choose | type Text | Enter Save | Esc Back".to_string()
        }
        Screen::Leaderboard => "r Refresh | b/Esc Back | q Quit".to_string(),
    }
}

fn render_login(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(50, 60, area);
    let form = &state.login;
    let focused = form.focused();
    let title = if form.register { "Register" } else { "Login" };

    let mut lines: Vec<Line> = Vec::new();
    for field in form.fields() {
        let (label, value) = match field {
            LoginField::Name => ("Name", form.name.clone()),
            LoginField::Email => ("Email", form.email.clone()),
            LoginField::Password => ("Password", "*".repeat(form.password.chars().count())),
        };
        let style = if *field == focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if *field == focused { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{label:>9}: "), style),
            Span::raw(format!("{value}{cursor}")),
        ]));
        lines.push(Line::from(""));
    }
    if state.auth_in_flight {
        lines.push(Line::from(Span::styled(
            "Contacting server...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let widget = Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(widget, popup);
}

fn render_fixtures(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let Some(session) = state.session.as_ref() else {
        return;
    };
    if app.view.is_empty() {
        let text = if session.gameweek().is_some() {
            "No fixtures this gameweek"
        } else {
            "Loading fixtures..."
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let zone = session.zone();
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_line = 0usize;

    for panel in &app.view {
        lines.push(day_header(panel, state, zone));
        for row in &panel.rows {
            let selected = row.index == state.selected;
            if selected {
                selected_line = lines.len();
            }
            lines.push(fixture_line(row, selected, state.side, zone, panel.day.editable));
        }
        lines.push(Line::from(""));
    }

    let visible = area.height as usize;
    let offset = selected_line.saturating_sub(visible.saturating_sub(2) / 2);
    let offset = offset.min(lines.len().saturating_sub(visible));
    let widget = Paragraph::new(lines).scroll((offset as u16, 0));
    frame.render_widget(widget, area);
}

fn day_header(panel: &DayPanel, state: &AppState, zone: ViewerZone) -> Line<'static> {
    let day = &panel.day;
    let state_color = match day.state {
        WindowState::Open => Color::Green,
        WindowState::Grace => Color::Yellow,
        WindowState::Locked => Color::Red,
    };
    let timing = match day.state {
        WindowState::Open => format!(
            "closes {} (in {})",
            zone.format(day.deadline, "%H:%M"),
            day.countdown
        ),
        WindowState::Grace => format!(
            "late window until {} ({} left, {GRACE_PENALTY_POINTS} pts)",
            zone.format(day.grace_end, "%H:%M"),
            day.countdown
        ),
        WindowState::Locked => "closed".to_string(),
    };
    let mut spans = vec![
        Span::styled(
            format!("{} ", day.label),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("[{}] ", day.state.label()),
            Style::default().fg(state_color),
        ),
        Span::raw(timing),
    ];
    if day.submitted {
        let stamp = state
            .receipts
            .get(&day.date)
            .map(|r| {
                let late = if r.late { ", late" } else { "" };
                format!(" submitted {}{late}", zone.format(r.submitted_at, "%a %H:%M"))
            })
            .unwrap_or_else(|| " submitted".to_string());
        spans.push(Span::styled(stamp, Style::default().fg(Color::Cyan)));
    }
    if state
        .session
        .as_ref()
        .and_then(|s| s.save_in_flight())
        .is_some_and(|d| d == day.date)
    {
        spans.push(Span::styled(" saving...", Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

fn fixture_line(
    row: &FixtureRow,
    selected: bool,
    side: ScoreSide,
    zone: ViewerZone,
    editable: bool,
) -> Line<'static> {
    let base = if selected {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else if editable {
        Style::default()
    } else {
        Style::default().fg(Color::Gray)
    };
    let cell = |value: Option<u32>, active: bool| {
        let text = value.map(|v| v.to_string()).unwrap_or_else(|| " ".to_string());
        let style = if active {
            base.fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            base
        };
        Span::styled(format!("[{text:>2}]"), style)
    };
    let marker = if selected { "> " } else { "  " };
    let joker = if row.joker {
        Span::styled(" J", base.fg(Color::Magenta).add_modifier(Modifier::BOLD))
    } else if selected && row.chip_enabled {
        Span::styled(" (c: joker)", base.fg(Color::DarkGray))
    } else {
        Span::styled("", base)
    };
    let derby = if row.fixture.is_derby { " derby" } else { "" };
    let result = row
        .fixture
        .result()
        .map(|(h, a)| format!("  FT {h}-{a}"))
        .unwrap_or_default();

    Line::from(vec![
        Span::styled(
            format!(
                "{marker}{}  {:>22} ",
                zone.format(row.fixture.kickoff_time, "%H:%M"),
                row.fixture.home_team
            ),
            base,
        ),
        cell(row.prediction.home, selected && side == ScoreSide::Home),
        Span::styled(" - ", base),
        cell(row.prediction.away, selected && side == ScoreSide::Away),
        Span::styled(format!(" {:<22}{derby}{result}", row.fixture.away_team), base),
        joker,
    ])
}

fn render_prophecies(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(session) = state.session.as_ref() else {
        return;
    };
    let form = &state.prophecy_form;
    let lock = session.prophecies();
    let title = if lock.locked() {
        "Season prophecies (locked)"
    } else if lock.pending() {
        "Season prophecies (saving...)"
    } else {
        "Season prophecies"
    };

    let focused = form.focused();
    let mut lines: Vec<Line> = Vec::new();
    for field in PROPHECY_FIELDS {
        if !form.is_visible(field) {
            continue;
        }
        let (label, value) = match field {
            ProphecyField::Winner => ("Champions".to_string(), form.draft.winner.clone()),
            ProphecyField::Relegation(i) => {
                (format!("Relegated #{}", i + 1), form.draft.relegation[i].clone())
            }
            ProphecyField::GoldenBoot => {
                ("Golden Boot".to_string(), form.draft.golden_boot.clone())
            }
            ProphecyField::GoldenBootOther => {
                ("  Player".to_string(), form.draft.golden_boot_other.clone())
            }
            ProphecyField::FirstSacking => {
                ("First sacking".to_string(), form.draft.first_sacking.clone())
            }
        };
        let style = if field == focused && !lock.locked() {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value = if value.is_empty() { "-".to_string() } else { value };
        lines.push(Line::from(vec![
            Span::styled(format!("{label:>14}: "), style),
            Span::raw(value),
        ]));
    }

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_leaderboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let me = state.session.as_ref().map(|s| s.identity.user_id.as_str());
    if state.leaderboard.is_empty() {
        let empty = Paragraph::new("No standings yet").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }
    let lines: Vec<Line> = state
        .leaderboard
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if Some(entry.id.as_str()) == me {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::styled(format!("{:>3}. {:<28} {:>5}", i + 1, entry.name, entry.score), style)
        })
        .collect();
    let widget =
        Paragraph::new(lines).block(Block::default().title("Leaderboard").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let height = area.height.saturating_sub(2) as usize;
    let start = state.logs.len().saturating_sub(height);
    let text = state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let widget = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title("Log").borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Predictor - Help",
        "",
        "Fixtures:",
        "  j/k or ↑/↓   Move between matches",
        "  Tab / ← / →  Home or away score",
        "  0-9          Type a score",
        "  Backspace    Delete a digit",
        "  x            Clear the score",
        "  c            Place or remove the Joker",
        "  s / Enter    Submit the selected day",
        "  e            Edit a submitted day",
        "  [ / ]        Previous / next gameweek",
        "  g            Score the gameweek",
        "  r            Refresh everything",
        "",
        "Screens:",
        "  p            Season prophecies",
        "  b            Leaderboard",
        "  l            Toggle log panel",
        "  o            Log out",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
