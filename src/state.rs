use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};

use crate::api::{FixtureList, LeaderboardEntry, SaveAck, SavePredictionsRequest, UserData};
use crate::auth::{self, LoginRequest, RegisterRequest};
use crate::chip::ChipChange;
use crate::error::{AppError, Violation};
use crate::fixtures::{self, Fixture};
use crate::ledger::{ScoreSide, SubmitPolicy};
use crate::persist::StoredSession;
use crate::prophecy::{GOLDEN_BOOT_OTHER, Prophecies, ProphecyDraft};
use crate::receipts::Receipt;
use crate::session::{Session, ViewerZone};
use crate::window::GRACE_PENALTY_POINTS;

pub const GOLDEN_BOOT_CHOICES: [&str; 7] = [
    "Erling Haaland",
    "Mohamed Salah",
    "Alexander Isak",
    "Cole Palmer",
    "Bukayo Saka",
    "Ollie Watkins",
    GOLDEN_BOOT_OTHER,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Fixtures,
    Prophecies,
    Leaderboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Name,
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub register: bool,
    pub name: String,
    pub email: String,
    pub password: String,
    pub focus: Option<LoginField>,
}

impl LoginForm {
    pub fn fields(&self) -> &'static [LoginField] {
        if self.register {
            &[LoginField::Name, LoginField::Email, LoginField::Password]
        } else {
            &[LoginField::Email, LoginField::Password]
        }
    }

    pub fn focused(&self) -> LoginField {
        self.focus
            .filter(|f| self.fields().contains(f))
            .unwrap_or(self.fields()[0])
    }

    fn field_mut(&mut self, field: LoginField) -> &mut String {
        match field {
            LoginField::Name => &mut self.name,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceAction {
    Edit,
    Submit,
}

/// A late-submission warning waiting for the player to say yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceConfirm {
    pub date: NaiveDate,
    pub action: GraceAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProphecyField {
    Winner,
    Relegation(usize),
    GoldenBoot,
    GoldenBootOther,
    FirstSacking,
}

pub const PROPHECY_FIELDS: [ProphecyField; 7] = [
    ProphecyField::Winner,
    ProphecyField::Relegation(0),
    ProphecyField::Relegation(1),
    ProphecyField::Relegation(2),
    ProphecyField::GoldenBoot,
    ProphecyField::GoldenBootOther,
    ProphecyField::FirstSacking,
];

#[derive(Debug, Clone, Default)]
pub struct ProphecyForm {
    pub draft: ProphecyDraft,
    pub field: usize,
}

impl ProphecyForm {
    pub fn focused(&self) -> ProphecyField {
        PROPHECY_FIELDS[self.field.min(PROPHECY_FIELDS.len() - 1)]
    }

    pub fn is_visible(&self, field: ProphecyField) -> bool {
        field != ProphecyField::GoldenBootOther || self.draft.golden_boot == GOLDEN_BOOT_OTHER
    }

    fn step(&mut self, forward: bool) {
        let len = PROPHECY_FIELDS.len();
        for _ in 0..len {
            self.field = if forward {
                (self.field + 1) % len
            } else {
                (self.field + len - 1) % len
            };
            if self.is_visible(self.focused()) {
                return;
            }
        }
    }

    fn text_mut(&mut self, field: ProphecyField) -> Option<&mut String> {
        match field {
            ProphecyField::GoldenBootOther => Some(&mut self.draft.golden_boot_other),
            ProphecyField::FirstSacking => Some(&mut self.draft.first_sacking),
            _ => None,
        }
    }
}

/// Per-kind request counters. A response is applied only if it carries the latest number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generations {
    pub fixtures: u64,
    pub user_data: u64,
    pub leaderboard: u64,
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Register(RegisterRequest),
    Login(LoginRequest),
    FetchFixtures {
        gameweek: Option<u32>,
        generation: u64,
    },
    FetchUserData {
        token: String,
        generation: u64,
    },
    SavePredictions {
        token: String,
        date: NaiveDate,
        gameweek: u32,
        late: bool,
        request: SavePredictionsRequest,
    },
    SaveProphecies {
        token: String,
        prophecies: Prophecies,
    },
    ScoreGameweek {
        token: String,
    },
    FetchLeaderboard {
        generation: u64,
    },
}

#[derive(Debug, Clone)]
pub enum Delta {
    Registered(Result<String, AppError>),
    LoggedIn(Result<String, AppError>),
    Fixtures {
        generation: u64,
        result: Result<FixtureList, AppError>,
    },
    UserData {
        generation: u64,
        result: Result<UserData, AppError>,
    },
    PredictionsSaved {
        date: NaiveDate,
        gameweek: u32,
        late: bool,
        joker_fixture_id: Option<String>,
        result: Result<SaveAck, AppError>,
    },
    PropheciesSaved {
        prophecies: Prophecies,
        result: Result<(), AppError>,
    },
    GameweekScored(Result<String, AppError>),
    Leaderboard {
        generation: u64,
        result: Result<Vec<LeaderboardEntry>, AppError>,
    },
    Log(String),
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub login: LoginForm,
    pub notice: Option<Notice>,
    pub logs: VecDeque<String>,
    pub session: Option<Session>,
    pub selected: usize,
    pub side: ScoreSide,
    pub confirm: Option<GraceConfirm>,
    pub prophecy_form: ProphecyForm,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub auth_in_flight: bool,
    pub scoring_in_flight: bool,
    pub help_overlay: bool,
    pub generations: Generations,
    pub stored: StoredSession,
    pub stored_dirty: bool,
    pub receipts: HashMap<NaiveDate, Receipt>,
    pub receipts_stale: bool,
    zone: ViewerZone,
    policy: SubmitPolicy,
    commands: VecDeque<ProviderCommand>,
    new_receipts: Vec<Receipt>,
}

impl AppState {
    pub fn new(zone: ViewerZone, policy: SubmitPolicy, stored: StoredSession) -> Self {
        Self {
            screen: Screen::Login,
            login: LoginForm::default(),
            notice: None,
            logs: VecDeque::with_capacity(200),
            session: None,
            selected: 0,
            side: ScoreSide::Home,
            confirm: None,
            prophecy_form: ProphecyForm::default(),
            leaderboard: Vec::new(),
            auth_in_flight: false,
            scoring_in_flight: false,
            help_overlay: false,
            generations: Generations::default(),
            stored,
            stored_dirty: false,
            receipts: HashMap::new(),
            receipts_stale: false,
            zone,
            policy,
            commands: VecDeque::new(),
            new_receipts: Vec::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            text: text.into(),
        });
    }

    fn reject(&mut self, violation: Violation) {
        self.notify(NoticeKind::Error, AppError::from(violation).user_message());
    }

    fn fail(&mut self, what: &str, err: &AppError) {
        warn!("{what} failed: {err}");
        self.push_log(format!("[WARN] {what} failed: {err}"));
        if err.is_fatal() {
            self.logout();
        }
        self.notify(NoticeKind::Error, err.user_message());
    }

    pub fn take_commands(&mut self) -> Vec<ProviderCommand> {
        self.commands.drain(..).collect()
    }

    pub fn take_new_receipts(&mut self) -> Vec<Receipt> {
        std::mem::take(&mut self.new_receipts)
    }

    fn send(&mut self, cmd: ProviderCommand) {
        self.commands.push_back(cmd);
    }

    /// Picks up a credential stored by an earlier run.
    pub fn resume(&mut self) {
        if let Some(token) = self.stored.token.clone() {
            self.start_session(token);
        }
    }

    fn start_session(&mut self, token: String) {
        match auth::decode_identity(&token) {
            Ok(identity) => {
                info!("session started for {}", identity.user_id);
                self.push_log(format!("[INFO] Logged in as {}", identity.name));
                self.session = Some(Session::new(identity, token.clone(), self.zone, self.policy));
                self.stored.token = Some(token);
                self.stored_dirty = true;
                self.screen = Screen::Fixtures;
                self.selected = 0;
                self.login = LoginForm::default();
                self.prophecy_form = ProphecyForm::default();
                let gameweek = self.stored.last_gameweek;
                self.request_fixtures(gameweek);
                self.request_user_data();
                self.request_leaderboard();
            }
            Err(err) => self.fail("Credential decode", &err),
        }
    }

    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!("logging out {}", session.identity.user_id);
        }
        self.stored.token = None;
        self.stored_dirty = true;
        self.screen = Screen::Login;
        self.confirm = None;
        self.leaderboard.clear();
        self.receipts.clear();
        self.selected = 0;
    }

    pub fn welcome(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|s| format!("Welcome, {}!", s.identity.name))
    }

    pub fn request_fixtures(&mut self, gameweek: Option<u32>) {
        self.generations.fixtures += 1;
        let generation = self.generations.fixtures;
        self.send(ProviderCommand::FetchFixtures {
            gameweek,
            generation,
        });
    }

    pub fn request_user_data(&mut self) {
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return;
        };
        self.generations.user_data += 1;
        let generation = self.generations.user_data;
        self.send(ProviderCommand::FetchUserData { token, generation });
    }

    pub fn request_leaderboard(&mut self) {
        self.generations.leaderboard += 1;
        let generation = self.generations.leaderboard;
        self.send(ProviderCommand::FetchLeaderboard { generation });
    }

    pub fn refresh(&mut self) {
        let gameweek = self.session.as_ref().and_then(Session::gameweek);
        self.request_fixtures(gameweek);
        self.request_user_data();
        self.request_leaderboard();
    }

    // ---- login screen ----

    pub fn login_input(&mut self, c: char) {
        let field = self.login.focused();
        self.login.field_mut(field).push(c);
    }

    pub fn login_backspace(&mut self) {
        let field = self.login.focused();
        self.login.field_mut(field).pop();
    }

    pub fn login_next_field(&mut self) {
        let fields = self.login.fields();
        let current = self.login.focused();
        let idx = fields.iter().position(|f| *f == current).unwrap_or(0);
        self.login.focus = Some(fields[(idx + 1) % fields.len()]);
    }

    pub fn login_toggle_mode(&mut self) {
        self.login.register = !self.login.register;
        self.login.focus = None;
        self.notice = None;
    }

    pub fn login_submit(&mut self) {
        if self.auth_in_flight {
            return;
        }
        let form = &self.login;
        if form.email.trim().is_empty()
            || form.password.is_empty()
            || (form.register && form.name.trim().is_empty())
        {
            self.notify(NoticeKind::Error, "Please fill in every field.");
            return;
        }
        let cmd = if form.register {
            ProviderCommand::Register(RegisterRequest {
                name: form.name.trim().to_string(),
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            })
        } else {
            ProviderCommand::Login(LoginRequest {
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            })
        };
        self.auth_in_flight = true;
        self.notice = None;
        self.send(cmd);
    }

    // ---- fixtures screen ----

    pub fn selected_fixture(&self) -> Option<Fixture> {
        let session = self.session.as_ref()?;
        session
            .fixtures_in_order()
            .get(self.selected)
            .map(|f| (*f).clone())
    }

    fn fixture_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.fixtures().len())
            .unwrap_or(0)
    }

    pub fn select_next(&mut self) {
        let len = self.fixture_count();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn clamp_selection(&mut self) {
        let len = self.fixture_count();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn switch_side(&mut self) {
        self.side = self.side.other();
    }

    pub fn push_digit(&mut self, digit: u32, now: DateTime<Utc>) {
        self.edit_selected_score(now, |current| {
            Some(match current {
                Some(v) => v.saturating_mul(10).saturating_add(digit),
                None => digit,
            })
        });
    }

    pub fn pop_digit(&mut self, now: DateTime<Utc>) {
        self.edit_selected_score(now, |current| match current {
            Some(v) if v >= 10 => Some(v / 10),
            _ => None,
        });
    }

    pub fn clear_score(&mut self, now: DateTime<Utc>) {
        self.edit_selected_score(now, |_| None);
    }

    fn edit_selected_score(
        &mut self,
        now: DateTime<Utc>,
        f: impl FnOnce(Option<u32>) -> Option<u32>,
    ) {
        let Some(fixture) = self.selected_fixture() else {
            return;
        };
        let side = self.side;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let current = session.ledger().prediction(&fixture.id).get(side);
        match session.set_score(&fixture.id, side, f(current), now) {
            Ok(()) => {}
            Err(Violation::GraceNotAcknowledged) => {
                self.ask_grace(&fixture, GraceAction::Edit);
            }
            Err(v) => self.reject(v),
        }
    }

    fn ask_grace(&mut self, fixture: &Fixture, action: GraceAction) {
        let Some(date) = self.session.as_ref().and_then(|s| s.day_of(&fixture.id)) else {
            return;
        };
        self.confirm = Some(GraceConfirm { date, action });
        self.notify(
            NoticeKind::Warn,
            format!(
                "The deadline for {} has passed. Late predictions cost {} points. Press y to continue or n to cancel.",
                fixtures::day_label(date),
                GRACE_PENALTY_POINTS.abs()
            ),
        );
    }

    pub fn confirm_grace(&mut self, now: DateTime<Utc>) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };
        if let Some(session) = self.session.as_mut() {
            session.acknowledge_grace(confirm.date);
        }
        self.notice = None;
        if confirm.action == GraceAction::Submit {
            self.submit_day(confirm.date, now);
        }
    }

    pub fn cancel_confirm(&mut self) {
        if self.confirm.take().is_some() {
            self.notice = None;
        }
    }

    pub fn toggle_chip(&mut self, now: DateTime<Utc>) {
        let Some(fixture) = self.selected_fixture() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.toggle_chip(&fixture.id, now) {
            Ok(ChipChange::Assigned) => {
                self.notify(NoticeKind::Info, format!("Joker placed on {}", fixture.label()));
            }
            Ok(ChipChange::Cleared) => {
                self.notify(NoticeKind::Info, format!("Joker removed from {}", fixture.label()));
            }
            Err(Violation::GraceNotAcknowledged) => self.ask_grace(&fixture, GraceAction::Edit),
            Err(v) => self.reject(v),
        }
    }

    pub fn submit_selected(&mut self, now: DateTime<Utc>) {
        let Some(fixture) = self.selected_fixture() else {
            return;
        };
        let Some(date) = self.session.as_ref().and_then(|s| s.day_of(&fixture.id)) else {
            return;
        };
        self.submit_day(date, now);
    }

    fn submit_day(&mut self, date: NaiveDate, now: DateTime<Utc>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(gameweek) = session.gameweek() else {
            return;
        };
        match session.submit_day(date, now) {
            Ok((receipt, request)) => {
                let token = session.token.clone();
                if receipt.chip_spent {
                    self.push_log("[INFO] Joker locked in");
                }
                self.notify(
                    NoticeKind::Info,
                    format!("Submitting {}...", fixtures::day_label(date)),
                );
                self.send(ProviderCommand::SavePredictions {
                    token,
                    date,
                    gameweek,
                    late: receipt.late,
                    request,
                });
            }
            Err(Violation::GraceNotAcknowledged) => {
                self.confirm = Some(GraceConfirm {
                    date,
                    action: GraceAction::Submit,
                });
                self.notify(
                    NoticeKind::Warn,
                    format!(
                        "The deadline for {} has passed. Submitting now costs {} points. Press y to submit or n to cancel.",
                        fixtures::day_label(date),
                        GRACE_PENALTY_POINTS.abs()
                    ),
                );
            }
            Err(v) => self.reject(v),
        }
    }

    pub fn edit_selected(&mut self, now: DateTime<Utc>) {
        let Some(fixture) = self.selected_fixture() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(date) = session.day_of(&fixture.id) else {
            return;
        };
        match session.edit_day(date, now) {
            Ok(()) => self.notify(
                NoticeKind::Info,
                format!("Editing {}", fixtures::day_label(date)),
            ),
            Err(v) => self.reject(v),
        }
    }

    pub fn change_gameweek(&mut self, delta: i64) {
        let Some(current) = self.session.as_ref().and_then(Session::gameweek) else {
            return;
        };
        let target = (i64::from(current) + delta).max(1);
        let Ok(target) = u32::try_from(target) else {
            return;
        };
        if target == current {
            return;
        }
        self.push_log(format!("[INFO] Loading gameweek {target}"));
        self.request_fixtures(Some(target));
    }

    pub fn score_gameweek(&mut self) {
        if self.scoring_in_flight {
            return;
        }
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return;
        };
        self.scoring_in_flight = true;
        self.send(ProviderCommand::ScoreGameweek { token });
    }

    // ---- prophecies screen ----

    pub fn open_prophecies(&mut self) {
        if let Some(session) = self.session.as_ref() {
            if session.prophecies().locked() {
                self.prophecy_form.draft = ProphecyDraft::from_saved(session.prophecies().saved());
            }
        }
        self.screen = Screen::Prophecies;
    }

    pub fn prophecy_next_field(&mut self) {
        self.prophecy_form.step(true);
    }

    pub fn prophecy_prev_field(&mut self) {
        self.prophecy_form.step(false);
    }

    fn prophecies_locked(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.prophecies().locked())
            .unwrap_or(true)
    }

    pub fn prophecy_cycle(&mut self, forward: bool) {
        if self.prophecies_locked() {
            return;
        }
        let teams = self
            .session
            .as_ref()
            .map(Session::team_names)
            .unwrap_or_default();
        let players: Vec<String> = GOLDEN_BOOT_CHOICES.iter().map(|s| s.to_string()).collect();
        let field = self.prophecy_form.focused();
        let draft = &mut self.prophecy_form.draft;
        match field {
            ProphecyField::Winner => draft.winner = cycle_choice(&draft.winner, &teams, forward),
            ProphecyField::Relegation(i) => {
                draft.relegation[i] = cycle_choice(&draft.relegation[i], &teams, forward)
            }
            ProphecyField::GoldenBoot => {
                draft.golden_boot = cycle_choice(&draft.golden_boot, &players, forward)
            }
            ProphecyField::GoldenBootOther | ProphecyField::FirstSacking => {}
        }
    }

    pub fn prophecy_input(&mut self, c: char) {
        if self.prophecies_locked() {
            return;
        }
        let field = self.prophecy_form.focused();
        if let Some(text) = self.prophecy_form.text_mut(field) {
            text.push(c);
        }
    }

    pub fn prophecy_backspace(&mut self) {
        if self.prophecies_locked() {
            return;
        }
        let field = self.prophecy_form.focused();
        if let Some(text) = self.prophecy_form.text_mut(field) {
            text.pop();
        }
    }

    pub fn prophecy_submit(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.save_prophecies(&self.prophecy_form.draft) {
            Ok(prophecies) => {
                let token = session.token.clone();
                self.notify(NoticeKind::Info, "Saving prophecies...");
                self.send(ProviderCommand::SaveProphecies { token, prophecies });
            }
            Err(v) => self.reject(v),
        }
    }
}

/// Next (or previous) entry after `current`; an unknown or empty value starts at the ends.
pub fn cycle_choice(current: &str, choices: &[String], forward: bool) -> String {
    if choices.is_empty() {
        return current.to_string();
    }
    let len = choices.len();
    let next = match choices.iter().position(|c| c == current) {
        Some(idx) if forward => (idx + 1) % len,
        Some(idx) => (idx + len - 1) % len,
        None if forward => 0,
        None => len - 1,
    };
    choices[next].clone()
}

pub fn apply_delta(state: &mut AppState, delta: Delta, now: DateTime<Utc>) {
    match delta {
        Delta::Registered(result) => {
            state.auth_in_flight = false;
            match result {
                Ok(message) => {
                    state.login.register = false;
                    state.login.focus = None;
                    state.login.password.clear();
                    state.notify(NoticeKind::Info, format!("{message} Please log in."));
                }
                Err(err) => state.fail("Registration", &err),
            }
        }
        Delta::LoggedIn(result) => {
            state.auth_in_flight = false;
            match result {
                Ok(token) => {
                    state.notice = None;
                    state.start_session(token);
                }
                Err(err) => state.fail("Login", &err),
            }
        }
        Delta::Fixtures { generation, result } => {
            if generation != state.generations.fixtures {
                debug!("dropping stale fixtures response {generation}");
                return;
            }
            let Some(session) = state.session.as_mut() else {
                return;
            };
            match result {
                Ok(list) => {
                    let gameweek = list.gameweek;
                    session.load_gameweek(list, now);
                    state.stored.last_gameweek = Some(gameweek);
                    state.stored_dirty = true;
                    state.receipts.clear();
                    state.receipts_stale = true;
                    state.confirm = None;
                    state.clamp_selection();
                    state.push_log(format!("[INFO] Gameweek {gameweek} loaded"));
                }
                Err(err) => state.fail("Fixtures fetch", &err),
            }
        }
        Delta::UserData { generation, result } => {
            if generation != state.generations.user_data {
                debug!("dropping stale user data response {generation}");
                return;
            }
            let Some(session) = state.session.as_mut() else {
                return;
            };
            match result {
                Ok(data) => {
                    session.apply_user_data(data);
                    if session.prophecies().locked() {
                        state.prophecy_form.draft =
                            ProphecyDraft::from_saved(session.prophecies().saved());
                    }
                }
                Err(err) => {
                    // Without the player's own data nothing on screen can be trusted.
                    state.fail("User data load", &err);
                    state.logout();
                }
            }
        }
        Delta::PredictionsSaved {
            date,
            gameweek,
            late,
            joker_fixture_id,
            result,
        } => {
            let Some(session) = state.session.as_mut() else {
                return;
            };
            match result {
                Ok(ack) => {
                    session.save_confirmed(date);
                    let receipt = Receipt {
                        user_id: session.identity.user_id.clone(),
                        gameweek,
                        day: date,
                        submitted_at: ack.submitted_at.unwrap_or(now),
                        late,
                        joker_fixture_id,
                    };
                    let mut text =
                        format!("Predictions for {} submitted.", fixtures::day_label(date));
                    if late {
                        text.push_str(&format!(
                            " Submitted late: {GRACE_PENALTY_POINTS} points."
                        ));
                    }
                    if session.gameweek() == Some(gameweek) {
                        state.receipts.insert(date, receipt.clone());
                    }
                    state.new_receipts.push(receipt);
                    state.notify(
                        if late { NoticeKind::Warn } else { NoticeKind::Info },
                        text,
                    );
                }
                Err(err) => {
                    session.submission_settled(date);
                    state.fail("Predictions save", &err);
                    // Roll local state back to whatever the backend holds.
                    state.request_user_data();
                }
            }
        }
        Delta::PropheciesSaved { prophecies, result } => {
            let Some(session) = state.session.as_mut() else {
                return;
            };
            match result {
                Ok(()) => {
                    session.prophecies_saved(prophecies);
                    state.prophecy_form.draft =
                        ProphecyDraft::from_saved(session.prophecies().saved());
                    state.notify(NoticeKind::Info, "Prophecies locked in for the season.");
                }
                Err(err) => {
                    session.prophecies_failed();
                    state.fail("Prophecies save", &err);
                }
            }
        }
        Delta::GameweekScored(result) => {
            state.scoring_in_flight = false;
            match result {
                Ok(message) => {
                    state.notify(NoticeKind::Info, message);
                    state.refresh();
                }
                Err(err) => state.fail("Scoring", &err),
            }
        }
        Delta::Leaderboard { generation, result } => {
            if generation != state.generations.leaderboard {
                return;
            }
            match result {
                Ok(rows) => state.leaderboard = rows,
                Err(err) => state.fail("Leaderboard fetch", &err),
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
