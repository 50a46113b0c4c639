use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use log::{debug, info};

use crate::api::{FixtureList, SavePredictionsRequest, UserData};
use crate::auth::Identity;
use crate::chip::{ChipChange, ChipController};
use crate::error::Violation;
use crate::fixtures::{self, DayGroup, Fixture};
use crate::ledger::{
    PredictionLedger, PredictionRecord, ScoreSide, SubmitPolicy, SubmitReceipt,
};
use crate::prophecy::{Prophecies, ProphecyDraft, ProphecyLock};
use crate::window::{self, WindowLatch, WindowState};

/// Zone the viewer reads dates in. Grouping and "today" both follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerZone {
    Local,
    Fixed(FixedOffset),
}

impl ViewerZone {
    pub fn group(&self, fixtures: &[Fixture], now: DateTime<Utc>) -> Vec<DayGroup> {
        match self {
            ViewerZone::Local => fixtures::group_fixtures(fixtures, &Local, now),
            ViewerZone::Fixed(tz) => fixtures::group_fixtures(fixtures, tz, now),
        }
    }

    pub fn refresh(&self, groups: &mut [DayGroup], now: DateTime<Utc>) {
        match self {
            ViewerZone::Local => fixtures::refresh_deadlines(groups, &Local, now),
            ViewerZone::Fixed(tz) => fixtures::refresh_deadlines(groups, tz, now),
        }
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            ViewerZone::Local => fixtures::local_date(instant, &Local),
            ViewerZone::Fixed(tz) => fixtures::local_date(instant, tz),
        }
    }

    pub fn format(&self, instant: DateTime<Utc>, fmt: &str) -> String {
        match self {
            ViewerZone::Local => instant.with_timezone(&Local).format(fmt).to_string(),
            ViewerZone::Fixed(tz) => instant.with_timezone(tz).format(fmt).to_string(),
        }
    }
}

/// Everything one evaluation pass knows about a match day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub date: NaiveDate,
    pub label: String,
    pub state: WindowState,
    pub submitted: bool,
    pub editable: bool,
    pub deadline: DateTime<Utc>,
    pub grace_end: DateTime<Utc>,
    pub countdown: String,
}

/// A player's view of one gameweek plus their season-long chip and prophecies.
///
/// All mutations go through these methods and every time-sensitive call takes the `now` of the
/// current pass, so grouping, deadlines and locking never disagree about the clock.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
    zone: ViewerZone,
    policy: SubmitPolicy,
    gameweek: Option<u32>,
    fixtures: Vec<Fixture>,
    groups: Vec<DayGroup>,
    deadlines_day: Option<NaiveDate>,
    latch: WindowLatch,
    persisted: Vec<PredictionRecord>,
    ledger: PredictionLedger,
    chip: ChipController,
    prophecies: ProphecyLock,
    grace_acknowledged: HashSet<NaiveDate>,
    save_in_flight: Option<NaiveDate>,
    pending_save: Vec<PredictionRecord>,
    confirmed_days: HashSet<NaiveDate>,
    user_data_loaded: bool,
}

impl Session {
    pub fn new(identity: Identity, token: String, zone: ViewerZone, policy: SubmitPolicy) -> Self {
        Self {
            identity,
            token,
            zone,
            policy,
            gameweek: None,
            fixtures: Vec::new(),
            groups: Vec::new(),
            deadlines_day: None,
            latch: WindowLatch::new(),
            persisted: Vec::new(),
            ledger: PredictionLedger::new(policy),
            chip: ChipController::new(),
            prophecies: ProphecyLock::new(),
            grace_acknowledged: HashSet::new(),
            save_in_flight: None,
            pending_save: Vec::new(),
            confirmed_days: HashSet::new(),
            user_data_loaded: false,
        }
    }

    pub fn zone(&self) -> ViewerZone {
        self.zone
    }

    pub fn gameweek(&self) -> Option<u32> {
        self.gameweek
    }

    pub fn groups(&self) -> &[DayGroup] {
        &self.groups
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn ledger(&self) -> &PredictionLedger {
        &self.ledger
    }

    pub fn chip(&self) -> &ChipController {
        &self.chip
    }

    pub fn prophecies(&self) -> &ProphecyLock {
        &self.prophecies
    }

    pub fn user_data_loaded(&self) -> bool {
        self.user_data_loaded
    }

    pub fn save_in_flight(&self) -> Option<NaiveDate> {
        self.save_in_flight
    }

    /// Fixtures in display order: day by day, kickoff order within a day.
    pub fn fixtures_in_order(&self) -> Vec<&Fixture> {
        self.groups.iter().flat_map(|g| g.fixtures.iter()).collect()
    }

    pub fn load_gameweek(&mut self, list: FixtureList, now: DateTime<Utc>) {
        info!(
            "loaded gameweek {} with {} fixtures",
            list.gameweek,
            list.fixtures.len()
        );
        self.gameweek = Some(list.gameweek);
        self.fixtures = list.fixtures;
        self.groups = self.zone.group(&self.fixtures, now);
        self.deadlines_day = Some(self.zone.date_of(now));
        self.latch.clear();
        self.grace_acknowledged.clear();
        self.rebuild_ledger();
    }

    pub fn apply_user_data(&mut self, data: UserData) {
        debug!(
            "user data: {} predictions, joker used: {}",
            data.predictions.len(),
            data.chips.joker_used_in_season
        );
        self.persisted = data.predictions;
        self.chip = ChipController::from_snapshot(data.chips);
        self.prophecies = ProphecyLock::from_saved(data.prophecies.unwrap_or_default());
        self.user_data_loaded = true;
        self.rebuild_ledger();
    }

    fn rebuild_ledger(&mut self) {
        let mut ledger = PredictionLedger::new(self.policy);
        ledger.merge_persisted(&self.groups, &self.persisted);
        for group in &self.groups {
            if self.confirmed_days.contains(&group.date) {
                ledger.mark_submitted(group.date);
            }
        }
        self.ledger = ledger;
    }

    /// Recomputes deadlines once the viewer's date has moved on since they were last computed.
    fn sync_clock(&mut self, now: DateTime<Utc>) {
        let today = self.zone.date_of(now);
        if self.deadlines_day != Some(today) {
            debug!("date rolled over to {today}, recomputing deadlines");
            self.zone.refresh(&mut self.groups, now);
            self.deadlines_day = Some(today);
        }
    }

    fn group_index(&self, date: NaiveDate) -> Result<usize, Violation> {
        self.groups
            .iter()
            .position(|g| g.date == date)
            .ok_or_else(|| Violation::UnknownDay(date.to_string()))
    }

    fn group_of(&self, fixture_id: &str) -> Result<usize, Violation> {
        self.groups
            .iter()
            .position(|g| g.contains(fixture_id))
            .ok_or_else(|| Violation::UnknownFixture(fixture_id.to_string()))
    }

    fn state_at(&mut self, idx: usize, now: DateTime<Utc>) -> WindowState {
        self.sync_clock(now);
        let group = &self.groups[idx];
        let computed = WindowState::at(&group.deadlines, now);
        self.latch.observe(group.date, computed)
    }

    pub fn day_state(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<WindowState, Violation> {
        let idx = self.group_index(date)?;
        Ok(self.state_at(idx, now))
    }

    pub fn day_of(&self, fixture_id: &str) -> Option<NaiveDate> {
        self.group_of(fixture_id).ok().map(|idx| self.groups[idx].date)
    }

    /// One pass over every day with a single clock reading.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<DayView> {
        (0..self.groups.len())
            .map(|idx| {
                let state = self.state_at(idx, now);
                let group = &self.groups[idx];
                let submitted = self.ledger.is_submitted(group.date);
                DayView {
                    date: group.date,
                    label: group.label(),
                    state,
                    submitted,
                    editable: window::is_editable(state, submitted),
                    deadline: group.deadlines.deadline,
                    grace_end: group.deadlines.grace_end,
                    countdown: window::countdown(&group.deadlines, now),
                }
            })
            .collect()
    }

    pub fn is_fixture_editable(&mut self, fixture_id: &str, now: DateTime<Utc>) -> bool {
        let Ok(idx) = self.group_of(fixture_id) else {
            return false;
        };
        let state = self.state_at(idx, now);
        window::is_editable(state, self.ledger.is_submitted(self.groups[idx].date))
    }

    pub fn needs_grace_ack(&mut self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        matches!(self.day_state(date, now), Ok(WindowState::Grace))
            && !self.grace_acknowledged.contains(&date)
    }

    /// Records that the player saw the late-submission warning for this day.
    pub fn acknowledge_grace(&mut self, date: NaiveDate) {
        self.grace_acknowledged.insert(date);
    }

    pub fn set_score(
        &mut self,
        fixture_id: &str,
        side: ScoreSide,
        value: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(), Violation> {
        let idx = self.group_of(fixture_id)?;
        let state = self.state_at(idx, now);
        let date = self.groups[idx].date;
        if state == WindowState::Grace
            && !self.ledger.is_submitted(date)
            && !self.grace_acknowledged.contains(&date)
        {
            return Err(Violation::GraceNotAcknowledged);
        }
        self.ledger
            .set_score(&self.groups[idx], state, fixture_id, side, value)
    }

    pub fn chip_button_enabled(&mut self, fixture_id: &str, now: DateTime<Utc>) -> bool {
        let editable = self.is_fixture_editable(fixture_id, now);
        self.chip.button_enabled(fixture_id, editable)
    }

    pub fn toggle_chip(
        &mut self,
        fixture_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChipChange, Violation> {
        if self.chip.used_in_season() {
            return Err(Violation::ChipSpent);
        }
        let idx = self.group_of(fixture_id)?;
        let state = self.state_at(idx, now);
        let group = &self.groups[idx];
        if state == WindowState::Locked {
            return Err(Violation::WindowClosed(group.label()));
        }
        if self.ledger.is_submitted(group.date) {
            return Err(Violation::AlreadySubmitted(group.label()));
        }
        if state == WindowState::Grace && !self.grace_acknowledged.contains(&group.date) {
            return Err(Violation::GraceNotAcknowledged);
        }
        self.chip.toggle(fixture_id)
    }

    /// Accepts a day's predictions and returns the request to send. The day stays frozen and the
    /// chip stays spent unless a reload after a failed save says otherwise.
    pub fn submit_day(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(SubmitReceipt, SavePredictionsRequest), Violation> {
        if self.save_in_flight.is_some() {
            return Err(Violation::SaveInFlight);
        }
        let idx = self.group_index(date)?;
        let state = self.state_at(idx, now);
        if self.ledger.is_submitted(date) {
            return Err(Violation::AlreadySubmitted(self.groups[idx].label()));
        }
        if state == WindowState::Grace && !self.grace_acknowledged.contains(&date) {
            return Err(Violation::GraceNotAcknowledged);
        }
        let receipt = self.ledger.submit(&self.groups[idx], state, &mut self.chip)?;
        if receipt.chip_spent {
            info!("joker spent on {date}");
        }
        self.save_in_flight = Some(date);
        self.pending_save = receipt.predictions.clone();
        let request = SavePredictionsRequest {
            predictions: receipt.predictions.clone(),
            joker_fixture_id: receipt.joker_fixture_id.clone(),
        };
        Ok((receipt, request))
    }

    /// Clears the in-flight guard without recording anything as saved.
    pub fn submission_settled(&mut self, date: NaiveDate) {
        if self.save_in_flight == Some(date) {
            self.save_in_flight = None;
            self.pending_save.clear();
        }
    }

    /// The backend accepted the day. Its predictions replace the loaded copy so that reloading
    /// this gameweek later shows the day as submitted.
    pub fn save_confirmed(&mut self, date: NaiveDate) {
        if self.save_in_flight != Some(date) {
            return;
        }
        let saved = std::mem::take(&mut self.pending_save);
        self.persisted
            .retain(|old| !saved.iter().any(|new| new.fixture_id == old.fixture_id));
        self.persisted.extend(saved);
        self.confirmed_days.insert(date);
        self.save_in_flight = None;
    }

    pub fn edit_day(&mut self, date: NaiveDate, now: DateTime<Utc>) -> Result<(), Violation> {
        if self.save_in_flight == Some(date) {
            return Err(Violation::SaveInFlight);
        }
        let idx = self.group_index(date)?;
        let state = self.state_at(idx, now);
        self.ledger.edit(&self.groups[idx], state)
    }

    pub fn save_prophecies(&mut self, draft: &ProphecyDraft) -> Result<Prophecies, Violation> {
        self.prophecies.save(draft)
    }

    pub fn prophecies_saved(&mut self, saved: Prophecies) {
        self.prophecies.confirm(saved);
    }

    pub fn prophecies_failed(&mut self) {
        self.prophecies.abort();
    }

    /// Team names seen this gameweek, for prophecy pickers.
    pub fn team_names(&self) -> Vec<String> {
        let mut teams: Vec<String> = self
            .fixtures
            .iter()
            .flat_map(|f| [f.home_team.clone(), f.away_team.clone()])
            .collect();
        teams.sort();
        teams.dedup();
        teams
    }
}
