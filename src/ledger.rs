use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chip::ChipController;
use crate::error::Violation;
use crate::fixtures::DayGroup;
use crate::window::{is_editable, WindowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSide {
    Home,
    Away,
}

impl ScoreSide {
    pub fn other(self) -> Self {
        match self {
            ScoreSide::Home => ScoreSide::Away,
            ScoreSide::Away => ScoreSide::Home,
        }
    }
}

/// A predicted score. `None` on a side means the player has not filled it in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prediction {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl Prediction {
    pub fn get(&self, side: ScoreSide) -> Option<u32> {
        match side {
            ScoreSide::Home => self.home,
            ScoreSide::Away => self.away,
        }
    }

    fn set(&mut self, side: ScoreSide, value: Option<u32>) {
        match side {
            ScoreSide::Home => self.home = value,
            ScoreSide::Away => self.away = value,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.home.is_some() && self.away.is_some()
    }
}

/// Wire shape of one prediction, both when loaded and when saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub fixture_id: String,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

/// Whether a day may be submitted with blank scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPolicy {
    #[default]
    RequireComplete,
    AllowPartial,
}

impl FromStr for SubmitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" | "require_complete" | "strict" => Ok(SubmitPolicy::RequireComplete),
            "partial" | "allow_partial" | "lenient" => Ok(SubmitPolicy::AllowPartial),
            other => Err(format!("unknown submit policy: {other}")),
        }
    }
}

/// What an accepted submit produced: the payload to send and its side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub date: NaiveDate,
    pub predictions: Vec<PredictionRecord>,
    pub joker_fixture_id: Option<String>,
    pub chip_spent: bool,
    pub late: bool,
    pub penalty: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionLedger {
    predictions: HashMap<String, Prediction>,
    submitted: HashSet<NaiveDate>,
    policy: SubmitPolicy,
}

impl PredictionLedger {
    pub fn new(policy: SubmitPolicy) -> Self {
        Self {
            predictions: HashMap::new(),
            submitted: HashSet::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.policy
    }

    /// Creates an empty entry for every fixture not seen before.
    pub fn track(&mut self, groups: &[DayGroup]) {
        for group in groups {
            for id in group.fixture_ids() {
                self.predictions.entry(id.to_string()).or_default();
            }
        }
    }

    /// Overlays previously saved predictions. Days whose every fixture came back complete are
    /// treated as already submitted.
    pub fn merge_persisted(&mut self, groups: &[DayGroup], records: &[PredictionRecord]) {
        self.track(groups);
        for record in records {
            if let Some(entry) = self.predictions.get_mut(&record.fixture_id) {
                entry.home = record.home_score;
                entry.away = record.away_score;
            }
        }
        for group in groups {
            let all_saved = !group.fixtures.is_empty()
                && group.fixtures.iter().all(|f| {
                    records.iter().any(|r| {
                        r.fixture_id == f.id && r.home_score.is_some() && r.away_score.is_some()
                    })
                });
            if all_saved {
                self.submitted.insert(group.date);
            }
        }
    }

    /// Marks a day the backend is known to hold as submitted.
    pub fn mark_submitted(&mut self, date: NaiveDate) {
        self.submitted.insert(date);
    }

    pub fn prediction(&self, fixture_id: &str) -> Prediction {
        self.predictions.get(fixture_id).copied().unwrap_or_default()
    }

    pub fn is_submitted(&self, date: NaiveDate) -> bool {
        self.submitted.contains(&date)
    }

    pub fn set_score(
        &mut self,
        group: &DayGroup,
        state: WindowState,
        fixture_id: &str,
        side: ScoreSide,
        value: Option<u32>,
    ) -> Result<(), Violation> {
        if !group.contains(fixture_id) {
            return Err(Violation::UnknownFixture(fixture_id.to_string()));
        }
        self.ensure_editable(group, state)?;
        self.predictions
            .entry(fixture_id.to_string())
            .or_default()
            .set(side, value);
        Ok(())
    }

    pub fn submit(
        &mut self,
        group: &DayGroup,
        state: WindowState,
        chip: &mut ChipController,
    ) -> Result<SubmitReceipt, Violation> {
        if state == WindowState::Locked {
            return Err(Violation::WindowClosed(group.label()));
        }
        if self.policy == SubmitPolicy::RequireComplete
            && group
                .fixture_ids()
                .any(|id| !self.prediction(id).is_complete())
        {
            return Err(Violation::IncompletePredictions(group.label()));
        }

        self.submitted.insert(group.date);
        let chip_spent = chip.on_submit_day_group(group.fixture_ids());
        Ok(SubmitReceipt {
            date: group.date,
            predictions: self.records_for(group),
            joker_fixture_id: chip.assigned().map(str::to_string),
            chip_spent,
            late: state == WindowState::Grace,
            penalty: state.submission_penalty(),
        })
    }

    /// Reopens a submitted day for changes while time still allows.
    pub fn edit(&mut self, group: &DayGroup, state: WindowState) -> Result<(), Violation> {
        if state == WindowState::Locked {
            return Err(Violation::WindowClosed(group.label()));
        }
        self.submitted.remove(&group.date);
        Ok(())
    }

    pub fn records_for(&self, group: &DayGroup) -> Vec<PredictionRecord> {
        group
            .fixture_ids()
            .map(|id| {
                let p = self.prediction(id);
                PredictionRecord {
                    fixture_id: id.to_string(),
                    home_score: p.home,
                    away_score: p.away,
                }
            })
            .collect()
    }

    fn ensure_editable(&self, group: &DayGroup, state: WindowState) -> Result<(), Violation> {
        let submitted = self.is_submitted(group.date);
        if is_editable(state, submitted) {
            return Ok(());
        }
        if submitted {
            Err(Violation::AlreadySubmitted(group.label()))
        } else {
            Err(Violation::WindowClosed(group.label()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Deadlines;
    use crate::fixtures::Fixture;
    use chrono::{Duration, TimeZone, Utc};

    fn group(ids: &[&str]) -> DayGroup {
        let kickoff = Utc.with_ymd_and_hms(2025, 8, 16, 14, 0, 0).unwrap();
        DayGroup {
            date: kickoff.date_naive(),
            fixtures: ids
                .iter()
                .map(|id| Fixture {
                    id: id.to_string(),
                    home_team: "H".into(),
                    away_team: "A".into(),
                    kickoff_time: kickoff,
                    home_score: None,
                    away_score: None,
                    is_derby: false,
                })
                .collect(),
            deadlines: Deadlines {
                deadline: kickoff - Duration::hours(1),
                grace_end: kickoff,
            },
        }
    }

    #[test]
    fn complete_policy_blocks_blank_scores() {
        let g = group(&["a", "b"]);
        let mut ledger = PredictionLedger::new(SubmitPolicy::RequireComplete);
        let mut chip = ChipController::new();
        ledger.track(std::slice::from_ref(&g));
        ledger
            .set_score(&g, WindowState::Open, "a", ScoreSide::Home, Some(2))
            .unwrap();
        ledger
            .set_score(&g, WindowState::Open, "a", ScoreSide::Away, Some(1))
            .unwrap();
        assert!(matches!(
            ledger.submit(&g, WindowState::Open, &mut chip),
            Err(Violation::IncompletePredictions(_))
        ));

        let mut lenient = PredictionLedger::new(SubmitPolicy::AllowPartial);
        let receipt = lenient.submit(&g, WindowState::Open, &mut chip).unwrap();
        assert_eq!(receipt.predictions.len(), 2);
        assert_eq!(receipt.predictions[0].home_score, None);
    }

    #[test]
    fn submitted_day_is_frozen_until_edit() {
        let g = group(&["a"]);
        let mut ledger = PredictionLedger::new(SubmitPolicy::AllowPartial);
        let mut chip = ChipController::new();
        ledger.submit(&g, WindowState::Open, &mut chip).unwrap();
        assert!(matches!(
            ledger.set_score(&g, WindowState::Open, "a", ScoreSide::Home, Some(1)),
            Err(Violation::AlreadySubmitted(_))
        ));
        ledger.edit(&g, WindowState::Open).unwrap();
        assert!(!ledger.is_submitted(g.date));
        ledger
            .set_score(&g, WindowState::Open, "a", ScoreSide::Home, Some(1))
            .unwrap();
        assert_eq!(ledger.prediction("a").home, Some(1));
    }

    #[test]
    fn grace_submission_carries_penalty() {
        let g = group(&["a"]);
        let mut ledger = PredictionLedger::new(SubmitPolicy::AllowPartial);
        let mut chip = ChipController::new();
        let receipt = ledger.submit(&g, WindowState::Grace, &mut chip).unwrap();
        assert!(receipt.late);
        assert_eq!(receipt.penalty, -3);
        assert!(matches!(
            ledger.edit(&g, WindowState::Locked),
            Err(Violation::WindowClosed(_))
        ));
    }

    #[test]
    fn locked_window_rejects_everything() {
        let g = group(&["a"]);
        let mut ledger = PredictionLedger::new(SubmitPolicy::AllowPartial);
        let mut chip = ChipController::new();
        assert!(matches!(
            ledger.set_score(&g, WindowState::Locked, "a", ScoreSide::Away, Some(0)),
            Err(Violation::WindowClosed(_))
        ));
        assert!(ledger.submit(&g, WindowState::Locked, &mut chip).is_err());
        assert!(matches!(
            ledger.set_score(&g, WindowState::Open, "zzz", ScoreSide::Away, Some(0)),
            Err(Violation::UnknownFixture(_))
        ));
    }

    #[test]
    fn persisted_values_fill_and_mark_complete_days() {
        let g = group(&["a", "b"]);
        let mut ledger = PredictionLedger::new(SubmitPolicy::RequireComplete);
        let records = vec![
            PredictionRecord {
                fixture_id: "a".into(),
                home_score: Some(3),
                away_score: Some(0),
            },
            PredictionRecord {
                fixture_id: "b".into(),
                home_score: Some(1),
                away_score: Some(1),
            },
            PredictionRecord {
                fixture_id: "other-week".into(),
                home_score: Some(9),
                away_score: Some(9),
            },
        ];
        ledger.merge_persisted(std::slice::from_ref(&g), &records);
        assert_eq!(ledger.prediction("a").home, Some(3));
        assert!(ledger.is_submitted(g.date));
        assert_eq!(ledger.prediction("other-week"), Prediction::default());
    }

    #[test]
    fn policy_parses_from_config_text() {
        assert_eq!("partial".parse(), Ok(SubmitPolicy::AllowPartial));
        assert_eq!(" Complete ".parse(), Ok(SubmitPolicy::RequireComplete));
        assert!("sometimes".parse::<SubmitPolicy>().is_err());
    }
}
