use std::collections::HashMap;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::api::{Backend, FixtureList, LeaderboardEntry, SaveAck, SavePredictionsRequest, UserData};
use crate::auth::{LoginRequest, RegisterRequest};
use crate::chip::ChipSnapshot;
use crate::error::AppError;
use crate::fixtures::Fixture;
use crate::ledger::PredictionRecord;
use crate::prophecy::Prophecies;

pub const DEMO_TEAMS: [&str; 20] = [
    "Arsenal",
    "Aston Villa",
    "Bournemouth",
    "Brentford",
    "Brighton",
    "Burnley",
    "Chelsea",
    "Crystal Palace",
    "Everton",
    "Fulham",
    "Leeds United",
    "Liverpool",
    "Manchester City",
    "Manchester United",
    "Newcastle United",
    "Nottingham Forest",
    "Sunderland",
    "Tottenham Hotspur",
    "West Ham United",
    "Wolves",
];

const LONDON: [&str; 6] = [
    "Arsenal",
    "Brentford",
    "Chelsea",
    "Crystal Palace",
    "Fulham",
    "Tottenham Hotspur",
];

const RIVALS: [(&str, i64); 5] = [
    ("Ada", 41),
    ("Bruno", 37),
    ("Chidi", 33),
    ("Dana", 29),
    ("Eli", 24),
];

#[derive(Debug, Default)]
struct DemoStore {
    users: HashMap<String, String>,
    predictions: HashMap<String, PredictionRecord>,
    prophecies: Option<Prophecies>,
    chips: ChipSnapshot,
    scored_gameweeks: u32,
}

/// Offline league used when no backend is reachable. Gameweek `n` starts `n - 1` weeks after the
/// anchor, with the first kickoff three hours out so every window state shows up quickly.
pub struct DemoBackend {
    anchor: DateTime<Utc>,
    store: Mutex<DemoStore>,
}

impl DemoBackend {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            store: Mutex::new(DemoStore::default()),
        }
    }

    pub fn fixtures_for(&self, gameweek: u32) -> Vec<Fixture> {
        let gameweek = gameweek.max(1);
        let mut rng = StdRng::seed_from_u64(u64::from(gameweek));
        let mut teams = DEMO_TEAMS.to_vec();
        teams.shuffle(&mut rng);

        let start = self.anchor + Duration::hours(3) + Duration::weeks(i64::from(gameweek) - 1);
        let start = start
            .duration_trunc(Duration::minutes(15))
            .unwrap_or(start);

        teams
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| {
                let day = (i / 4) as i64;
                let slot = (i % 4) as i64;
                let home = pair[0];
                let away = pair[1];
                Fixture {
                    id: format!("gw{gameweek}-{i:02}"),
                    home_team: home.to_string(),
                    away_team: away.to_string(),
                    kickoff_time: start + Duration::days(day) + Duration::minutes(150 * slot),
                    home_score: None,
                    away_score: None,
                    is_derby: LONDON.contains(&home) && LONDON.contains(&away),
                }
            })
            .collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DemoStore>, AppError> {
        self.store.lock().map_err(|_| AppError::Transport {
            detail: "demo store poisoned".to_string(),
            message: None,
        })
    }
}

fn demo_token(name: &str) -> String {
    let user_id = name.to_ascii_lowercase().replace(' ', "-");
    let payload = serde_json::json!({ "userId": user_id, "name": name });
    format!(
        "eyJhbGciOiJub25lIn0.{}.ZGVtbw",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

fn rejected(message: &str) -> AppError {
    AppError::Transport {
        detail: "demo backend rejected request".to_string(),
        message: Some(message.to_string()),
    }
}

impl Backend for DemoBackend {
    fn register(&self, req: &RegisterRequest) -> Result<String, AppError> {
        let mut store = self.lock()?;
        if store.users.contains_key(&req.email) {
            return Err(rejected("User already exists."));
        }
        store.users.insert(req.email.clone(), req.name.clone());
        Ok("User registered successfully.".to_string())
    }

    fn login(&self, req: &LoginRequest) -> Result<String, AppError> {
        if req.password.is_empty() {
            return Err(rejected("Invalid credentials."));
        }
        let store = self.lock()?;
        let name = store
            .users
            .get(&req.email)
            .cloned()
            .unwrap_or_else(|| req.email.split('@').next().unwrap_or("Player").to_string());
        Ok(demo_token(&name))
    }

    fn fetch_fixtures(&self, gameweek: Option<u32>) -> Result<FixtureList, AppError> {
        let gameweek = gameweek.unwrap_or(1).max(1);
        Ok(FixtureList {
            gameweek,
            fixtures: self.fixtures_for(gameweek),
        })
    }

    fn user_data(&self, _token: &str) -> Result<UserData, AppError> {
        let store = self.lock()?;
        let mut predictions: Vec<PredictionRecord> = store.predictions.values().cloned().collect();
        predictions.sort_by(|a, b| a.fixture_id.cmp(&b.fixture_id));
        Ok(UserData {
            predictions,
            prophecies: store.prophecies.clone(),
            chips: store.chips.clone(),
        })
    }

    fn save_predictions(
        &self,
        _token: &str,
        req: &SavePredictionsRequest,
    ) -> Result<SaveAck, AppError> {
        let mut store = self.lock()?;
        if store.chips.joker_used_in_season
            && req.joker_fixture_id.is_some()
            && req.joker_fixture_id != store.chips.joker_fixture_id
        {
            return Err(rejected("Joker already used this season."));
        }
        for record in &req.predictions {
            store
                .predictions
                .insert(record.fixture_id.clone(), record.clone());
        }
        if let Some(joker) = req.joker_fixture_id.as_ref() {
            store.chips.joker_fixture_id = Some(joker.clone());
            if req.predictions.iter().any(|p| &p.fixture_id == joker) {
                store.chips.joker_used_in_season = true;
            }
        }
        Ok(SaveAck {
            submitted_at: Some(Utc::now()),
        })
    }

    fn save_prophecies(&self, _token: &str, prophecies: &Prophecies) -> Result<(), AppError> {
        let mut store = self.lock()?;
        if store.prophecies.is_some() {
            return Err(rejected("Prophecies already locked."));
        }
        store.prophecies = Some(prophecies.clone());
        Ok(())
    }

    fn score_gameweek(&self, _token: &str) -> Result<String, AppError> {
        let mut store = self.lock()?;
        store.scored_gameweeks = store.scored_gameweeks.saturating_add(1);
        Ok(format!("Gameweek scored ({} so far).", store.scored_gameweeks))
    }

    fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let store = self.lock()?;
        let mut rng = StdRng::seed_from_u64(u64::from(store.scored_gameweeks));
        let mut rows: Vec<LeaderboardEntry> = RIVALS
            .iter()
            .map(|(name, base)| LeaderboardEntry {
                id: name.to_ascii_lowercase(),
                name: name.to_string(),
                score: base + i64::from(store.scored_gameweeks) * rng.gen_range(0..8),
            })
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::decode_identity;
    use chrono::TimeZone;

    #[test]
    fn gameweeks_are_stable_and_spread_over_days() {
        let anchor = Utc.with_ymd_and_hms(2025, 8, 14, 9, 0, 0).unwrap();
        let demo = DemoBackend::new(anchor);
        let a = demo.fixtures_for(1);
        assert_eq!(a.len(), 10);
        assert_eq!(a, demo.fixtures_for(1));
        assert_eq!(a[0].kickoff_time, anchor + Duration::hours(3));
        assert_eq!(a[4].kickoff_time, anchor + Duration::hours(3) + Duration::days(1));
        let next = demo.fixtures_for(2);
        assert_eq!(next[0].kickoff_time - a[0].kickoff_time, Duration::weeks(1));
    }

    #[test]
    fn login_token_decodes_to_registered_name() {
        let demo = DemoBackend::new(Utc::now());
        demo.register(&RegisterRequest {
            name: "Sam Kerr".into(),
            email: "sam@example.com".into(),
            password: "pw".into(),
        })
        .unwrap();
        let token = demo
            .login(&LoginRequest {
                email: "sam@example.com".into(),
                password: "pw".into(),
            })
            .unwrap();
        let id = decode_identity(&token).unwrap();
        assert_eq!(id.name, "Sam Kerr");
        assert_eq!(id.user_id, "sam-kerr");
    }

    #[test]
    fn prophecies_save_once() {
        let demo = DemoBackend::new(Utc::now());
        demo.save_prophecies("t", &Prophecies::default()).unwrap();
        let err = demo.save_prophecies("t", &Prophecies::default()).unwrap_err();
        assert_eq!(err.user_message(), "Prophecies already locked.");
    }
}
