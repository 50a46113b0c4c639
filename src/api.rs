use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use once_cell::sync::OnceCell;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::{LoginRequest, RegisterRequest};
use crate::chip::ChipSnapshot;
use crate::error::AppError;
use crate::fixtures::Fixture;
use crate::ledger::PredictionRecord;
use crate::prophecy::Prophecies;

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const FIXTURES_PATH: &str = "/api/fixtures";
const USER_DATA_PATH: &str = "/api/user/data";
const PREDICTIONS_PATH: &str = "/api/predictions";
const PROPHECIES_PATH: &str = "/api/prophecies";
const SCORE_PATH: &str = "/api/gameweek/score";
const LEADERBOARD_PATH: &str = "/api/leaderboard";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureList {
    pub gameweek: u32,
    pub fixtures: Vec<Fixture>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub predictions: Vec<PredictionRecord>,
    #[serde(default)]
    pub prophecies: Option<Prophecies>,
    #[serde(default)]
    pub chips: ChipSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePredictionsRequest {
    pub predictions: Vec<PredictionRecord>,
    pub joker_fixture_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub score: i64,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Everything the application asks of the league backend.
pub trait Backend: Send {
    /// Returns the server's confirmation text.
    fn register(&self, req: &RegisterRequest) -> Result<String, AppError>;
    /// Returns the bearer credential.
    fn login(&self, req: &LoginRequest) -> Result<String, AppError>;
    fn fetch_fixtures(&self, gameweek: Option<u32>) -> Result<FixtureList, AppError>;
    fn user_data(&self, token: &str) -> Result<UserData, AppError>;
    fn save_predictions(
        &self,
        token: &str,
        req: &SavePredictionsRequest,
    ) -> Result<SaveAck, AppError>;
    fn save_prophecies(&self, token: &str, prophecies: &Prophecies) -> Result<(), AppError>;
    fn score_gameweek(&self, token: &str) -> Result<String, AppError>;
    fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, AppError>;
}

pub struct HttpBackend {
    client: &'static Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, req: RequestBuilder) -> Result<String, AppError> {
        let resp = req
            .header(USER_AGENT, "predictor-terminal")
            .send()
            .context("request failed")
            .map_err(|err| AppError::transport(&err))?;
        let status = resp.status();
        let body = resp
            .text()
            .context("failed reading body")
            .map_err(|err| AppError::transport(&err))?;
        if !status.is_success() {
            warn!("backend answered {status}");
            let message = serde_json::from_str::<MessageBody>(&body)
                .ok()
                .and_then(|b| b.message);
            return Err(AppError::Transport {
                detail: format!("http {status}"),
                message,
            });
        }
        Ok(body)
    }

    fn authed(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Bearer {token}"))
    }
}

impl Backend for HttpBackend {
    fn register(&self, req: &RegisterRequest) -> Result<String, AppError> {
        let body = self.send(self.client.post(self.url(REGISTER_PATH)).json(req))?;
        Ok(parse_message(&body).unwrap_or_else(|| "Registration successful.".to_string()))
    }

    fn login(&self, req: &LoginRequest) -> Result<String, AppError> {
        let body = self.send(self.client.post(self.url(LOGIN_PATH)).json(req))?;
        let parsed: MessageBody = decode(&body, "invalid login json")?;
        parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Transport {
                detail: "login response without token".to_string(),
                message: parsed.message,
            })
    }

    fn fetch_fixtures(&self, gameweek: Option<u32>) -> Result<FixtureList, AppError> {
        let url = match gameweek {
            Some(gw) => format!("{}?gameweek={gw}", self.url(FIXTURES_PATH)),
            None => self.url(FIXTURES_PATH),
        };
        debug!("fetching fixtures from {url}");
        let body = self.send(self.client.get(url))?;
        parse_fixtures_json(&body, gameweek).map_err(|err| AppError::transport(&err))
    }

    fn user_data(&self, token: &str) -> Result<UserData, AppError> {
        let req = self.authed(self.client.get(self.url(USER_DATA_PATH)), token);
        let body = self.send(req)?;
        parse_user_data_json(&body).map_err(|err| AppError::transport(&err))
    }

    fn save_predictions(
        &self,
        token: &str,
        req: &SavePredictionsRequest,
    ) -> Result<SaveAck, AppError> {
        let http = self.authed(self.client.post(self.url(PREDICTIONS_PATH)), token);
        let body = self.send(http.json(req))?;
        if body.trim().is_empty() {
            return Ok(SaveAck { submitted_at: None });
        }
        decode(&body, "invalid save predictions json")
    }

    fn save_prophecies(&self, token: &str, prophecies: &Prophecies) -> Result<(), AppError> {
        #[derive(Serialize)]
        struct Body<'a> {
            prophecies: &'a Prophecies,
        }
        let http = self.authed(self.client.post(self.url(PROPHECIES_PATH)), token);
        self.send(http.json(&Body { prophecies }))?;
        Ok(())
    }

    fn score_gameweek(&self, token: &str) -> Result<String, AppError> {
        let http = self.authed(self.client.post(self.url(SCORE_PATH)), token);
        let body = self.send(http)?;
        Ok(parse_message(&body).unwrap_or_else(|| "Scoring started.".to_string()))
    }

    fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let body = self.send(self.client.get(self.url(LEADERBOARD_PATH)))?;
        parse_leaderboard_json(&body).map_err(|err| AppError::transport(&err))
    }
}

fn decode<T: DeserializeOwned>(body: &str, what: &'static str) -> Result<T, AppError> {
    serde_json::from_str(body)
        .context(what)
        .map_err(|err| AppError::transport(&err))
}

fn parse_message(body: &str) -> Option<String> {
    serde_json::from_str::<MessageBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

/// Accepts `{ "gameweek": n, "fixtures": [...] }` or a bare fixture array.
pub fn parse_fixtures_json(raw: &str, requested: Option<u32>) -> Result<FixtureList> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Wrapped {
            #[serde(default)]
            gameweek: Option<u32>,
            fixtures: Vec<Fixture>,
        },
        Bare(Vec<Fixture>),
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(FixtureList {
            gameweek: requested.unwrap_or(1),
            fixtures: Vec::new(),
        });
    }
    let shape: Shape = serde_json::from_str(trimmed).context("invalid fixtures json")?;
    let (gameweek, mut fixtures) = match shape {
        Shape::Wrapped { gameweek, fixtures } => (gameweek, fixtures),
        Shape::Bare(fixtures) => (None, fixtures),
    };
    fixtures.sort_by_key(|f| f.kickoff_time);
    Ok(FixtureList {
        gameweek: gameweek.or(requested).unwrap_or(1),
        fixtures,
    })
}

pub fn parse_user_data_json(raw: &str) -> Result<UserData> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(UserData::default());
    }
    serde_json::from_str(trimmed).context("invalid user data json")
}

/// Highest score first; ties keep name order so the table does not jitter.
pub fn parse_leaderboard_json(raw: &str) -> Result<Vec<LeaderboardEntry>> {
    let mut rows: Vec<LeaderboardEntry> =
        serde_json::from_str(raw.trim()).context("invalid leaderboard json")?;
    rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    Ok(rows)
}
