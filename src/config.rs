use std::env;
use std::time::Duration;

use log::warn;

use crate::ledger::SubmitPolicy;

pub const DEFAULT_BACKEND_URL: &str = "https://predictions-backend-api.onrender.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Demo,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend: BackendKind,
    pub submit_policy: SubmitPolicy,
    pub request_timeout: Duration,
    pub leaderboard_refresh: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend: BackendKind::Http,
            submit_policy: SubmitPolicy::RequireComplete,
            request_timeout: Duration::from_secs(10),
            leaderboard_refresh: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Reads `PREDICTOR_*` variables. Unknown values fall back to defaults with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend_url = env::var("PREDICTOR_BACKEND_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.backend_url);

        let backend = match env::var("PREDICTOR_BACKEND")
            .unwrap_or_else(|_| "http".to_string())
            .to_lowercase()
            .as_str()
        {
            "demo" | "offline" => BackendKind::Demo,
            "http" | "" => BackendKind::Http,
            other => {
                warn!("unknown PREDICTOR_BACKEND {other:?}, using http");
                BackendKind::Http
            }
        };

        let submit_policy = match env::var("PREDICTOR_SUBMIT_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                warn!("{err}, requiring complete predictions");
                SubmitPolicy::RequireComplete
            }),
            Err(_) => defaults.submit_policy,
        };

        let request_timeout = env::var("PREDICTOR_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(10)
            .max(2);
        let leaderboard_refresh = env::var("PREDICTOR_LEADERBOARD_POLL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(60)
            .max(10);

        Self {
            backend_url,
            backend,
            submit_policy,
            request_timeout: Duration::from_secs(request_timeout),
            leaderboard_refresh: Duration::from_secs(leaderboard_refresh),
        }
    }
}
