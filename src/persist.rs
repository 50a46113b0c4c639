use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "predictor_terminal";
const SESSION_FILE: &str = "session.json";
const SESSION_VERSION: u32 = 1;

/// What survives a restart: the credential and where the player was looking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub version: u32,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub last_gameweek: Option<u32>,
}

pub fn app_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

pub fn session_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join(SESSION_FILE))
}

pub fn load_session() -> StoredSession {
    session_path()
        .and_then(|path| load_session_from(&path))
        .unwrap_or_default()
}

pub fn load_session_from(path: &Path) -> Option<StoredSession> {
    let raw = fs::read_to_string(path).ok()?;
    let session = serde_json::from_str::<StoredSession>(&raw).ok()?;
    if session.version != SESSION_VERSION {
        return None;
    }
    Some(session)
}

pub fn save_session(session: &StoredSession) -> Result<()> {
    let Some(path) = session_path() else {
        return Ok(());
    };
    save_session_to(&path, session)
}

pub fn save_session_to(path: &Path, session: &StoredSession) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let mut session = session.clone();
    session.version = SESSION_VERSION;
    let json = serde_json::to_string(&session).context("serialize session")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).context("write session")?;
    fs::rename(&tmp, path).context("swap session")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("predictor-persist-{}", std::process::id()));
        let path = dir.join(SESSION_FILE);
        let session = StoredSession {
            version: 0,
            token: Some("a.b.c".into()),
            last_gameweek: Some(7),
        };
        save_session_to(&path, &session).unwrap();
        let loaded = load_session_from(&path).unwrap();
        assert_eq!(loaded.version, SESSION_VERSION);
        assert_eq!(loaded.token.as_deref(), Some("a.b.c"));
        assert_eq!(loaded.last_gameweek, Some(7));

        fs::write(&path, r#"{"version":99,"token":"x"}"#).unwrap();
        assert!(load_session_from(&path).is_none());
        let _ = fs::remove_dir_all(dir);
    }
}
