use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Violation;

pub const GOLDEN_BOOT_OTHER: &str = "Other (Please Specify)";

/// Season prophecies as the backend stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prophecies {
    #[serde(default, deserialize_with = "de_nullable")]
    pub winner: String,
    #[serde(default, deserialize_with = "de_relegation")]
    pub relegation: [String; 3],
    #[serde(default, deserialize_with = "de_nullable")]
    pub golden_boot: String,
    #[serde(default, deserialize_with = "de_nullable")]
    pub first_sacking: String,
}

impl Prophecies {
    pub fn is_empty(&self) -> bool {
        self.winner.is_empty()
            && self.relegation.iter().all(String::is_empty)
            && self.golden_boot.is_empty()
            && self.first_sacking.is_empty()
    }
}

// Backends send nulls and short slot lists before anything is saved.
fn de_nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_relegation<'de, D>(deserializer: D) -> Result<[String; 3], D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    let mut out: [String; 3] = Default::default();
    for (slot, value) in out.iter_mut().zip(raw) {
        *slot = value.unwrap_or_default();
    }
    Ok(out)
}

/// Form state while the player is still choosing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProphecyDraft {
    pub winner: String,
    pub relegation: [String; 3],
    pub golden_boot: String,
    /// Free text used only when `golden_boot` is [`GOLDEN_BOOT_OTHER`].
    pub golden_boot_other: String,
    pub first_sacking: String,
}

impl ProphecyDraft {
    pub fn from_saved(saved: &Prophecies) -> Self {
        Self {
            winner: saved.winner.clone(),
            relegation: saved.relegation.clone(),
            golden_boot: saved.golden_boot.clone(),
            golden_boot_other: String::new(),
            first_sacking: saved.first_sacking.clone(),
        }
    }

    /// The payload the backend receives: the override replaces the sentinel and is then dropped.
    pub fn resolve(&self) -> Result<Prophecies, Violation> {
        let winner = required(&self.winner, "pick a title winner")?;
        let mut relegation: [String; 3] = Default::default();
        for (slot, pick) in relegation.iter_mut().zip(&self.relegation) {
            *slot = required(pick, "pick three relegated teams")?;
        }
        if relegation[0] == relegation[1]
            || relegation[0] == relegation[2]
            || relegation[1] == relegation[2]
        {
            return Err(Violation::DuplicateRelegation);
        }
        let golden_boot = if self.golden_boot == GOLDEN_BOOT_OTHER {
            required(&self.golden_boot_other, "name your golden boot pick")?
        } else {
            required(&self.golden_boot, "pick a golden boot winner")?
        };
        let first_sacking = required(&self.first_sacking, "pick the first manager sacked")?;
        Ok(Prophecies {
            winner,
            relegation,
            golden_boot,
            first_sacking,
        })
    }
}

fn required(value: &str, what: &'static str) -> Result<String, Violation> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Violation::ProphecyIncomplete(what))
    } else {
        Ok(trimmed.to_string())
    }
}

/// One-time lock over a player's season prophecies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProphecyLock {
    saved: Prophecies,
    locked: bool,
    pending: bool,
}

impl ProphecyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anything the backend already holds counts as locked in.
    pub fn from_saved(saved: Prophecies) -> Self {
        let locked = !saved.is_empty();
        Self {
            saved,
            locked,
            pending: false,
        }
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    pub fn saved(&self) -> &Prophecies {
        &self.saved
    }

    /// Validates the draft and hands back the payload to send. The lock closes once the backend
    /// acknowledges through [`ProphecyLock::confirm`].
    pub fn save(&mut self, draft: &ProphecyDraft) -> Result<Prophecies, Violation> {
        if self.locked {
            return Err(Violation::ProphecyLocked);
        }
        if self.pending {
            return Err(Violation::SaveInFlight);
        }
        let payload = draft.resolve()?;
        self.pending = true;
        Ok(payload)
    }

    pub fn confirm(&mut self, saved: Prophecies) {
        self.pending = false;
        if self.locked {
            return;
        }
        self.saved = saved;
        self.locked = true;
    }

    pub fn abort(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProphecyDraft {
        ProphecyDraft {
            winner: "Arsenal".into(),
            relegation: ["Burnley".into(), "Leeds".into(), "Sunderland".into()],
            golden_boot: "Erling Haaland".into(),
            golden_boot_other: String::new(),
            first_sacking: "Ange Postecoglou".into(),
        }
    }

    #[test]
    fn other_sentinel_is_replaced_by_override() {
        let mut d = draft();
        d.golden_boot = GOLDEN_BOOT_OTHER.into();
        d.golden_boot_other = "X".into();
        let payload = d.resolve().unwrap();
        assert_eq!(payload.golden_boot, "X");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["goldenBoot"], "X");
        assert!(json.get("goldenBootOther").is_none());
    }

    #[test]
    fn lock_closes_once_and_stays_closed() {
        let mut lock = ProphecyLock::new();
        let payload = lock.save(&draft()).unwrap();
        assert_eq!(lock.save(&draft()), Err(Violation::SaveInFlight));
        lock.confirm(payload.clone());
        assert!(lock.locked());
        assert_eq!(lock.saved(), &payload);
        assert_eq!(lock.save(&draft()), Err(Violation::ProphecyLocked));

        let mut other = draft();
        other.winner = "Chelsea".into();
        lock.confirm(other.resolve().unwrap());
        assert_eq!(lock.saved().winner, "Arsenal");
    }

    #[test]
    fn failed_save_can_be_retried() {
        let mut lock = ProphecyLock::new();
        lock.save(&draft()).unwrap();
        lock.abort();
        assert!(!lock.locked());
        assert!(lock.save(&draft()).is_ok());
    }

    #[test]
    fn relegation_needs_three_distinct_teams() {
        let mut d = draft();
        d.relegation[2] = "Leeds".into();
        assert_eq!(d.resolve(), Err(Violation::DuplicateRelegation));
        d.relegation[2] = " ".into();
        assert!(matches!(d.resolve(), Err(Violation::ProphecyIncomplete(_))));
    }

    #[test]
    fn partial_backend_copy_deserializes() {
        let saved: Prophecies =
            serde_json::from_str(r#"{"winner":null,"relegation":[null,"Leeds"]}"#).unwrap();
        assert_eq!(saved.winner, "");
        assert_eq!(saved.relegation[1], "Leeds");

        let saved: Prophecies = serde_json::from_str(r#"{"relegation":["Leeds"]}"#).unwrap();
        assert_eq!(saved.relegation, ["Leeds".to_string(), String::new(), String::new()]);
    }

    #[test]
    fn backend_copy_with_content_is_locked() {
        assert!(!ProphecyLock::from_saved(Prophecies::default()).locked());
        let saved = draft().resolve().unwrap();
        assert!(ProphecyLock::from_saved(saved).locked());
    }
}
