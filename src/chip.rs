use serde::{Deserialize, Serialize};

use crate::error::Violation;

/// Joker state as the backend stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipSnapshot {
    #[serde(default)]
    pub joker_fixture_id: Option<String>,
    #[serde(default)]
    pub joker_used_in_season: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipChange {
    Assigned,
    Cleared,
}

/// Season-long Joker for one player.
///
/// At most one fixture holds the chip at a time across the whole season. The chip is spent only
/// when the day holding it is submitted, and a spent chip never comes back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChipController {
    assigned: Option<String>,
    used_in_season: bool,
}

impl ChipController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ChipSnapshot) -> Self {
        Self {
            assigned: snapshot.joker_fixture_id.filter(|id| !id.is_empty()),
            used_in_season: snapshot.joker_used_in_season,
        }
    }

    pub fn assigned(&self) -> Option<&str> {
        self.assigned.as_deref()
    }

    pub fn used_in_season(&self) -> bool {
        self.used_in_season
    }

    pub fn holds(&self, fixture_id: &str) -> bool {
        self.assigned.as_deref() == Some(fixture_id)
    }

    pub fn toggle(&mut self, fixture_id: &str) -> Result<ChipChange, Violation> {
        if self.used_in_season {
            return Err(Violation::ChipSpent);
        }
        if self.holds(fixture_id) {
            self.assigned = None;
            Ok(ChipChange::Cleared)
        } else {
            self.assigned = Some(fixture_id.to_string());
            Ok(ChipChange::Assigned)
        }
    }

    pub fn button_enabled(&self, fixture_id: &str, window_editable: bool) -> bool {
        if !window_editable || self.used_in_season {
            return false;
        }
        match self.assigned.as_deref() {
            Some(holder) => holder == fixture_id,
            None => true,
        }
    }

    /// Spends the chip if the submitted day contains the fixture holding it.
    /// Returns whether this call spent it.
    pub fn on_submit_day_group<'a>(
        &mut self,
        submitted_fixture_ids: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        if self.used_in_season {
            return false;
        }
        let Some(holder) = self.assigned.as_deref() else {
            return false;
        };
        if submitted_fixture_ids.into_iter().any(|id| id == holder) {
            self.used_in_season = true;
            return true;
        }
        false
    }
}
