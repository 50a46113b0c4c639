use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::deadline::Deadlines;

/// Points the external scorer deducts for a submission accepted during the grace hour.
pub const GRACE_PENALTY_POINTS: i32 = -3;

/// Time-driven state of one match day. Ordered so that later states compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WindowState {
    Open,
    Grace,
    Locked,
}

impl WindowState {
    pub fn at(deadlines: &Deadlines, now: DateTime<Utc>) -> Self {
        if now < deadlines.deadline {
            WindowState::Open
        } else if now < deadlines.grace_end {
            WindowState::Grace
        } else {
            WindowState::Locked
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WindowState::Open => "OPEN",
            WindowState::Grace => "GRACE",
            WindowState::Locked => "LOCKED",
        }
    }

    /// Penalty attached to a submission made in this state.
    pub fn submission_penalty(self) -> i32 {
        match self {
            WindowState::Grace => GRACE_PENALTY_POINTS,
            WindowState::Open | WindowState::Locked => 0,
        }
    }
}

/// Submission state and time state are orthogonal; both must allow it.
pub fn is_editable(state: WindowState, submitted: bool) -> bool {
    state != WindowState::Locked && !submitted
}

/// Remembers the furthest state each day has reached.
///
/// Deadlines are recomputed when the local date rolls over, which can move a deadline later.
/// The latch keeps a day that already reached GRACE or LOCKED from moving back.
#[derive(Debug, Clone, Default)]
pub struct WindowLatch {
    reached: HashMap<NaiveDate, WindowState>,
}

impl WindowLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, date: NaiveDate, computed: WindowState) -> WindowState {
        let entry = self.reached.entry(date).or_insert(computed);
        if computed > *entry {
            *entry = computed;
        }
        *entry
    }

    pub fn clear(&mut self) {
        self.reached.clear();
    }
}

/// Human countdown to the next boundary, e.g. `1d 02:03:04`.
pub fn countdown(deadlines: &Deadlines, now: DateTime<Utc>) -> String {
    let target = match WindowState::at(deadlines, now) {
        WindowState::Open => deadlines.deadline,
        WindowState::Grace => deadlines.grace_end,
        WindowState::Locked => return "closed".to_string(),
    };
    format_remaining(target - now)
}

pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
