use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::deadline::{self, Deadlines};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(alias = "home")]
    pub home_team: String,
    #[serde(alias = "away")]
    pub away_team: String,
    #[serde(deserialize_with = "de_kickoff")]
    pub kickoff_time: DateTime<Utc>,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    // Only the external scorer reads this.
    #[serde(default)]
    pub is_derby: bool,
}

impl Fixture {
    /// Final score, present only once both sides are known.
    pub fn result(&self) -> Option<(u32, u32)> {
        Some((self.home_score?, self.away_score?))
    }

    pub fn label(&self) -> String {
        format!("{} v {}", self.home_team, self.away_team)
    }
}

/// Fixtures sharing one local kickoff date, and the deadline they share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub fixtures: Vec<Fixture>,
    pub deadlines: Deadlines,
}

impl DayGroup {
    pub fn earliest_kickoff(&self) -> Option<DateTime<Utc>> {
        self.fixtures.iter().map(|f| f.kickoff_time).min()
    }

    pub fn contains(&self, fixture_id: &str) -> bool {
        self.fixtures.iter().any(|f| f.id == fixture_id)
    }

    pub fn fixture_ids(&self) -> impl Iterator<Item = &str> {
        self.fixtures.iter().map(|f| f.id.as_str())
    }

    pub fn label(&self) -> String {
        day_label(self.date)
    }
}

pub fn day_label(date: NaiveDate) -> String {
    date.format("%a %d %b %Y").to_string()
}

/// Local calendar date of an instant as seen from `tz`.
pub fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Partitions fixtures into day groups keyed by the local kickoff date in `tz`.
///
/// Groups appear in the order their date is first seen; fixtures keep their input order within a
/// group. Deadlines are derived from the same `now` so every group of one pass agrees on "today".
pub fn group_fixtures<Tz: TimeZone>(
    fixtures: &[Fixture],
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<DayGroup> {
    let mut buckets: Vec<(NaiveDate, Vec<Fixture>)> = Vec::new();
    for fixture in fixtures {
        let date = local_date(fixture.kickoff_time, tz);
        match buckets.iter_mut().find(|(d, _)| *d == date) {
            Some((_, list)) => list.push(fixture.clone()),
            None => buckets.push((date, vec![fixture.clone()])),
        }
    }

    buckets
        .into_iter()
        .filter_map(|(date, fixtures)| {
            let earliest = fixtures.iter().map(|f| f.kickoff_time).min()?;
            Some(DayGroup {
                date,
                deadlines: deadline::compute(earliest, tz, now),
                fixtures,
            })
        })
        .collect()
}

/// Recomputes every group's deadlines against a fresh `now`.
///
/// A deadline already shown to the player is never pushed later: a day that turns into "today"
/// after midnight keeps the lead time it was loaded with.
pub fn refresh_deadlines<Tz: TimeZone>(groups: &mut [DayGroup], tz: &Tz, now: DateTime<Utc>) {
    for group in groups {
        if let Some(earliest) = group.earliest_kickoff() {
            let fresh = deadline::compute(earliest, tz, now);
            if fresh.deadline < group.deadlines.deadline {
                group.deadlines = fresh;
            }
        }
    }
}

fn de_kickoff<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_kickoff(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised kickoff time: {raw}")))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD HH:MM[:SS]` which is read as UTC.
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn fixture(id: &str, kickoff: DateTime<Utc>) -> Fixture {
        Fixture {
            id: id.to_string(),
            home_team: format!("{id}-H"),
            away_team: format!("{id}-A"),
            kickoff_time: kickoff,
            home_score: None,
            away_score: None,
            is_derby: false,
        }
    }

    #[test]
    fn groups_follow_local_date_not_utc_date() {
        // 23:30 UTC is already the next day in UTC+2.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
        let a = fixture("a", Utc.with_ymd_and_hms(2025, 8, 16, 20, 0, 0).unwrap());
        let b = fixture("b", Utc.with_ymd_and_hms(2025, 8, 16, 23, 30, 0).unwrap());

        let utc_groups = group_fixtures(&[a.clone(), b.clone()], &Utc, now);
        assert_eq!(utc_groups.len(), 1);

        let local_groups = group_fixtures(&[a, b], &tz, now);
        assert_eq!(local_groups.len(), 2);
        assert_eq!(
            local_groups[1].date,
            NaiveDate::from_ymd_opt(2025, 8, 17).unwrap()
        );
    }

    #[test]
    fn first_seen_date_order_and_fixture_order_preserved() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
        let sat_late = fixture("s2", Utc.with_ymd_and_hms(2025, 8, 16, 17, 30, 0).unwrap());
        let sun = fixture("u1", Utc.with_ymd_and_hms(2025, 8, 17, 14, 0, 0).unwrap());
        let sat_early = fixture("s1", Utc.with_ymd_and_hms(2025, 8, 16, 12, 30, 0).unwrap());

        let groups = group_fixtures(&[sat_late, sun, sat_early], &Utc, now);
        assert_eq!(groups.len(), 2);
        let ids: Vec<_> = groups[0].fixture_ids().collect();
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(groups[1].fixture_ids().collect::<Vec<_>>(), vec!["u1"]);
        // Deadline keys off the earliest kickoff, not the first listed.
        assert_eq!(
            groups[0].deadlines.deadline,
            Utc.with_ymd_and_hms(2025, 8, 16, 11, 30, 0).unwrap()
        );
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
        assert!(group_fixtures(&[], &Utc, now).is_empty());
    }

    #[test]
    fn kickoff_formats() {
        let want = Utc.with_ymd_and_hms(2025, 8, 16, 14, 0, 0).unwrap();
        assert_eq!(parse_kickoff("2025-08-16T14:00:00.000Z"), Some(want));
        assert_eq!(parse_kickoff("2025-08-16T15:00:00+01:00"), Some(want));
        assert_eq!(parse_kickoff("2025-08-16 14:00"), Some(want));
        assert_eq!(parse_kickoff("soon"), None);
    }
}
