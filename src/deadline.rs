use chrono::{DateTime, Duration, TimeZone, Utc};

/// Lead time before the first kickoff of a day, unless that day is today.
pub const OFFSET_HOURS: i64 = 1;
pub const GRACE_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub deadline: DateTime<Utc>,
    pub grace_end: DateTime<Utc>,
}

/// Deadline for a day whose first match kicks off at `earliest_kickoff`.
///
/// A day that is "today" in `tz` at `now` gets no lead time: its deadline is the kickoff itself.
pub fn compute<Tz: TimeZone>(
    earliest_kickoff: DateTime<Utc>,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Deadlines {
    let kickoff_day = earliest_kickoff.with_timezone(tz).date_naive();
    let today = now.with_timezone(tz).date_naive();
    let offset = if kickoff_day == today {
        Duration::zero()
    } else {
        Duration::hours(OFFSET_HOURS)
    };
    let deadline = earliest_kickoff - offset;
    Deadlines {
        deadline,
        grace_end: deadline + Duration::hours(GRACE_HOURS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn future_day_gets_one_hour_lead() {
        let now = Utc.with_ymd_and_hms(2025, 8, 15, 10, 0, 0).unwrap();
        let kickoff = Utc.with_ymd_and_hms(2025, 8, 16, 14, 0, 0).unwrap();
        let d = compute(kickoff, &Utc, now);
        assert_eq!(d.deadline, kickoff - Duration::hours(1));
        assert_eq!(d.grace_end, kickoff);
    }

    #[test]
    fn same_day_has_no_lead() {
        let now = Utc.with_ymd_and_hms(2025, 8, 16, 8, 0, 0).unwrap();
        let kickoff = Utc.with_ymd_and_hms(2025, 8, 16, 14, 0, 0).unwrap();
        let d = compute(kickoff, &Utc, now);
        assert_eq!(d.deadline, kickoff);
        assert_eq!(d.grace_end, kickoff + Duration::hours(1));
    }

    #[test]
    fn today_is_judged_in_viewer_zone() {
        // 23:30 UTC on the 15th is already the 16th in UTC+3.
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 15, 23, 30, 0).unwrap();
        let kickoff = Utc.with_ymd_and_hms(2025, 8, 16, 14, 0, 0).unwrap();
        assert_eq!(compute(kickoff, &tz, now).deadline, kickoff);
        assert_eq!(
            compute(kickoff, &Utc, now).deadline,
            kickoff - Duration::hours(1)
        );
    }
}
