use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use predictor_terminal::api::{FixtureList, UserData};
use predictor_terminal::auth::decode_identity;
use predictor_terminal::chip::{ChipChange, ChipSnapshot};
use predictor_terminal::error::Violation;
use predictor_terminal::fixtures::Fixture;
use predictor_terminal::ledger::{PredictionRecord, ScoreSide, SubmitPolicy};
use predictor_terminal::session::{Session, ViewerZone};
use predictor_terminal::window::WindowState;

fn token() -> String {
    let claims = r#"{"userId":"u1","name":"Sam"}"#;
    format!("h.{}.s", URL_SAFE_NO_PAD.encode(claims))
}

fn session(policy: SubmitPolicy) -> Session {
    let token = token();
    let identity = decode_identity(&token).unwrap();
    let zone = ViewerZone::Fixed(FixedOffset::east_opt(0).unwrap());
    Session::new(identity, token, zone, policy)
}

fn fixture(id: &str, kickoff: DateTime<Utc>) -> Fixture {
    Fixture {
        id: id.to_string(),
        home_team: format!("{id} home"),
        away_team: format!("{id} away"),
        kickoff_time: kickoff,
        home_score: None,
        away_score: None,
        is_derby: false,
    }
}

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, d, h, m, 0).unwrap()
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
}

fn fill(session: &mut Session, id: &str, home: u32, away: u32, now: DateTime<Utc>) {
    session.set_score(id, ScoreSide::Home, Some(home), now).unwrap();
    session.set_score(id, ScoreSide::Away, Some(away), now).unwrap();
}

#[test]
fn three_hours_out_goes_open_grace_locked() {
    // Kickoff is tomorrow, three hours from now.
    let start = at(15, 22, 0);
    let mut s = session(SubmitPolicy::RequireComplete);
    s.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: vec![fixture("a", at(16, 1, 0))],
        },
        start,
    );

    let views = s.evaluate(start);
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].deadline, start + Duration::hours(2));
    assert_eq!(views[0].grace_end, start + Duration::hours(3));
    assert_eq!(views[0].state, WindowState::Open);
    assert!(views[0].editable);

    let later = start + Duration::hours(2) + Duration::minutes(5);
    assert_eq!(s.day_state(date(16), later), Ok(WindowState::Grace));

    let last = start + Duration::hours(3) + Duration::minutes(5);
    assert_eq!(s.day_state(date(16), last), Ok(WindowState::Locked));
    assert!(!s.is_fixture_editable("a", last));
    assert!(matches!(
        s.set_score("a", ScoreSide::Home, Some(1), last),
        Err(Violation::WindowClosed(_))
    ));
}

#[test]
fn same_day_kickoff_has_no_lead_time() {
    let now = at(16, 10, 0);
    let mut s = session(SubmitPolicy::RequireComplete);
    s.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: vec![fixture("a", at(16, 12, 0)), fixture("b", at(16, 14, 0))],
        },
        now,
    );
    let views = s.evaluate(now);
    assert_eq!(views[0].deadline, at(16, 12, 0));
    assert_eq!(views[0].grace_end, at(16, 13, 0));
}

#[test]
fn locked_day_stays_locked_across_midnight() {
    let start = at(15, 20, 0);
    let mut s = session(SubmitPolicy::AllowPartial);
    s.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: vec![fixture("a", at(15, 21, 0)), fixture("b", at(16, 23, 30))],
        },
        start,
    );
    let locked_at = at(15, 22, 30);
    assert_eq!(s.day_state(date(15), locked_at), Ok(WindowState::Locked));

    // Saturday's deadline was shown as 22:30; rolling into Saturday does not move it later.
    let saturday_deadline = s.evaluate(locked_at)[1].deadline;
    assert_eq!(saturday_deadline, at(16, 22, 30));
    let after_midnight = at(16, 0, 10);
    let views = s.evaluate(after_midnight);
    assert_eq!(views[0].state, WindowState::Locked);
    assert_eq!(views[1].deadline, saturday_deadline);
    assert_eq!(views[1].state, WindowState::Open);
    assert!(s.edit_day(date(15), after_midnight).is_err());
}

#[test]
fn chip_spent_by_submit_blocks_other_fixtures() {
    let now = at(10, 9, 0);
    let mut s = session(SubmitPolicy::RequireComplete);
    s.load_gameweek(
        FixtureList {
            gameweek: 2,
            fixtures: vec![
                fixture("a", at(16, 12, 30)),
                fixture("b", at(16, 15, 0)),
                fixture("c", at(17, 14, 0)),
            ],
        },
        now,
    );
    fill(&mut s, "a", 2, 1, now);
    fill(&mut s, "b", 0, 0, now);

    assert_eq!(s.toggle_chip("a", now), Ok(ChipChange::Assigned));
    assert!(!s.chip_button_enabled("b", now));
    let (receipt, request) = s.submit_day(date(16), now).unwrap();
    assert!(receipt.chip_spent);
    assert!(!receipt.late);
    assert_eq!(request.joker_fixture_id.as_deref(), Some("a"));
    assert_eq!(request.predictions.len(), 2);
    assert!(s.chip().used_in_season());
    s.submission_settled(date(16));

    assert_eq!(s.toggle_chip("b", now), Err(Violation::ChipSpent));
    assert_eq!(s.toggle_chip("c", now), Err(Violation::ChipSpent));
    assert_eq!(s.chip().assigned(), Some("a"));
}

#[test]
fn chip_moves_freely_until_submit() {
    let now = at(10, 9, 0);
    let mut s = session(SubmitPolicy::AllowPartial);
    s.load_gameweek(
        FixtureList {
            gameweek: 2,
            fixtures: vec![fixture("a", at(16, 12, 30)), fixture("c", at(17, 14, 0))],
        },
        now,
    );
    assert_eq!(s.toggle_chip("a", now), Ok(ChipChange::Assigned));
    assert_eq!(s.toggle_chip("a", now), Ok(ChipChange::Cleared));
    assert_eq!(s.chip().assigned(), None);
    assert_eq!(s.toggle_chip("a", now), Ok(ChipChange::Assigned));
    assert_eq!(s.toggle_chip("c", now), Ok(ChipChange::Assigned));
    assert_eq!(s.chip().assigned(), Some("c"));

    // Submitting a day that does not hold the chip leaves it unspent.
    let (receipt, _) = s.submit_day(date(16), now).unwrap();
    assert!(!receipt.chip_spent);
    assert!(!s.chip().used_in_season());
}

#[test]
fn grace_needs_acknowledgement_and_is_penalised() {
    let mut s = session(SubmitPolicy::RequireComplete);
    let load = at(10, 9, 0);
    s.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: vec![fixture("a", at(16, 15, 0))],
        },
        load,
    );
    // Loaded days before, so the deadline keeps its hour of lead time.
    let grace = at(16, 14, 20);
    assert_eq!(s.day_state(date(16), grace), Ok(WindowState::Grace));
    assert!(s.needs_grace_ack(date(16), grace));
    assert_eq!(
        s.set_score("a", ScoreSide::Home, Some(1), grace),
        Err(Violation::GraceNotAcknowledged)
    );
    assert_eq!(s.toggle_chip("a", grace), Err(Violation::GraceNotAcknowledged));

    s.acknowledge_grace(date(16));
    fill(&mut s, "a", 1, 1, grace);
    let (receipt, _) = s.submit_day(date(16), grace).unwrap();
    assert!(receipt.late);
    assert_eq!(receipt.penalty, -3);
}

#[test]
fn in_flight_save_blocks_second_submit() {
    let now = at(10, 9, 0);
    let mut s = session(SubmitPolicy::AllowPartial);
    s.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: vec![fixture("a", at(16, 12, 30)), fixture("c", at(17, 14, 0))],
        },
        now,
    );
    s.submit_day(date(16), now).unwrap();
    assert_eq!(s.submit_day(date(17), now).unwrap_err(), Violation::SaveInFlight);
    assert_eq!(s.edit_day(date(16), now), Err(Violation::SaveInFlight));

    s.submission_settled(date(16));
    assert!(matches!(
        s.submit_day(date(16), now),
        Err(Violation::AlreadySubmitted(_))
    ));
    s.edit_day(date(16), now).unwrap();
    s.set_score("a", ScoreSide::Away, Some(4), now).unwrap();
    assert_eq!(s.ledger().prediction("a").away, Some(4));
}

#[test]
fn user_data_restores_saved_days_and_chip() {
    let now = at(10, 9, 0);
    let mut s = session(SubmitPolicy::RequireComplete);
    s.apply_user_data(UserData {
        predictions: vec![PredictionRecord {
            fixture_id: "a".into(),
            home_score: Some(3),
            away_score: Some(2),
        }],
        prophecies: None,
        chips: ChipSnapshot {
            joker_fixture_id: Some("a".into()),
            joker_used_in_season: true,
        },
    });
    // Fixtures arriving after user data still pick up the saved values.
    s.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: vec![fixture("a", at(16, 12, 30)), fixture("c", at(17, 14, 0))],
        },
        now,
    );
    let views = s.evaluate(now);
    assert!(views[0].submitted);
    assert!(!views[0].editable);
    assert!(!views[1].submitted);
    assert_eq!(s.ledger().prediction("a").home, Some(3));
    assert!(s.chip().holds("a"));
    assert!(!s.prophecies().locked());
    assert_eq!(s.toggle_chip("c", now), Err(Violation::ChipSpent));
}
