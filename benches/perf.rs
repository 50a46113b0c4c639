use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use predictor_terminal::api::{FixtureList, parse_fixtures_json};
use predictor_terminal::auth::decode_identity;
use predictor_terminal::fixtures::{Fixture, group_fixtures};
use predictor_terminal::ledger::SubmitPolicy;
use predictor_terminal::session::{Session, ViewerZone};

fn season() -> Vec<Fixture> {
    let start = Utc.with_ymd_and_hms(2025, 8, 15, 19, 0, 0).unwrap();
    (0..380)
        .map(|i| Fixture {
            id: format!("f{i:03}"),
            home_team: format!("Team {}", i % 20),
            away_team: format!("Team {}", (i + 7) % 20),
            kickoff_time: start + Duration::hours(i64::from(i) * 9),
            home_score: None,
            away_score: None,
            is_derby: i % 17 == 0,
        })
        .collect()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
}

fn bench_group_fixtures(c: &mut Criterion) {
    let fixtures = season();
    let tz = FixedOffset::east_opt(3600).unwrap();
    c.bench_function("group_fixtures_season", |b| {
        b.iter(|| {
            let groups = group_fixtures(black_box(&fixtures), &tz, now());
            black_box(groups.len());
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let token = format!(
        "h.{}.s",
        URL_SAFE_NO_PAD.encode(r#"{"userId":"bench","name":"Bench"}"#)
    );
    let identity = decode_identity(&token).expect("valid token");
    let zone = ViewerZone::Fixed(FixedOffset::east_opt(0).unwrap());
    let mut session = Session::new(identity, token, zone, SubmitPolicy::RequireComplete);
    session.load_gameweek(
        FixtureList {
            gameweek: 1,
            fixtures: season(),
        },
        now(),
    );
    c.bench_function("session_evaluate", |b| {
        b.iter(|| {
            let views = session.evaluate(black_box(now()));
            black_box(views.len());
        })
    });
}

fn bench_fixtures_parse(c: &mut Criterion) {
    let raw = serde_json::json!({ "gameweek": 1, "fixtures": season() }).to_string();
    c.bench_function("fixtures_parse", |b| {
        b.iter(|| {
            let list = parse_fixtures_json(black_box(&raw), None).unwrap();
            black_box(list.fixtures.len());
        })
    });
}

criterion_group!(benches, bench_group_fixtures, bench_evaluate, bench_fixtures_parse);
criterion_main!(benches);
