use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::persist::app_dir;

/// One accepted submission as the backend acknowledged it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub user_id: String,
    pub gameweek: u32,
    pub day: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub late: bool,
    pub joker_fixture_id: Option<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("receipts.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS receipts (
            receipt_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            gameweek INTEGER NOT NULL,
            day TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            late INTEGER NOT NULL,
            joker_fixture_id TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_receipts_user_gw ON receipts(user_id, gameweek);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn record(conn: &Connection, receipt: &Receipt) -> Result<()> {
    conn.execute(
        "INSERT INTO receipts (user_id, gameweek, day, submitted_at, late, joker_fixture_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            receipt.user_id,
            receipt.gameweek,
            receipt.day.format("%Y-%m-%d").to_string(),
            receipt.submitted_at.to_rfc3339(),
            receipt.late,
            receipt.joker_fixture_id,
        ],
    )
    .context("insert receipt")?;
    Ok(())
}

/// Latest receipt per day for one player's gameweek, oldest day first.
pub fn latest_for_gameweek(
    conn: &Connection,
    user_id: &str,
    gameweek: u32,
) -> Result<Vec<Receipt>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, gameweek, day, submitted_at, late, joker_fixture_id
             FROM receipts
             WHERE user_id = ?1 AND gameweek = ?2
             ORDER BY day ASC, receipt_id ASC",
        )
        .context("prepare receipts query")?;
    let rows = stmt
        .query_map(params![user_id, gameweek], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .context("query receipts")?;

    let mut out: Vec<Receipt> = Vec::new();
    for row in rows {
        let (user_id, gameweek, day, submitted_at, late, joker_fixture_id) =
            row.context("read receipt row")?;
        let Ok(day) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") else {
            continue;
        };
        let Ok(submitted_at) = DateTime::parse_from_rfc3339(&submitted_at) else {
            continue;
        };
        let receipt = Receipt {
            user_id,
            gameweek,
            day,
            submitted_at: submitted_at.with_timezone(&Utc),
            late,
            joker_fixture_id,
        };
        match out.last_mut() {
            Some(last) if last.day == receipt.day => *last = receipt,
            _ => out.push(receipt),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn receipt(day: u32, minute: u32, late: bool) -> Receipt {
        Receipt {
            user_id: "u1".into(),
            gameweek: 3,
            day: NaiveDate::from_ymd_opt(2025, 8, day).unwrap(),
            submitted_at: Utc.with_ymd_and_hms(2025, 8, 15, 10, minute, 0).unwrap(),
            late,
            joker_fixture_id: None,
        }
    }

    #[test]
    fn keeps_latest_receipt_per_day() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        record(&conn, &receipt(16, 0, false)).unwrap();
        record(&conn, &receipt(17, 5, false)).unwrap();
        record(&conn, &receipt(16, 30, true)).unwrap();

        let rows = latest_for_gameweek(&conn, "u1", 3).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].day.day(), 16);
        assert!(rows[0].late);
        assert_eq!(rows[0].submitted_at.minute(), 30);
        assert!(latest_for_gameweek(&conn, "u2", 3).unwrap().is_empty());
    }
}
