use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::info;
use rusqlite::{Connection, OptionalExtension, params};

use crate::archive::{ArchivedPrediction, ArchivedResult, ArchivedStanding, SessionDump};
use crate::config::TEAM_ROSTER;
use crate::features::GoalAverages;
use crate::scoring::Outcome;

#[derive(Debug, Clone)]
pub struct StandingRow {
    pub round: i64,
    pub team_id: i64,
    pub position: Option<i64>,
    pub points: i64,
    pub form: String,
}

#[derive(Debug, Clone, Copy)]
pub struct OddsRow {
    pub round: i64,
    pub home_id: i64,
    pub away_id: i64,
    pub odds_home: Option<f64>,
    pub odds_draw: Option<f64>,
    pub odds_away: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PredictionRow {
    pub id: i64,
    pub round: i64,
    pub home_id: i64,
    pub away_id: i64,
    pub pick: Outcome,
    pub confidence: f64,
    pub actual: Option<Outcome>,
    pub success: Option<bool>,
    pub points_delta: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ScoreState {
    pub score: f64,
    pub predictions_total: i64,
    pub predictions_correct: i64,
    pub pause_until: i64,
    pub session_archived: bool,
    pub last_update: Option<String>,
}

pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;

        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round INTEGER NOT NULL,
            home_id INTEGER NOT NULL REFERENCES teams(id),
            away_id INTEGER NOT NULL REFERENCES teams(id),
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            UNIQUE(round, home_id, away_id)
        );

        CREATE TABLE IF NOT EXISTS odds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round INTEGER NOT NULL,
            home_id INTEGER NOT NULL REFERENCES teams(id),
            away_id INTEGER NOT NULL REFERENCES teams(id),
            odds_home REAL NULL,
            odds_draw REAL NULL,
            odds_away REAL NULL,
            UNIQUE(round, home_id, away_id)
        );

        CREATE TABLE IF NOT EXISTS standings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round INTEGER NOT NULL,
            team_id INTEGER NOT NULL REFERENCES teams(id),
            position INTEGER NULL,
            points INTEGER NOT NULL,
            form TEXT NULL,
            UNIQUE(round, team_id)
        );

        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round INTEGER NOT NULL,
            home_id INTEGER NOT NULL REFERENCES teams(id),
            away_id INTEGER NOT NULL REFERENCES teams(id),
            pick TEXT NOT NULL,
            confidence REAL NOT NULL DEFAULT 0,
            actual TEXT NULL,
            success INTEGER NULL,
            points_delta REAL NULL
        );

        CREATE TABLE IF NOT EXISTS score_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            score REAL NOT NULL DEFAULT 100,
            predictions_total INTEGER NOT NULL DEFAULT 0,
            predictions_correct INTEGER NOT NULL DEFAULT 0,
            pause_until INTEGER NOT NULL DEFAULT 0,
            session_archived INTEGER NOT NULL DEFAULT 0,
            last_update TEXT NULL
        );

        CREATE TABLE IF NOT EXISTS shadow_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round INTEGER NOT NULL,
            home_id INTEGER NOT NULL REFERENCES teams(id),
            away_id INTEGER NOT NULL REFERENCES teams(id),
            action INTEGER NOT NULL,
            confidence REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE(round, home_id, away_id)
        );

        CREATE INDEX IF NOT EXISTS idx_results_round ON results(round);
        CREATE INDEX IF NOT EXISTS idx_results_teams ON results(home_id, away_id);
        CREATE INDEX IF NOT EXISTS idx_odds_round ON odds(round);
        CREATE INDEX IF NOT EXISTS idx_standings_round ON standings(round);
        CREATE INDEX IF NOT EXISTS idx_predictions_round ON predictions(round);
        CREATE INDEX IF NOT EXISTS idx_predictions_success ON predictions(success);
        "#,
    )
    .context("create sqlite schema")?;

    for name in TEAM_ROSTER {
        conn.execute("INSERT OR IGNORE INTO teams(name) VALUES (?1)", params![name])
            .context("seed team roster")?;
    }

    let state_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM score_state", [], |row| row.get(0))
        .context("count score_state rows")?;
    if state_rows == 0 {
        conn.execute(
            "INSERT INTO score_state(id, score, predictions_total, predictions_correct,
                                     pause_until, session_archived, last_update)
             VALUES (1, 100, 0, 0, 0, 0, NULL)",
            [],
        )
        .context("seed score_state")?;
        info!("store: schema initialized, score state seeded");
    }
    Ok(())
}

/// Read-through lookup between team names and ids. Owned by whoever talks to
/// the teams table; must be invalidated after any team write.
#[derive(Debug, Default)]
pub struct TeamDirectory {
    by_name: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
}

impl TeamDirectory {
    pub fn id_for(&mut self, conn: &Connection, name: &str) -> Result<Option<i64>> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(Some(*id));
        }
        let id = conn
            .query_row(
                "SELECT id FROM teams WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .context("lookup team id")?;
        if let Some(id) = id {
            self.by_name.insert(name.to_string(), id);
            self.by_id.insert(id, name.to_string());
        }
        Ok(id)
    }

    pub fn name_for(&mut self, conn: &Connection, id: i64) -> Result<Option<String>> {
        if let Some(name) = self.by_id.get(&id) {
            return Ok(Some(name.clone()));
        }
        let name = conn
            .query_row(
                "SELECT name FROM teams WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("lookup team name")?;
        if let Some(name) = &name {
            self.by_name.insert(name.clone(), id);
            self.by_id.insert(id, name.clone());
        }
        Ok(name)
    }

    pub fn invalidate(&mut self) {
        self.by_name.clear();
        self.by_id.clear();
    }
}

pub fn insert_team(conn: &Connection, directory: &mut TeamDirectory, name: &str) -> Result<i64> {
    conn.execute("INSERT OR IGNORE INTO teams(name) VALUES (?1)", params![name])
        .context("insert team")?;
    directory.invalidate();
    directory
        .id_for(conn, name)?
        .ok_or_else(|| anyhow!("team {name} missing after insert"))
}

/// Final scores are a pair: both present or both absent.
pub fn upsert_result(
    conn: &Connection,
    round: i64,
    home_id: i64,
    away_id: i64,
    score: Option<(i64, i64)>,
) -> Result<()> {
    let (home_goals, away_goals) = match score {
        Some((h, a)) => (Some(h), Some(a)),
        None => (None, None),
    };
    conn.execute(
        r#"
        INSERT INTO results (round, home_id, away_id, home_goals, away_goals)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(round, home_id, away_id) DO UPDATE SET
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals
        "#,
        params![round, home_id, away_id, home_goals, away_goals],
    )
    .context("upsert result")?;
    Ok(())
}

pub fn upsert_odds(conn: &Connection, row: &OddsRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO odds (round, home_id, away_id, odds_home, odds_draw, odds_away)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(round, home_id, away_id) DO UPDATE SET
            odds_home = excluded.odds_home,
            odds_draw = excluded.odds_draw,
            odds_away = excluded.odds_away
        "#,
        params![
            row.round,
            row.home_id,
            row.away_id,
            row.odds_home,
            row.odds_draw,
            row.odds_away
        ],
    )
    .context("upsert odds")?;
    Ok(())
}

pub fn upsert_standing(conn: &Connection, row: &StandingRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO standings (round, team_id, position, points, form)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(round, team_id) DO UPDATE SET
            position = excluded.position,
            points = excluded.points,
            form = excluded.form
        "#,
        params![row.round, row.team_id, row.position, row.points, row.form],
    )
    .context("upsert standing")?;
    Ok(())
}

pub fn standing(conn: &Connection, round: i64, team_id: i64) -> Result<Option<StandingRow>> {
    conn.query_row(
        "SELECT round, team_id, position, points, form
         FROM standings WHERE round = ?1 AND team_id = ?2",
        params![round, team_id],
        |row| {
            Ok(StandingRow {
                round: row.get(0)?,
                team_id: row.get(1)?,
                position: row.get(2)?,
                points: row.get(3)?,
                form: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            })
        },
    )
    .optional()
    .context("query standing")
}

/// Most recent standings snapshot strictly before `round`: predictions for a
/// round can only see tables published after earlier rounds.
pub fn latest_standing_before(
    conn: &Connection,
    round: i64,
    team_id: i64,
) -> Result<Option<StandingRow>> {
    conn.query_row(
        "SELECT round, team_id, position, points, form
         FROM standings WHERE team_id = ?1 AND round < ?2
         ORDER BY round DESC LIMIT 1",
        params![team_id, round],
        |row| {
            Ok(StandingRow {
                round: row.get(0)?,
                team_id: row.get(1)?,
                position: row.get(2)?,
                points: row.get(3)?,
                form: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            })
        },
    )
    .optional()
    .context("query latest standing")
}

pub fn odds_for_round(conn: &Connection, round: i64) -> Result<Vec<OddsRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT round, home_id, away_id, odds_home, odds_draw, odds_away
             FROM odds WHERE round = ?1 ORDER BY id ASC",
        )
        .context("prepare odds query")?;
    let rows = stmt
        .query_map(params![round], |row| {
            Ok(OddsRow {
                round: row.get(0)?,
                home_id: row.get(1)?,
                away_id: row.get(2)?,
                odds_home: row.get(3)?,
                odds_draw: row.get(4)?,
                odds_away: row.get(5)?,
            })
        })
        .context("query odds rows")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode odds row")?);
    }
    Ok(out)
}

/// Last completed meetings with the same home/away orientation, most recent
/// first, capped at five.
pub fn head_to_head(conn: &Connection, home_id: i64, away_id: i64) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT home_goals, away_goals FROM results
             WHERE home_id = ?1 AND away_id = ?2
               AND home_goals IS NOT NULL AND away_goals IS NOT NULL
             ORDER BY round DESC LIMIT 5",
        )
        .context("prepare head-to-head query")?;
    let rows = stmt
        .query_map(params![home_id, away_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })
        .context("query head-to-head")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode head-to-head row")?);
    }
    Ok(out)
}

/// Average goals scored/conceded over the team's last five completed matches.
pub fn recent_goal_averages(conn: &Connection, team_id: i64) -> Result<Option<GoalAverages>> {
    let mut stmt = conn
        .prepare(
            "SELECT CASE WHEN home_id = ?1 THEN home_goals ELSE away_goals END,
                    CASE WHEN home_id = ?1 THEN away_goals ELSE home_goals END
             FROM results
             WHERE (home_id = ?1 OR away_id = ?1)
               AND home_goals IS NOT NULL AND away_goals IS NOT NULL
             ORDER BY round DESC LIMIT 5",
        )
        .context("prepare recent goals query")?;
    let rows = stmt
        .query_map(params![team_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })
        .context("query recent goals")?;

    let mut scored = 0.0;
    let mut conceded = 0.0;
    let mut n = 0usize;
    for row in rows {
        let (for_goals, against_goals) = row.context("decode recent goals row")?;
        scored += for_goals as f64;
        conceded += against_goals as f64;
        n += 1;
    }
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(GoalAverages {
        scored: scored / n as f64,
        conceded: conceded / n as f64,
    }))
}

pub fn result_score(
    conn: &Connection,
    round: i64,
    home_id: i64,
    away_id: i64,
) -> Result<Option<(i64, i64)>> {
    let row = conn
        .query_row(
            "SELECT home_goals, away_goals FROM results
             WHERE round = ?1 AND home_id = ?2 AND away_id = ?3",
            params![round, home_id, away_id],
            |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                ))
            },
        )
        .optional()
        .context("query result score")?;
    Ok(match row {
        Some((Some(h), Some(a))) => Some((h, a)),
        _ => None,
    })
}

pub fn max_stored_round(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(round), 0) FROM results", [], |row| {
        row.get(0)
    })
    .context("query max stored round")
}

pub fn insert_prediction(
    conn: &Connection,
    round: i64,
    home_id: i64,
    away_id: i64,
    pick: Outcome,
    confidence: f64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO predictions (round, home_id, away_id, pick, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![round, home_id, away_id, pick.code(), confidence],
    )
    .context("insert prediction")?;
    Ok(())
}

pub fn ungraded_predictions(conn: &Connection) -> Result<Vec<PredictionRow>> {
    query_predictions(
        conn,
        "SELECT id, round, home_id, away_id, pick, confidence, actual, success, points_delta
         FROM predictions WHERE success IS NULL ORDER BY id ASC",
        params![],
    )
}

pub fn predictions_for_round(conn: &Connection, round: i64) -> Result<Vec<PredictionRow>> {
    query_predictions(
        conn,
        "SELECT id, round, home_id, away_id, pick, confidence, actual, success, points_delta
         FROM predictions WHERE round = ?1 ORDER BY confidence DESC, id ASC",
        params![round],
    )
}

fn query_predictions(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<PredictionRow>> {
    let mut stmt = conn.prepare(sql).context("prepare predictions query")?;
    let rows = stmt
        .query_map(args, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, Option<f64>>(8)?,
            ))
        })
        .context("query predictions")?;

    let mut out = Vec::new();
    for row in rows {
        let (id, round, home_id, away_id, pick, confidence, actual, success, points_delta) =
            row.context("decode prediction row")?;
        let pick =
            Outcome::from_code(&pick).ok_or_else(|| anyhow!("bad pick code {pick:?}"))?;
        let actual = match actual {
            Some(code) => Some(
                Outcome::from_code(&code).ok_or_else(|| anyhow!("bad actual code {code:?}"))?,
            ),
            None => None,
        };
        out.push(PredictionRow {
            id,
            round,
            home_id,
            away_id,
            pick,
            confidence,
            actual,
            success: success.map(|v| v != 0),
            points_delta,
        });
    }
    Ok(out)
}

/// Grades one prediction and folds the delta into the score state. No-op if
/// the row was already graded (grading is idempotent at the query level; this
/// guard covers direct calls).
pub fn apply_grade(
    conn: &Connection,
    prediction_id: i64,
    actual: Outcome,
    success: bool,
    points_delta: f64,
) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE predictions SET actual = ?1, success = ?2, points_delta = ?3
             WHERE id = ?4 AND success IS NULL",
            params![actual.code(), success as i64, points_delta, prediction_id],
        )
        .context("grade prediction")?;
    if changed == 0 {
        return Ok(());
    }
    conn.execute(
        "UPDATE score_state SET
            score = score + ?1,
            predictions_total = predictions_total + 1,
            predictions_correct = predictions_correct + ?2,
            last_update = ?3
         WHERE id = 1",
        params![points_delta, success as i64, Utc::now().to_rfc3339()],
    )
    .context("apply grade to score state")?;
    Ok(())
}

pub fn score_state(conn: &Connection) -> Result<ScoreState> {
    conn.query_row(
        "SELECT score, predictions_total, predictions_correct, pause_until,
                session_archived, last_update
         FROM score_state WHERE id = 1",
        [],
        |row| {
            Ok(ScoreState {
                score: row.get(0)?,
                predictions_total: row.get(1)?,
                predictions_correct: row.get(2)?,
                pause_until: row.get(3)?,
                session_archived: row.get::<_, i64>(4)? != 0,
                last_update: row.get(5)?,
            })
        },
    )
    .context("query score state")
}

pub fn set_pause_until(conn: &Connection, round: i64) -> Result<()> {
    conn.execute(
        "UPDATE score_state SET pause_until = ?1 WHERE id = 1",
        params![round],
    )
    .context("set pause watermark")?;
    Ok(())
}

pub fn mark_session_archived(conn: &Connection) -> Result<()> {
    conn.execute("UPDATE score_state SET session_archived = 1 WHERE id = 1", [])
        .context("mark session archived")?;
    Ok(())
}

/// Success flags of the most recently graded predictions, newest first.
pub fn recent_graded_success(conn: &Connection, limit: usize) -> Result<Vec<bool>> {
    let mut stmt = conn
        .prepare(
            "SELECT success FROM predictions WHERE success IS NOT NULL
             ORDER BY id DESC LIMIT ?1",
        )
        .context("prepare recent success query")?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(row.get::<_, i64>(0)? != 0)
        })
        .context("query recent successes")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode success row")?);
    }
    Ok(out)
}

/// Clears every per-session table and resets the per-session score-state
/// fields. The running score and the team roster survive.
pub fn reset_session_data(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM results", []).context("clear results")?;
    conn.execute("DELETE FROM predictions", [])
        .context("clear predictions")?;
    conn.execute("DELETE FROM odds", []).context("clear odds")?;
    conn.execute("DELETE FROM standings", [])
        .context("clear standings")?;
    conn.execute("DELETE FROM shadow_predictions", [])
        .context("clear shadow predictions")?;
    conn.execute(
        "UPDATE score_state SET
            predictions_total = 0,
            predictions_correct = 0,
            pause_until = 0,
            session_archived = 0,
            last_update = NULL
         WHERE id = 1",
        [],
    )
    .context("reset score state for new session")?;
    info!("store: session tables cleared, running score preserved");
    Ok(())
}

pub fn insert_shadow_prediction(
    conn: &Connection,
    round: i64,
    home_id: i64,
    away_id: i64,
    action: i64,
    confidence: f64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO shadow_predictions
            (round, home_id, away_id, action, confidence, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            round,
            home_id,
            away_id,
            action,
            confidence,
            Utc::now().to_rfc3339()
        ],
    )
    .context("insert shadow prediction")?;
    Ok(())
}

pub fn shadow_predictions_for_round(
    conn: &Connection,
    round: i64,
) -> Result<Vec<(i64, i64, i64, f64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT home_id, away_id, action, confidence FROM shadow_predictions
             WHERE round = ?1 ORDER BY id ASC",
        )
        .context("prepare shadow query")?;
    let rows = stmt
        .query_map(params![round], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .context("query shadow predictions")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode shadow row")?);
    }
    Ok(out)
}

/// Full name-resolved snapshot of the current session for archival.
pub fn collect_session_dump(conn: &Connection) -> Result<SessionDump> {
    let mut results = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT r.round, h.name, a.name, r.home_goals, r.away_goals
                 FROM results r
                 JOIN teams h ON r.home_id = h.id
                 JOIN teams a ON r.away_id = a.id
                 ORDER BY r.round, r.id",
            )
            .context("prepare results dump")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ArchivedResult {
                    round: row.get(0)?,
                    home: row.get(1)?,
                    away: row.get(2)?,
                    home_goals: row.get(3)?,
                    away_goals: row.get(4)?,
                })
            })
            .context("query results dump")?;
        for row in rows {
            results.push(row.context("decode results dump row")?);
        }
    }

    let mut predictions = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT p.round, h.name, a.name, p.pick, p.actual, p.success, p.points_delta
                 FROM predictions p
                 JOIN teams h ON p.home_id = h.id
                 JOIN teams a ON p.away_id = a.id
                 ORDER BY p.round, p.id",
            )
            .context("prepare predictions dump")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ArchivedPrediction {
                    round: row.get(0)?,
                    home: row.get(1)?,
                    away: row.get(2)?,
                    pick: row.get(3)?,
                    actual: row.get(4)?,
                    success: row.get::<_, Option<i64>>(5)?.map(|v| v != 0),
                    points_delta: row.get(6)?,
                })
            })
            .context("query predictions dump")?;
        for row in rows {
            predictions.push(row.context("decode predictions dump row")?);
        }
    }

    let mut standings = Vec::new();
    {
        let mut stmt = conn
            .prepare(
                "SELECT t.name, c.points, c.form
                 FROM standings c
                 JOIN teams t ON c.team_id = t.id
                 WHERE c.round = (SELECT COALESCE(MAX(round), 0) FROM standings)
                 ORDER BY c.points DESC",
            )
            .context("prepare standings dump")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ArchivedStanding {
                    team: row.get(0)?,
                    points: row.get(1)?,
                    form: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })
            .context("query standings dump")?;
        for row in rows {
            standings.push(row.context("decode standings dump row")?);
        }
    }

    let state = score_state(conn)?;
    Ok(SessionDump {
        results,
        predictions,
        final_standings: standings,
        score: state.score,
        predictions_total: state.predictions_total,
        predictions_correct: state.predictions_correct,
    })
}
