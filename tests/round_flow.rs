use anyhow::{Result, anyhow};
use chrono::Utc;

use vleague_engine::archive::{ArchiveSink, SessionDump};
use vleague_engine::config::{ConfigHandle, EngineConfig};
use vleague_engine::orchestrator;
use vleague_engine::scoring::Outcome;
use vleague_engine::shadow::{ShadowAction, ShadowScorer};
use vleague_engine::store::{self, OddsRow, StandingRow};

struct NullSink;

impl ArchiveSink for NullSink {
    fn export(&self, _dump: &SessionDump) -> Result<()> {
        Ok(())
    }
}

struct AlwaysHomeScorer;

impl ShadowScorer for AlwaysHomeScorer {
    fn score(&self, observation: &[f64]) -> Result<(ShadowAction, f64)> {
        assert_eq!(observation.len(), 10);
        Ok((ShadowAction::Home, 0.7))
    }
}

struct PanickyScorer;

impl ShadowScorer for PanickyScorer {
    fn score(&self, _observation: &[f64]) -> Result<(ShadowAction, f64)> {
        Err(anyhow!("weights file corrupted"))
    }
}

fn seed_standings(conn: &rusqlite::Connection, round: i64, team_id: i64, points: i64, form: &str) {
    store::upsert_standing(
        conn,
        &StandingRow {
            round,
            team_id,
            position: Some(team_id),
            points,
            form: form.to_string(),
        },
    )
    .unwrap();
}

fn seed_odds(
    conn: &rusqlite::Connection,
    round: i64,
    home: i64,
    away: i64,
    odds: (f64, f64, f64),
) {
    store::upsert_odds(
        conn,
        &OddsRow {
            round,
            home_id: home,
            away_id: away,
            odds_home: Some(odds.0),
            odds_draw: Some(odds.1),
            odds_away: Some(odds.2),
        },
    )
    .unwrap();
}

/// One-sided fixture: big points gap, clean streaks, ideal-zone odds.
fn seed_strong_fixture(conn: &rusqlite::Connection, round: i64, home: i64, away: i64) {
    seed_standings(conn, round - 1, home, 30, "WWWWW");
    seed_standings(conn, round - 1, away, 5, "LLLLL");
    seed_odds(conn, round, home, away, (1.8, 3.4, 4.0));
}

#[test]
fn collected_round_grades_then_predicts_the_next() {
    let mut conn = store::open_in_memory().unwrap();
    let config = ConfigHandle::new(EngineConfig::default());

    // An open prediction from round 11 whose result just arrived.
    store::insert_prediction(&conn, 11, 3, 4, Outcome::Home, 9.0).unwrap();
    store::upsert_result(&conn, 11, 3, 4, Some((2, 0))).unwrap();

    seed_strong_fixture(&conn, 12, 1, 2);

    let selected = orchestrator::on_round_collected(
        &mut conn,
        &config,
        &NullSink,
        None,
        11,
        Utc::now(),
    )
    .unwrap();

    // Old prediction settled.
    let state = store::score_state(&conn).unwrap();
    assert_eq!(state.score, 105.0);
    assert_eq!(state.predictions_correct, 1);

    // New prediction for round 12 issued.
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].round, 12);
    assert_eq!(selected[0].pick, Outcome::Home);
}

#[test]
fn shadow_rows_are_written_for_every_fixture_without_gating_selection() {
    let mut conn = store::open_in_memory().unwrap();
    let config = ConfigHandle::new(EngineConfig::default());

    seed_strong_fixture(&conn, 12, 1, 2);
    // A balanced fixture the heuristic must reject.
    seed_standings(&conn, 11, 3, 15, "WDLDW");
    seed_standings(&conn, 11, 4, 14, "DWLWD");
    seed_odds(&conn, 12, 3, 4, (2.00, 2.10, 2.05));

    let selected =
        orchestrator::run_round(&mut conn, &config, Some(&AlwaysHomeScorer), 12).unwrap();

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].home_id, 1);

    // Shadow saw both fixtures, including the rejected one.
    let shadow_rows = store::shadow_predictions_for_round(&conn, 12).unwrap();
    assert_eq!(shadow_rows.len(), 2);
    assert!(shadow_rows.iter().all(|r| r.2 == ShadowAction::Home.code()));
}

#[test]
fn shadow_failure_never_breaks_the_round() {
    let mut conn = store::open_in_memory().unwrap();
    let config = ConfigHandle::new(EngineConfig::default());
    seed_strong_fixture(&conn, 12, 1, 2);

    let selected =
        orchestrator::run_round(&mut conn, &config, Some(&PanickyScorer), 12).unwrap();

    assert_eq!(selected.len(), 1);
    let shadow_rows = store::shadow_predictions_for_round(&conn, 12).unwrap();
    assert_eq!(shadow_rows.len(), 1);
    assert_eq!(shadow_rows[0].2, ShadowAction::Skip.code());
}

#[test]
fn missing_odds_falls_back_to_simple_scoring() {
    let mut conn = store::open_in_memory().unwrap();
    let config = ConfigHandle::new(EngineConfig::default());

    seed_standings(&conn, 11, 1, 40, "WWWWW");
    seed_standings(&conn, 11, 2, 5, "LLLLL");
    store::upsert_odds(
        &conn,
        &OddsRow {
            round: 12,
            home_id: 1,
            away_id: 2,
            odds_home: None,
            odds_draw: None,
            odds_away: None,
        },
    )
    .unwrap();

    let selected = orchestrator::run_round(&mut conn, &config, None, 12).unwrap();
    // Simple path: (40-5)*0.5 + (15-0) = 32.5, well past any threshold.
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].pick, Outcome::Home);
    assert!((selected[0].confidence - 32.5).abs() < 1e-9);
}

#[test]
fn fixtures_without_standings_are_skipped_quietly() {
    let mut conn = store::open_in_memory().unwrap();
    let config = ConfigHandle::new(EngineConfig::default());
    // Odds but no standings at all.
    seed_odds(&conn, 12, 1, 2, (1.8, 3.4, 4.0));

    let selected = orchestrator::run_round(&mut conn, &config, None, 12).unwrap();
    assert!(selected.is_empty());
    assert!(store::predictions_for_round(&conn, 12).unwrap().is_empty());
}

#[test]
fn defensive_posture_filters_moderate_confidence() {
    let mut conn = store::open_in_memory().unwrap();
    let config = ConfigHandle::new(EngineConfig::default());

    // 9 graded predictions with 2 successes -> crisis threshold 10.0.
    for i in 0..9 {
        store::insert_prediction(&conn, 5, 1, 2, Outcome::Home, 8.0).unwrap();
        let id = conn.last_insert_rowid();
        store::apply_grade(&conn, id, Outcome::Home, i < 2, 1.0).unwrap();
    }
    // Keep the score healthy so the pause gate stays out of the way.
    conn.execute("UPDATE score_state SET score = 100 WHERE id = 1", [])
        .unwrap();

    seed_standings(&conn, 11, 1, 22, "WDDDD");
    seed_standings(&conn, 11, 2, 10, "WDDDD");
    seed_odds(&conn, 12, 1, 2, (1.8, 3.4, 4.0));

    let selected = orchestrator::run_round(&mut conn, &config, None, 12).unwrap();
    // rank 4.8 + home adv 2 + ideal odds 2 = 8.8 home call, below the
    // 10.0 crisis bar.
    assert!(selected.is_empty());
}
