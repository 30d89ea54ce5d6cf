//! Per-round driver: grade what can be graded, gate on the session state,
//! pick a threshold, score the round's fixtures and persist the best calls.
//!
//! The external monitor calls `on_round_collected` once per newly collected
//! round; there is never more than one writer per round by design, and each
//! step runs inside its own transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::Connection;

use crate::adaptive;
use crate::archive::ArchiveSink;
use crate::config::ConfigHandle;
use crate::features::{FixtureContext, OddsTriple, TeamSnapshot};
use crate::form::Form;
use crate::scoring::{self, Outcome, ScoreDecision};
use crate::session::{self, SessionGate};
use crate::shadow::{self, ShadowScorer};
use crate::store::{self, OddsRow};

#[derive(Debug, Clone)]
pub struct SelectedPrediction {
    pub round: i64,
    pub home_id: i64,
    pub away_id: i64,
    pub pick: Outcome,
    pub confidence: f64,
}

/// Grades every pending prediction whose fixture now has a final score.
/// Already-graded rows are untouched, so re-running is a no-op. Runs in one
/// transaction: either all newly gradable rows are graded or none are.
pub fn grade_pending(conn: &mut Connection, config: &ConfigHandle) -> Result<usize> {
    let config = config.snapshot();
    let tx = conn.transaction().context("begin grading transaction")?;

    let mut graded = 0usize;
    for prediction in store::ungraded_predictions(&tx)? {
        let Some((home_goals, away_goals)) =
            store::result_score(&tx, prediction.round, prediction.home_id, prediction.away_id)?
        else {
            continue;
        };
        let actual = Outcome::from_score(home_goals, away_goals);
        let success = actual == prediction.pick;
        let points = if success {
            config.reward_points
        } else {
            config.penalty_points
        };
        store::apply_grade(&tx, prediction.id, actual, success, points)?;
        info!(
            "round {} fixture {}v{}: graded {} (picked {}, actual {}, {points:+.0} pts)",
            prediction.round,
            prediction.home_id,
            prediction.away_id,
            if success { "success" } else { "failure" },
            prediction.pick.code(),
            actual.code()
        );
        graded += 1;
    }

    tx.commit().context("commit grading transaction")?;
    if graded > 0 {
        info!("grading pass complete, {graded} predictions settled");
    }
    Ok(graded)
}

fn team_snapshot(conn: &Connection, round: i64, team_id: i64) -> Result<Option<TeamSnapshot>> {
    let Some(row) = store::latest_standing_before(conn, round, team_id)? else {
        return Ok(None);
    };
    Ok(Some(TeamSnapshot {
        position: row.position,
        points: row.points,
        form: Form::parse(&row.form),
    }))
}

fn build_fixture_context(conn: &Connection, odds_row: &OddsRow) -> Result<FixtureContext> {
    let odds = match (odds_row.odds_home, odds_row.odds_draw, odds_row.odds_away) {
        (Some(home), Some(draw), Some(away)) => Some(OddsTriple { home, draw, away }),
        _ => None,
    };
    Ok(FixtureContext {
        round: odds_row.round,
        home_id: odds_row.home_id,
        away_id: odds_row.away_id,
        home: team_snapshot(conn, odds_row.round, odds_row.home_id)?,
        away: team_snapshot(conn, odds_row.round, odds_row.away_id)?,
        home_goals: store::recent_goal_averages(conn, odds_row.home_id)?,
        away_goals: store::recent_goal_averages(conn, odds_row.away_id)?,
        head_to_head: store::head_to_head(conn, odds_row.home_id, odds_row.away_id)?,
        odds,
    })
}

/// Runs selection for one round. Returns the capped, confidence-sorted list
/// that was persisted; an empty list when the session is paused or the round
/// is too early.
pub fn run_round(
    conn: &mut Connection,
    config_handle: &ConfigHandle,
    shadow_scorer: Option<&dyn ShadowScorer>,
    round: i64,
) -> Result<Vec<SelectedPrediction>> {
    let config = config_handle.snapshot();

    if round < config.first_prediction_round {
        info!("round {round}: before prediction start, collecting data only");
        return Ok(Vec::new());
    }

    let gate = session::evaluate_pause_gate(conn, round, &config)?;
    if !gate.allows_predictions() {
        return Ok(Vec::new());
    }
    if let SessionGate::Immunity { pause_ended } = gate {
        info!("round {round}: predicting under immunity (pause ended round {pause_ended})");
    }

    let posture = adaptive::select_posture(conn, round, config.first_prediction_round)?;
    let Some(threshold) = posture.threshold() else {
        return Ok(Vec::new());
    };

    let mut contexts = Vec::new();
    for odds_row in store::odds_for_round(conn, round)? {
        contexts.push(build_fixture_context(conn, &odds_row)?);
    }

    let mut candidates: Vec<SelectedPrediction> = Vec::new();
    for ctx in &contexts {
        let decision = if config.enhanced_scoring {
            scoring::score_with_fallback(ctx)
        } else {
            scoring::score_simple(ctx)
        };
        if let ScoreDecision::Call {
            outcome,
            confidence,
        } = decision
            && confidence > threshold
        {
            candidates.push(SelectedPrediction {
                round,
                home_id: ctx.home_id,
                away_id: ctx.away_id,
                pick: outcome,
                confidence,
            });
        }
    }

    // Shadow pass over every fixture, selected or not. Strictly observational
    // and never allowed to fail the round.
    if let Some(scorer) = shadow_scorer {
        shadow::record_shadow_predictions(conn, scorer, &contexts, config.season_rounds);
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(config.max_predictions_per_round);

    let tx = conn.transaction().context("begin selection transaction")?;
    for candidate in &candidates {
        store::insert_prediction(
            &tx,
            candidate.round,
            candidate.home_id,
            candidate.away_id,
            candidate.pick,
            candidate.confidence,
        )?;
    }
    tx.commit().context("commit selection transaction")?;

    info!(
        "round {round}: {} predictions persisted (threshold {threshold}, posture {})",
        candidates.len(),
        posture.label()
    );
    Ok(candidates)
}

/// Entry point for the monitor once a round's data is fully collected:
/// handle a possible season boundary, settle old predictions, then predict
/// the next round.
pub fn on_round_collected(
    conn: &mut Connection,
    config_handle: &ConfigHandle,
    archive_sink: &dyn ArchiveSink,
    shadow_scorer: Option<&dyn ShadowScorer>,
    collected_round: i64,
    now: DateTime<Utc>,
) -> Result<Vec<SelectedPrediction>> {
    if session::detect_new_session(conn, collected_round, now)? {
        session::archive_and_reset(conn, archive_sink)?;
        return Ok(Vec::new());
    }

    grade_pending(conn, config_handle)?;
    run_round(conn, config_handle, shadow_scorer, collected_round + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::store::{OddsRow, StandingRow};

    fn seed_standings(conn: &Connection, round: i64, team_id: i64, points: i64, form: &str) {
        store::upsert_standing(
            conn,
            &StandingRow {
                round,
                team_id,
                position: None,
                points,
                form: form.to_string(),
            },
        )
        .unwrap();
    }

    fn seed_odds(conn: &Connection, round: i64, home: i64, away: i64, o: (f64, f64, f64)) {
        store::upsert_odds(
            conn,
            &OddsRow {
                round,
                home_id: home,
                away_id: away,
                odds_home: Some(o.0),
                odds_draw: Some(o.1),
                odds_away: Some(o.2),
            },
        )
        .unwrap();
    }

    fn handle() -> ConfigHandle {
        ConfigHandle::new(EngineConfig::default())
    }

    #[test]
    fn early_rounds_never_predict() {
        let mut conn = store::open_in_memory().unwrap();
        seed_standings(&conn, 2, 1, 9, "WWW");
        seed_standings(&conn, 2, 2, 0, "LLL");
        seed_odds(&conn, 3, 1, 2, (1.8, 3.4, 4.0));
        let selected = run_round(&mut conn, &handle(), None, 3).unwrap();
        assert!(selected.is_empty());
        assert!(store::predictions_for_round(&conn, 3).unwrap().is_empty());
    }

    #[test]
    fn strong_fixture_is_selected_and_persisted() {
        let mut conn = store::open_in_memory().unwrap();
        seed_standings(&conn, 11, 1, 30, "WWWWW");
        seed_standings(&conn, 11, 2, 10, "LLLLL");
        seed_odds(&conn, 12, 1, 2, (1.8, 3.4, 4.0));

        let selected = run_round(&mut conn, &handle(), None, 12).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].pick, Outcome::Home);
        assert!(selected[0].confidence > 7.0);

        let persisted = store::predictions_for_round(&conn, 12).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].pick, Outcome::Home);
        assert!((persisted[0].confidence - selected[0].confidence).abs() < 1e-9);
    }

    #[test]
    fn selection_is_capped_and_sorted_by_confidence() {
        let mut conn = store::open_in_memory().unwrap();
        // Four one-sided fixtures with growing point gaps.
        for (i, gap) in [22, 26, 30, 34].iter().enumerate() {
            let home = (i as i64) * 2 + 1;
            let away = home + 1;
            seed_standings(&conn, 11, home, *gap, "WWWWW");
            seed_standings(&conn, 11, away, 0, "LLLLL");
            seed_odds(&conn, 12, home, away, (1.8, 3.4, 4.0));
        }

        let selected = run_round(&mut conn, &handle(), None, 12).unwrap();
        assert_eq!(selected.len(), 3);
        assert!(selected[0].confidence >= selected[1].confidence);
        assert!(selected[1].confidence >= selected[2].confidence);
        // The weakest fixture (gap 22) was the one dropped.
        assert!(selected.iter().all(|p| p.home_id != 1));
    }

    #[test]
    fn paused_session_yields_no_predictions() {
        let mut conn = store::open_in_memory().unwrap();
        seed_standings(&conn, 11, 1, 30, "WWWWW");
        seed_standings(&conn, 11, 2, 10, "LLLLL");
        seed_odds(&conn, 12, 1, 2, (1.8, 3.4, 4.0));
        store::set_pause_until(&conn, 13).unwrap();

        let selected = run_round(&mut conn, &handle(), None, 12).unwrap();
        assert!(selected.is_empty());
        assert!(store::predictions_for_round(&conn, 12).unwrap().is_empty());
    }

    #[test]
    fn grading_settles_scores_and_is_idempotent() {
        let mut conn = store::open_in_memory().unwrap();
        store::insert_prediction(&conn, 5, 1, 2, Outcome::Home, 8.0).unwrap();
        store::insert_prediction(&conn, 5, 3, 4, Outcome::Away, 9.0).unwrap();
        store::upsert_result(&conn, 5, 1, 2, Some((2, 0))).unwrap();
        store::upsert_result(&conn, 5, 3, 4, Some((1, 1))).unwrap();

        let config = handle();
        assert_eq!(grade_pending(&mut conn, &config).unwrap(), 2);
        let state = store::score_state(&conn).unwrap();
        // +5 for the home hit, -8 for the away miss.
        assert_eq!(state.score, 97.0);
        assert_eq!(state.predictions_total, 2);
        assert_eq!(state.predictions_correct, 1);

        assert_eq!(grade_pending(&mut conn, &config).unwrap(), 0);
        assert_eq!(store::score_state(&conn).unwrap().score, 97.0);
    }

    #[test]
    fn grading_waits_for_final_scores() {
        let mut conn = store::open_in_memory().unwrap();
        store::insert_prediction(&conn, 5, 1, 2, Outcome::Home, 8.0).unwrap();
        store::upsert_result(&conn, 5, 1, 2, None).unwrap();
        assert_eq!(grade_pending(&mut conn, &handle()).unwrap(), 0);
        assert_eq!(store::ungraded_predictions(&conn).unwrap().len(), 1);
    }
}
