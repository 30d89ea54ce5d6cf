//! Shadow-mode boundary to the external reinforcement-learning scorer.
//!
//! Shadow predictions are recorded for observation only: they never gate the
//! heuristic selection, and a failing scorer never aborts a round.

use anyhow::Result;
use log::{info, warn};
use rusqlite::Connection;

use crate::features::{self, FixtureContext};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowAction {
    Home,
    Draw,
    Away,
    Skip,
}

impl ShadowAction {
    /// Storage codes follow the RL action space: 0=home, 1=draw, 2=away,
    /// 3=skip.
    pub fn code(self) -> i64 {
        match self {
            ShadowAction::Home => 0,
            ShadowAction::Draw => 1,
            ShadowAction::Away => 2,
            ShadowAction::Skip => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ShadowAction::Home),
            1 => Some(ShadowAction::Draw),
            2 => Some(ShadowAction::Away),
            3 => Some(ShadowAction::Skip),
            _ => None,
        }
    }
}

/// Contract with the external model: a fixed-length observation in, a
/// discrete action plus a confidence in [0, 1] out.
pub trait ShadowScorer {
    fn score(&self, observation: &[f64]) -> Result<(ShadowAction, f64)>;
}

/// Best-effort shadow pass over the round's fixtures. Each failure degrades
/// that fixture to a skip; storage errors for a single shadow row are logged
/// and do not propagate.
pub fn record_shadow_predictions(
    conn: &Connection,
    scorer: &dyn ShadowScorer,
    fixtures: &[FixtureContext],
    season_rounds: i64,
) {
    for ctx in fixtures {
        let observation = features::shadow_feature_vector(ctx, season_rounds);
        let (action, confidence) = match scorer.score(&observation) {
            Ok((action, confidence)) => (action, confidence.clamp(0.0, 1.0)),
            Err(err) => {
                warn!(
                    "round {} fixture {}v{}: shadow scorer failed ({err:#}), recording skip",
                    ctx.round, ctx.home_id, ctx.away_id
                );
                (ShadowAction::Skip, 0.0)
            }
        };

        if action != ShadowAction::Skip {
            info!(
                "round {} fixture {}v{}: shadow suggests {:?} ({:.2})",
                ctx.round, ctx.home_id, ctx.away_id, action, confidence
            );
        }

        if let Err(err) = store::insert_shadow_prediction(
            conn,
            ctx.round,
            ctx.home_id,
            ctx.away_id,
            action.code(),
            confidence,
        ) {
            warn!(
                "round {} fixture {}v{}: failed to store shadow prediction ({err:#})",
                ctx.round, ctx.home_id, ctx.away_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedScorer(ShadowAction, f64);

    impl ShadowScorer for FixedScorer {
        fn score(&self, observation: &[f64]) -> Result<(ShadowAction, f64)> {
            assert_eq!(observation.len(), 10);
            Ok((self.0, self.1))
        }
    }

    struct FailingScorer;

    impl ShadowScorer for FailingScorer {
        fn score(&self, _observation: &[f64]) -> Result<(ShadowAction, f64)> {
            Err(anyhow!("model not loaded"))
        }
    }

    fn fixture(round: i64, home_id: i64, away_id: i64) -> FixtureContext {
        FixtureContext {
            round,
            home_id,
            away_id,
            home: None,
            away: None,
            home_goals: None,
            away_goals: None,
            head_to_head: Vec::new(),
            odds: None,
        }
    }

    #[test]
    fn action_codes_round_trip() {
        for action in [
            ShadowAction::Home,
            ShadowAction::Draw,
            ShadowAction::Away,
            ShadowAction::Skip,
        ] {
            assert_eq!(ShadowAction::from_code(action.code()), Some(action));
        }
        assert_eq!(ShadowAction::from_code(7), None);
    }

    #[test]
    fn records_one_row_per_fixture() {
        let conn = store::open_in_memory().unwrap();
        let fixtures = vec![fixture(5, 1, 2), fixture(5, 3, 4)];
        record_shadow_predictions(&conn, &FixedScorer(ShadowAction::Home, 0.9), &fixtures, 38);
        let rows = store::shadow_predictions_for_round(&conn, 5).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].2, ShadowAction::Home.code());
        assert!((rows[0].3 - 0.9).abs() < 1e-9);
    }

    #[test]
    fn scorer_failure_degrades_to_skip() {
        let conn = store::open_in_memory().unwrap();
        record_shadow_predictions(&conn, &FailingScorer, &[fixture(5, 1, 2)], 38);
        let rows = store::shadow_predictions_for_round(&conn, 5).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, ShadowAction::Skip.code());
        assert_eq!(rows[0].3, 0.0);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let conn = store::open_in_memory().unwrap();
        record_shadow_predictions(&conn, &FixedScorer(ShadowAction::Away, 3.5), &[fixture(5, 1, 2)], 38);
        let rows = store::shadow_predictions_for_round(&conn, 5).unwrap();
        assert_eq!(rows[0].3, 1.0);
    }
}
