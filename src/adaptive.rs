//! Self-adjusting confidence thresholds. The controller looks at the last
//! few graded predictions and moves the bar for the current round: a bad run
//! raises it, a hot streak lowers it.

use anyhow::Result;
use log::info;
use rusqlite::Connection;

use crate::store;

/// How many graded predictions feed the success-rate window.
const PERFORMANCE_WINDOW: usize = 9;

/// Rounds in [RISK_PHASE_START, ADAPTIVE_PHASE_START) use a fixed moderate
/// threshold; from ADAPTIVE_PHASE_START on, the rate decides.
const ADAPTIVE_PHASE_START: i64 = 10;

const CRISIS_RATE: f64 = 0.35;
const CAUTIOUS_RATE: f64 = 0.55;
const AGGRESSIVE_RATE: f64 = 0.80;

#[derive(Debug, Clone, Copy)]
pub struct PerformanceWindow {
    pub correct: usize,
    pub total: usize,
}

impl PerformanceWindow {
    /// Success rate over the window. With no history the controller starts
    /// fully confident on purpose: a fresh session gets the standard
    /// threshold, not the defensive one.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.correct as f64 / self.total as f64
    }
}

pub fn recent_performance(conn: &Connection) -> Result<PerformanceWindow> {
    let flags = store::recent_graded_success(conn, PERFORMANCE_WINDOW)?;
    Ok(PerformanceWindow {
        correct: flags.iter().filter(|s| **s).count(),
        total: flags.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskPosture {
    /// Not enough rounds played to predict at all.
    TooEarly,
    /// Early rounds: moderate fixed threshold.
    RiskTaking,
    /// Recent run is a disaster, only near-certain calls pass.
    Defensive,
    Cautious,
    Standard,
    /// Recent run is hot, loosen up.
    Aggressive,
}

impl RiskPosture {
    pub fn threshold(self) -> Option<f64> {
        match self {
            RiskPosture::TooEarly => None,
            RiskPosture::RiskTaking => Some(5.0),
            RiskPosture::Defensive => Some(10.0),
            RiskPosture::Cautious => Some(8.5),
            RiskPosture::Standard => Some(7.0),
            RiskPosture::Aggressive => Some(6.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskPosture::TooEarly => "too-early",
            RiskPosture::RiskTaking => "risk-taking",
            RiskPosture::Defensive => "defensive",
            RiskPosture::Cautious => "cautious",
            RiskPosture::Standard => "standard",
            RiskPosture::Aggressive => "aggressive",
        }
    }
}

pub fn posture_for_round(round: i64, min_round: i64, window: PerformanceWindow) -> RiskPosture {
    if round < min_round {
        return RiskPosture::TooEarly;
    }
    if round < ADAPTIVE_PHASE_START {
        return RiskPosture::RiskTaking;
    }
    let rate = window.rate();
    if rate < CRISIS_RATE {
        RiskPosture::Defensive
    } else if rate < CAUTIOUS_RATE {
        RiskPosture::Cautious
    } else if rate > AGGRESSIVE_RATE {
        RiskPosture::Aggressive
    } else {
        RiskPosture::Standard
    }
}

/// Convenience wrapper: window from the store, posture for the round, with a
/// log line describing the decision.
pub fn select_posture(conn: &Connection, round: i64, min_round: i64) -> Result<RiskPosture> {
    let window = recent_performance(conn)?;
    let posture = posture_for_round(round, min_round, window);
    info!(
        "round {round}: recent form {}/{} ({:.0}%), posture {}",
        window.correct,
        window.total,
        window.rate() * 100.0,
        posture.label()
    );
    Ok(posture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Outcome;

    fn window(correct: usize, total: usize) -> PerformanceWindow {
        PerformanceWindow { correct, total }
    }

    #[test]
    fn empty_history_is_optimistic() {
        assert_eq!(window(0, 0).rate(), 1.0);
        assert_eq!(
            posture_for_round(15, 4, window(0, 0)),
            RiskPosture::Standard
        );
    }

    #[test]
    fn early_rounds_gate_and_risk_phase() {
        assert_eq!(posture_for_round(3, 4, window(9, 9)), RiskPosture::TooEarly);
        assert_eq!(
            posture_for_round(4, 4, window(0, 9)),
            RiskPosture::RiskTaking
        );
        assert_eq!(
            posture_for_round(9, 4, window(9, 9)),
            RiskPosture::RiskTaking
        );
    }

    #[test]
    fn rate_bands_pick_thresholds() {
        // 2/9 ~ 0.222 -> crisis
        let posture = posture_for_round(12, 4, window(2, 9));
        assert_eq!(posture, RiskPosture::Defensive);
        assert_eq!(posture.threshold(), Some(10.0));

        // 4/9 ~ 0.444 -> cautious
        assert_eq!(
            posture_for_round(12, 4, window(4, 9)).threshold(),
            Some(8.5)
        );
        // 6/9 ~ 0.667 -> standard
        assert_eq!(
            posture_for_round(12, 4, window(6, 9)).threshold(),
            Some(7.0)
        );
        // 8/9 ~ 0.889 -> aggressive
        assert_eq!(
            posture_for_round(12, 4, window(8, 9)).threshold(),
            Some(6.0)
        );
    }

    #[test]
    fn performance_window_reads_latest_grades() {
        let conn = store::open_in_memory().unwrap();
        for i in 0..12 {
            store::insert_prediction(&conn, i, 1, 2, Outcome::Home, 8.0).unwrap();
            let id = conn.last_insert_rowid();
            // Only the 3 most recent grades are successes; the window of 9
            // must see exactly those 3.
            let success = i >= 9;
            store::apply_grade(&conn, id, Outcome::Home, success, 1.0).unwrap();
        }
        let window = recent_performance(&conn).unwrap();
        assert_eq!(window.total, 9);
        assert_eq!(window.correct, 3);
        assert!((window.rate() - 1.0 / 3.0).abs() < 1e-9);
    }
}
