//! Session lifecycle: the score-driven reinforcement pause and the
//! season-boundary detection that triggers archive-then-reset.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rusqlite::Connection;

use crate::archive::ArchiveSink;
use crate::config::EngineConfig;
use crate::store;

/// A backwards jump of at least this many rounds is an end-of-season wrap;
/// a forward jump of at least this many needs the staleness check.
const ROUND_JUMP: i64 = 10;
const STALE_AFTER_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionGate {
    Active,
    /// Score is critical but a pause just ended; keep predicting and try to
    /// recover instead of re-pausing immediately.
    Immunity { pause_ended: i64 },
    Paused { until: i64 },
}

impl SessionGate {
    pub fn allows_predictions(self) -> bool {
        !matches!(self, SessionGate::Paused { .. })
    }
}

/// Evaluates (and possibly activates) the reinforcement pause for a round.
/// Activation writes the new watermark; everything else only reads.
pub fn evaluate_pause_gate(
    conn: &Connection,
    round: i64,
    config: &EngineConfig,
) -> Result<SessionGate> {
    let state = store::score_state(conn)?;

    if state.pause_until >= round {
        info!(
            "round {round}: reinforcement pause active until round {}",
            state.pause_until
        );
        return Ok(SessionGate::Paused {
            until: state.pause_until,
        });
    }

    if state.score >= config.critical_score {
        return Ok(SessionGate::Active);
    }

    let in_immunity = round <= state.pause_until + config.immunity_rounds;
    if in_immunity {
        info!(
            "round {round}: score critical ({:.1}) inside immunity window (pause ended round {}), staying active",
            state.score, state.pause_until
        );
        return Ok(SessionGate::Immunity {
            pause_ended: state.pause_until,
        });
    }

    let until = round + config.pause_rounds;
    store::set_pause_until(conn, until)?;
    warn!(
        "round {round}: score critical ({:.1} < {:.1}), pausing predictions until round {until}",
        state.score, config.critical_score
    );
    Ok(SessionGate::Paused { until })
}

/// Decides whether the round number reported upstream belongs to a new
/// season. Small backwards jumps are stale data; big forward jumps are only
/// believed when enough wall-clock time has passed since the last update.
pub fn detect_new_session(
    conn: &Connection,
    latest_round: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    if latest_round <= 0 {
        return Ok(false);
    }

    let stored_round = store::max_stored_round(conn)?;
    let state = store::score_state(conn)?;

    if state.session_archived && stored_round > 0 {
        info!("session already archived, round {latest_round} starts a new one");
        return Ok(true);
    }
    if stored_round == 0 {
        return Ok(false);
    }

    let delta = latest_round - stored_round;
    if delta <= -ROUND_JUMP {
        info!("round wrap detected ({stored_round} -> {latest_round}), new session");
        return Ok(true);
    }
    if delta < 0 {
        info!("stale round {latest_round} (stored {stored_round}), ignoring");
        return Ok(false);
    }
    if delta < ROUND_JUMP {
        return Ok(false);
    }

    // Forward jump of 10+ rounds: implausible unless the monitor was down
    // for a while.
    let Some(last_update) = state.last_update.as_deref() else {
        warn!("round jump +{delta} with no last-update timestamp, assuming new session");
        return Ok(true);
    };
    match DateTime::parse_from_rfc3339(last_update) {
        Ok(updated_at) => {
            let elapsed = now.signed_duration_since(updated_at.with_timezone(&Utc));
            if elapsed.num_seconds() > STALE_AFTER_SECS {
                info!(
                    "round jump +{delta} after {}min idle, new session",
                    elapsed.num_minutes()
                );
                Ok(true)
            } else {
                info!(
                    "round jump +{delta} but only {}min elapsed, treating as false positive",
                    elapsed.num_minutes()
                );
                Ok(false)
            }
        }
        Err(err) => {
            warn!("unparseable last-update timestamp {last_update:?} ({err}), not switching session");
            Ok(false)
        }
    }
}

/// Exports the finished session and clears the per-session tables. The
/// export must succeed before anything is deleted; a failed export leaves
/// all data untouched.
pub fn archive_and_reset(conn: &mut Connection, sink: &dyn ArchiveSink) -> Result<()> {
    let dump = store::collect_session_dump(conn).context("collect session dump")?;
    sink.export(&dump).context("export session archive")?;
    store::mark_session_archived(conn)?;

    let tx = conn.transaction().context("begin session reset")?;
    store::reset_session_data(&tx)?;
    tx.commit().context("commit session reset")?;
    info!("session reset complete, new season starts clean");
    Ok(())
}
