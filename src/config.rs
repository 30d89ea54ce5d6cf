use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The 20 teams of the virtual league, inserted once at bootstrap.
pub const TEAM_ROSTER: [&str; 20] = [
    "London Reds",
    "Manchester Blue",
    "Manchester Red",
    "Wolverhampton",
    "N. Forest",
    "Fulham",
    "West Ham",
    "Spurs",
    "London Blues",
    "Brighton",
    "Brentford",
    "Everton",
    "Aston Villa",
    "Leeds",
    "Sunderland",
    "Crystal Palace",
    "Liverpool",
    "Newcastle",
    "Burnley",
    "Bournemouth",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Multi-factor scoring with odds analysis; the simple ranking+form
    /// scorer is only a fallback when odds are missing.
    pub enhanced_scoring: bool,
    pub max_predictions_per_round: usize,
    /// No predictions are issued before this round.
    pub first_prediction_round: i64,
    pub reward_points: f64,
    pub penalty_points: f64,
    /// Running score below this activates the reinforcement pause.
    pub critical_score: f64,
    /// Rounds to stay paused once activated.
    pub pause_rounds: i64,
    /// Rounds after a pause ends during which a critical score does not
    /// re-trigger the pause.
    pub immunity_rounds: i64,
    /// Rounds in a full season; feeds the shadow round-progress feature.
    pub season_rounds: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enhanced_scoring: true,
            max_predictions_per_round: 3,
            first_prediction_round: 4,
            reward_points: 5.0,
            penalty_points: -8.0,
            critical_score: 60.0,
            pause_rounds: 2,
            immunity_rounds: 3,
            season_rounds: 38,
        }
    }
}

/// Shared configuration handle. Writers go through `update`; each round takes
/// a by-value `snapshot` and uses it consistently for that round.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<EngineConfig>>,
}

impl ConfigHandle {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> EngineConfig {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut EngineConfig)) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut guard);
    }
}

pub fn load_config(path: &Path) -> EngineConfig {
    let Ok(raw) = fs::read_to_string(path) else {
        return EngineConfig::default();
    };
    serde_json::from_str(&raw).unwrap_or_default()
}

pub fn save_config(path: &Path, config: &EngineConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = tmp_path(path);
    let json = serde_json::to_string_pretty(config).context("serialize engine config")?;
    fs::write(&tmp, json).context("write engine config")?;
    fs::rename(&tmp, path).context("swap engine config")?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}
