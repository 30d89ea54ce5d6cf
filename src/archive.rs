//! Session archival. At a season boundary the whole session is exported
//! through an `ArchiveSink` before any table is cleared; a failed export
//! aborts the reset.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::info;
use rust_xlsxwriter::{Workbook, Worksheet};

#[derive(Debug, Clone)]
pub struct ArchivedResult {
    pub round: i64,
    pub home: String,
    pub away: String,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ArchivedPrediction {
    pub round: i64,
    pub home: String,
    pub away: String,
    pub pick: String,
    pub actual: Option<String>,
    pub success: Option<bool>,
    pub points_delta: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ArchivedStanding {
    pub team: String,
    pub points: i64,
    pub form: String,
}

/// Everything worth keeping from a finished session.
#[derive(Debug, Clone)]
pub struct SessionDump {
    pub results: Vec<ArchivedResult>,
    pub predictions: Vec<ArchivedPrediction>,
    pub final_standings: Vec<ArchivedStanding>,
    pub score: f64,
    pub predictions_total: i64,
    pub predictions_correct: i64,
}

pub trait ArchiveSink {
    fn export(&self, dump: &SessionDump) -> Result<()>;
}

/// Writes numbered `session_NNN.xlsx` workbooks into an archive directory,
/// one worksheet per section.
pub struct XlsxArchiveSink {
    dir: PathBuf,
}

impl XlsxArchiveSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn next_session_path(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create archive dir {}", self.dir.display()))?;

        let mut max_id = 0u32;
        for entry in fs::read_dir(&self.dir).context("list archive dir")? {
            let entry = entry.context("read archive dir entry")?;
            if let Some(id) = session_number(&entry.path()) {
                max_id = max_id.max(id);
            }
        }
        Ok(self.dir.join(format!("session_{:03}.xlsx", max_id + 1)))
    }
}

fn session_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_prefix("session_")?.strip_suffix(".xlsx")?;
    stem.parse::<u32>().ok()
}

impl ArchiveSink for XlsxArchiveSink {
    fn export(&self, dump: &SessionDump) -> Result<()> {
        let path = self.next_session_path()?;
        let mut workbook = Workbook::new();

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Results")?;
            write_rows(sheet, &results_rows(dump))?;
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Predictions")?;
            write_rows(sheet, &prediction_rows(dump))?;
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Score")?;
            write_rows(sheet, &score_rows(dump))?;
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("FinalStandings")?;
            write_rows(sheet, &standings_rows(dump))?;
        }

        workbook
            .save(&path)
            .with_context(|| format!("save session archive {}", path.display()))?;

        // An empty archive file means the export silently failed.
        let size = fs::metadata(&path)
            .with_context(|| format!("stat session archive {}", path.display()))?
            .len();
        if size == 0 {
            return Err(anyhow!("session archive {} is empty", path.display()));
        }
        info!("archived session to {}", path.display());
        Ok(())
    }
}

fn results_rows(dump: &SessionDump) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Round".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Home Goals".to_string(),
        "Away Goals".to_string(),
    ]];
    for r in &dump.results {
        rows.push(vec![
            r.round.to_string(),
            r.home.clone(),
            r.away.clone(),
            opt_to_string(r.home_goals),
            opt_to_string(r.away_goals),
        ]);
    }
    rows
}

fn prediction_rows(dump: &SessionDump) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Round".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Pick".to_string(),
        "Actual".to_string(),
        "Success".to_string(),
        "Points".to_string(),
    ]];
    for p in &dump.predictions {
        rows.push(vec![
            p.round.to_string(),
            p.home.clone(),
            p.away.clone(),
            p.pick.clone(),
            p.actual.clone().unwrap_or_default(),
            p.success
                .map(|s| if s { "yes" } else { "no" }.to_string())
                .unwrap_or_default(),
            opt_to_string(p.points_delta),
        ]);
    }
    rows
}

fn score_rows(dump: &SessionDump) -> Vec<Vec<String>> {
    vec![
        vec![
            "Final Score".to_string(),
            "Predictions Total".to_string(),
            "Predictions Correct".to_string(),
        ],
        vec![
            format!("{:.2}", dump.score),
            dump.predictions_total.to_string(),
            dump.predictions_correct.to_string(),
        ],
    ]
}

fn standings_rows(dump: &SessionDump) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Team".to_string(),
        "Points".to_string(),
        "Form".to_string(),
    ]];
    for s in &dump.final_standings {
        rows.push(vec![s.team.clone(), s.points.to_string(), s.form.clone()]);
    }
    rows
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
