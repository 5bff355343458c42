// src/history/mod.rs
//
// Append-only run log kept in the `etl_log` tab of the DB spreadsheet.

pub mod state;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::sheets::{SheetWriter, SheetsApi};
use crate::table::{Cell, TableRow};

pub use state::RunStatus;

pub const LOG_RANGE: &str = "etl_log!A:H";
const HEADER_CELL: &str = "etl_log!A1:A1";
/// Longest error message stored in the log.
pub const MAX_ERROR_CHARS: usize = 500;

/// Data rows written per table; zero for tables a failed run never reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub dim_chorister: usize,
    pub dim_chorister_assignment: usize,
    pub dim_song: usize,
    pub fact_attendance: usize,
    pub fact_song_time: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_ts: DateTime<Utc>,
    pub status: RunStatus,
    pub counts: RowCounts,
    pub error_message: String,
}

impl RunRecord {
    pub fn success(run_ts: DateTime<Utc>, counts: RowCounts) -> Self {
        Self {
            run_ts,
            status: RunStatus::Success,
            counts,
            error_message: String::new(),
        }
    }

    pub fn failed(run_ts: DateTime<Utc>, counts: RowCounts, error: &anyhow::Error) -> Self {
        Self {
            run_ts,
            status: RunStatus::Failed,
            counts,
            error_message: format!("{:#}", error).chars().take(MAX_ERROR_CHARS).collect(),
        }
    }
}

impl TableRow for RunRecord {
    const TAB: &'static str = "etl_log";
    const HEADER: &'static [&'static str] = &[
        "run_ts",
        "status",
        "rows_dim_chorister",
        "rows_dim_chorister_assignment",
        "rows_dim_song",
        "rows_fact_attendance",
        "rows_fact_song_time",
        "error_message",
    ];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.run_ts.to_rfc3339_opts(SecondsFormat::Secs, false)),
            Cell::from(self.status.as_str()),
            Cell::from(self.counts.dim_chorister),
            Cell::from(self.counts.dim_chorister_assignment),
            Cell::from(self.counts.dim_song),
            Cell::from(self.counts.fact_attendance),
            Cell::from(self.counts.fact_song_time),
            Cell::from(&self.error_message),
        ]
    }
}

/// Append one record, writing the header first when the log is empty.
pub async fn append_run<S: SheetsApi + ?Sized>(writer: &SheetWriter<'_, S>, record: &RunRecord) -> Result<()> {
    writer.ensure_tab(RunRecord::TAB).await?;

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(2);
    if writer.read(HEADER_CELL).await?.is_empty() {
        rows.push(RunRecord::HEADER.iter().map(|h| Cell::from(*h)).collect());
    }
    rows.push(record.to_cells());
    writer.append(LOG_RANGE, &rows).await?;

    info!(status = record.status.as_str(), "recorded run in etl_log");
    Ok(())
}
