// src/pipeline.rs
//
// RAW → dims → facts → marts → DB spreadsheet, one stage at a time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use crate::dims::{build_dimensions, DimChorister, DimChoristerAssignment, DimSong, Dimensions};
use crate::error::EtlError;
use crate::facts::{
    attendance_observations, build_fact_attendance, build_fact_song_time, FactAttendance,
    FactSongTime,
};
use crate::history::{append_run, RowCounts, RunRecord};
use crate::marts::Marts;
use crate::raw::layout::{RAW_RANGE, RAW_TAB};
use crate::raw::{RawSheet, RawTable};
use crate::sheets::{A1Range, SheetWriter, SheetsApi};
use crate::table::{read_table, to_grid, Cell, FromRecord, TableRow};

/// Fixed range of the connectivity smoke-test tab.
pub const MEMBERS_RANGE: &str = "members!A1:C2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub member_id: String,
    pub full_name: String,
    pub is_active: bool,
}

impl Member {
    /// The dummy row written on every run.
    pub fn smoke_test() -> Self {
        Self {
            member_id: "test_member_1".to_string(),
            full_name: "Test Member".to_string(),
            is_active: true,
        }
    }
}

impl TableRow for Member {
    const TAB: &'static str = "members";
    const HEADER: &'static [&'static str] = &["member_id", "full_name", "is_active"];

    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(&self.member_id),
            Cell::from(&self.full_name),
            Cell::from(if self.is_active { "TRUE" } else { "FALSE" }),
        ]
    }
}

/// Every table one run produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warehouse {
    pub dims: Dimensions,
    pub fact_attendance: Vec<FactAttendance>,
    pub fact_song_time: Vec<FactSongTime>,
    pub marts: Marts,
}

impl Warehouse {
    pub fn row_counts(&self) -> RowCounts {
        RowCounts {
            dim_chorister: self.dims.choristers.len(),
            dim_chorister_assignment: self.dims.assignments.len(),
            dim_song: self.dims.songs.len(),
            fact_attendance: self.fact_attendance.len(),
            fact_song_time: self.fact_song_time.len(),
        }
    }
}

/// Pure transform of the RAW tab's values.
pub fn transform(values: Vec<Vec<String>>) -> Result<Warehouse> {
    let table = RawTable::from_values(values);
    let sheet = RawSheet::parse(&table)?;
    info!(
        rows = table.len(),
        choristers = sheet.choristers.len(),
        songs = sheet.songs.len(),
        dates = sheet.rehearsal_columns.len(),
        "read RAW sheet"
    );

    let dims = build_dimensions(&sheet);
    let observations = attendance_observations(&sheet, &dims);
    let fact_attendance = build_fact_attendance(&dims.choristers, &dims.rehearsals, &observations);
    let fact_song_time = build_fact_song_time(&sheet, &dims);
    info!(
        fact_attendance = fact_attendance.len(),
        fact_song_time = fact_song_time.len(),
        "built facts"
    );

    let marts = Marts::build(
        &dims.choristers,
        &dims.assignments,
        &dims.songs,
        &fact_attendance,
        &fact_song_time,
    )?;

    Ok(Warehouse {
        dims,
        fact_attendance,
        fact_song_time,
        marts,
    })
}

async fn require_tabs<S: SheetsApi + ?Sized>(api: &S, spreadsheet_id: &str, tabs: &[&str]) -> Result<()> {
    let titles = api.sheet_titles(spreadsheet_id).await?;
    let missing: Vec<String> = tabs
        .iter()
        .filter(|t| !titles.iter().any(|title| title == *t))
        .map(|t| t.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::MissingTabs(missing).into())
    }
}

pub async fn write_marts<S: SheetsApi + ?Sized>(writer: &SheetWriter<'_, S>, marts: &Marts) -> Result<()> {
    writer.write_table(&marts.attendance).await?;
    writer.write_table(&marts.chorister_attendance).await?;
    writer.write_table(&marts.rehearsal_attendance).await?;
    writer.write_table(&marts.song_rehearsal).await?;
    writer.write_table(&marts.chorister_song).await?;
    Ok(())
}

/// Write every table. `counts` is filled in as tables land, so a failure part
/// way through still reports what was written.
pub async fn write_warehouse<S: SheetsApi + ?Sized>(
    writer: &SheetWriter<'_, S>,
    warehouse: &Warehouse,
    counts: &mut RowCounts,
) -> Result<()> {
    counts.dim_chorister = writer.write_table(&warehouse.dims.choristers).await?;
    counts.dim_chorister_assignment = writer.write_table(&warehouse.dims.assignments).await?;
    counts.dim_song = writer.write_table(&warehouse.dims.songs).await?;
    writer.write_table(&warehouse.dims.rehearsals).await?;
    counts.fact_attendance = writer.write_table(&warehouse.fact_attendance).await?;
    counts.fact_song_time = writer.write_table(&warehouse.fact_song_time).await?;
    write_marts(writer, &warehouse.marts).await
}

/// One full run without the run log.
#[instrument(skip(api, counts))]
pub async fn run<S: SheetsApi + ?Sized>(
    api: &S,
    raw_spreadsheet_id: &str,
    target_spreadsheet_id: &str,
    counts: &mut RowCounts,
) -> Result<Warehouse> {
    require_tabs(api, raw_spreadsheet_id, &[RAW_TAB])
        .await
        .context("checking RAW spreadsheet")?;

    let writer = SheetWriter::new(api, target_spreadsheet_id);
    writer
        .overwrite(MEMBERS_RANGE, &to_grid(&[Member::smoke_test()]))
        .await?;
    info!(range = MEMBERS_RANGE, "wrote members smoke test");

    let values = api
        .get_values(raw_spreadsheet_id, RAW_RANGE)
        .await
        .with_context(|| format!("reading {}", RAW_RANGE))?;
    let warehouse = transform(values)?;

    write_warehouse(&writer, &warehouse, counts).await?;
    info!(?counts, "run finished");
    Ok(warehouse)
}

/// `run`, then one `etl_log` row for the outcome. A pipeline error is returned
/// even when logging it fails too.
pub async fn run_logged<S: SheetsApi + ?Sized>(
    api: &S,
    raw_spreadsheet_id: &str,
    target_spreadsheet_id: &str,
    run_ts: DateTime<Utc>,
) -> Result<RowCounts> {
    let mut counts = RowCounts::default();
    let outcome = run(api, raw_spreadsheet_id, target_spreadsheet_id, &mut counts).await;

    let writer = SheetWriter::new(api, target_spreadsheet_id);
    match outcome {
        Ok(_) => {
            append_run(&writer, &RunRecord::success(run_ts, counts)).await?;
            Ok(counts)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "run failed");
            if let Err(log_err) = append_run(&writer, &RunRecord::failed(run_ts, counts, &e)).await {
                error!(error = %format!("{:#}", log_err), "could not record failed run in etl_log");
            }
            Err(e)
        }
    }
}

async fn read_back<R: FromRecord, S: SheetsApi + ?Sized>(writer: &SheetWriter<'_, S>) -> Result<Vec<R>> {
    let range = A1Range::columns(R::TAB, R::HEADER.len()).to_string();
    let values = writer.read(&range).await?;
    read_table(values)
}

/// Rebuild every mart from the dim and fact tabs already in the DB spreadsheet.
#[instrument(skip(api))]
pub async fn rebuild_marts<S: SheetsApi + ?Sized>(api: &S, target_spreadsheet_id: &str) -> Result<Marts> {
    require_tabs(
        api,
        target_spreadsheet_id,
        &[
            DimChorister::TAB,
            DimChoristerAssignment::TAB,
            DimSong::TAB,
            FactAttendance::TAB,
            FactSongTime::TAB,
        ],
    )
    .await?;

    let writer = SheetWriter::new(api, target_spreadsheet_id);
    let choristers: Vec<DimChorister> = read_back(&writer).await?;
    let assignments: Vec<DimChoristerAssignment> = read_back(&writer).await?;
    let songs: Vec<DimSong> = read_back(&writer).await?;
    let attendance: Vec<FactAttendance> = read_back(&writer).await?;
    let song_time: Vec<FactSongTime> = read_back(&writer).await?;

    let marts = Marts::build(&choristers, &assignments, &songs, &attendance, &song_time)?;
    write_marts(&writer, &marts).await?;
    Ok(marts)
}
