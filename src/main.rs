use anyhow::Result;
use chrono::Utc;
use choir_etl::{bootstrap, run_logged};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    info!("startup");

    let config = bootstrap::load_config()?;
    let client = bootstrap::sheets_client(&config)?;

    let counts = run_logged(
        &client,
        &config.raw_spreadsheet_id,
        &config.target_spreadsheet_id,
        Utc::now(),
    )
    .await?;

    info!(
        dim_chorister = counts.dim_chorister,
        dim_chorister_assignment = counts.dim_chorister_assignment,
        dim_song = counts.dim_song,
        fact_attendance = counts.fact_attendance,
        fact_song_time = counts.fact_song_time,
        "ETL finished"
    );
    Ok(())
}
