use anyhow::Result;
use choir_etl::{bootstrap, rebuild_marts};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();

    let config = bootstrap::load_config()?;
    let client = bootstrap::sheets_client(&config)?;

    let marts = rebuild_marts(&client, &config.target_spreadsheet_id).await?;
    info!(
        attendance = marts.attendance.len(),
        chorister_song = marts.chorister_song.len(),
        "marts rebuilt"
    );
    Ok(())
}
