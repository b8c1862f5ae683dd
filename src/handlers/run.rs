use crate::{
    Result,
    config::Config,
    driver::chrome::ChromeDriver,
    export::{ExportRun, RunReport},
    utils::signal,
};

/// Launches Chrome and exports every results page reachable from the
/// configured start URL. Browser setup failures are returned as `Err`; once
/// the browser is up, the outcome is carried by the report.
pub async fn handle_run(config: &Config, progress: bool) -> Result<RunReport> {
    std::fs::create_dir_all(&config.export.download_dir)?;
    signal::setup_handlers()?;

    tracing::info!(
        url = config.site.start_url.as_deref().unwrap_or_default(),
        dir = %config.export.download_dir.display(),
        "Starting export run"
    );

    let driver = ChromeDriver::launch(config).await?;
    let report = ExportRun::new(driver, config.clone())
        .with_progress(progress)
        .run()
        .await;

    Ok(report)
}
