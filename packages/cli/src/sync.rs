//! The `sync` command.

use std::sync::Arc;
use std::time::Instant;

use aviation_bts::fetch::HttpFetcher;
use aviation_bts::{ObjectStore, Period, SyncConfig, Syncer};
use aviation_cli_utils::{DownloadProgress, MultiProgress};
use aviation_storage::S3Store;
use dialoguer::{Confirm, Input};

/// Wires the production collaborators from the environment.
async fn build_syncer() -> Result<Syncer, Box<dyn std::error::Error>> {
    let config = SyncConfig::from_env()?;
    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout)?);
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::from_env().await);

    Ok(Syncer::new(store, fetcher, config))
}

/// Syncs one period, or only prints the plan when `dry_run` is set.
///
/// # Errors
///
/// Returns the first configuration, listing, download, extraction or
/// upload failure.
pub async fn run(
    multi: &MultiProgress,
    period: Option<Period>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let syncer = build_syncer().await?;

    if dry_run {
        let plan = syncer.plan(period).await?;
        println!("Period:      {}", plan.period);
        println!("Source:      {}", plan.source_url);
        println!(
            "Destination: s3://{}/{}",
            syncer.config().bucket,
            plan.destination_key
        );
        return Ok(());
    }

    let start = Instant::now();
    let syncer = syncer.with_progress(DownloadProgress::bytes_bar(multi, "Downloading"));
    let outcome = syncer.run(period).await?;

    log::info!(
        "Synced {} ({}, {} bytes, {} entries skipped) in {:.1}s",
        outcome.plan.period,
        outcome.csv_entry,
        outcome.bytes_uploaded,
        outcome.skipped_entries.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Prompts for an optional period override, then runs [`run`].
///
/// # Errors
///
/// Returns an error if a prompt fails or the sync fails.
pub async fn interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let raw: String = Input::new()
        .with_prompt("Period to fetch (YYYY-MM, empty for the next month)")
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            if input.trim().is_empty() {
                return Ok(());
            }
            input
                .trim()
                .parse::<Period>()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let period = match raw.trim() {
        "" => None,
        s => Some(s.parse::<Period>()?),
    };

    let target = period.map_or_else(|| "the next month".to_string(), |p| p.to_string());
    if !Confirm::new()
        .with_prompt(format!("Download and upload {target}?"))
        .default(true)
        .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    run(multi, period, false).await
}
