//! Latest-period resolution from the bucket listing.

use aviation_bts_models::Period;
use aviation_storage::ObjectStore;

use crate::SyncError;

/// Returns the latest period stored under `prefix`.
///
/// Every key is parsed for a `bts-data/{YYYY}/{MM}/` segment; keys without
/// one are ignored. The maximum is taken by year, then month.
///
/// # Errors
///
/// Returns [`SyncError::NoPriorData`] if no key yields a period, or
/// [`SyncError::Storage`] if the listing fails.
pub async fn latest_period(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Period, SyncError> {
    let keys = store.list_keys(bucket, prefix).await?;

    let latest = keys.iter().filter_map(|key| Period::from_key(key)).max();

    match latest {
        Some(period) => {
            log::info!(
                "Latest stored period in s3://{bucket}/{prefix}: {period} ({} keys scanned)",
                keys.len()
            );
            Ok(period)
        }
        None => Err(SyncError::NoPriorData {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }),
    }
}

/// Returns the period immediately after the latest stored one.
///
/// # Errors
///
/// Same as [`latest_period`], plus [`SyncError::NoNextPeriod`] if the
/// latest period is December of the last representable year.
pub async fn next_period(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Period, SyncError> {
    let latest = latest_period(store, bucket, prefix).await?;
    latest.next().ok_or(SyncError::NoNextPeriod { latest })
}
