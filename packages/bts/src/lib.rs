#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Monthly sync of the BTS on-time-performance dataset.
//!
//! Each run is a single linear pipeline:
//!
//! 1. list the bucket under [`BTS_PREFIX`] and resolve the latest stored
//!    [`Period`] ([`resolve`]);
//! 2. advance it one month and derive the archive URL and destination key;
//! 3. stream the zip archive over HTTP ([`fetch`]), pick the first CSV
//!    entry ([`archive`]) and upload it ([`pipeline`]).
//!
//! The bucket and the HTTP client are injected through the
//! [`ObjectStore`] and [`fetch::ArchiveFetcher`] traits so the whole
//! pipeline runs against in-memory fakes in tests.

pub mod archive;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod resolve;

pub use aviation_bts_models::{BTS_PREFIX, Period, PeriodError};
pub use aviation_storage::{ObjectStore, StorageError};
pub use config::{ConfigError, SyncConfig};
pub use pipeline::{SyncOutcome, SyncPlan, Syncer};

/// Content type used for uploaded CSV files.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Errors that can occur while syncing a period.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The bucket holds no key with a parsable period, so there is nothing
    /// to advance from.
    #[error("No prior data found under s3://{bucket}/{prefix}")]
    NoPriorData {
        /// Bucket name.
        bucket: String,
        /// Listing prefix.
        prefix: String,
    },

    /// The latest stored period is the last representable month.
    #[error("No period follows {latest}")]
    NoNextPeriod {
        /// Latest stored period.
        latest: Period,
    },

    /// The archive response yielded no body.
    #[error("Error fetching data from BTS ({url}): {reason}")]
    FetchFailed {
        /// Archive URL.
        url: String,
        /// What was missing or went wrong.
        reason: String,
    },

    /// Non-success HTTP status for the archive download.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Archive URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The archive contained no `.csv` entry.
    #[error("No CSV file found in the zip archive from {url}")]
    NoCsvFound {
        /// Archive URL.
        url: String,
    },

    /// The archive could not be read.
    #[error("Failed to read zip archive from {url}: {source}")]
    Archive {
        /// Archive URL.
        url: String,
        /// Underlying archive error.
        source: archive::ArchiveError,
    },

    /// Listing or uploading failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid or missing configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
