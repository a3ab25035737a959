//! The monthly sync: list, compute, fetch, extract, upload.

use std::sync::Arc;

use aviation_bts_models::Period;
use aviation_storage::ObjectStore;
use futures::{StreamExt as _, TryStreamExt as _};

use crate::archive::{self, ArchiveError, SkippedEntry};
use crate::fetch::{ArchiveBody, ArchiveDownload, ArchiveFetcher};
use crate::progress::{ProgressCallback, null_progress};
use crate::{CSV_CONTENT_TYPE, SyncConfig, SyncError, resolve};

/// What a run will do, derived before any download starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Period being fetched.
    pub period: Period,
    /// Archive URL for that period.
    pub source_url: String,
    /// Key the CSV will be stored under.
    pub destination_key: String,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The plan that was executed.
    pub plan: SyncPlan,
    /// Name of the CSV entry inside the archive.
    pub csv_entry: String,
    /// Size of the uploaded object.
    pub bytes_uploaded: u64,
    /// Entries drained before the CSV.
    pub skipped_entries: Vec<SkippedEntry>,
}

/// Runs the sync against injected storage and HTTP collaborators.
pub struct Syncer {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn ArchiveFetcher>,
    config: SyncConfig,
    progress: Arc<dyn ProgressCallback>,
}

impl Syncer {
    /// Creates a syncer that reports no progress.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn ArchiveFetcher>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
            progress: null_progress(),
        }
    }

    /// Reports download progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// The configuration this syncer runs with.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Resolves the period to fetch and derives its URL and key.
    ///
    /// With `period = None` the period after the latest stored one is used;
    /// otherwise the given period is planned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoPriorData`] or [`SyncError::Storage`] from
    /// the resolver.
    pub async fn plan(&self, period: Option<Period>) -> Result<SyncPlan, SyncError> {
        let period = match period {
            Some(period) => period,
            None => {
                resolve::next_period(self.store.as_ref(), &self.config.bucket, &self.config.prefix)
                    .await?
            }
        };

        Ok(SyncPlan {
            period,
            source_url: period.archive_url(&self.config.archive_base_url),
            destination_key: period.destination_key(),
        })
    }

    /// Runs the full pipeline once.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any step; nothing is uploaded unless
    /// every step before the upload succeeded.
    pub async fn run(&self, period: Option<Period>) -> Result<SyncOutcome, SyncError> {
        let plan = self.plan(period).await?;
        log::info!(
            "Syncing {} from {} -> s3://{}/{}",
            plan.period,
            plan.source_url,
            self.config.bucket,
            plan.destination_key
        );

        let download = self.fetcher.fetch(&plan.source_url).await?;
        let body = require_body(&plan.source_url, download, &self.progress)
            .await
            .inspect_err(|_| self.progress.finish_and_clear())?;

        let entry = match archive::extract_first_csv_from_stream(body).await {
            Ok(entry) => entry,
            Err(e) => {
                self.progress.finish_and_clear();
                return Err(match e {
                    ArchiveError::NoCsvFound => SyncError::NoCsvFound {
                        url: plan.source_url.clone(),
                    },
                    source => SyncError::Archive {
                        url: plan.source_url.clone(),
                        source,
                    },
                });
            }
        };
        self.progress
            .finish(format!("[{}] extracted {}", plan.period, entry.name));

        let bytes_uploaded = entry.data.len() as u64;
        self.store
            .put(
                &self.config.bucket,
                &plan.destination_key,
                entry.data,
                CSV_CONTENT_TYPE,
            )
            .await?;

        log::info!(
            "Successfully uploaded {} to {}",
            plan.destination_key,
            self.config.bucket
        );

        Ok(SyncOutcome {
            plan,
            csv_entry: entry.name,
            bytes_uploaded,
            skipped_entries: entry.skipped,
        })
    }
}

/// Checks that the download has a body with at least one non-empty chunk
/// and wires the body into `progress`.
///
/// The first chunk is read here, before any zip parsing, and put back in
/// front of the remaining stream.
async fn require_body(
    url: &str,
    download: Option<ArchiveDownload>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ArchiveBody, SyncError> {
    let fetch_failed = |reason: String| SyncError::FetchFailed {
        url: url.to_string(),
        reason,
    };

    let Some(ArchiveDownload {
        content_length,
        mut body,
    }) = download
    else {
        return Err(fetch_failed("response has no body".to_string()));
    };

    let first = loop {
        match body.next().await {
            None => return Err(fetch_failed("response body is empty".to_string())),
            Some(Err(e)) => return Err(fetch_failed(e.to_string())),
            Some(Ok(chunk)) if chunk.is_empty() => {}
            Some(Ok(chunk)) => break chunk,
        }
    };

    if let Some(total) = content_length {
        progress.set_total(total);
    }
    progress.set_message(format!("Downloading {url}"));

    let progress = Arc::clone(progress);
    Ok(futures::stream::once(async move { Ok(first) })
        .chain(body)
        .inspect_ok(move |chunk| progress.inc(chunk.len() as u64))
        .boxed())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write as _};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use async_trait::async_trait;
    use aviation_storage::MemoryStore;
    use bytes::Bytes;

    use super::*;

    const BUCKET: &str = "test-bts-data";
    const BASE_URL: &str = "https://example.com/PREZIP/On_Time";

    /// What the fake fetcher answers with.
    enum Response {
        NoBody,
        Chunks(Vec<Vec<u8>>),
    }

    /// Serves one canned response and records requested URLs.
    struct FakeFetcher {
        response: Mutex<Option<Response>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(response: Response) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArchiveFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Option<ArchiveDownload>, SyncError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.response.lock().unwrap().take() {
                None | Some(Response::NoBody) => Ok(None),
                Some(Response::Chunks(chunks)) => {
                    let content_length = Some(chunks.iter().map(|c| c.len() as u64).sum());
                    let items: Vec<std::io::Result<Bytes>> =
                        chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
                    Ok(Some(ArchiveDownload {
                        content_length,
                        body: futures::stream::iter(items).boxed(),
                    }))
                }
            }
        }
    }

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicU64,
        seen: AtomicU64,
        cleared: AtomicBool,
    }

    impl ProgressCallback for CountingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }
        fn inc(&self, delta: u64) {
            self.seen.fetch_add(delta, Ordering::SeqCst);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
        fn finish_and_clear(&self) {
            self.cleared.store(true, Ordering::SeqCst);
        }
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn seeded_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_keys(
            BUCKET,
            &[
                "bts-data/2024/01/performance.csv",
                "bts-data/2024/03/performance.csv",
            ],
        ))
    }

    fn syncer(store: &Arc<MemoryStore>, fetcher: &Arc<FakeFetcher>) -> Syncer {
        Syncer::new(
            Arc::clone(store) as Arc<dyn ObjectStore>,
            Arc::clone(fetcher) as Arc<dyn ArchiveFetcher>,
            SyncConfig::new(BUCKET, BASE_URL),
        )
    }

    #[tokio::test]
    async fn plan_derives_url_and_key_from_next_period() {
        let store = seeded_store();
        let fetcher = FakeFetcher::new(Response::NoBody);

        let plan = syncer(&store, &fetcher).plan(None).await.unwrap();

        assert_eq!(plan.period, Period::new(2024, 4).unwrap());
        assert_eq!(plan.source_url, format!("{BASE_URL}_2024_4.zip"));
        assert_eq!(plan.destination_key, "bts-data/2024/04/performance.csv");
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn plan_uses_explicit_period_without_listing() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new(Response::NoBody);

        let period = Period::new(2019, 12).unwrap();
        let plan = syncer(&store, &fetcher).plan(Some(period)).await.unwrap();

        assert_eq!(plan.destination_key, "bts-data/2019/12/performance.csv");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn uploads_first_csv_to_derived_key() {
        let csv = b"FL_DATE,OP_CARRIER,ARR_DELAY\n2024-04-01,DL,-3\n".repeat(100);
        let archive = build_zip(&[
            ("readme.html", b"<p>terms</p>".as_slice()),
            ("data.csv", csv.as_slice()),
        ]);
        let chunks = archive.chunks(512).map(<[u8]>::to_vec).collect();

        let store = seeded_store();
        let fetcher = FakeFetcher::new(Response::Chunks(chunks));
        let progress = Arc::new(CountingProgress::default());

        let outcome = syncer(&store, &fetcher)
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressCallback>)
            .run(None)
            .await
            .unwrap();

        assert_eq!(fetcher.requested(), vec![format!("{BASE_URL}_2024_4.zip")]);
        assert_eq!(outcome.csv_entry, "data.csv");
        assert_eq!(outcome.bytes_uploaded, csv.len() as u64);
        assert_eq!(outcome.skipped_entries.len(), 1);
        assert_eq!(
            store.get(BUCKET, "bts-data/2024/04/performance.csv"),
            Some(csv)
        );
        assert_eq!(
            store
                .content_type(BUCKET, "bts-data/2024/04/performance.csv")
                .as_deref(),
            Some(CSV_CONTENT_TYPE)
        );
        assert_eq!(progress.total.load(Ordering::SeqCst), archive.len() as u64);
        assert!(progress.seen.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn absent_body_fails_before_parsing() {
        let store = seeded_store();
        let fetcher = FakeFetcher::new(Response::NoBody);
        let progress = Arc::new(CountingProgress::default());

        let err = syncer(&store, &fetcher)
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressCallback>)
            .run(None)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::FetchFailed { .. }));
        assert_eq!(store.len(), 2);
        assert!(progress.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_body_fails_before_parsing() {
        let store = seeded_store();
        let fetcher = FakeFetcher::new(Response::Chunks(vec![Vec::new(), Vec::new()]));
        let progress = Arc::new(CountingProgress::default());

        let err = syncer(&store, &fetcher)
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressCallback>)
            .run(None)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::FetchFailed { ref url, .. } if url.ends_with("_2024_4.zip")));
        assert_eq!(store.len(), 2);
        assert!(progress.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn archive_without_csv_uploads_nothing() {
        let archive = build_zip(&[("readme.txt", b"nothing to see".as_slice())]);
        let store = seeded_store();
        let fetcher = FakeFetcher::new(Response::Chunks(vec![archive]));

        let err = syncer(&store, &fetcher).run(None).await.unwrap_err();

        assert!(matches!(err, SyncError::NoCsvFound { .. }));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_failure_propagates() {
        let archive = build_zip(&[("data.csv", b"a,b\n1,2\n".as_slice())]);
        let store = Arc::new(
            MemoryStore::with_keys(BUCKET, &["bts-data/2023/12/performance.csv"])
                .rejecting_uploads(),
        );
        let fetcher = FakeFetcher::new(Response::Chunks(vec![archive]));

        let err = syncer(&store, &fetcher).run(None).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Storage(aviation_storage::StorageError::Upload { ref key, .. })
                if key == "bts-data/2024/01/performance.csv"
        ));
    }

    #[tokio::test]
    async fn empty_bucket_does_not_fetch() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new(Response::NoBody);

        let err = syncer(&store, &fetcher).run(None).await.unwrap_err();

        assert!(matches!(err, SyncError::NoPriorData { .. }));
        assert!(fetcher.requested().is_empty());
    }
}
