//! Streamed zip extraction.
//!
//! The archive is read front to back from its local file headers, so it
//! never has to be seekable or fully downloaded. Only the selected CSV
//! entry is held in memory; every entry before it is drained into a sink.
//!
//! Local headers written by streaming zip writers carry a data descriptor
//! (general-purpose flag bit 3) instead of sizes, and those entries cannot
//! be read forward-only. Every byte consumed is therefore also spooled to
//! an anonymous temp file; when such a header shows up, the rest of the
//! body is appended to the spool and the CSV is selected through the
//! central directory instead.

use std::fs::File;
use std::io::{self, Read, Seek, Write as _};

use tokio_util::io::{StreamReader, SyncIoBridge};
use zip::result::ZipError;

use crate::fetch::ArchiveBody;

/// Upper bound on the buffer reserved up front from an entry's declared
/// size. Larger entries still read fully, just with incremental growth.
const MAX_PREALLOC: usize = 256 * 1_048_576;

/// Errors from reading an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The archive ended without a `.csv` entry.
    #[error("No CSV file found in the zip archive")]
    NoCsvFound,

    /// Malformed or unsupported zip data.
    #[error("Zip error: {0}")]
    Zip(#[from] ZipError),

    /// Reading the underlying stream or the spool file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// An entry that was drained without being kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Path of the entry inside the archive.
    pub name: String,
    /// Uncompressed size of the discarded entry.
    pub drained_bytes: u64,
}

/// The selected CSV entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvEntry {
    /// Path of the entry inside the archive.
    pub name: String,
    /// Uncompressed contents.
    pub data: Vec<u8>,
    /// Entries that preceded it, in archive order.
    pub skipped: Vec<SkippedEntry>,
}

/// Whether an entry name selects it as the dataset.
fn is_csv(name: &str) -> bool {
    name.ends_with(".csv")
}

/// Tees everything read from `inner` into an anonymous temp file.
struct SpoolReader<R> {
    inner: R,
    spool: File,
}

impl<R: Read> SpoolReader<R> {
    fn new(inner: R) -> io::Result<Self> {
        Ok(Self {
            inner,
            spool: tempfile::tempfile()?,
        })
    }

    /// Appends the unread remainder of `inner` and rewinds the spool, which
    /// then holds the complete body.
    fn into_spool(mut self) -> io::Result<File> {
        io::copy(&mut self.inner, &mut self.spool)?;
        self.spool.rewind()?;
        Ok(self.spool)
    }
}

impl<R: Read> Read for SpoolReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.spool.write_all(&buf[..n])?;
        Ok(n)
    }
}

fn read_csv(
    entry: &mut impl Read,
    declared_size: u64,
    name: String,
    skipped: Vec<SkippedEntry>,
) -> io::Result<CsvEntry> {
    let capacity = usize::try_from(declared_size)
        .unwrap_or(MAX_PREALLOC)
        .min(MAX_PREALLOC);
    let mut data = Vec::with_capacity(capacity);
    entry.read_to_end(&mut data)?;

    log::info!(
        "  selected {name} ({} bytes, {} entries skipped)",
        data.len(),
        skipped.len()
    );
    Ok(CsvEntry {
        name,
        data,
        skipped,
    })
}

/// Reads a zip stream and returns its first `.csv` entry.
///
/// Entries are visited in archive order. Anything that is not a CSV is
/// drained with [`io::copy`] into [`io::sink`]; reading stops as soon as
/// the CSV is complete, and the rest of the stream is left unread.
///
/// Archives whose local headers defer sizes to a data descriptor are
/// finished from the spooled copy through [`zip::ZipArchive`], in
/// central-directory order.
///
/// # Errors
///
/// Returns [`ArchiveError::NoCsvFound`] if the archive is exhausted without
/// a match, [`ArchiveError::Zip`] or [`ArchiveError::Io`] on bad data.
pub fn extract_first_csv<R: Read>(reader: R) -> Result<CsvEntry, ArchiveError> {
    let mut reader = io::BufReader::new(SpoolReader::new(reader)?);

    match scan_local_headers(&mut reader) {
        Err(ArchiveError::Zip(ZipError::UnsupportedArchive(reason))) => {
            log::info!("  local headers not streamable ({reason}), using central directory");
            let spool = reader.into_inner().into_spool()?;
            scan_central_directory(spool)
        }
        result => result,
    }
}

fn scan_local_headers<R: Read>(reader: &mut R) -> Result<CsvEntry, ArchiveError> {
    let mut skipped = Vec::new();

    while let Some(mut entry) = zip::read::read_zipfile_from_stream(reader)? {
        let name = entry.name().to_string();

        if is_csv(&name) {
            let size = entry.size();
            return Ok(read_csv(&mut entry, size, name, skipped)?);
        }

        let drained_bytes = io::copy(&mut entry, &mut io::sink())?;
        log::debug!("  drained {name} ({drained_bytes} bytes)");
        skipped.push(SkippedEntry {
            name,
            drained_bytes,
        });
    }

    Err(ArchiveError::NoCsvFound)
}

fn scan_central_directory<R: Read + Seek>(reader: R) -> Result<CsvEntry, ArchiveError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut skipped = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if is_csv(&name) {
            let size = entry.size();
            return Ok(read_csv(&mut entry, size, name, skipped)?);
        }

        log::debug!("  skipped {name} ({} bytes)", entry.size());
        skipped.push(SkippedEntry {
            drained_bytes: entry.size(),
            name,
        });
    }

    Err(ArchiveError::NoCsvFound)
}

/// Runs [`extract_first_csv`] over an async body on the blocking pool.
///
/// # Errors
///
/// Same as [`extract_first_csv`], plus [`ArchiveError::Task`] if the
/// blocking task fails.
pub async fn extract_first_csv_from_stream(body: ArchiveBody) -> Result<CsvEntry, ArchiveError> {
    let handle = tokio::runtime::Handle::current();

    tokio::task::spawn_blocking(move || {
        extract_first_csv(SyncIoBridge::new_with_handle(
            StreamReader::new(body),
            handle,
        ))
    })
    .await?
}
