//! Local, freshness-checked copies of the monthly QCLCD archives.

use crate::archive::error::ArchiveError;
use crate::types::month::Month;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::io::StreamReader;

/// What is known about the local copy of one month's archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub month: Month,
    /// Local modification time of the cached file, `None` when there is no file.
    pub modified: Option<NaiveDateTime>,
}

impl ArchiveEntry {
    pub fn new(month: Month, modified: Option<NaiveDateTime>) -> Self {
        Self { month, modified }
    }

    /// The moment the vendor is expected to have finalized this month's data:
    /// `finalization_day` of the following month, at midnight. The day is
    /// clamped to `1..=28` so it exists in every month.
    pub fn finalization(&self, finalization_day: u32) -> NaiveDateTime {
        let day = finalization_day.clamp(1, 28);
        self.month
            .next()
            .and_then(|next| NaiveDate::from_ymd_opt(next.year(), next.month(), day))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
    }

    /// Whether the archive has to be (re)fetched.
    ///
    /// A missing file is always stale. An existing file is stale only when it
    /// was written no later than the finalization date *and* it was not
    /// already written today.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use qclcd_weather::{ArchiveEntry, Month};
    ///
    /// let at = |y, m, d, h| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap();
    /// let march = Month::new(2013, 3).unwrap();
    ///
    /// // Downloaded before April 7th, checked again a day later: refetch.
    /// let early = ArchiveEntry::new(march, Some(at(2013, 4, 2, 9)));
    /// assert!(early.is_stale(at(2013, 4, 3, 9), 7));
    /// // Same download, checked again later that day: keep it.
    /// assert!(!early.is_stale(at(2013, 4, 2, 18), 7));
    /// // Downloaded after finalization: never refetched.
    /// let late = ArchiveEntry::new(march, Some(at(2013, 4, 8, 0)));
    /// assert!(!late.is_stale(at(2020, 1, 1, 0), 7));
    /// ```
    pub fn is_stale(&self, now: NaiveDateTime, finalization_day: u32) -> bool {
        match self.modified {
            None => true,
            Some(modified) => {
                self.finalization(finalization_day) >= modified && now.date() != modified.date()
            }
        }
    }
}

/// Resolves monthly archives to local files, downloading them when missing or stale.
///
/// Check-then-fetch for one month runs under a per-month lock, so overlapping
/// requests for the same archive download it at most once.
pub struct ArchiveCache {
    cache_dir: PathBuf,
    base_url: String,
    finalization_day: u32,
    download_client: Client,
    locks: Mutex<HashMap<Month, Arc<Mutex<()>>>>,
}

impl ArchiveCache {
    /// `fetch_timeout` bounds each whole download; a timeout is reported as a
    /// retrieval failure for that archive. `finalization_day` must be in `1..=28`.
    pub fn new(
        cache_dir: &Path,
        base_url: &str,
        finalization_day: u32,
        fetch_timeout: Duration,
    ) -> Result<Self, ArchiveError> {
        if !(1..=28).contains(&finalization_day) {
            return Err(ArchiveError::InvalidFinalizationDay(finalization_day));
        }
        let download_client = Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(ArchiveError::ClientBuild)?;
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            base_url: base_url.to_string(),
            finalization_day,
            download_client,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn archive_url(&self, month: Month) -> String {
        format!("{}QCLCD{}.zip", self.base_url, month.prefix())
    }

    pub fn local_path(&self, month: Month) -> PathBuf {
        self.cache_dir.join(format!("QCLCD{}.zip", month.prefix()))
    }

    /// Current state of the local copy for `month`.
    pub async fn entry(&self, month: Month) -> Result<ArchiveEntry, ArchiveError> {
        let path = self.local_path(month);
        match fs::metadata(&path).await {
            Ok(metadata) => {
                let modified = metadata
                    .modified()
                    .map_err(|e| ArchiveError::CacheMetadataRead(path.clone(), e))?;
                let modified = DateTime::<Local>::from(modified).naive_local();
                Ok(ArchiveEntry::new(month, Some(modified)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ArchiveEntry::new(month, None)),
            Err(e) => Err(ArchiveError::CacheMetadataRead(path, e)),
        }
    }

    /// Path of a readable local archive for `month`, fetching it first if needed.
    pub async fn archive_path(&self, month: Month) -> Result<PathBuf, ArchiveError> {
        let lock = self.lock_for(month).await;
        let _guard = lock.lock().await;

        let path = self.local_path(month);
        let entry = self.entry(month).await?;
        if entry.is_stale(Local::now().naive_local(), self.finalization_day) {
            let url = self.archive_url(month);
            info!(
                "Archive {} missing or stale, fetching {}",
                path.display(),
                url
            );
            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| ArchiveError::CacheDirCreation(self.cache_dir.clone(), e))?;
            self.download(&url, &path).await?;
        } else {
            debug!("Cache hit for archive {}", path.display());
        }
        Ok(path)
    }

    async fn lock_for(&self, month: Month) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(month).or_default().clone()
    }

    /// Streams `url` into a temporary file next to `target`, then moves it into
    /// place once it opens as a zip archive. A failed transfer or a body that
    /// is not an archive never leaves a file at `target`.
    async fn download(&self, url: &str, target: &Path) -> Result<(), ArchiveError> {
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::Retrieval {
                url: url.to_string(),
                source: e,
            })?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    ArchiveError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    ArchiveError::Retrieval {
                        url: url.to_string(),
                        source: e,
                    }
                });
            }
        };

        let transfer = |source: std::io::Error| ArchiveError::Transfer {
            url: url.to_string(),
            source,
        };

        let temp = tempfile::Builder::new()
            .prefix(".qclcd-")
            .suffix(".part")
            .tempfile_in(&self.cache_dir)
            .map_err(transfer)?;
        let mut file = fs::File::from_std(temp.reopen().map_err(transfer)?);

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(transfer)?;
        file.flush().await.map_err(transfer)?;
        drop(file);

        let written = temp.reopen().map_err(transfer)?;
        tokio::task::spawn_blocking(move || zip::ZipArchive::new(written).map(|_| ()))
            .await?
            .map_err(|source| {
                warn!("Body of {} ({} bytes) is not a zip archive", url, bytes);
                ArchiveError::NotAnArchive {
                    url: url.to_string(),
                    source,
                }
            })?;

        temp.persist(target).map_err(|e| transfer(e.error))?;
        info!(
            "Downloaded {} bytes from {} to {}",
            bytes,
            url,
            target.display()
        );
        Ok(())
    }
}
