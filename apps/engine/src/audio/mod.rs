//! Chapter audio downloads and cache housekeeping.

use std::path::PathBuf;

use crate::content::{ContentError, ContentFetcher};
use crate::db::{AudioMeta, AudioRepository, ChapterRepository, SqliteStore, StoreError};

/// Language tag recorded with every cached rendition.
const AUDIO_LANGUAGE: &str = "ar";

/// Outcome of a full-chapter audio download.
///
/// Per-verse fetch failures are counted, not fatal: verses written before
/// a failure stay cached, and the failed ones can be fetched on a later
/// pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub failed: usize,
    pub total: usize,
}

/// Download the audio rendition of every verse in a chapter.
///
/// Each verse is fetched completely before it is written, so a partial
/// download is never committed. Store write failures (e.g. quota) abort
/// the batch and surface to the caller; network failures for individual
/// verses only bump the failure count.
pub async fn download_chapter<F>(
    store: &SqliteStore,
    fetcher: &F,
    chapter_id: u32,
    narrator: &str,
) -> Result<DownloadReport, ContentError>
where
    F: ContentFetcher + Sync,
{
    store
        .get_chapter(chapter_id)?
        .ok_or(ContentError::UnknownChapter(chapter_id))?;

    let verses = store.get_verses_for_chapter(chapter_id)?;
    let mut downloaded = 0;
    let mut failed = 0;

    for verse in &verses {
        match fetcher.fetch_audio_bytes(verse.global_number, narrator).await {
            Ok(audio) => {
                let meta = AudioMeta {
                    mime_type: audio.mime_type,
                    narrator: narrator.to_string(),
                    language: AUDIO_LANGUAGE.to_string(),
                };
                store.save_audio(chapter_id, verse.verse_number, &audio.bytes, &meta)?;
                downloaded += 1;
            }
            Err(_) => failed += 1,
        }
    }

    Ok(DownloadReport {
        downloaded,
        failed,
        total: verses.len(),
    })
}

/// A point-in-time storage usage estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub usage_bytes: u64,
    pub quota_bytes: u64,
}

/// Platform storage-estimate capability.
pub trait StorageEstimator {
    fn estimate(&self) -> StorageEstimate;
}

/// Estimator backed by the store file's on-disk size against a
/// configured quota.
pub struct DiskEstimator {
    path: PathBuf,
    quota_bytes: u64,
}

impl DiskEstimator {
    pub fn new(path: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            path: path.into(),
            quota_bytes,
        }
    }
}

impl StorageEstimator for DiskEstimator {
    fn estimate(&self) -> StorageEstimate {
        let usage_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        StorageEstimate {
            usage_bytes,
            quota_bytes: self.quota_bytes,
        }
    }
}

/// Caller-side eviction policy: when estimated usage crosses a threshold
/// fraction of quota, drop cached audio older than a cutoff age. The
/// cache itself never evicts on its own.
#[derive(Debug, Clone, Copy)]
pub struct StorageMonitor {
    pub threshold: f64,
    pub max_age_ms: i64,
}

impl Default for StorageMonitor {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_age_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}

impl StorageMonitor {
    /// Evict old audio if usage exceeds the threshold. Returns the number
    /// of assets evicted (zero when under the threshold).
    pub fn ensure_headroom<E>(
        &self,
        store: &SqliteStore,
        estimator: &E,
    ) -> Result<usize, StoreError>
    where
        E: StorageEstimator,
    {
        let estimate = estimator.estimate();
        if estimate.quota_bytes == 0 {
            return Ok(0);
        }

        let used = estimate.usage_bytes as f64 / estimate.quota_bytes as f64;
        if used <= self.threshold {
            return Ok(0);
        }

        store.evict_older_than(self.max_age_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{AudioBytes, ReferencePayload};
    use async_trait::async_trait;
    use murajah_core::types::{Chapter, RevelationCategory, Verse};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    struct VerseAudioFetcher {
        failing: HashSet<u32>,
    }

    #[async_trait]
    impl ContentFetcher for VerseAudioFetcher {
        async fn fetch_reference_content(&self) -> Result<ReferencePayload, ContentError> {
            Ok(ReferencePayload { chapters: vec![] })
        }

        async fn fetch_audio_bytes(
            &self,
            global_number: u32,
            _narrator: &str,
        ) -> Result<AudioBytes, ContentError> {
            if self.failing.contains(&global_number) {
                return Err(ContentError::Status(503));
            }
            Ok(AudioBytes {
                bytes: vec![global_number as u8; 16],
                mime_type: "audio/mpeg".to_string(),
            })
        }
    }

    fn seed_chapter(store: &SqliteStore, chapter_id: u32, verse_count: u32) {
        store
            .put_chapter(&Chapter {
                id: chapter_id,
                ordinal: chapter_id,
                name_local: format!("Chapter {}", chapter_id),
                name_arabic: format!("سورة {}", chapter_id),
                verse_count,
                revelation: RevelationCategory::Meccan,
            })
            .unwrap();
        let verses: Vec<Verse> = (1..=verse_count)
            .map(|n| Verse {
                chapter_id,
                verse_number: n,
                text_arabic: format!("آية {}", n),
                text_translation: None,
                global_number: n,
            })
            .collect();
        store.put_verses(&verses).unwrap();
    }

    #[tokio::test]
    async fn test_download_chapter_full_success() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_chapter(&store, 1, 7);
        let fetcher = VerseAudioFetcher {
            failing: HashSet::new(),
        };

        let report = download_chapter(&store, &fetcher, 1, "alafasy").await.unwrap();
        assert_eq!(
            report,
            DownloadReport { downloaded: 7, failed: 0, total: 7 }
        );

        assert_eq!(store.total_audio_size().unwrap(), 7 * 16);
        let asset = store.get_audio(1, 3).unwrap().unwrap();
        assert_eq!(asset.narrator, "alafasy");
        assert_eq!(asset.language, "ar");
    }

    #[tokio::test]
    async fn test_download_chapter_counts_failures() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_chapter(&store, 1, 5);
        let fetcher = VerseAudioFetcher {
            failing: [2, 4].into_iter().collect(),
        };

        let report = download_chapter(&store, &fetcher, 1, "alafasy").await.unwrap();
        assert_eq!(
            report,
            DownloadReport { downloaded: 3, failed: 2, total: 5 }
        );

        // Failed verses committed nothing; the rest are cached.
        assert!(store.audio_exists(1, 1).unwrap());
        assert!(!store.audio_exists(1, 2).unwrap());
        assert!(store.audio_exists(1, 3).unwrap());
        assert!(!store.audio_exists(1, 4).unwrap());
    }

    #[tokio::test]
    async fn test_download_unknown_chapter() {
        let store = SqliteStore::open_in_memory().unwrap();
        let fetcher = VerseAudioFetcher {
            failing: HashSet::new(),
        };

        let err = download_chapter(&store, &fetcher, 42, "alafasy")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::UnknownChapter(42)));
    }

    struct FixedEstimator {
        estimate: StorageEstimate,
    }

    impl StorageEstimator for FixedEstimator {
        fn estimate(&self) -> StorageEstimate {
            self.estimate
        }
    }

    #[test]
    fn test_monitor_under_threshold_does_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_audio(
                1,
                1,
                &[0u8; 10],
                &AudioMeta {
                    mime_type: "audio/mpeg".to_string(),
                    narrator: "alafasy".to_string(),
                    language: "ar".to_string(),
                },
            )
            .unwrap();

        let estimator = FixedEstimator {
            estimate: StorageEstimate { usage_bytes: 10, quota_bytes: 100 },
        };
        let evicted = StorageMonitor::default()
            .ensure_headroom(&store, &estimator)
            .unwrap();
        assert_eq!(evicted, 0);
        assert!(store.audio_exists(1, 1).unwrap());
    }

    #[test]
    fn test_monitor_over_threshold_evicts_old_audio() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_audio(
                1,
                1,
                &[0u8; 10],
                &AudioMeta {
                    mime_type: "audio/mpeg".to_string(),
                    narrator: "alafasy".to_string(),
                    language: "ar".to_string(),
                },
            )
            .unwrap();

        let estimator = FixedEstimator {
            estimate: StorageEstimate { usage_bytes: 90, quota_bytes: 100 },
        };
        // Cutoff in the past relative to the fresh asset: nothing to evict
        // yet even though we are over the threshold.
        let monitor = StorageMonitor { threshold: 0.8, max_age_ms: 60_000 };
        assert_eq!(monitor.ensure_headroom(&store, &estimator).unwrap(), 0);

        // A negative age cutoff evicts everything written before "now".
        let monitor = StorageMonitor { threshold: 0.8, max_age_ms: -1 };
        assert_eq!(monitor.ensure_headroom(&store, &estimator).unwrap(), 1);
        assert!(!store.audio_exists(1, 1).unwrap());
    }
}
