//! Offline-first local store and sync engine for the murajah study app.
//!
//! Owns the persistent containers (reference content, audio cache, quiz
//! history, settings), the durable sync outbox, and the coordinator that
//! drains it against the remote endpoint once connectivity returns. UI,
//! scheduling and connectivity signals live with the embedding
//! application; the store handle is opened once at startup and passed by
//! reference to everything that needs it.

pub mod audio;
pub mod content;
pub mod db;
pub mod export;
pub mod sync;

pub use audio::{
    download_chapter, DiskEstimator, DownloadReport, StorageEstimate, StorageEstimator,
    StorageMonitor,
};
pub use content::{
    load_reference_content, AudioBytes, ChapterContent, ContentError, ContentFetcher,
    HttpContentFetcher, LoadReport, ReferencePayload,
};
pub use db::{
    AudioAsset, AudioMeta, AudioRepository, ChapterRepository, QuizRepository, SettingsRepository,
    SqliteStore, StoreError, StoreStats, SyncOperation, SyncQueueRepository,
};
pub use export::{export_snapshot, ExportSnapshot, DEFAULT_EXPORT_QUIZ_LIMIT};
pub use sync::{
    DrainOutcome, DrainReport, HttpTransport, SyncCoordinator, SyncError, SyncStatus,
    SyncTransport,
};

use std::path::PathBuf;

/// Default on-disk location of the store.
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("murajah")
        .join("murajah.db")
}
