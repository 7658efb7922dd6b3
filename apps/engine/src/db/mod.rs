//! Local SQLite store operations.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::StoreError;
pub use repository::{
    now_ms, AudioAsset, AudioMeta, AudioRepository, ChapterRepository, QuizRepository,
    SettingsRepository, SqliteStore, StoreStats, SyncOperation, SyncQueueRepository,
};
