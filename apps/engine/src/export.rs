//! Point-in-time JSON export of the store.
//!
//! The snapshot is a diagnostic dump (chapters, verses, settings and the
//! most recent quiz sessions), not a restorable backup format. Cached
//! audio is excluded by design.

use std::collections::BTreeMap;

use murajah_core::types::{Chapter, QuizSession, Verse};
use serde::Serialize;

use crate::db::{
    now_ms, ChapterRepository, QuizRepository, SettingsRepository, SqliteStore, StoreError,
};

/// Quiz sessions included in a snapshot unless the caller asks otherwise.
pub const DEFAULT_EXPORT_QUIZ_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
pub struct ExportSnapshot {
    pub exported_at_ms: i64,
    pub schema_version: i32,
    pub chapters: Vec<Chapter>,
    pub verses: Vec<Verse>,
    pub settings: BTreeMap<String, serde_json::Value>,
    pub quiz_history: Vec<QuizSession>,
}

/// Serialize a snapshot of the store to pretty-printed JSON.
pub fn export_snapshot(store: &SqliteStore, recent_quizzes: usize) -> Result<String, StoreError> {
    let chapters = store.get_chapters()?;

    let mut verses = Vec::new();
    for chapter in &chapters {
        verses.extend(store.get_verses_for_chapter(chapter.id)?);
    }

    let snapshot = ExportSnapshot {
        exported_at_ms: now_ms(),
        schema_version: store.schema_version()?,
        chapters,
        verses,
        settings: store.all_settings()?,
        quiz_history: store.recent_quiz_history(recent_quizzes)?,
    };

    Ok(serde_json::to_string_pretty(&snapshot)?)
}
