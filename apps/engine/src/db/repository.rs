//! Repository pattern for store access.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use murajah_core::types::{audio_asset_id, Chapter, QuizSession, RevelationCategory, Verse};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::db::error::StoreError;
use crate::db::schema::{MIGRATIONS, SCHEMA_VERSION};

type Result<T> = std::result::Result<T, StoreError>;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Metadata recorded alongside a cached audio payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AudioMeta {
    pub mime_type: String,
    pub narrator: String,
    pub language: String,
}

/// A cached audio asset, payload included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub id: String,
    pub chapter_id: u32,
    pub verse_number: u32,
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
    pub mime_type: String,
    pub narrator: String,
    pub language: String,
    pub checksum: String,
    pub created_at_ms: i64,
}

/// A queued remote-write operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncOperation {
    pub id: i64,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at_ms: i64,
    pub delivered: bool,
    pub delivered_at_ms: Option<i64>,
    pub attempts: u32,
}

/// Store-wide counters, used for first-run detection and maintenance views.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub chapters: u64,
    pub verses: u64,
    pub audio_assets: u64,
    pub audio_bytes: u64,
    pub quiz_sessions: u64,
    pub pending_sync: u64,
}

/// Repository for reference content (chapters and verses).
pub trait ChapterRepository {
    fn put_chapter(&self, chapter: &Chapter) -> Result<()>;
    fn put_verses(&self, verses: &[Verse]) -> Result<()>;
    fn get_chapter(&self, id: u32) -> Result<Option<Chapter>>;
    fn get_chapters(&self) -> Result<Vec<Chapter>>;
    fn get_verses_for_chapter(&self, chapter_id: u32) -> Result<Vec<Verse>>;
    fn get_verse(&self, chapter_id: u32, verse_number: u32) -> Result<Option<Verse>>;
}

/// Repository for the audio blob cache.
pub trait AudioRepository {
    fn save_audio(
        &self,
        chapter_id: u32,
        verse_number: u32,
        bytes: &[u8],
        meta: &AudioMeta,
    ) -> Result<String>;
    fn get_audio(&self, chapter_id: u32, verse_number: u32) -> Result<Option<AudioAsset>>;
    fn audio_exists(&self, chapter_id: u32, verse_number: u32) -> Result<bool>;
    fn audio_for_chapter(&self, chapter_id: u32) -> Result<Vec<AudioAsset>>;
    fn total_audio_size(&self) -> Result<u64>;
    fn delete_audio(&self, chapter_id: u32, verse_number: u32) -> Result<()>;
    fn clear_audio(&self) -> Result<()>;
    fn evict_older_than(&self, age_ms: i64) -> Result<usize>;
}

/// Repository for the append-only quiz history ledger.
pub trait QuizRepository {
    fn record_quiz(&self, session: &QuizSession) -> Result<i64>;
    fn quiz_history_for_chapter(&self, chapter_id: u32, limit: usize) -> Result<Vec<QuizSession>>;
    fn recent_quiz_history(&self, limit: usize) -> Result<Vec<QuizSession>>;
}

/// Repository for user settings.
pub trait SettingsRepository {
    fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<()>;
    fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn all_settings(&self) -> Result<BTreeMap<String, serde_json::Value>>;
    fn delete_setting(&self, key: &str) -> Result<()>;
}

/// Repository for the durable sync outbox.
pub trait SyncQueueRepository {
    fn enqueue(&self, kind: &str, payload: &serde_json::Value) -> Result<i64>;
    fn pending_operations(&self) -> Result<Vec<SyncOperation>>;
    fn get_operation(&self, id: i64) -> Result<Option<SyncOperation>>;
    fn mark_delivered(&self, id: i64) -> Result<()>;
    fn record_attempt(&self, id: i64) -> Result<()>;
    fn compact_delivered(&self) -> Result<usize>;
    fn pending_count(&self) -> Result<u64>;
}

/// SQLite implementation of the repositories.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at `path`, creating and migrating as necessary.
    ///
    /// Idempotent: reopening a store that is already at the current
    /// schema version performs no structural work.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::Init(e.to_string()))?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Init(e.to_string()))?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Release the store handle.
    pub fn close(self) {
        // Connection closes on drop; kept explicit so the handle has a
        // visible lifecycle end.
        drop(self.conn);
    }

    /// Installed schema version, from `PRAGMA user_version`.
    pub fn schema_version(&self) -> Result<i32> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn initialize(&self) -> Result<()> {
        let installed = self.schema_version()?;
        if installed > SCHEMA_VERSION {
            return Err(StoreError::Init(format!(
                "store schema version {} is newer than supported version {}",
                installed, SCHEMA_VERSION
            )));
        }

        // Each migration step runs in one transaction together with its
        // version bump, so a crash mid-step leaves the previous version
        // fully intact.
        for (index, migration) in MIGRATIONS.iter().enumerate().skip(installed as usize) {
            let tx = self.conn.unchecked_transaction()?;
            tx.execute_batch(migration)?;
            tx.pragma_update(None, "user_version", index as i32 + 1)?;
            tx.commit()?;
        }

        Ok(())
    }

    /// Store-wide counters.
    pub fn store_stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<u64> {
            let n: u64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n)
        };

        Ok(StoreStats {
            chapters: count("SELECT COUNT(*) FROM chapters")?,
            verses: count("SELECT COUNT(*) FROM verses")?,
            audio_assets: count("SELECT COUNT(*) FROM audio_assets")?,
            audio_bytes: self.total_audio_size()?,
            quiz_sessions: count("SELECT COUNT(*) FROM quiz_history")?,
            pending_sync: self.pending_count()?,
        })
    }

    fn row_to_verse(row: &rusqlite::Row) -> rusqlite::Result<Verse> {
        Ok(Verse {
            chapter_id: row.get(0)?,
            verse_number: row.get(1)?,
            text_arabic: row.get(2)?,
            text_translation: row.get(3)?,
            global_number: row.get(4)?,
        })
    }

    fn row_to_chapter(row: &rusqlite::Row) -> rusqlite::Result<Chapter> {
        let revelation: String = row.get(5)?;
        Ok(Chapter {
            id: row.get(0)?,
            ordinal: row.get(1)?,
            name_local: row.get(2)?,
            name_arabic: row.get(3)?,
            verse_count: row.get(4)?,
            revelation: RevelationCategory::parse(&revelation)
                .unwrap_or(RevelationCategory::Meccan),
        })
    }

    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<AudioAsset> {
        Ok(AudioAsset {
            id: row.get(0)?,
            chapter_id: row.get(1)?,
            verse_number: row.get(2)?,
            bytes: row.get(3)?,
            size_bytes: row.get(4)?,
            mime_type: row.get(5)?,
            narrator: row.get(6)?,
            language: row.get(7)?,
            checksum: row.get(8)?,
            created_at_ms: row.get(9)?,
        })
    }

    fn row_to_operation(row: &rusqlite::Row) -> rusqlite::Result<SyncOperation> {
        let payload: String = row.get(2)?;
        Ok(SyncOperation {
            id: row.get(0)?,
            kind: row.get(1)?,
            payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
            created_at_ms: row.get(3)?,
            delivered: row.get::<_, i64>(4)? != 0,
            delivered_at_ms: row.get(5)?,
            attempts: row.get(6)?,
        })
    }
}

impl ChapterRepository for SqliteStore {
    fn put_chapter(&self, chapter: &Chapter) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO chapters (id, ordinal, name_local, name_arabic, verse_count, revelation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chapter.id,
                chapter.ordinal,
                chapter.name_local,
                chapter.name_arabic,
                chapter.verse_count,
                chapter.revelation.as_str(),
            ],
        )?;
        Ok(())
    }

    fn put_verses(&self, verses: &[Verse]) -> Result<()> {
        // All-or-nothing: a partially loaded chapter is never observable.
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO verses (chapter_id, verse_number, text_arabic, text_translation, global_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for verse in verses {
                stmt.execute(params![
                    verse.chapter_id,
                    verse.verse_number,
                    verse.text_arabic,
                    verse.text_translation,
                    verse.global_number,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_chapter(&self, id: u32) -> Result<Option<Chapter>> {
        self.conn
            .query_row(
                "SELECT id, ordinal, name_local, name_arabic, verse_count, revelation
                 FROM chapters WHERE id = ?1",
                params![id],
                Self::row_to_chapter,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_chapters(&self) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ordinal, name_local, name_arabic, verse_count, revelation
             FROM chapters ORDER BY ordinal",
        )?;
        let chapters = stmt
            .query_map([], Self::row_to_chapter)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    fn get_verses_for_chapter(&self, chapter_id: u32) -> Result<Vec<Verse>> {
        let mut stmt = self.conn.prepare(
            "SELECT chapter_id, verse_number, text_arabic, text_translation, global_number
             FROM verses WHERE chapter_id = ?1 ORDER BY verse_number",
        )?;
        let verses = stmt
            .query_map(params![chapter_id], Self::row_to_verse)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(verses)
    }

    fn get_verse(&self, chapter_id: u32, verse_number: u32) -> Result<Option<Verse>> {
        self.conn
            .query_row(
                "SELECT chapter_id, verse_number, text_arabic, text_translation, global_number
                 FROM verses WHERE chapter_id = ?1 AND verse_number = ?2",
                params![chapter_id, verse_number],
                Self::row_to_verse,
            )
            .optional()
            .map_err(Into::into)
    }
}

impl AudioRepository for SqliteStore {
    fn save_audio(
        &self,
        chapter_id: u32,
        verse_number: u32,
        bytes: &[u8],
        meta: &AudioMeta,
    ) -> Result<String> {
        let id = audio_asset_id(chapter_id, verse_number);
        let checksum = format!("{:x}", Sha256::digest(bytes));

        // Single-row replace: the previous payload, size and timestamp are
        // gone in the same commit the new ones land.
        self.conn.execute(
            "INSERT OR REPLACE INTO audio_assets
                 (id, chapter_id, verse_number, payload, size_bytes, mime_type, narrator, language, checksum, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                chapter_id,
                verse_number,
                bytes,
                bytes.len() as u64,
                meta.mime_type,
                meta.narrator,
                meta.language,
                checksum,
                now_ms(),
            ],
        )?;

        Ok(id)
    }

    fn get_audio(&self, chapter_id: u32, verse_number: u32) -> Result<Option<AudioAsset>> {
        self.conn
            .query_row(
                "SELECT id, chapter_id, verse_number, payload, size_bytes, mime_type, narrator, language, checksum, created_at_ms
                 FROM audio_assets WHERE id = ?1",
                params![audio_asset_id(chapter_id, verse_number)],
                Self::row_to_asset,
            )
            .optional()
            .map_err(Into::into)
    }

    fn audio_exists(&self, chapter_id: u32, verse_number: u32) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM audio_assets WHERE id = ?1",
                params![audio_asset_id(chapter_id, verse_number)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn audio_for_chapter(&self, chapter_id: u32) -> Result<Vec<AudioAsset>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, chapter_id, verse_number, payload, size_bytes, mime_type, narrator, language, checksum, created_at_ms
             FROM audio_assets WHERE chapter_id = ?1 ORDER BY verse_number",
        )?;
        let assets = stmt
            .query_map(params![chapter_id], Self::row_to_asset)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(assets)
    }

    fn total_audio_size(&self) -> Result<u64> {
        let total: u64 = self.conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM audio_assets",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn delete_audio(&self, chapter_id: u32, verse_number: u32) -> Result<()> {
        self.conn.execute(
            "DELETE FROM audio_assets WHERE id = ?1",
            params![audio_asset_id(chapter_id, verse_number)],
        )?;
        Ok(())
    }

    fn clear_audio(&self) -> Result<()> {
        self.conn.execute("DELETE FROM audio_assets", [])?;
        Ok(())
    }

    fn evict_older_than(&self, age_ms: i64) -> Result<usize> {
        let cutoff = now_ms() - age_ms;
        let count = self.conn.execute(
            "DELETE FROM audio_assets WHERE created_at_ms < ?1",
            params![cutoff],
        )?;
        Ok(count)
    }
}

impl QuizRepository for SqliteStore {
    fn record_quiz(&self, session: &QuizSession) -> Result<i64> {
        let verse_numbers = serde_json::to_string(&session.verse_numbers)?;
        self.conn.execute(
            "INSERT INTO quiz_history (chapter_id, verse_numbers, score, question_count, duration_seconds, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.chapter_id,
                verse_numbers,
                session.score,
                session.question_count,
                session.duration_seconds,
                session.created_at_ms,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn quiz_history_for_chapter(&self, chapter_id: u32, limit: usize) -> Result<Vec<QuizSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, chapter_id, verse_numbers, score, question_count, duration_seconds, created_at_ms
             FROM quiz_history WHERE chapter_id = ?1
             ORDER BY created_at_ms DESC, id DESC LIMIT ?2",
        )?;
        let sessions = stmt
            .query_map(params![chapter_id, limit], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn recent_quiz_history(&self, limit: usize) -> Result<Vec<QuizSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, chapter_id, verse_numbers, score, question_count, duration_seconds, created_at_ms
             FROM quiz_history ORDER BY created_at_ms DESC, id DESC LIMIT ?1",
        )?;
        let sessions = stmt
            .query_map(params![limit], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<QuizSession> {
    let verse_numbers: String = row.get(2)?;
    Ok(QuizSession {
        id: row.get(0)?,
        chapter_id: row.get(1)?,
        verse_numbers: serde_json::from_str(&verse_numbers).unwrap_or_default(),
        score: row.get(3)?,
        question_count: row.get(4)?,
        duration_seconds: row.get(5)?,
        created_at_ms: row.get(6)?,
    })
}

impl SettingsRepository for SqliteStore {
    fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn all_settings(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut settings = BTreeMap::new();
        for (key, raw) in rows {
            settings.insert(key, serde_json::from_str(&raw)?);
        }
        Ok(settings)
    }

    fn delete_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl SyncQueueRepository for SqliteStore {
    fn enqueue(&self, kind: &str, payload: &serde_json::Value) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_queue (kind, payload, created_at_ms, delivered, attempts)
             VALUES (?1, ?2, ?3, 0, 0)",
            params![kind, serde_json::to_string(payload)?, now_ms()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn pending_operations(&self) -> Result<Vec<SyncOperation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, payload, created_at_ms, delivered, delivered_at_ms, attempts
             FROM sync_queue WHERE delivered = 0 ORDER BY id",
        )?;
        let operations = stmt
            .query_map([], Self::row_to_operation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(operations)
    }

    fn get_operation(&self, id: i64) -> Result<Option<SyncOperation>> {
        self.conn
            .query_row(
                "SELECT id, kind, payload, created_at_ms, delivered, delivered_at_ms, attempts
                 FROM sync_queue WHERE id = ?1",
                params![id],
                Self::row_to_operation,
            )
            .optional()
            .map_err(Into::into)
    }

    fn mark_delivered(&self, id: i64) -> Result<()> {
        // Idempotent: a second call leaves the original delivery timestamp.
        self.conn.execute(
            "UPDATE sync_queue SET delivered = 1, delivered_at_ms = ?1
             WHERE id = ?2 AND delivered = 0",
            params![now_ms(), id],
        )?;
        Ok(())
    }

    fn record_attempt(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue SET attempts = attempts + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    fn compact_delivered(&self) -> Result<usize> {
        let count = self
            .conn
            .execute("DELETE FROM sync_queue WHERE delivered = 1", [])?;
        Ok(count)
    }

    fn pending_count(&self) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE delivered = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
