//! SQLite schema definitions and versioned migrations.

/// Current schema version. Tracked in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

/// One SQL batch per schema version, applied in order at open time.
///
/// Migrations only ever create missing containers and indexes; an
/// existing container is never dropped or truncated.
pub const MIGRATIONS: &[&str] = &[SCHEMA_V1];

const SCHEMA_V1: &str = r#"
-- Chapters of the reference text (immutable after initial load)
CREATE TABLE IF NOT EXISTS chapters (
    id INTEGER PRIMARY KEY,
    ordinal INTEGER NOT NULL UNIQUE,
    name_local TEXT NOT NULL,
    name_arabic TEXT NOT NULL,
    verse_count INTEGER NOT NULL,
    revelation TEXT NOT NULL
);

-- Verses, keyed by (chapter, verse number)
CREATE TABLE IF NOT EXISTS verses (
    chapter_id INTEGER NOT NULL REFERENCES chapters(id),
    verse_number INTEGER NOT NULL,
    text_arabic TEXT NOT NULL,
    text_translation TEXT,
    global_number INTEGER NOT NULL,
    PRIMARY KEY (chapter_id, verse_number)
);

-- Downloaded per-verse audio, one asset per verse
CREATE TABLE IF NOT EXISTS audio_assets (
    id TEXT PRIMARY KEY,
    chapter_id INTEGER NOT NULL,
    verse_number INTEGER NOT NULL,
    payload BLOB NOT NULL,
    size_bytes INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    narrator TEXT NOT NULL,
    language TEXT NOT NULL,
    checksum TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    UNIQUE (chapter_id, verse_number)
);

-- Completed quiz rounds (append-only)
CREATE TABLE IF NOT EXISTS quiz_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chapter_id INTEGER NOT NULL,
    verse_numbers TEXT NOT NULL,
    score INTEGER NOT NULL,
    question_count INTEGER NOT NULL,
    duration_seconds INTEGER NOT NULL,
    created_at_ms INTEGER NOT NULL
);

-- User settings (opaque JSON values, last write wins)
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Durable outbox of operations awaiting remote delivery
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    delivered INTEGER NOT NULL DEFAULT 0,
    delivered_at_ms INTEGER,
    attempts INTEGER NOT NULL DEFAULT 0
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_verses_chapter ON verses(chapter_id);
CREATE INDEX IF NOT EXISTS idx_audio_chapter ON audio_assets(chapter_id);
CREATE INDEX IF NOT EXISTS idx_audio_created ON audio_assets(created_at_ms);
CREATE INDEX IF NOT EXISTS idx_quiz_chapter ON quiz_history(chapter_id);
CREATE INDEX IF NOT EXISTS idx_quiz_created ON quiz_history(created_at_ms);
CREATE INDEX IF NOT EXISTS idx_sync_delivered ON sync_queue(delivered);
"#;
