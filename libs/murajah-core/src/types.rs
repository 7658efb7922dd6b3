//! Core types for the murajah study engine.

use serde::{Deserialize, Serialize};

/// Revelation category of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevelationCategory {
    Meccan,
    Medinan,
}

impl Default for RevelationCategory {
    fn default() -> Self {
        Self::Meccan
    }
}

impl RevelationCategory {
    /// Get the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meccan => "meccan",
            Self::Medinan => "medinan",
        }
    }

    /// Parse from string. Accepts the upstream API spellings as well.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "meccan" | "Meccan" => Some(Self::Meccan),
            "medinan" | "Medinan" => Some(Self::Medinan),
            _ => None,
        }
    }
}

/// A chapter of the reference text. Loaded once during initial content
/// import and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub ordinal: u32,
    pub name_local: String,
    pub name_arabic: String,
    pub verse_count: u32,
    pub revelation: RevelationCategory,
}

/// A single verse. Identity is `(chapter_id, verse_number)`;
/// `global_number` is the corpus-wide sequence number used by the
/// audio CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub chapter_id: u32,
    pub verse_number: u32,
    pub text_arabic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_translation: Option<String>,
    pub global_number: u32,
}

/// A completed quiz round over one chapter. Append-only: `id` is the
/// store-assigned surrogate and is ignored on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: i64,
    pub chapter_id: u32,
    pub verse_numbers: Vec<u32>,
    pub score: u32,
    pub question_count: u32,
    pub duration_seconds: u32,
    pub created_at_ms: i64,
}

/// Deterministic composite key for a cached audio asset.
///
/// At most one asset is cached per verse; re-saving under the same key
/// replaces the previous payload.
pub fn audio_asset_id(chapter_id: u32, verse_number: u32) -> String {
    format!("{}_{}", chapter_id, verse_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_asset_id_format() {
        assert_eq!(audio_asset_id(2, 255), "2_255");
        assert_eq!(audio_asset_id(114, 1), "114_1");
    }

    #[test]
    fn test_revelation_roundtrip() {
        assert_eq!(RevelationCategory::parse("meccan"), Some(RevelationCategory::Meccan));
        assert_eq!(RevelationCategory::parse("Medinan"), Some(RevelationCategory::Medinan));
        assert_eq!(RevelationCategory::parse("other"), None);
        assert_eq!(RevelationCategory::Medinan.as_str(), "medinan");
    }
}
