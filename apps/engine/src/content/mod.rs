//! Reference content fetching and initial import.
//!
//! The engine never talks HTTP directly for content; it consumes the
//! [`ContentFetcher`] capability, whose shipped implementation wraps the
//! public corpus API and the per-verse audio CDN. Status-code handling
//! stays inside the fetcher; callers only see [`ContentError`].

use async_trait::async_trait;
use murajah_core::types::{Chapter, RevelationCategory, Verse};
use serde::Deserialize;
use thiserror::Error;

use crate::db::{ChapterRepository, SettingsRepository, SqliteStore, StoreError};

/// Content layer errors.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("network error: {0}")]
    Http(String),

    #[error("content endpoint returned status {0}")]
    Status(u16),

    #[error("failed to decode content payload: {0}")]
    Decode(String),

    #[error("unknown chapter: {0}")]
    UnknownChapter(u32),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One chapter together with its verses, as delivered by the fetcher.
#[derive(Debug, Clone)]
pub struct ChapterContent {
    pub chapter: Chapter,
    pub verses: Vec<Verse>,
}

/// The full reference corpus.
#[derive(Debug, Clone)]
pub struct ReferencePayload {
    pub chapters: Vec<ChapterContent>,
}

/// Raw audio for one verse.
#[derive(Debug, Clone)]
pub struct AudioBytes {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// External content-fetcher capability.
#[async_trait]
pub trait ContentFetcher {
    async fn fetch_reference_content(&self) -> Result<ReferencePayload, ContentError>;

    /// Fetch the audio rendition of one verse, addressed by its
    /// corpus-wide sequence number and the narrator edition.
    async fn fetch_audio_bytes(
        &self,
        global_number: u32,
        narrator: &str,
    ) -> Result<AudioBytes, ContentError>;
}

/// HTTP implementation against the public corpus API and audio CDN.
pub struct HttpContentFetcher {
    client: reqwest::Client,
    api_base: String,
    cdn_base: String,
    edition: String,
}

impl HttpContentFetcher {
    pub const DEFAULT_API_BASE: &'static str = "https://api.alquran.cloud/v1";
    pub const DEFAULT_CDN_BASE: &'static str = "https://cdn.islamic.network/quran/audio";

    pub fn new(edition: impl Into<String>) -> Self {
        Self::with_bases(Self::DEFAULT_API_BASE, Self::DEFAULT_CDN_BASE, edition)
    }

    pub fn with_bases(
        api_base: impl Into<String>,
        cdn_base: impl Into<String>,
        edition: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            cdn_base: cdn_base.into().trim_end_matches('/').to_string(),
            edition: edition.into(),
        }
    }
}

// Upstream document shape: { code, data: { surahs: [...] } }

#[derive(Debug, Deserialize)]
struct CorpusDocument {
    code: u32,
    data: CorpusData,
}

#[derive(Debug, Deserialize)]
struct CorpusData {
    surahs: Vec<ApiSurah>,
}

#[derive(Debug, Deserialize)]
struct ApiSurah {
    number: u32,
    #[serde(rename = "englishName")]
    english_name: String,
    name: String,
    #[serde(rename = "numberOfAyahs")]
    number_of_ayahs: u32,
    #[serde(rename = "revelationType")]
    revelation_type: String,
    ayahs: Vec<ApiAyah>,
}

#[derive(Debug, Deserialize)]
struct ApiAyah {
    #[serde(rename = "numberInSurah")]
    number_in_surah: u32,
    text: String,
    #[serde(default)]
    translation: Option<String>,
    number: u32,
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_reference_content(&self) -> Result<ReferencePayload, ContentError> {
        let url = format!("{}/quran/{}", self.api_base, self.edition);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ContentError::Status(resp.status().as_u16()));
        }

        let document: CorpusDocument = resp
            .json()
            .await
            .map_err(|e| ContentError::Decode(e.to_string()))?;

        if document.code != 200 {
            return Err(ContentError::Decode(format!(
                "unexpected api code {}",
                document.code
            )));
        }

        let chapters = document
            .data
            .surahs
            .into_iter()
            .map(|surah| ChapterContent {
                chapter: Chapter {
                    id: surah.number,
                    ordinal: surah.number,
                    name_local: surah.english_name,
                    name_arabic: surah.name,
                    verse_count: surah.number_of_ayahs,
                    revelation: RevelationCategory::parse(&surah.revelation_type)
                        .unwrap_or(RevelationCategory::Meccan),
                },
                verses: surah
                    .ayahs
                    .into_iter()
                    .map(|ayah| Verse {
                        chapter_id: surah.number,
                        verse_number: ayah.number_in_surah,
                        text_arabic: ayah.text,
                        text_translation: ayah.translation,
                        global_number: ayah.number,
                    })
                    .collect(),
            })
            .collect();

        Ok(ReferencePayload { chapters })
    }

    async fn fetch_audio_bytes(
        &self,
        global_number: u32,
        narrator: &str,
    ) -> Result<AudioBytes, ContentError> {
        let url = format!("{}/{}/{}.mp3", self.cdn_base, global_number, narrator);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ContentError::Status(resp.status().as_u16()));
        }

        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ContentError::Http(e.to_string()))?;

        Ok(AudioBytes {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

/// Result of an initial content import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub chapters: usize,
    pub verses: usize,
}

/// Settings key stamped once the whole corpus has landed. A store
/// without the stamp re-imports on the next load, so an import cut
/// short never leaves the corpus permanently partial.
const CONTENT_LOADED_KEY: &str = "content_loaded";

/// First-run import of the reference corpus.
///
/// A store stamped as fully loaded is left untouched (the corpus is
/// immutable once loaded), reported as a zero-count load. Each chapter's
/// verses land in one transaction, so readers never observe a partially
/// loaded chapter; an interrupted import resumes through the same
/// idempotent upserts.
pub async fn load_reference_content<F>(
    store: &SqliteStore,
    fetcher: &F,
) -> Result<LoadReport, ContentError>
where
    F: ContentFetcher + Sync,
{
    if store.get_setting(CONTENT_LOADED_KEY)?.is_some() {
        return Ok(LoadReport {
            chapters: 0,
            verses: 0,
        });
    }

    let payload = fetcher.fetch_reference_content().await?;

    let mut verse_total = 0;
    for content in &payload.chapters {
        store.put_chapter(&content.chapter)?;
        store.put_verses(&content.verses)?;
        verse_total += content.verses.len();
    }

    store.set_setting(CONTENT_LOADED_KEY, &serde_json::Value::Bool(true))?;

    Ok(LoadReport {
        chapters: payload.chapters.len(),
        verses: verse_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct StaticFetcher {
        payload: ReferencePayload,
    }

    #[async_trait]
    impl ContentFetcher for StaticFetcher {
        async fn fetch_reference_content(&self) -> Result<ReferencePayload, ContentError> {
            Ok(self.payload.clone())
        }

        async fn fetch_audio_bytes(
            &self,
            _global_number: u32,
            _narrator: &str,
        ) -> Result<AudioBytes, ContentError> {
            Err(ContentError::Status(404))
        }
    }

    fn sample_payload() -> ReferencePayload {
        let chapter = Chapter {
            id: 1,
            ordinal: 1,
            name_local: "Al-Fatiha".to_string(),
            name_arabic: "الفاتحة".to_string(),
            verse_count: 2,
            revelation: RevelationCategory::Meccan,
        };
        let verses = vec![
            Verse {
                chapter_id: 1,
                verse_number: 1,
                text_arabic: "بِسْمِ اللَّهِ".to_string(),
                text_translation: None,
                global_number: 1,
            },
            Verse {
                chapter_id: 1,
                verse_number: 2,
                text_arabic: "الْحَمْدُ لِلَّهِ".to_string(),
                text_translation: None,
                global_number: 2,
            },
        ];
        ReferencePayload {
            chapters: vec![ChapterContent { chapter, verses }],
        }
    }

    #[tokio::test]
    async fn test_first_run_import() {
        let store = SqliteStore::open_in_memory().unwrap();
        let fetcher = StaticFetcher {
            payload: sample_payload(),
        };

        let report = load_reference_content(&store, &fetcher).await.unwrap();
        assert_eq!(report, LoadReport { chapters: 1, verses: 2 });

        let verses = store.get_verses_for_chapter(1).unwrap();
        assert_eq!(verses.len(), 2);
        assert_eq!(verses[0].verse_number, 1);
    }

    #[tokio::test]
    async fn test_loaded_store_is_left_untouched() {
        let store = SqliteStore::open_in_memory().unwrap();
        let fetcher = StaticFetcher {
            payload: sample_payload(),
        };

        load_reference_content(&store, &fetcher).await.unwrap();
        let report = load_reference_content(&store, &fetcher).await.unwrap();

        assert_eq!(report, LoadReport { chapters: 0, verses: 0 });
        assert_eq!(store.get_chapters().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupted_import_is_resumed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let fetcher = StaticFetcher {
            payload: sample_payload(),
        };

        // Chapter committed but the import never finished: no stamp.
        let partial = sample_payload().chapters.remove(0);
        store.put_chapter(&partial.chapter).unwrap();
        store.put_verses(&partial.verses[..1]).unwrap();

        let report = load_reference_content(&store, &fetcher).await.unwrap();
        assert_eq!(report, LoadReport { chapters: 1, verses: 2 });
        assert_eq!(store.get_verses_for_chapter(1).unwrap().len(), 2);

        // The completed load is stamped; a third call is a no-op.
        let report = load_reference_content(&store, &fetcher).await.unwrap();
        assert_eq!(report, LoadReport { chapters: 0, verses: 0 });
    }

    #[test]
    fn test_corpus_document_decoding() {
        let raw = r#"{
            "code": 200,
            "data": {
                "surahs": [{
                    "number": 1,
                    "englishName": "Al-Fatiha",
                    "name": "الفاتحة",
                    "numberOfAyahs": 1,
                    "revelationType": "Meccan",
                    "ayahs": [{"numberInSurah": 1, "text": "بِسْمِ اللَّهِ", "number": 1}]
                }]
            }
        }"#;

        let document: CorpusDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(document.code, 200);
        assert_eq!(document.data.surahs[0].ayahs[0].number, 1);
        assert_eq!(document.data.surahs[0].revelation_type, "Meccan");
    }
}
