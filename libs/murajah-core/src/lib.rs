//! Core murajah library shared by the storage engine and frontends.
//!
//! Provides:
//! - Shared domain types (Chapter, Verse, QuizSession)
//! - Uniform quiz verse sampling (partial Fisher-Yates)
//! - The deterministic audio asset key

pub mod error;
pub mod selection;
pub mod types;

pub use error::{Result, SelectionError};
pub use selection::draw;
pub use types::{audio_asset_id, Chapter, QuizSession, RevelationCategory, Verse};
