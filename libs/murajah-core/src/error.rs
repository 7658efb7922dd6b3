//! Error types for murajah-core.

use thiserror::Error;

/// Result type alias using SelectionError.
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Errors that can occur while drawing quiz content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no verses available to draw from")]
    NoVerses,
}
