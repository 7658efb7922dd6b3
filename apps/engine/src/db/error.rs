//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database could not be opened or brought to the
    /// current schema version. Fatal; surfaced to the caller at open time.
    #[error("failed to initialize store: {0}")]
    Init(String),

    /// The underlying storage rejected a write for lack of space. The
    /// write is not retried automatically; callers are expected to evict
    /// and retry.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            // SQLITE_FULL, plus the I/O-layer variant that arrives under
            // a different primary code.
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::DiskFull
                    || err.extended_code == rusqlite::ffi::SQLITE_IOERR_WRITE =>
            {
                Self::QuotaExceeded
            }
            _ => Self::Sqlite(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(result_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(result_code), None)
    }

    #[test]
    fn test_disk_full_codes_map_to_quota_exceeded() {
        assert!(matches!(
            StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_FULL)),
            StoreError::QuotaExceeded
        ));
        assert!(matches!(
            StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_IOERR_WRITE)),
            StoreError::QuotaExceeded
        ));
    }

    #[test]
    fn test_other_sqlite_errors_pass_through() {
        assert!(matches!(
            StoreError::from(sqlite_failure(rusqlite::ffi::SQLITE_BUSY)),
            StoreError::Sqlite(_)
        ));
    }
}
