//! Offline sync: durable outbox drain against the remote endpoint.
//!
//! The queue itself lives in the store (`SyncQueueRepository`); this
//! module owns the drain cycle. Delivery is at-least-once: an operation
//! is marked delivered only after the transport reports success, so a
//! lost acknowledgement can cause redelivery. The envelope carries the
//! queue id as an idempotency key so the remote side can deduplicate.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{SqliteStore, StoreError, SyncOperation, SyncQueueRepository};

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("sync endpoint returned status {0}")]
    Endpoint(u16),

    #[error("drain already in progress")]
    AlreadyInProgress,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// How a drain cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Every pending operation was delivered (or there were none).
    Completed,
    /// At least one operation failed delivery and remains pending.
    PartiallyFailed,
}

/// Summary of one drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub outcome: DrainOutcome,
}

/// Coordinator status for observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SyncStatus {
    Idle,
    Draining { total: usize, completed: usize },
    Completed { report: DrainReport },
    PartiallyFailed { report: DrainReport },
}

/// JSON envelope posted to the remote endpoint, one per operation.
#[derive(Debug, Serialize)]
struct DeliveryEnvelope<'a> {
    operation_id: i64,
    kind: &'a str,
    enqueued_at_ms: i64,
    payload: &'a serde_json::Value,
}

impl<'a> DeliveryEnvelope<'a> {
    fn from_operation(operation: &'a SyncOperation) -> Self {
        Self {
            operation_id: operation.id,
            kind: &operation.kind,
            enqueued_at_ms: operation.created_at_ms,
            payload: &operation.payload,
        }
    }
}

/// Remote sync endpoint capability.
#[async_trait]
pub trait SyncTransport {
    /// Deliver one operation. Success means the remote side has durably
    /// accepted it.
    async fn deliver(&self, operation: &SyncOperation) -> Result<(), SyncError>;

    /// Cheap reachability probe, used by connectivity-restore triggers.
    async fn is_reachable(&self) -> bool;
}

/// HTTP implementation of the remote sync endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn deliver(&self, operation: &SyncOperation) -> Result<(), SyncError> {
        let url = format!("{}/api/sync", self.base_url);
        let envelope = DeliveryEnvelope::from_operation(operation);

        let resp = self
            .client
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SyncError::Endpoint(resp.status().as_u16()));
        }

        Ok(())
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Drains the sync queue against a transport when invoked (on a
/// connectivity-restore signal or a periodic trigger).
pub struct SyncCoordinator<T: SyncTransport> {
    transport: T,
    status: Mutex<SyncStatus>,
}

impl<T: SyncTransport> SyncCoordinator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            status: Mutex::new(SyncStatus::Idle),
        }
    }

    /// Current coordinator status.
    pub async fn status(&self) -> SyncStatus {
        self.status.lock().await.clone()
    }

    /// Probe the remote endpoint.
    pub async fn check_connectivity(&self) -> bool {
        self.transport.is_reachable().await
    }

    /// Run one drain cycle over all pending operations, FIFO.
    ///
    /// Per-operation failures never abort the cycle: a failed operation
    /// gets its attempt count bumped and stays pending for the next
    /// trigger. A cycle with any failure reports `PartiallyFailed`; no
    /// operation is ever dropped.
    pub async fn drain(&self, store: &SqliteStore) -> Result<DrainReport, SyncError> {
        {
            let mut status = self.status.lock().await;
            if matches!(*status, SyncStatus::Draining { .. }) {
                return Err(SyncError::AlreadyInProgress);
            }
            *status = SyncStatus::Draining { total: 0, completed: 0 };
        }

        let result = self.drain_inner(store).await;

        match &result {
            Ok(report) => {
                let status = match report.outcome {
                    DrainOutcome::Completed => SyncStatus::Completed { report: *report },
                    DrainOutcome::PartiallyFailed => {
                        SyncStatus::PartiallyFailed { report: *report }
                    }
                };
                self.set_status(status).await;
            }
            Err(_) => self.set_status(SyncStatus::Idle).await,
        }

        result
    }

    async fn drain_inner(&self, store: &SqliteStore) -> Result<DrainReport, SyncError> {
        let pending = store.pending_operations()?;
        let total = pending.len();
        self.set_status(SyncStatus::Draining { total, completed: 0 }).await;

        let mut delivered = 0;
        let mut failed = 0;

        for (index, operation) in pending.iter().enumerate() {
            match self.transport.deliver(operation).await {
                Ok(()) => {
                    // Mark before anything else observes the success, so
                    // the operation can never be re-listed as pending.
                    store.mark_delivered(operation.id)?;
                    delivered += 1;
                }
                Err(_) => {
                    store.record_attempt(operation.id)?;
                    failed += 1;
                }
            }
            self.set_status(SyncStatus::Draining { total, completed: index + 1 })
                .await;
        }

        let outcome = if failed > 0 {
            DrainOutcome::PartiallyFailed
        } else {
            DrainOutcome::Completed
        };

        Ok(DrainReport {
            attempted: total,
            delivered,
            failed,
            outcome,
        })
    }

    async fn set_status(&self, status: SyncStatus) {
        *self.status.lock().await = status;
    }
}
