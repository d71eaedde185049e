//! Usage recording for authorized requests.
//!
//! After a request passes the auth pipeline its credential id is pushed onto a
//! bounded channel. A single background worker drains the channel, increments
//! `total_requests` and stamps `last_used_at`.
//!
//! # Guarantees
//!
//! - Submitting never waits: a full or closed queue drops the record and logs a warning
//! - Worker failures are logged and never reach the request
//! - Nothing is retried
//!
//! `last_used_at` may land out of order under concurrent use of one key.

use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::store::{Counter, CredentialStore, FieldUpdate, Precondition};

/// Handle for submitting usage records. Cheap to clone.
#[derive(Clone)]
pub struct UsageRecorder {
    tx: mpsc::Sender<Uuid>,
}

impl UsageRecorder {
    /// Starts the worker and returns the submission handle with the worker's
    /// join handle. The worker exits once every handle has been dropped and
    /// the queue is drained.
    pub fn spawn(store: Arc<dyn CredentialStore>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(store, rx));
        (Self { tx }, worker)
    }

    /// Queues one usage record for `credential_id`.
    pub fn record(&self, credential_id: Uuid) {
        match self.tx.try_send(credential_id) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%credential_id, "usage queue full, dropping usage record");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(%credential_id, "usage worker stopped, dropping usage record");
            }
        }
    }
}

async fn run_worker(store: Arc<dyn CredentialStore>, mut rx: mpsc::Receiver<Uuid>) {
    while let Some(credential_id) = rx.recv().await {
        if let Err(e) = store
            .increment_counter(credential_id, Counter::TotalRequests)
            .await
        {
            error!(%credential_id, error = %e, "failed to increment usage counter");
            continue;
        }

        if let Err(e) = store
            .update_fields(
                credential_id,
                &[FieldUpdate::LastUsedAt(Utc::now())],
                Precondition::None,
            )
            .await
        {
            error!(%credential_id, error = %e, "failed to stamp last_used_at");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::api_key::{CredentialRecord, KeyStatus, RateLimits, Usage},
        store::memory::MemoryCredentialStore,
    };

    async fn seeded_store() -> (MemoryCredentialStore, Uuid) {
        let store = MemoryCredentialStore::new();
        let now = Utc::now();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            name: "k".into(),
            description: String::new(),
            environment: String::new(),
            project_id: None,
            api_key: "ak_usage".into(),
            hashed_secret: "hash".into(),
            user_id: None,
            user_email: None,
            assigned_at: None,
            status: KeyStatus::Active,
            permissions: vec![],
            rate_limits: RateLimits::default(),
            usage: Usage::default(),
            created_at: now,
            updated_at: now,
        };
        store.create_with_id(&record).await.unwrap();
        (store, record.id)
    }

    #[tokio::test]
    async fn every_record_increments_once() {
        let (store, id) = seeded_store().await;
        let (recorder, worker) = UsageRecorder::spawn(Arc::new(store.clone()), 64);

        for _ in 0..10 {
            recorder.record(id);
        }
        drop(recorder);
        worker.await.unwrap();

        let stored = store.get_by_id(id).await.unwrap();
        assert_eq!(stored.usage.total_requests, 10);
        assert!(stored.usage.last_used_at.is_some());
    }

    #[tokio::test]
    async fn unknown_credential_does_not_stop_worker() {
        let (store, id) = seeded_store().await;
        let (recorder, worker) = UsageRecorder::spawn(Arc::new(store.clone()), 8);

        recorder.record(Uuid::new_v4());
        recorder.record(id);
        drop(recorder);
        worker.await.unwrap();

        assert_eq!(store.get_by_id(id).await.unwrap().usage.total_requests, 1);
    }

    #[tokio::test]
    async fn record_after_worker_stops_is_dropped_quietly() {
        let (store, id) = seeded_store().await;
        let (recorder, worker) = UsageRecorder::spawn(Arc::new(store.clone()), 8);
        worker.abort();
        let _ = worker.await;

        recorder.record(id);
        assert_eq!(store.get_by_id(id).await.unwrap().usage.total_requests, 0);
    }
}
