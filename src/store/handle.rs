//! Serialized store domain.
//!
//! One tokio task owns the [`InMemoryStore`] and drains a bounded request
//! channel; each request carries a oneshot for its reply. Requests are served
//! strictly in arrival order, so no two calls observe each other's partial
//! effects.

use super::memory::InMemoryStore;
use super::StoreGateway;
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::model::{ApplyResult, ChangeBatch, Forest, Record};
use crate::types::ElementId;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

enum StoreRequest {
    Fetch {
        id: ElementId,
        reply: oneshot::Sender<Option<Record>>,
    },
    ApplyBatch {
        batch: ChangeBatch,
        reply: oneshot::Sender<ApplyResult>,
    },
    FullSnapshot {
        reply: oneshot::Sender<Forest>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable handle to a running store worker
#[derive(Clone)]
pub struct StoreHandle {
    requests: mpsc::Sender<StoreRequest>,
}

impl StoreHandle {
    /// Spawn a worker over a freshly seeded store.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &StoreConfig) -> Self {
        Self::spawn_with(InMemoryStore::seeded(config.id_strategy), config)
    }

    /// Spawn a worker over an existing store.
    pub fn spawn_with(store: InMemoryStore, config: &StoreConfig) -> Self {
        let (requests, inbox) = mpsc::channel(config.channel_capacity.max(1));
        tokio::spawn(Self::worker_loop(store, inbox));
        Self { requests }
    }

    /// Ask the worker to stop; later calls fail with `Unavailable`.
    pub async fn shutdown(&self) {
        let _ = self.requests.send(StoreRequest::Shutdown).await;
    }

    async fn worker_loop(mut store: InMemoryStore, mut inbox: mpsc::Receiver<StoreRequest>) {
        debug!("Store worker started");
        while let Some(request) = inbox.recv().await {
            // A dropped reply receiver means the caller went away; the
            // mutation has still been applied.
            match request {
                StoreRequest::Fetch { id, reply } => {
                    let _ = reply.send(store.fetch(&id));
                }
                StoreRequest::ApplyBatch { batch, reply } => {
                    let _ = reply.send(store.apply_batch(batch));
                }
                StoreRequest::FullSnapshot { reply } => {
                    let _ = reply.send(store.full_snapshot());
                }
                StoreRequest::Reset { reply } => {
                    store.reset_to_defaults();
                    let _ = reply.send(());
                }
                StoreRequest::Shutdown => break,
            }
        }
        info!("Store worker stopped");
    }

    async fn call<T, F>(&self, make: F) -> Result<T, StorageError>
    where
        T: Send,
        F: FnOnce(oneshot::Sender<T>) -> StoreRequest + Send,
    {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(make(reply))
            .await
            .map_err(|_| StorageError::Unavailable("store worker is not running".to_string()))?;
        response
            .await
            .map_err(|_| StorageError::Unavailable("store worker dropped the request".to_string()))
    }
}

#[async_trait]
impl StoreGateway for StoreHandle {
    async fn fetch(&self, id: ElementId) -> Result<Option<Record>, StorageError> {
        self.call(|reply| StoreRequest::Fetch { id, reply }).await
    }

    async fn apply_batch(&self, batch: ChangeBatch) -> Result<ApplyResult, StorageError> {
        self.call(|reply| StoreRequest::ApplyBatch { batch, reply }).await
    }

    async fn full_snapshot(&self) -> Result<Forest, StorageError> {
        self.call(|reply| StoreRequest::FullSnapshot { reply }).await
    }

    async fn reset_to_defaults(&self) -> Result<(), StorageError> {
        self.call(|reply| StoreRequest::Reset { reply }).await
    }
}
