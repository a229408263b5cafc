//! Secondary (mirror) patient store.
//!
//! Every registered patient is copied, with a creation timestamp, into a document store that
//! nothing reads from. The copy is best-effort: [`PatientMirror::mirror`] is a fault boundary
//! and never returns an error. Stores may drift apart; the primary store is the source of truth.

use crate::error::{StoreError, StoreResult};
use crate::patient::{MirroredPatientRecord, PatientRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Insert-only access to a document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Prepare the backing collection. Safe to call repeatedly.
    async fn initialise(&self) -> StoreResult<()>;

    /// Store one document.
    async fn insert(&self, document: &MirroredPatientRecord) -> StoreResult<()>;
}

/// Result of a mirror write. Informational only; callers do not branch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorOutcome {
    Written,
    /// No document store is configured.
    Skipped,
    Failed,
}

/// Fault boundary around the secondary store.
#[derive(Clone, Default)]
pub struct PatientMirror {
    store: Option<Arc<dyn DocumentStore>>,
}

impl PatientMirror {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A mirror with no document store behind it. Every write is skipped.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Copy `record` into the document store, stamped with `created_at`.
    ///
    /// Store errors and panics inside the store are caught here and logged; they never reach
    /// the caller.
    pub async fn mirror(&self, record: &PatientRecord, created_at: DateTime<Utc>) -> MirrorOutcome {
        let Some(store) = self.store.clone() else {
            tracing::debug!(patient_id = record.id, "mirror store not configured, skipping");
            return MirrorOutcome::Skipped;
        };

        let patient_id = record.id;
        let document = MirroredPatientRecord::new(record.clone(), created_at);

        // Run on its own task so a panicking store is reported as a JoinError.
        let handle = tokio::spawn(async move { store.insert(&document).await });

        match handle.await {
            Ok(Ok(())) => {
                tracing::debug!(patient_id, "patient mirrored");
                MirrorOutcome::Written
            }
            Ok(Err(e)) => {
                tracing::warn!(patient_id, error = %e, "mirror write failed; primary record kept");
                MirrorOutcome::Failed
            }
            Err(e) => {
                tracing::error!(patient_id, error = %e, "mirror write aborted; primary record kept");
                MirrorOutcome::Failed
            }
        }
    }
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<Vec<MirroredPatientRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored document, in insertion order.
    pub async fn documents(&self) -> Vec<MirroredPatientRecord> {
        self.documents.read().await.clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn initialise(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert(&self, document: &MirroredPatientRecord) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory document store is marked unavailable".into(),
            ));
        }
        self.documents.write().await.push(document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Gender;

    struct PanickingStore;

    #[async_trait]
    impl DocumentStore for PanickingStore {
        async fn initialise(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn insert(&self, _document: &MirroredPatientRecord) -> StoreResult<()> {
            panic!("driver bug");
        }
    }

    fn record() -> PatientRecord {
        PatientRecord {
            id: 12,
            name: "Mirror Me".into(),
            age: 64,
            gender: Gender::Male,
            contact: "0123456789".into(),
        }
    }

    #[tokio::test]
    async fn test_mirror_writes_enriched_document() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mirror = PatientMirror::new(store.clone());
        let created_at = Utc::now();

        assert_eq!(mirror.mirror(&record(), created_at).await, MirrorOutcome::Written);

        let documents = store.documents().await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].patient, record());
        assert_eq!(documents[0].created_at, created_at);
        assert_eq!(documents[0].updated_at, None);
    }

    #[tokio::test]
    async fn test_disabled_mirror_skips() {
        let mirror = PatientMirror::disabled();
        assert!(!mirror.is_enabled());
        assert_eq!(mirror.mirror(&record(), Utc::now()).await, MirrorOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_store_failure_is_absorbed() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.set_unavailable(true);
        let mirror = PatientMirror::new(store.clone());

        assert_eq!(mirror.mirror(&record(), Utc::now()).await, MirrorOutcome::Failed);
        assert!(store.documents().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_panic_is_absorbed() {
        let mirror = PatientMirror::new(Arc::new(PanickingStore));
        assert_eq!(mirror.mirror(&record(), Utc::now()).await, MirrorOutcome::Failed);
    }
}
