//! Primary (authoritative) patient store.
//!
//! The primary store assigns patient ids and is the only store reads are served from. A write
//! is reported successful only after it has been committed.

use crate::error::{StoreError, StoreResult};
use crate::patient::{NewPatient, PatientId, PatientRecord};
use crate::query::Page;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Create and read access to the authoritative patient records.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Prepare the backing storage (tables, indexes). Safe to call repeatedly.
    async fn initialise(&self) -> StoreResult<()>;

    /// Persist a new patient, assigning it a unique id.
    ///
    /// Returns only once the record is durable.
    async fn create(&self, patient: &NewPatient) -> StoreResult<PatientRecord>;

    /// Records in ascending id order, skipping `page.offset` and returning at most `page.limit`.
    async fn list(&self, page: Page) -> StoreResult<Vec<PatientRecord>>;

    /// Exact lookup. `Ok(None)` means no such patient.
    async fn get_by_id(&self, id: PatientId) -> StoreResult<Option<PatientRecord>>;
}

#[derive(Debug, Default)]
struct Records {
    last_id: PatientId,
    by_id: BTreeMap<PatientId, PatientRecord>,
}

/// Process-local primary store.
///
/// Ids start at 1 and increase by one per record, matching a fresh serial column.
#[derive(Debug, Default)]
pub struct InMemoryPrimaryStore {
    records: RwLock<Records>,
    unavailable: AtomicBool,
}

impl InMemoryPrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory primary store is marked unavailable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for InMemoryPrimaryStore {
    async fn initialise(&self) -> StoreResult<()> {
        self.check_available()
    }

    async fn create(&self, patient: &NewPatient) -> StoreResult<PatientRecord> {
        self.check_available()?;

        let mut records = self.records.write().await;
        let id = records.last_id + 1;
        let record = patient.clone().with_id(id);
        records.by_id.insert(id, record.clone());
        records.last_id = id;

        Ok(record)
    }

    async fn list(&self, page: Page) -> StoreResult<Vec<PatientRecord>> {
        self.check_available()?;

        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

        let records = self.records.read().await;
        Ok(records
            .by_id
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: PatientId) -> StoreResult<Option<PatientRecord>> {
        self.check_available()?;
        Ok(self.records.read().await.by_id.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Gender;

    fn new_patient(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            age: 40,
            gender: Gender::Other,
            contact: "07700900000".into(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = InMemoryPrimaryStore::new();

        let first = store.create(&new_patient("First")).await.unwrap();
        let second = store.create(&new_patient("Second")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.name, "Second");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_list_pages_in_id_order() {
        let store = InMemoryPrimaryStore::new();
        for i in 0..5 {
            store
                .create(&new_patient(&format!("Patient {i}")))
                .await
                .unwrap();
        }

        let ids = |records: Vec<PatientRecord>| {
            records.into_iter().map(|r| r.id).collect::<Vec<_>>()
        };

        assert_eq!(ids(store.list(Page::new(0, 2)).await.unwrap()), vec![1, 2]);
        assert_eq!(ids(store.list(Page::new(2, 2)).await.unwrap()), vec![3, 4]);
        assert_eq!(ids(store.list(Page::new(4, 2)).await.unwrap()), vec![5]);
        assert!(store.list(Page::new(10, 2)).await.unwrap().is_empty());
        assert!(store.list(Page::new(0, 0)).await.unwrap().is_empty());
        assert_eq!(store.list(Page::new(0, u64::MAX)).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_get_by_id_distinguishes_absence() {
        let store = InMemoryPrimaryStore::new();
        let created = store.create(&new_patient("Present")).await.unwrap();

        assert_eq!(store.get_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(store.get_by_id(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_without_writing() {
        let store = InMemoryPrimaryStore::new();
        store.set_unavailable(true);

        let err = store.create(&new_patient("Lost")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_unavailable(false);
        assert!(store.is_empty().await);
    }
}
