//! Read-side patient operations.
//!
//! Reads go to the primary store only; the mirror is never consulted.

use std::sync::Arc;

use crate::constants::DEFAULT_PAGE_LIMIT;
use crate::error::RegistryResult;
use crate::patient::{PatientId, PatientRecord};
use crate::repositories::primary::PrimaryStore;

/// A window over the patient listing.
///
/// `limit` is not capped; callers get what they ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Clone)]
pub struct PatientQueryService {
    primary: Arc<dyn PrimaryStore>,
}

impl PatientQueryService {
    pub fn new(primary: Arc<dyn PrimaryStore>) -> Self {
        Self { primary }
    }

    /// Lists patients in id order.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::PrimaryStore` if the store cannot be read.
    pub async fn list_patients(&self, page: Page) -> RegistryResult<Vec<PatientRecord>> {
        Ok(self.primary.list(page).await?)
    }

    /// Looks up a single patient. `Ok(None)` means no patient has that id.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::PrimaryStore` if the store cannot be read.
    pub async fn get_patient(&self, id: PatientId) -> RegistryResult<Option<PatientRecord>> {
        Ok(self.primary.get_by_id(id).await?)
    }
}
