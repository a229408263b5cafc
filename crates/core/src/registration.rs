//! Patient registration.
//!
//! A registration runs through four stages in order:
//!
//! ```text
//! Validating -> WritingPrimary -> Mirroring -> Responding
//!      |              |
//!      +---> Aborted <+
//! ```
//!
//! Only validation and the primary write can abort. The mirror write happens after the primary
//! commit, needs the id the primary store assigned, and its outcome never changes the result.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::error::{RegistryError, RegistryResult};
use crate::patient::PatientRecord;
use crate::repositories::mirror::PatientMirror;
use crate::repositories::primary::PrimaryStore;
use crate::validation::validate_registration;

/// Stage of a single registration, used for tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStage {
    Validating,
    WritingPrimary,
    Mirroring,
    Responding,
    Aborted,
}

impl std::fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RegistrationStage::Validating => "validating",
            RegistrationStage::WritingPrimary => "writing_primary",
            RegistrationStage::Mirroring => "mirroring",
            RegistrationStage::Responding => "responding",
            RegistrationStage::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Orchestrates validation, the primary write and the mirror write.
#[derive(Clone)]
pub struct RegistrationService {
    primary: Arc<dyn PrimaryStore>,
    mirror: PatientMirror,
}

impl RegistrationService {
    pub fn new(primary: Arc<dyn PrimaryStore>, mirror: PatientMirror) -> Self {
        Self { primary, mirror }
    }

    /// Registers a patient from a raw request body.
    ///
    /// # Arguments
    ///
    /// * `raw` - The decoded JSON body as received from the caller.
    ///
    /// # Returns
    ///
    /// The stored record, including the id assigned by the primary store.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if:
    /// - any field fails validation (`Validation`, nothing is written),
    /// - the primary store write fails (`PrimaryStore`, no mirror write is attempted).
    pub async fn register(&self, raw: &Value) -> RegistryResult<PatientRecord> {
        tracing::debug!(stage = %RegistrationStage::Validating, "registration started");
        let patient = match validate_registration(raw) {
            Ok(patient) => patient,
            Err(violations) => {
                tracing::debug!(
                    stage = %RegistrationStage::Aborted,
                    %violations,
                    "registration rejected"
                );
                return Err(RegistryError::Validation(violations));
            }
        };

        tracing::debug!(stage = %RegistrationStage::WritingPrimary, "writing primary record");
        let record = match self.primary.create(&patient).await {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(
                    stage = %RegistrationStage::Aborted,
                    error = %e,
                    "primary write failed"
                );
                return Err(RegistryError::PrimaryStore(e));
            }
        };

        tracing::debug!(
            stage = %RegistrationStage::Mirroring,
            patient_id = record.id,
            "mirroring record"
        );
        let outcome = self.mirror.mirror(&record, Utc::now()).await;

        tracing::info!(
            stage = %RegistrationStage::Responding,
            patient_id = record.id,
            mirror = ?outcome,
            "patient registered"
        );
        Ok(record)
    }
}
