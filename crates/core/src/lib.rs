//! # Registry Core
//!
//! Core business logic for the patient registration service.
//!
//! This crate contains the data operations behind the HTTP surface:
//! - Validation of inbound registration data
//! - Authoritative persistence in the primary (relational) store
//! - Best-effort mirroring into the secondary (document) store
//! - Paginated listing and lookup against the primary store
//!
//! **No API concerns**: HTTP servers, status codes and wire formats belong in `api-rest` or
//! `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod patient;
pub mod query;
pub mod registration;
pub mod repositories;
pub mod validation;

pub use config::{CoreConfig, MirrorConfig, PostgresConfig, StoreBackend};
pub use constants::{DEFAULT_PAGE_LIMIT, PATIENT_NOT_FOUND};
pub use error::{RegistryError, RegistryResult, StoreError, StoreResult};
pub use patient::{Gender, MirroredPatientRecord, NewPatient, PatientId, PatientRecord};
pub use query::{Page, PatientQueryService};
pub use registration::{RegistrationService, RegistrationStage};
pub use repositories::mirror::{DocumentStore, InMemoryDocumentStore, MirrorOutcome, PatientMirror};
pub use repositories::primary::{InMemoryPrimaryStore, PrimaryStore};
pub use repositories::{connect_stores, Stores};
pub use validation::{Violation, ViolationKind, Violations};
