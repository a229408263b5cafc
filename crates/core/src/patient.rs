//! Patient record types.
//!
//! - [`NewPatient`] is a validated registration that has not been stored yet
//! - [`PatientRecord`] is the canonical row held by the primary store
//! - [`MirroredPatientRecord`] is the enriched document written to the secondary store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System-assigned identifier of a patient record.
pub type PatientId = i64;

/// Recorded gender of a patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// All accepted values, in the order they are listed to callers.
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    /// Convert to the stored/wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Parse from the stored/wire string. Matching is case-sensitive.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registration that has passed validation and is ready for the primary store.
///
/// Only [`crate::validation::validate_registration`] produces values of this type outside tests,
/// so holding one means every field is within bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub contact: String,
}

impl NewPatient {
    /// Attach the id assigned by the primary store.
    pub fn with_id(self, id: PatientId) -> PatientRecord {
        PatientRecord {
            id,
            name: self.name,
            age: self.age,
            gender: self.gender,
            contact: self.contact,
        }
    }
}

/// A patient record as held by the primary store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub contact: String,
}

/// A patient record as mirrored into the secondary store.
///
/// `created_at` is stamped when the mirror write is attempted and never changes afterwards.
/// `updated_at` is reserved; no current flow sets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroredPatientRecord {
    #[serde(flatten)]
    pub patient: PatientRecord,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MirroredPatientRecord {
    pub fn new(patient: PatientRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            patient,
            created_at,
            updated_at: None,
        }
    }
}
