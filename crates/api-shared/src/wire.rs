//! Request and response bodies shared by the registry APIs.
//!
//! Error bodies always carry a `detail` member: a list of field errors for validation failures,
//! a plain message otherwise.

use registry_core::{PatientRecord, Violation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Patient registration request.
///
/// Documented shape only; handlers validate the raw body so every violation can be reported.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientCreateReq {
    /// Full name, 2-100 characters.
    #[schema(example = "Test Patient", min_length = 2, max_length = 100)]
    pub name: String,
    /// Age in years, 1-149.
    #[schema(example = 30, minimum = 1, maximum = 149)]
    pub age: i64,
    /// One of `male`, `female`, `other`.
    #[schema(example = "male")]
    pub gender: String,
    /// Contact details, 5-20 characters.
    #[schema(example = "1234567890", min_length = 5, max_length = 20)]
    pub contact: String,
}

/// A stored patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Test Patient")]
    pub name: String,
    #[schema(example = 30)]
    pub age: i32,
    #[schema(example = "male")]
    pub gender: String,
    #[schema(example = "1234567890")]
    pub contact: String,
}

impl From<PatientRecord> for PatientRes {
    fn from(record: PatientRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            age: record.age,
            gender: record.gender.as_str().to_string(),
            contact: record.contact,
        }
    }
}

/// One entry of a validation error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorItem {
    /// Where the error is: `["body", <field>]`, `["query", <param>]` or `["path", <param>]`.
    #[schema(example = json!(["body", "name"]))]
    pub loc: Vec<String>,
    #[schema(example = "String should have at least 2 characters")]
    pub msg: String,
    #[serde(rename = "type")]
    #[schema(example = "string_too_short")]
    pub kind: String,
}

impl ValidationErrorItem {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Item for a violation found in the request body.
    pub fn from_body_violation(violation: &Violation) -> Self {
        let mut loc = vec!["body".to_string()];
        if let Some(field) = violation.field {
            loc.push(field.to_string());
        }
        Self {
            loc,
            msg: violation.message.clone(),
            kind: violation.kind.code().to_string(),
        }
    }
}

/// 422 response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorRes {
    pub detail: Vec<ValidationErrorItem>,
}

/// Error body with a single message, e.g. `{"detail": "Patient not found"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailRes {
    #[schema(example = "Patient not found")]
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RootRes {
    pub message: String,
}
