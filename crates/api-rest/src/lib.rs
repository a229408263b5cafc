//! # API REST
//!
//! REST API implementation for the patient registry.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, query/path parsing, status codes, CORS)
//!
//! Uses `api-shared` for wire types and `registry-core` for the registration and query services.

#![warn(rust_2018_idioms)]

pub mod error;

use std::collections::HashMap;

use api_shared::{
    DetailRes, HealthRes, HealthService, PatientCreateReq, PatientRes, RootRes,
    ValidationErrorItem, ValidationErrorRes,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use registry_core::constants::DEFAULT_API_PREFIX;
use registry_core::{
    Page, PatientId, PatientQueryService, RegistrationService, Stores, DEFAULT_PAGE_LIMIT,
};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    pub registration: RegistrationService,
    pub queries: PatientQueryService,
}

impl AppState {
    pub fn new(registration: RegistrationService, queries: PatientQueryService) -> Self {
        Self {
            registration,
            queries,
        }
    }

    pub fn from_stores(stores: &Stores) -> Self {
        Self::new(stores.registration_service(), stores.query_service())
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Patient Registration API",
        version = "1.0.0",
        description = "API for registering and managing patient information"
    ),
    paths(root, health, create_patient, list_patients, read_patient),
    components(schemas(
        PatientCreateReq,
        PatientRes,
        ValidationErrorItem,
        ValidationErrorRes,
        DetailRes,
        HealthRes,
        RootRes
    ))
)]
pub struct ApiDoc;

/// OpenAPI document for routes mounted under `api_prefix`.
///
/// Patient paths are declared under the default prefix and rewritten here.
pub fn openapi(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if api_prefix != DEFAULT_API_PREFIX {
        let paths = std::mem::take(&mut doc.paths.paths);
        doc.paths.paths = paths
            .into_iter()
            .map(|(path, item)| match path.strip_prefix(DEFAULT_API_PREFIX) {
                Some(rest) if rest.starts_with('/') => (format!("{api_prefix}{rest}"), item),
                _ => (path, item),
            })
            .collect();
    }
    doc
}

/// Builds the REST router.
///
/// Patient routes are mounted under `api_prefix` (empty for the root) and answer both with and
/// without a trailing slash. Swagger UI is served at `/docs` and ReDoc at `/redoc`.
pub fn router(state: AppState, api_prefix: &str) -> Router {
    let patients = Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/", get(list_patients).post(create_patient))
        .route("/patients/:patient_id", get(read_patient));

    let api = if api_prefix.is_empty() {
        patients
    } else {
        Router::new().nest(api_prefix, patients)
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi(api_prefix)))
        .merge(Redoc::with_url("/redoc", openapi(api_prefix)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootRes)
    )
)]
async fn root() -> Json<RootRes> {
    Json(HealthService::banner())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Does not touch either store.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/patients/",
    request_body = PatientCreateReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 422, description = "Validation error", body = ValidationErrorRes),
        (status = 500, description = "Internal server error", body = DetailRes)
    )
)]
/// Register a new patient
///
/// Validates the body, stores the patient in the primary store and mirrors it into the
/// secondary store. A failed mirror write does not affect the response.
///
/// # Errors
/// Returns `422 Unprocessable Entity` listing every invalid field, or
/// `500 Internal Server Error` if the primary store write fails.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        ApiError::Validation(vec![ValidationErrorItem::new(
            &["body"],
            rejection.body_text(),
            "json_invalid",
        )])
    })?;

    let record = state.registration.register(&body).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    get,
    path = "/api/patients/",
    params(
        ("skip" = Option<u64>, Query, description = "Number of records to skip (default 0)"),
        ("limit" = Option<u64>, Query, description = "Maximum number of records to return (default 100)")
    ),
    responses(
        (status = 200, description = "List of patients", body = [PatientRes]),
        (status = 422, description = "Invalid query parameters", body = ValidationErrorRes),
        (status = 500, description = "Internal server error", body = DetailRes)
    )
)]
/// List patients
///
/// Returns patients in id order from the primary store.
///
/// # Errors
/// Returns `422 Unprocessable Entity` for non-integer or negative `skip`/`limit`, or
/// `500 Internal Server Error` if the primary store cannot be read.
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Vec<PatientRes>>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        ApiError::Validation(vec![ValidationErrorItem::new(
            &["query"],
            rejection.body_text(),
            "query_invalid",
        )])
    })?;

    let skip = parse_non_negative(&params, "skip", 0);
    let limit = parse_non_negative(&params, "limit", DEFAULT_PAGE_LIMIT);

    let page = match (skip, limit) {
        (Ok(skip), Ok(limit)) => Page::new(skip, limit),
        (skip, limit) => {
            let detail = [skip.err(), limit.err()].into_iter().flatten().collect();
            return Err(ApiError::Validation(detail));
        }
    };

    let patients = state.queries.list_patients(page).await?;
    Ok(Json(patients.into_iter().map(PatientRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/patients/{patient_id}",
    params(
        ("patient_id" = i64, Path, description = "Patient id")
    ),
    responses(
        (status = 200, description = "Patient found", body = PatientRes),
        (status = 404, description = "Patient not found", body = DetailRes),
        (status = 422, description = "Invalid patient id", body = ValidationErrorRes),
        (status = 500, description = "Internal server error", body = DetailRes)
    )
)]
/// Read a single patient by id
///
/// # Errors
/// Returns `404 Not Found` with `"Patient not found"` if no patient has the id,
/// `422 Unprocessable Entity` if the id is not an integer, or
/// `500 Internal Server Error` if the primary store cannot be read.
#[axum::debug_handler]
async fn read_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let id: PatientId = patient_id.trim().parse().map_err(|_| {
        ApiError::Validation(vec![ValidationErrorItem::new(
            &["path", "patient_id"],
            "Input should be a valid integer, unable to parse string as an integer",
            "int_parsing",
        )])
    })?;

    match state.queries.get_patient(id).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(ApiError::patient_not_found()),
    }
}

// Helper function
fn parse_non_negative(
    params: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ValidationErrorItem> {
    let Some(raw) = params.get(name) else {
        return Ok(default);
    };
    let raw = raw.trim();

    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    if raw.parse::<i64>().is_ok() {
        return Err(ValidationErrorItem::new(
            &["query", name],
            "Input should be greater than or equal to 0",
            "greater_than_equal",
        ));
    }
    Err(ValidationErrorItem::new(
        &["query", name],
        "Input should be a valid integer, unable to parse string as an integer",
        "int_parsing",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_non_negative_defaults_and_values() {
        assert_eq!(parse_non_negative(&params(&[]), "skip", 0), Ok(0));
        assert_eq!(parse_non_negative(&params(&[]), "limit", 100), Ok(100));
        assert_eq!(
            parse_non_negative(&params(&[("limit", "25")]), "limit", 100),
            Ok(25)
        );
    }

    #[test]
    fn test_parse_non_negative_rejections() {
        let err = parse_non_negative(&params(&[("skip", "-1")]), "skip", 0).unwrap_err();
        assert_eq!(err.loc, vec!["query", "skip"]);
        assert_eq!(err.kind, "greater_than_equal");

        let err = parse_non_negative(&params(&[("limit", "ten")]), "limit", 100).unwrap_err();
        assert_eq!(err.loc, vec!["query", "limit"]);
        assert_eq!(err.kind, "int_parsing");
    }

    #[test]
    fn test_openapi_lists_patient_paths() {
        let doc = openapi("/api");
        assert!(doc.paths.paths.contains_key("/api/patients/"));
        assert!(doc.paths.paths.contains_key("/api/patients/{patient_id}"));
    }

    #[test]
    fn test_openapi_follows_api_prefix() {
        let doc = openapi("/v1");
        assert!(doc.paths.paths.contains_key("/v1/patients/"));
        assert!(doc.paths.paths.contains_key("/v1/patients/{patient_id}"));
        assert!(!doc.paths.paths.contains_key("/api/patients/"));
        assert!(doc.paths.paths.contains_key("/health"));

        let doc = openapi("");
        assert!(doc.paths.paths.contains_key("/patients/"));
    }
}
