//! # API Shared
//!
//! Shared definitions for the registry HTTP APIs.
//!
//! Contains:
//! - Wire types for requests, responses and error bodies (`wire` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the workspace runner.

pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
