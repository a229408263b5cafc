use crate::wire::{HealthRes, RootRes};

/// Simple health service shared by the registry binaries.
///
/// This service provides a standardised way to check the health status of the registry.
#[derive(Clone, Copy, Debug)]
pub struct HealthService;

impl HealthService {
    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Patient registry is alive".into(),
        }
    }

    /// Banner served at the root path.
    pub fn banner() -> RootRes {
        RootRes {
            message: "Patient Registration API is running".into(),
        }
    }
}
