//! Store adapters and their startup wiring.

pub mod mirror;
pub mod postgres;
pub mod primary;

use std::sync::Arc;

use crate::config::{CoreConfig, MirrorConfig, StoreBackend};
use crate::error::StoreResult;
use crate::query::PatientQueryService;
use crate::registration::RegistrationService;
use mirror::{DocumentStore, InMemoryDocumentStore, PatientMirror};
use postgres::{PgDocumentStore, PgPrimaryStore};
use primary::{InMemoryPrimaryStore, PrimaryStore};

/// Store handles shared by every request for the life of the process.
#[derive(Clone)]
pub struct Stores {
    pub primary: Arc<dyn PrimaryStore>,
    pub mirror: PatientMirror,
}

impl Stores {
    pub fn new(primary: Arc<dyn PrimaryStore>, mirror: PatientMirror) -> Self {
        Self { primary, mirror }
    }

    /// Fresh in-memory stores, mirror enabled.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryPrimaryStore::new()),
            PatientMirror::new(Arc::new(InMemoryDocumentStore::new())),
        )
    }

    pub fn registration_service(&self) -> RegistrationService {
        RegistrationService::new(self.primary.clone(), self.mirror.clone())
    }

    pub fn query_service(&self) -> PatientQueryService {
        PatientQueryService::new(self.primary.clone())
    }
}

/// Connects and initialises the stores named by `cfg`.
///
/// The primary store must come up; its error is returned. The mirror is optional: if it cannot
/// be reached or initialised the failure is logged and the service runs with the mirror
/// disabled.
///
/// # Errors
///
/// Returns a `StoreError` if the primary store cannot be connected or its schema created.
pub async fn connect_stores(cfg: &CoreConfig) -> StoreResult<Stores> {
    match cfg.backend() {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory primary and mirror stores");
            Ok(Stores::in_memory())
        }
        StoreBackend::Postgres { primary, mirror } => {
            let primary_store = PgPrimaryStore::connect(primary).await?;
            primary_store.initialise().await?;
            tracing::info!("Connected to primary store");

            let mirror = match mirror {
                Some(mirror_cfg) => connect_mirror(mirror_cfg).await,
                None => {
                    tracing::info!("MIRROR_DATABASE_URL not set, mirror writes disabled");
                    PatientMirror::disabled()
                }
            };

            Ok(Stores::new(Arc::new(primary_store), mirror))
        }
    }
}

async fn connect_mirror(cfg: &MirrorConfig) -> PatientMirror {
    let store = async {
        let pool = postgres::create_pool(&cfg.connection).await?;
        postgres::test_connection(&pool).await?;
        let store = PgDocumentStore::new(pool, &cfg.collection)?;
        store.initialise().await?;
        StoreResult::Ok(store)
    }
    .await;

    match store {
        Ok(store) => {
            tracing::info!(table = store.table(), "Connected to mirror store");
            let store: Arc<dyn DocumentStore> = Arc::new(store);
            PatientMirror::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Mirror store connection failed, mirror writes disabled");
            PatientMirror::disabled()
        }
    }
}
