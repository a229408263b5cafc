//! PostgreSQL adapters for both stores.
//!
//! - [`PgPrimaryStore`] keeps the authoritative `patients` table.
//! - [`PgDocumentStore`] keeps the mirror as JSONB documents in a collection table, usually in a
//!   separate database.

use std::time::Duration;

use async_trait::async_trait;
use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::{is_valid_collection_name, PostgresConfig};
use crate::constants::PATIENTS_TABLE;
use crate::error::{StoreError, StoreResult};
use crate::patient::{Gender, MirroredPatientRecord, NewPatient, PatientId, PatientRecord};
use crate::query::Page;
use crate::repositories::mirror::DocumentStore;
use crate::repositories::primary::PrimaryStore;

/// Type alias for PostgreSQL pool options.
pub type PgPoolOptions = PoolOptions<Postgres>;

type PatientRow = (i64, String, i32, String, String);

/// Creates a new PostgreSQL connection pool from the given configuration.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> StoreResult<PgPool> {
    info!(
        pool_size = config.pool_size,
        connect_timeout_ms = config.connect_timeout_ms,
        "Creating PostgreSQL connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .connect(&config.url)
        .await?;

    debug!("PostgreSQL connection pool created successfully");

    Ok(pool)
}

/// Tests the connection to the database.
#[instrument(skip(pool))]
pub async fn test_connection(pool: &PgPool) -> StoreResult<()> {
    query("SELECT 1").execute(pool).await?;

    debug!("Database connection test successful");

    Ok(())
}

/// Masks the password in a database URL for logging.
pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
            }
        }
    }
    url.to_string()
}

fn record_from_row(row: PatientRow) -> StoreResult<PatientRecord> {
    let (id, name, age, gender, contact) = row;
    let gender = Gender::from_wire(&gender).ok_or_else(|| {
        StoreError::Corrupt(format!("patient {id} has unknown gender '{gender}'"))
    })?;
    Ok(PatientRecord {
        id,
        name,
        age,
        gender,
        contact,
    })
}

/// Authoritative patient store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgPrimaryStore {
    pool: PgPool,
}

impl PgPrimaryStore {
    /// Connects a new pool for the primary store.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        Ok(Self::from_pool(create_pool(config).await?))
    }

    /// Creates the store from an existing connection pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PrimaryStore for PgPrimaryStore {
    async fn initialise(&self) -> StoreResult<()> {
        query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {PATIENTS_TABLE} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                contact TEXT NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        query(&format!(
            "CREATE INDEX IF NOT EXISTS ix_{PATIENTS_TABLE}_name ON {PATIENTS_TABLE} (name)"
        ))
        .execute(&self.pool)
        .await?;

        debug!(table = PATIENTS_TABLE, "primary schema ready");
        Ok(())
    }

    async fn create(&self, patient: &NewPatient) -> StoreResult<PatientRecord> {
        let mut tx = self.pool.begin().await?;

        let row: PatientRow = query_as(&format!(
            r#"
            INSERT INTO {PATIENTS_TABLE} (name, age, gender, contact)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, age, gender, contact
            "#
        ))
        .bind(&patient.name)
        .bind(patient.age)
        .bind(patient.gender.as_str())
        .bind(&patient.contact)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        record_from_row(row)
    }

    async fn list(&self, page: Page) -> StoreResult<Vec<PatientRecord>> {
        // Postgres takes BIGINT for both; anything larger behaves the same as i64::MAX.
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(page.limit).unwrap_or(i64::MAX);

        let rows: Vec<PatientRow> = query_as(&format!(
            r#"
            SELECT id, name, age, gender, contact
            FROM {PATIENTS_TABLE}
            ORDER BY id
            OFFSET $1
            LIMIT $2
            "#
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn get_by_id(&self, id: PatientId) -> StoreResult<Option<PatientRecord>> {
        let row: Option<PatientRow> = query_as(&format!(
            "SELECT id, name, age, gender, contact FROM {PATIENTS_TABLE} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }
}

/// Mirror document store backed by a PostgreSQL JSONB collection table.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    table: String,
}

impl PgDocumentStore {
    /// Creates the store for `collection` on an existing pool.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the collection name is not a plain identifier.
    pub fn new(pool: PgPool, collection: &str) -> StoreResult<Self> {
        if !is_valid_collection_name(collection) {
            return Err(StoreError::Unavailable(format!(
                "invalid mirror collection name '{collection}'"
            )));
        }
        Ok(Self {
            pool,
            table: format!("{collection}_documents"),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn initialise(&self) -> StoreResult<()> {
        query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                seq BIGSERIAL PRIMARY KEY,
                document JSONB NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await?;

        debug!(table = %self.table, "mirror collection ready");
        Ok(())
    }

    async fn insert(&self, document: &MirroredPatientRecord) -> StoreResult<()> {
        let body = serde_json::to_value(document)?;

        query(&format!("INSERT INTO {} (document) VALUES ($1)", self.table))
            .bind(body)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
