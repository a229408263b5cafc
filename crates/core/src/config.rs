//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the services. Request
//! handling never reads process-wide environment variables.
//!
//! Values are looked up through a caller-supplied function so binaries can pass
//! `std::env::var` while tests pass a fixed map.

use crate::constants::{
    DEFAULT_API_PREFIX, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DATABASE_URL,
    DEFAULT_MIRROR_COLLECTION, DEFAULT_POOL_SIZE, MAX_COLLECTION_NAME_LEN,
};
use crate::{RegistryError, RegistryResult};

/// Connection settings for a PostgreSQL-backed store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    pub pool_size: u32,
    pub connect_timeout_ms: u64,
}

/// Where the secondary (document) store lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorConfig {
    pub connection: PostgresConfig,
    /// Plain identifier; see [`is_valid_collection_name`].
    pub collection: String,
}

/// Which adapters back the two stores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL primary store; the mirror is enabled only when `mirror` is set.
    Postgres {
        primary: PostgresConfig,
        mirror: Option<MirrorConfig>,
    },
    /// Process-local stores for development and tests. Both stores are in memory.
    Memory,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    backend: StoreBackend,
    api_prefix: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(backend: StoreBackend, api_prefix: String) -> RegistryResult<Self> {
        Ok(Self {
            backend,
            api_prefix: normalise_api_prefix(&api_prefix)?,
        })
    }

    /// Build the configuration from named values.
    ///
    /// Recognised names: `REGISTRY_STORE`, `DATABASE_URL` (falling back to `POSTGRES_URL`),
    /// `PRIMARY_POOL_SIZE`, `PRIMARY_CONNECT_TIMEOUT_MS`, `MIRROR_DATABASE_URL`,
    /// `MIRROR_COLLECTION` and `REGISTRY_API_PREFIX`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidConfig` if any value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> RegistryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = match get("REGISTRY_STORE").as_deref() {
            None | Some("postgres") => {
                let url = get("DATABASE_URL")
                    .or_else(|| get("POSTGRES_URL"))
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
                let primary = postgres_config(&get, "PRIMARY", url)?;

                let mirror = match get("MIRROR_DATABASE_URL") {
                    None => None,
                    Some(url) => {
                        let collection = get("MIRROR_COLLECTION")
                            .unwrap_or_else(|| DEFAULT_MIRROR_COLLECTION.into());
                        if !is_valid_collection_name(&collection) {
                            return Err(RegistryError::InvalidConfig(format!(
                                "MIRROR_COLLECTION must be a plain identifier \
                                 ([A-Za-z0-9_], no leading digit, at most \
                                 {MAX_COLLECTION_NAME_LEN} characters), got '{collection}'"
                            )));
                        }
                        Some(MirrorConfig {
                            connection: postgres_config(&get, "MIRROR", url)?,
                            collection,
                        })
                    }
                };
                StoreBackend::Postgres { primary, mirror }
            }
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(RegistryError::InvalidConfig(format!(
                    "REGISTRY_STORE must be 'postgres' or 'memory', got '{other}'"
                )))
            }
        };

        let api_prefix = get("REGISTRY_API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.into());

        Self::new(backend, api_prefix)
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.backend
    }

    /// Route prefix for the patient endpoints. Empty means the routes sit at the root.
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }
}

/// Pool settings read from `{prefix}_POOL_SIZE` and `{prefix}_CONNECT_TIMEOUT_MS`.
fn postgres_config<G>(get: &G, prefix: &str, url: String) -> RegistryResult<PostgresConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let pool_size_key = format!("{prefix}_POOL_SIZE");
    let timeout_key = format!("{prefix}_CONNECT_TIMEOUT_MS");

    let pool_size = parse_or(&pool_size_key, get(&pool_size_key), DEFAULT_POOL_SIZE)?;
    if pool_size == 0 {
        return Err(RegistryError::InvalidConfig(format!(
            "{pool_size_key} must be at least 1"
        )));
    }

    Ok(PostgresConfig {
        url,
        pool_size,
        connect_timeout_ms: parse_or(
            &timeout_key,
            get(&timeout_key),
            DEFAULT_CONNECT_TIMEOUT_MS,
        )?,
    })
}

/// Collection names become part of a table name, so only `[A-Za-z0-9_]` is allowed and the
/// name must not start with a digit.
pub fn is_valid_collection_name(collection: &str) -> bool {
    let valid_chars = collection
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    let starts_ok = collection
        .bytes()
        .next()
        .is_some_and(|b| !b.is_ascii_digit());

    valid_chars && starts_ok && collection.len() <= MAX_COLLECTION_NAME_LEN
}

fn parse_or<T: std::str::FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> RegistryResult<T> {
    match value {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|_| {
            RegistryError::InvalidConfig(format!("{name} is not a valid number: '{v}'"))
        }),
    }
}

/// Normalise a route prefix: leading `/` required, trailing `/` dropped, `/` alone means none.
fn normalise_api_prefix(prefix: &str) -> RegistryResult<String> {
    if !prefix.starts_with('/') {
        return Err(RegistryError::InvalidConfig(format!(
            "REGISTRY_API_PREFIX must start with '/', got '{prefix}'"
        )));
    }
    Ok(prefix.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> RegistryResult<CoreConfig> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn test_defaults_use_postgres_without_mirror() {
        let cfg = config_from(&[]).expect("defaults should be valid");

        assert_eq!(cfg.api_prefix(), "/api");
        assert_eq!(
            cfg.backend(),
            &StoreBackend::Postgres {
                primary: PostgresConfig {
                    url: DEFAULT_DATABASE_URL.into(),
                    pool_size: DEFAULT_POOL_SIZE,
                    connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
                },
                mirror: None,
            }
        );
    }

    #[test]
    fn test_postgres_url_is_a_fallback_for_database_url() {
        let cfg = config_from(&[("POSTGRES_URL", "postgres://a@b/c")]).unwrap();
        let StoreBackend::Postgres { primary, .. } = cfg.backend() else {
            panic!("expected postgres backend");
        };
        assert_eq!(primary.url, "postgres://a@b/c");

        let cfg = config_from(&[
            ("POSTGRES_URL", "postgres://a@b/c"),
            ("DATABASE_URL", "postgres://x@y/z"),
        ])
        .unwrap();
        let StoreBackend::Postgres { primary, .. } = cfg.backend() else {
            panic!("expected postgres backend");
        };
        assert_eq!(primary.url, "postgres://x@y/z");
    }

    #[test]
    fn test_mirror_enabled_by_url() {
        let cfg = config_from(&[
            ("MIRROR_DATABASE_URL", "postgres://mirror/docs"),
            ("MIRROR_COLLECTION", "registrations"),
        ])
        .unwrap();
        let StoreBackend::Postgres { mirror, .. } = cfg.backend() else {
            panic!("expected postgres backend");
        };
        assert_eq!(
            mirror.as_ref(),
            Some(&MirrorConfig {
                connection: PostgresConfig {
                    url: "postgres://mirror/docs".into(),
                    pool_size: DEFAULT_POOL_SIZE,
                    connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
                },
                collection: "registrations".into(),
            })
        );
    }

    #[test]
    fn test_mirror_pool_is_tuned_separately() {
        let cfg = config_from(&[
            ("PRIMARY_POOL_SIZE", "20"),
            ("MIRROR_DATABASE_URL", "postgres://mirror/docs"),
            ("MIRROR_POOL_SIZE", "2"),
            ("MIRROR_CONNECT_TIMEOUT_MS", "750"),
        ])
        .unwrap();
        let StoreBackend::Postgres { primary, mirror } = cfg.backend() else {
            panic!("expected postgres backend");
        };
        let mirror = mirror.as_ref().expect("mirror should be configured");

        assert_eq!(primary.pool_size, 20);
        assert_eq!(mirror.connection.pool_size, 2);
        assert_eq!(mirror.connection.connect_timeout_ms, 750);
        assert_eq!(mirror.collection, DEFAULT_MIRROR_COLLECTION);

        assert!(config_from(&[
            ("MIRROR_DATABASE_URL", "postgres://mirror/docs"),
            ("MIRROR_POOL_SIZE", "0"),
        ])
        .is_err());
    }

    #[test]
    fn test_invalid_mirror_collection_fails_startup() {
        let err = config_from(&[
            ("MIRROR_DATABASE_URL", "postgres://mirror/docs"),
            ("MIRROR_COLLECTION", "patients; DROP TABLE x"),
        ])
        .unwrap_err();

        assert!(matches!(err, RegistryError::InvalidConfig(_)));
        assert!(err.to_string().contains("MIRROR_COLLECTION"));
    }

    #[test]
    fn test_collection_names() {
        assert!(is_valid_collection_name("patients"));
        assert!(is_valid_collection_name("patients_v2"));

        assert!(!is_valid_collection_name(""));
        assert!(!is_valid_collection_name("2patients"));
        assert!(!is_valid_collection_name("patients; DROP TABLE x"));
        assert!(!is_valid_collection_name("pätients"));
        assert!(!is_valid_collection_name(&"p".repeat(49)));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let cfg = config_from(&[("MIRROR_DATABASE_URL", "   "), ("REGISTRY_STORE", "")]).unwrap();
        assert!(matches!(
            cfg.backend(),
            StoreBackend::Postgres { mirror: None, .. }
        ));
    }

    #[test]
    fn test_memory_backend() {
        let cfg = config_from(&[("REGISTRY_STORE", "memory")]).unwrap();
        assert_eq!(cfg.backend(), &StoreBackend::Memory);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("REGISTRY_STORE", "mongo")]).is_err());
        assert!(config_from(&[("PRIMARY_POOL_SIZE", "lots")]).is_err());
        assert!(config_from(&[("PRIMARY_POOL_SIZE", "0")]).is_err());
        assert!(config_from(&[("REGISTRY_API_PREFIX", "api")]).is_err());
    }

    #[test]
    fn test_api_prefix_is_normalised() {
        assert_eq!(
            config_from(&[("REGISTRY_API_PREFIX", "/v1/")]).unwrap().api_prefix(),
            "/v1"
        );
        assert_eq!(
            config_from(&[("REGISTRY_API_PREFIX", "/")]).unwrap().api_prefix(),
            ""
        );
    }
}
