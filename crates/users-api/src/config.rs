//! Configuration loading and validation for the users service.
//!
//! All values are read from environment variables at startup (an optional
//! `.env` file is loaded first by `main`). The process exits with a clear error
//! message if any required variable is missing or invalid, before any port is
//! bound or connection opened.

use std::time::Duration;

use anyhow::{Context, Result};
use mongodb::Namespace;
use serde::Deserialize;

use crate::keys::{DataKeyId, MasterKey};

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// MongoDB connection string. **Required.**
    pub mongo_uri: String,

    /// Base64-encoded 96-byte local master key. **Required.**
    pub master_key: String,

    /// Base64-encoded data-encryption key id. When absent the process
    /// provisions a new key, prints it and exits.
    #[serde(default)]
    pub key_id: Option<String>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// `<db>.<collection>` holding wrapped data-encryption keys.
    #[serde(default = "default_key_vault_namespace")]
    pub key_vault_namespace: String,

    /// Database holding the users collection.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Collection holding user records.
    #[serde(default = "default_users_collection")]
    pub users_collection: String,

    /// Upper bound on server selection when opening a connection.
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`); `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP/gRPC endpoint for span export. Export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The master key never leaves this struct in readable form.
        f.debug_struct("Config")
            .field("mongo_uri", &self.mongo_uri)
            .field("master_key", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .field("port", &self.port)
            .field("key_vault_namespace", &self.key_vault_namespace)
            .field("database_name", &self.database_name)
            .field("users_collection", &self.users_collection)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

fn default_port() -> u16 {
    8000
}
fn default_key_vault_namespace() -> String {
    "encryption.__keyVault".into()
}
fn default_database_name() -> String {
    "queryable_encryption".into()
}
fn default_users_collection() -> String {
    "users".into()
}
fn default_server_selection_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    fn load(source: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.mongo_uri, "MONGO_URI")?;
        ensure_non_empty(&self.master_key, "MASTER_KEY")?;
        self.master_key().context("MASTER_KEY is invalid")?;
        self.data_key_id().context("KEY_ID is invalid")?;
        self.key_vault_namespace()?;
        ensure_non_empty(&self.database_name, "DATABASE_NAME")?;
        ensure_non_empty(&self.users_collection, "USERS_COLLECTION")?;

        if self.server_selection_timeout_ms == 0 {
            anyhow::bail!("SERVER_SELECTION_TIMEOUT_MS must be > 0");
        }
        Ok(())
    }

    /// Decoded local master key.
    pub fn master_key(&self) -> Result<MasterKey> {
        Ok(MasterKey::from_base64(&self.master_key)?)
    }

    /// Decoded data-encryption key id, or `None` when provisioning is needed.
    ///
    /// A blank `KEY_ID` counts as absent.
    pub fn data_key_id(&self) -> Result<Option<DataKeyId>> {
        match self.key_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => Ok(Some(DataKeyId::from_base64(encoded)?)),
        }
    }

    /// Parsed key-vault namespace.
    pub fn key_vault_namespace(&self) -> Result<Namespace> {
        match self.key_vault_namespace.split_once('.') {
            Some((db, coll)) if !db.is_empty() && !coll.is_empty() => Ok(Namespace::new(db, coll)),
            _ => anyhow::bail!(
                "KEY_VAULT_NAMESPACE must look like <database>.<collection>, got {:?}",
                self.key_vault_namespace
            ),
        }
    }

    /// `<database>.<collection>` of the users collection, as used by the schema map.
    pub fn users_namespace(&self) -> String {
        format!("{}.{}", self.database_name, self.users_collection)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
