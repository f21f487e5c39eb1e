//! Database access: per-operation client acquisition and the user store.
//!
//! # Resource discipline
//!
//! No client is shared between requests. Every operation goes through
//! [`ClientFactory::scoped`], which opens a fresh client, runs the operation,
//! and shuts the client down on every exit path, success or failure.

pub mod lease;
pub mod users;

pub use lease::ClientLease;
pub use users::{MongoUserStore, UserStore};

use std::future::Future;

use bson::doc;
use mongodb::{options::ClientOptions, Client};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::encryption::EncryptionSettings;

/// Errors produced by the database layer.
///
/// `Display` is the driver's message verbatim; handlers forward it to the
/// client unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the client or selecting a server failed.
    #[error("{0}")]
    Connect(#[source] mongodb::error::Error),

    /// A CRUD operation on an open client failed.
    #[error("{0}")]
    Operation(#[source] mongodb::error::Error),

    /// The record could not be converted to BSON.
    #[error("{0}")]
    InvalidDocument(String),
}

/// Opens database clients, optionally with automatic field-level encryption.
///
/// The connection string is parsed once at construction; each
/// [`ClientFactory::acquire`] builds a brand new client from those options.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    options: ClientOptions,
    encryption: Option<EncryptionSettings>,
}

impl ClientFactory {
    /// Parse the connection string from `cfg` and apply its server-selection timeout.
    ///
    /// With `encryption` set, acquired clients auto-encrypt and auto-decrypt;
    /// without it they are plain clients (used for key provisioning).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connect`] if the connection string is invalid or
    /// its SRV/TXT records cannot be resolved.
    pub async fn new(cfg: &Config, encryption: Option<EncryptionSettings>) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(cfg.mongo_uri.as_str())
            .await
            .map_err(StoreError::Connect)?;
        options.server_selection_timeout = Some(cfg.server_selection_timeout());
        Ok(Self {
            options,
            encryption,
        })
    }

    /// Open a new client and confirm a server is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connect`] if the client cannot be built or no
    /// server is selected within the configured timeout. A client that was
    /// built but failed its ping is shut down before returning.
    pub async fn acquire(&self) -> Result<ClientLease, StoreError> {
        let client = match &self.encryption {
            Some(enc) => Client::encrypted_builder(
                self.options.clone(),
                enc.key_vault_namespace.clone(),
                enc.kms_providers(),
            )
            .map_err(StoreError::Connect)?
            .schema_map(enc.schema_map.clone())
            .build()
            .await
            .map_err(StoreError::Connect)?,
            None => Client::with_options(self.options.clone()).map_err(StoreError::Connect)?,
        };

        let lease = ClientLease::new(client);
        if let Err(e) = lease
            .client()
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
        {
            lease.release().await;
            return Err(StoreError::Connect(e));
        }
        debug!(encrypted = self.encryption.is_some(), "database client acquired");
        Ok(lease)
    }

    /// Run `op` against a freshly acquired client, then release it.
    ///
    /// The client is released whether `op` succeeds or fails; see
    /// [`ClientLease::run`].
    pub async fn scoped<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.acquire().await?.run(op).await
    }
}
