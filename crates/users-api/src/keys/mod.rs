//! Data-encryption key (DEK) provisioning and the key material read from config.
//!
//! # Lifecycle
//!
//! 1. On a first run without `KEY_ID`, [`provision_data_key`] asks the driver to
//!    generate a DEK, wrap it with the local master key and store it in the
//!    key-vault collection.
//! 2. The operator copies the printed key id into `KEY_ID`.
//! 3. Every later run references that id from the schema map; the driver
//!    fetches and unwraps the DEK from the key vault on demand.
//!
//! Provisioning is an operator tool, not a served request: it does not retry,
//! and any failure aborts the process.

pub mod material;

pub use material::{DataKeyId, MasterKey};

use anyhow::{Context, Result};
use mongodb::client_encryption::{ClientEncryption, LocalMasterKey};
use tracing::info;

use crate::config::Config;
use crate::db::{ClientFactory, StoreError};
use crate::encryption::local_kms_providers;

/// Create a new data-encryption key in the key vault and return its id.
///
/// Uses a plain (non-encrypting) client that is shut down before returning,
/// on success and on failure.
///
/// # Errors
///
/// Returns an error if the database is unreachable, the key vault cannot be
/// written, or the driver returns a key id that is not a UUID.
pub async fn provision_data_key(cfg: &Config) -> Result<DataKeyId> {
    let key_vault_namespace = cfg.key_vault_namespace()?;
    let master_key = cfg.master_key()?;
    let factory = ClientFactory::new(cfg, None)
        .await
        .context("failed to parse MONGO_URI")?;

    let raw_id = factory
        .scoped(|client| async move {
            let encryption = ClientEncryption::new(
                client,
                key_vault_namespace,
                local_kms_providers(&master_key),
            )
            .map_err(StoreError::Operation)?;
            encryption
                .create_data_key(LocalMasterKey::builder().build())
                .await
                .map_err(StoreError::Operation)
        })
        .await
        .context("failed to create data key")?;

    let key_id = DataKeyId::from_slice(&raw_id.bytes).context("driver returned a malformed key id")?;
    info!(key_id = %key_id, "data key created in key vault");
    Ok(key_id)
}
