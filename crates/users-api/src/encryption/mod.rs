//! Client-side field-level encryption settings handed to the MongoDB driver.
//!
//! The driver (libmongocrypt underneath) does all the cryptography: key
//! wrapping, deterministic and randomized AEAD, rewriting equality queries on
//! encrypted fields. This module only assembles what it needs:
//!
//! - the key-vault namespace,
//! - the local KMS provider carrying the master key,
//! - the schema map for the users collection.
//!
//! # Invariants
//!
//! - The master key is never logged; it only leaves [`MasterKey`] as the BSON
//!   binary handed to the driver.

pub mod schema;

pub use schema::{sensitive_field_names, USER_FIELDS};

use bson::{doc, Document};
use mongodb::{mongocrypt::ctx::KmsProvider, options::TlsOptions, Namespace};

use crate::config::Config;
use crate::keys::{DataKeyId, MasterKey};

/// KMS provider list in the form the driver's builders accept.
pub type KmsProviders = Vec<(KmsProvider, Document, Option<TlsOptions>)>;

/// A single `local` KMS provider wrapping keys with `master_key`.
pub fn local_kms_providers(master_key: &MasterKey) -> KmsProviders {
    vec![(
        KmsProvider::local(),
        doc! { "key": master_key.to_binary() },
        None,
    )]
}

/// Everything an auto-encrypting client needs beyond its connection options.
#[derive(Debug, Clone)]
pub struct EncryptionSettings {
    pub key_vault_namespace: Namespace,
    pub master_key: MasterKey,
    pub schema_map: Vec<(String, Document)>,
}

impl EncryptionSettings {
    /// Assemble settings for the users collection encrypted under `key_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key or key-vault namespace in `cfg` is invalid.
    pub fn for_users(cfg: &Config, key_id: &DataKeyId) -> anyhow::Result<Self> {
        Ok(Self {
            key_vault_namespace: cfg.key_vault_namespace()?,
            master_key: cfg.master_key()?,
            schema_map: schema::users_schema_map(&cfg.users_namespace(), key_id),
        })
    }

    pub fn kms_providers(&self) -> KmsProviders {
        local_kms_providers(&self.master_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    #[test]
    fn local_provider_carries_master_key_binary() {
        let cfg = valid_config();
        let key = cfg.master_key().unwrap();
        let providers = local_kms_providers(&key);
        assert_eq!(providers.len(), 1);
        let (_, creds, tls) = &providers[0];
        assert_eq!(creds.get_binary_generic("key").unwrap(), &key.to_binary().bytes);
        assert!(tls.is_none());
    }

    #[test]
    fn settings_target_configured_namespaces() {
        let cfg = valid_config();
        let key_id = cfg.data_key_id().unwrap().unwrap();
        let settings = EncryptionSettings::for_users(&cfg, &key_id).unwrap();
        assert_eq!(settings.key_vault_namespace.db, "encryption");
        assert_eq!(settings.key_vault_namespace.coll, "__keyVault");
        assert_eq!(settings.schema_map[0].0, "queryable_encryption.users");
    }

    #[test]
    fn settings_debug_hides_master_key() {
        let cfg = valid_config();
        let key_id = cfg.data_key_id().unwrap().unwrap();
        let settings = EncryptionSettings::for_users(&cfg, &key_id).unwrap();
        assert!(format!("{settings:?}").contains("MasterKey([REDACTED])"));
    }
}
