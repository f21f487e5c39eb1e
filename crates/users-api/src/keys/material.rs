//! [`MasterKey`] and [`DataKeyId`]: decoded key material from configuration.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bson::{spec::BinarySubtype, Binary};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroize;

/// Byte length of a local KMS master key as required by libmongocrypt.
pub const MASTER_KEY_LEN: usize = 96;

/// Byte length of a data-encryption key id (a UUID).
pub const DATA_KEY_ID_LEN: usize = 16;

/// Errors produced while decoding key material.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    /// The value is not standard base64.
    #[error("value is not valid base64")]
    InvalidBase64,

    /// The decoded master key has an unexpected length.
    #[error("master key has invalid length: expected {MASTER_KEY_LEN} bytes, got {0}")]
    InvalidMasterKeyLength(usize),

    /// The decoded key id has an unexpected length.
    #[error("key id has invalid length: expected {DATA_KEY_ID_LEN} bytes, got {0}")]
    InvalidKeyIdLength(usize),
}

/// Local master key used to wrap and unwrap data-encryption keys.
///
/// Zeroized on drop. Copies handed to the driver through [`to_binary`](Self::to_binary)
/// are owned by the driver from then on.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; MASTER_KEY_LEN],
}

impl MasterKey {
    /// Decode a standard-base64 master key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError`] if the text is not base64 or does not decode
    /// to exactly [`MASTER_KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyMaterialError> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyMaterialError::InvalidBase64)?;
        let result = Self::from_slice(&bytes);
        bytes.zeroize();
        result
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        if bytes.len() != MASTER_KEY_LEN {
            return Err(KeyMaterialError::InvalidMasterKeyLength(bytes.len()));
        }
        let mut key = Self {
            bytes: [0u8; MASTER_KEY_LEN],
        };
        key.bytes.copy_from_slice(bytes);
        Ok(key)
    }

    /// The key as a generic BSON binary, the shape the local KMS provider expects.
    pub fn to_binary(&self) -> Binary {
        Binary {
            subtype: BinarySubtype::Generic,
            bytes: self.bytes.to_vec(),
        }
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Identifier of a data-encryption key stored in the key vault.
///
/// Not secret: it only names a wrapped key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataKeyId(Uuid);

impl DataKeyId {
    /// Decode a standard-base64 key id.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError`] if the text is not base64 or does not decode
    /// to exactly [`DATA_KEY_ID_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyMaterialError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyMaterialError::InvalidBase64)?;
        Self::from_slice(&bytes)
    }

    /// Build a key id from the raw bytes of a key-vault `_id`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| KeyMaterialError::InvalidKeyIdLength(bytes.len()))
    }

    /// Standard base64, the form stored in `KEY_ID`.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_bytes())
    }

    /// The id as a BSON binary of subtype 4 (UUID), as referenced by the schema map.
    pub fn to_binary(&self) -> Binary {
        Binary {
            subtype: BinarySubtype::Uuid,
            bytes: self.0.as_bytes().to_vec(),
        }
    }
}

impl std::fmt::Display for DataKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}
