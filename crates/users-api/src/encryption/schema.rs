//! Schema map: which fields of which collection the driver encrypts, and how.
//!
//! The algorithm of each field is derived from whether it is queried by exact
//! match, so a queryable field can never be declared with the randomized
//! algorithm (and vice versa).

use bson::{doc, Document};

use crate::keys::DataKeyId;

/// AEAD algorithm applied to an encrypted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAlgorithm {
    /// Same plaintext → same ciphertext; supports equality queries.
    Deterministic,
    /// Fresh IV per write; no query support.
    Random,
}

impl FieldAlgorithm {
    /// Algorithm name as understood by libmongocrypt.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldAlgorithm::Deterministic => "AEAD_AES_256_CBC_HMAC_SHA_512-Deterministic",
            FieldAlgorithm::Random => "AEAD_AES_256_CBC_HMAC_SHA_512-Random",
        }
    }
}

/// One encrypted field of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedField {
    pub name: &'static str,
    pub bson_type: &'static str,
    /// Whether the application looks records up by exact match on this field.
    pub queryable: bool,
}

impl EncryptedField {
    pub const fn queryable(name: &'static str, bson_type: &'static str) -> Self {
        Self {
            name,
            bson_type,
            queryable: true,
        }
    }

    pub const fn sensitive(name: &'static str, bson_type: &'static str) -> Self {
        Self {
            name,
            bson_type,
            queryable: false,
        }
    }

    pub fn algorithm(&self) -> FieldAlgorithm {
        if self.queryable {
            FieldAlgorithm::Deterministic
        } else {
            FieldAlgorithm::Random
        }
    }
}

/// Encrypted fields of the users collection. `name` stays plaintext.
pub const USER_FIELDS: &[EncryptedField] = &[
    EncryptedField::queryable("email", "string"),
    EncryptedField::sensitive("password", "string"),
    EncryptedField::sensitive("ssn", "string"),
];

/// Names of fields that are encrypted but never queried; these are withheld
/// from API responses.
pub fn sensitive_field_names(fields: &[EncryptedField]) -> impl Iterator<Item = &'static str> + '_ {
    fields.iter().filter(|f| !f.queryable).map(|f| f.name)
}

/// `$jsonSchema` document for one collection, all fields under `key_id`.
pub fn collection_schema(key_id: &DataKeyId, fields: &[EncryptedField]) -> Document {
    let mut properties = Document::new();
    for field in fields {
        properties.insert(
            field.name,
            doc! {
                "encrypt": {
                    "bsonType": field.bson_type,
                    "algorithm": field.algorithm().as_str(),
                }
            },
        );
    }

    doc! {
        "bsonType": "object",
        "encryptMetadata": {
            "keyId": [key_id.to_binary()],
        },
        "properties": properties,
    }
}

/// Schema map handed to the encrypted client builder: a single entry for the
/// users collection at `users_namespace`.
pub fn users_schema_map(users_namespace: &str, key_id: &DataKeyId) -> Vec<(String, Document)> {
    vec![(
        users_namespace.to_owned(),
        collection_schema(key_id, USER_FIELDS),
    )]
}
