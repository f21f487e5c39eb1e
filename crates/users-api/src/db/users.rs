//! User records: the [`UserStore`] seam and its MongoDB implementation.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use common::protocol::RegisterRequest;

use super::{ClientFactory, StoreError};
use crate::encryption::{sensitive_field_names, USER_FIELDS};

/// Persistence operations behind the HTTP handlers.
///
/// No uniqueness is enforced: inserting two records with the same email
/// yields two records with distinct ids.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert one user document and return its generated `_id`.
    async fn insert(&self, user: Document) -> Result<Bson, StoreError>;

    /// Find the first user whose `email` equals `email` exactly.
    async fn find_by_email(&self, email: &str) -> Result<Option<Document>, StoreError>;
}

/// [`UserStore`] backed by MongoDB through an auto-encrypting client.
///
/// Each call opens its own client and releases it before returning; the
/// driver encrypts `email`, `password` and `ssn` on insert, encrypts the
/// `email` filter of lookups deterministically, and decrypts results.
#[derive(Debug, Clone)]
pub struct MongoUserStore {
    factory: ClientFactory,
    database: String,
    collection: String,
}

impl MongoUserStore {
    pub fn new(
        factory: ClientFactory,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            factory,
            database: database.into(),
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: Document) -> Result<Bson, StoreError> {
        let (database, collection) = (self.database.clone(), self.collection.clone());
        self.factory
            .scoped(|client| async move {
                let result = client
                    .database(&database)
                    .collection::<Document>(&collection)
                    .insert_one(user)
                    .await
                    .map_err(StoreError::Operation)?;
                Ok(result.inserted_id)
            })
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Document>, StoreError> {
        let (database, collection) = (self.database.clone(), self.collection.clone());
        let filter = doc! { "email": email };
        self.factory
            .scoped(|client| async move {
                client
                    .database(&database)
                    .collection::<Document>(&collection)
                    .find_one(filter)
                    .await
                    .map_err(StoreError::Operation)
            })
            .await
    }
}

/// Build the document to insert from a registration body.
///
/// Values are converted as-is, without type checks; `null` is stored as BSON
/// null and absent fields are left out of the document.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDocument`] if a value has no BSON representation.
pub fn user_document(req: RegisterRequest) -> Result<Document, StoreError> {
    let mut user = Document::new();
    for (key, value) in req.fields() {
        let bson = bson::to_bson(&value).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        user.insert(key, bson);
    }
    Ok(user)
}

/// Render an `_id` the way clients see it: object ids as 24-char hex.
pub fn id_to_json(id: Bson) -> serde_json::Value {
    match id {
        Bson::ObjectId(oid) => serde_json::Value::String(oid.to_hex()),
        other => other.into_relaxed_extjson(),
    }
}

/// Text form of an inserted id for the register response.
pub fn id_to_string(id: Bson) -> String {
    match id_to_json(id) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// JSON view of a stored user with sensitive fields removed.
pub fn public_view(mut user: Document) -> serde_json::Value {
    for name in sensitive_field_names(USER_FIELDS) {
        user.remove(name);
    }
    let fields = user
        .into_iter()
        .map(|(key, value)| (key, id_to_json(value)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(fields)
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-process [`UserStore`] used by handler and router tests.

    use super::*;
    use bson::oid::ObjectId;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct InMemoryUserStore {
        docs: Mutex<Vec<Document>>,
    }

    impl InMemoryUserStore {
        pub(crate) async fn len(&self) -> usize {
            self.docs.lock().await.len()
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn insert(&self, mut user: Document) -> Result<Bson, StoreError> {
            let id = Bson::ObjectId(ObjectId::new());
            user.insert("_id", id.clone());
            self.docs.lock().await.push(user);
            Ok(id)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Document>, StoreError> {
            let docs = self.docs.lock().await;
            Ok(docs
                .iter()
                .find(|d| matches!(d.get("email"), Some(Bson::String(e)) if e == email))
                .cloned())
        }
    }
}


/// Round trips against a live deployment with libmongocrypt available.
///
/// Run with `MONGO_URI` and `MASTER_KEY` set:
/// `cargo test -p users-api -- --ignored live`
#[cfg(test)]
mod live {
    use super::*;
    use bson::spec::BinarySubtype;

    use crate::config::Config;
    use crate::encryption::EncryptionSettings;
    use crate::keys;

    async fn stores() -> (MongoUserStore, MongoUserStore) {
        let cfg = Config::from_env().expect("MONGO_URI and MASTER_KEY must be set");
        let key_id = match cfg.data_key_id().unwrap() {
            Some(id) => id,
            None => keys::provision_data_key(&cfg).await.unwrap(),
        };
        let settings = EncryptionSettings::for_users(&cfg, &key_id).unwrap();
        let encrypted = ClientFactory::new(&cfg, Some(settings)).await.unwrap();
        let plain = ClientFactory::new(&cfg, None).await.unwrap();
        (
            MongoUserStore::new(encrypted, &cfg.database_name, &cfg.users_collection),
            MongoUserStore::new(plain, &cfg.database_name, &cfg.users_collection),
        )
    }

    fn unique_email() -> String {
        format!("{}@live.test", bson::oid::ObjectId::new().to_hex())
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB deployment and libmongocrypt"]
    async fn live_register_then_lookup() {
        let (store, _) = stores().await;
        let email = unique_email();
        store
            .insert(doc! { "name": "Ann", "email": email.as_str(), "password": "p1", "ssn": "123-45-6789" })
            .await
            .unwrap();
        let found = store.find_by_email(&email).await.unwrap().unwrap();
        let view = public_view(found);
        assert_eq!(view["name"], "Ann");
        assert_eq!(view["email"], email.as_str());
        assert!(view.get("password").is_none());
        assert!(view.get("ssn").is_none());
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB deployment and libmongocrypt"]
    async fn live_stored_fields_are_ciphertext() {
        let (store, raw) = stores().await;
        let email = unique_email();
        let id = store
            .insert(doc! { "name": "Ann", "email": email.as_str(), "password": "p1", "ssn": "123-45-6789" })
            .await
            .unwrap();

        let (database, collection) = (raw.database.clone(), raw.collection.clone());
        let raw_user = raw
            .factory
            .scoped(|client| async move {
                client
                    .database(&database)
                    .collection::<Document>(&collection)
                    .find_one(doc! { "_id": id })
                    .await
                    .map_err(StoreError::Operation)
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(raw_user.get_str("name").unwrap(), "Ann");
        for field in ["email", "password", "ssn"] {
            match raw_user.get(field) {
                Some(Bson::Binary(bin)) => assert_eq!(bin.subtype, BinarySubtype::Encrypted),
                other => panic!("{field} stored as {other:?}"),
            }
        }
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB deployment and libmongocrypt"]
    async fn live_duplicate_registrations_get_distinct_ids() {
        let (store, _) = stores().await;
        let email = unique_email();
        let a = store.insert(doc! { "email": email.as_str() }).await.unwrap();
        let b = store.insert(doc! { "email": email.as_str() }).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB deployment and libmongocrypt"]
    async fn live_unknown_email_is_none() {
        let (store, _) = stores().await;
        assert!(store.find_by_email(&unique_email()).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB deployment and libmongocrypt"]
    async fn live_failed_operation_releases_client() {
        let (store, _) = stores().await;
        let result: Result<(), _> = store
            .factory
            .scoped(|_client| async { Err(StoreError::InvalidDocument("bad value".into())) })
            .await;
        assert!(matches!(result, Err(StoreError::InvalidDocument(msg)) if msg == "bad value"));

        let lease = store.factory.acquire().await.expect("next acquire should succeed");
        lease.release().await;
    }
}
