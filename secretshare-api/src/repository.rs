//! Secret records in the item store

use std::sync::Arc;
use tracing::debug;

use secretshare_core::{ActiveDuration, Secret, ShareError};
use secretshare_store::{
    AttributeValue, DeleteItemInput, Item, ItemStore, KeyAttribute, KeySchema, PutItemInput,
    QueryInput, ScalarType, StoreError,
};

/// Table attribute names
pub mod attributes {
    pub const SECRET_ID: &str = "SecretID";
    pub const MESSAGE: &str = "Message";
    pub const SECRET_KEY: &str = "SecretKey";
    pub const ACTIVE_DURATION: &str = "ActiveDuration";
    pub const EXPIRATION_TIME: &str = "ExpirationTime";
}

use attributes::{ACTIVE_DURATION, EXPIRATION_TIME, MESSAGE, SECRET_ID, SECRET_KEY};

/// SecretID (S) partition key, ExpirationTime (N) sort key
pub fn key_schema() -> KeySchema {
    KeySchema::new(
        KeyAttribute::new(SECRET_ID, ScalarType::S),
        Some(KeyAttribute::new(EXPIRATION_TIME, ScalarType::N)),
    )
}

/// Result of removing a secret after it was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The item was already gone, another reader removed it first
    AlreadyGone,
}

#[derive(Clone)]
pub struct SecretRepository {
    store: Arc<dyn ItemStore>,
}

impl SecretRepository {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Insert a new secret. The id must not already exist.
    pub async fn insert(&self, secret: &Secret) -> Result<(), ShareError> {
        let input = PutItemInput::new(to_item(secret))
            .condition("attribute_not_exists(#id)")
            .name("#id", SECRET_ID);

        self.store
            .put_item(input)
            .await
            .map_err(|e| ShareError::store_failure(e.to_string()))
    }

    /// Find the unexpired secret with this id and key. `now` is Unix seconds;
    /// a secret expiring exactly at `now` is already gone.
    pub async fn find_live(
        &self,
        secret_id: &str,
        secret_key: &str,
        now: i64,
    ) -> Result<Option<Secret>, ShareError> {
        let input = QueryInput::new("#id = :id AND #exp > :now")
            .filter("#key = :key")
            .name("#id", SECRET_ID)
            .name("#exp", EXPIRATION_TIME)
            .name("#key", SECRET_KEY)
            .value(":id", AttributeValue::string(secret_id))
            .value(":now", AttributeValue::number(now))
            .value(":key", AttributeValue::string(secret_key))
            .consistent_read(true);

        let output = self
            .store
            .query(input)
            .await
            .map_err(|e| ShareError::store_failure(e.to_string()))?;

        debug!(count = output.count, scanned = output.scanned_count, "Queried secrets");

        output.items.first().map(from_item).transpose()
    }

    /// Delete exactly this secret, but only if it is still there
    pub async fn remove(&self, secret: &Secret) -> Result<Removal, ShareError> {
        let key: Item = [
            (SECRET_ID.to_string(), AttributeValue::string(&secret.secret_id)),
            (
                EXPIRATION_TIME.to_string(),
                AttributeValue::number(secret.expiration_time),
            ),
        ]
        .into_iter()
        .collect();

        let input = DeleteItemInput::new(key)
            .condition("attribute_exists(#id)")
            .name("#id", SECRET_ID);

        match self.store.delete_item(input).await {
            Ok(_) => Ok(Removal::Removed),
            Err(StoreError::ConditionalCheckFailed) => Ok(Removal::AlreadyGone),
            Err(e) => Err(ShareError::store_failure(e.to_string())),
        }
    }
}

pub fn to_item(secret: &Secret) -> Item {
    [
        (SECRET_ID, AttributeValue::string(&secret.secret_id)),
        (MESSAGE, AttributeValue::string(&secret.message)),
        (SECRET_KEY, AttributeValue::string(&secret.secret_key)),
        (
            ACTIVE_DURATION,
            AttributeValue::string(secret.active_duration.as_str()),
        ),
        (
            EXPIRATION_TIME,
            AttributeValue::number(secret.expiration_time),
        ),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect()
}

/// Decode a stored item. Key attributes are required; absent payload
/// attributes decode as empty strings. A present attribute of the wrong type
/// is a corrupt record.
pub fn from_item(item: &Item) -> Result<Secret, ShareError> {
    let secret_id = required_string(item, SECRET_ID)?;
    let expiration_time = item
        .get(EXPIRATION_TIME)
        .ok_or_else(|| missing(EXPIRATION_TIME))?
        .as_i64()
        .ok_or_else(|| wrong_type(EXPIRATION_TIME))?;
    let active_duration = optional_string(item, ACTIVE_DURATION)?;

    Ok(Secret {
        secret_id,
        message: optional_string(item, MESSAGE)?,
        secret_key: optional_string(item, SECRET_KEY)?,
        active_duration: ActiveDuration::normalize(Some(active_duration.as_str())),
        expiration_time,
    })
}

fn required_string(item: &Item, name: &str) -> Result<String, ShareError> {
    item.get(name)
        .ok_or_else(|| missing(name))?
        .as_string()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(name))
}

fn optional_string(item: &Item, name: &str) -> Result<String, ShareError> {
    match item.get(name) {
        None => Ok(String::new()),
        Some(value) => value
            .as_string()
            .map(str::to_string)
            .ok_or_else(|| wrong_type(name)),
    }
}

fn missing(name: &str) -> ShareError {
    ShareError::corrupt_record(format!("missing attribute {}", name))
}

fn wrong_type(name: &str) -> ShareError {
    ShareError::corrupt_record(format!("attribute {} has the wrong type", name))
}
