//! The user-model contract: base metadata, the [`CosmosEntity`] capability
//! trait, and helpers for locating the partition key inside a record.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::http::documents::Resource;
use crate::http::partition_key::PartitionKeyValue;
use crate::transaction::Transaction;

/// The base metadata every user model embeds, flattened into the document:
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Default)]
/// struct MyModel {
///     #[serde(flatten)]
///     base: BaseModel,
///     model: String,
///     #[serde(rename = "userId")]
///     user_id: String, // partition key
///     x: i64,
/// }
/// ```
pub type BaseModel = Resource;

/// Capabilities every user model declares so the engine can read its
/// metadata and invoke its hooks. A missing capability is a compile error,
/// which preserves the "misuse is a programmer error" contract.
pub trait CosmosEntity: Serialize + DeserializeOwned + Default + Send + Sync {
    /// The declared model-version tag, a literal of the form `Name/N`, e.g.
    /// `"MyModel/1"`.
    const MODEL: &'static str;

    fn base(&self) -> &BaseModel;

    fn base_mut(&mut self) -> &mut BaseModel;

    /// The current value of the serialized model field.
    fn model(&self) -> &str;

    fn model_mut(&mut self) -> &mut String;

    /// Called after every successful get, whether served from the database
    /// or from the session cache. `txn` is `None` for reads outside a
    /// transaction, e.g. [`Collection::stale_get`].
    ///
    /// [`Collection::stale_get`]: crate::collection::Collection::stale_get
    fn post_get(&mut self, txn: Option<&Transaction>) -> Result<(), Error> {
        let _ = txn;
        Ok(())
    }

    /// Called right before the write to the database. `txn` is `None` for
    /// writes outside a transaction, e.g. [`Collection::racing_put`].
    ///
    /// [`Collection::racing_put`]: crate::collection::Collection::racing_put
    fn pre_put(&mut self, txn: Option<&Transaction>) -> Result<(), Error> {
        let _ = txn;
        Ok(())
    }

    /// A document is new iff it has never been written, i.e. its etag is
    /// empty.
    fn is_new(&self) -> bool {
        self.base().etag.is_empty()
    }
}

/// A globally-unique cache key for a document.
///
/// Document ids are unique only within a partition key value, so the key
/// combines both, serialized as the JSON pair `[partitionKeyValue, id]` to
/// stay lossless for every supported key type.
pub(crate) fn unique_key(pk: &PartitionKeyValue, id: &str) -> String {
    Value::Array(vec![pk.to_value(), Value::from(id)]).to_string()
}

/// Extracts the base metadata and the partition key value from a serialized
/// entity. The partition key field is located by the collection's
/// configured field name; a configured name of `id` aliases the base
/// metadata's id. A missing field panics, as it represents a bug in the
/// model declaration, not a runtime condition.
pub(crate) fn entity_info_value(
    value: &Value,
    partition_key_name: &str,
) -> Result<(BaseModel, PartitionKeyValue), Error> {
    let Some(object) = value.as_object() else {
        panic!("entity must serialize to a JSON object, got: {value}");
    };
    let base: BaseModel = serde_json::from_value(value.clone())?;
    let pk = if partition_key_name == "id" {
        PartitionKeyValue::from(base.id.clone())
    } else {
        match object.get(partition_key_name) {
            Some(field) => PartitionKeyValue::from_value(field)?,
            None => panic!(
                "entity has no serialized field named \"{partition_key_name}\"; \
                 the partition key field must match the collection configuration"
            ),
        }
    };
    Ok((base, pk))
}

/// Builds the zero document standing in for a key the database knows
/// nothing about: default-initialized, with the id and partition key field
/// written in and an empty etag, so `is_new()` holds and a later put
/// creates it.
pub(crate) fn absent_entity<T: CosmosEntity>(
    partition_key_name: &str,
    pk: &PartitionKeyValue,
    id: &str,
) -> Result<T, Error> {
    let mut value = serde_json::to_value(T::default())?;
    let Some(object) = value.as_object_mut() else {
        panic!("entity must serialize to a JSON object");
    };
    object.insert("id".to_string(), Value::from(id));
    if partition_key_name != "id" {
        if !object.contains_key(partition_key_name) {
            panic!(
                "entity has no serialized field named \"{partition_key_name}\"; \
                 the partition key field must match the collection configuration"
            );
        }
        object.insert(partition_key_name.to_string(), pk.to_value());
    }
    Ok(serde_json::from_value(value)?)
}

/// Overwrites the base-metadata fields of a serialized entity with the
/// resource the server returned, the way a successful commit updates the
/// committed document.
pub(crate) fn write_base(value: &mut Value, base: &BaseModel) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    for name in ["id", "_self", "_etag", "_rid", "_ts"] {
        object.remove(name);
    }
    if let Ok(Value::Object(fields)) = serde_json::to_value(base) {
        for (name, field) in fields {
            object.insert(name, field);
        }
    }
}
