//! The model-version registry.
//!
//! Every user model declares a version tag of the form `Name/N`. Conversion
//! functions between versions are registered process-wide at program start
//! and looked up by migration-aware readers; executing conversions is the
//! caller's business.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

use crate::error::Error;
use crate::model::CosmosEntity;
use crate::transaction::Transaction;

/// Converts the serialized form of one model version into another.
pub type MigrationFn = fn(serde_json::Value) -> Result<serde_json::Value, Error>;

// Keyed by "{fromTag}|{toTag}". Append-only after program initialization.
static MIGRATIONS: Lazy<RwLock<HashMap<String, MigrationFn>>> = Lazy::new(Default::default);

/// The names accepted as model-version tags.
static MODEL_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new("^[A-Za-z_]+/[0-9]+$").unwrap());

fn migration_key(from: &str, to: &str) -> String {
    format!("{from}|{to}")
}

/// Registers a conversion between two model versions. Registering the same
/// pair twice is a bug in program setup and panics.
pub fn add_migration<From: CosmosEntity, To: CosmosEntity>(convert: MigrationFn) {
    check_model_tag(From::MODEL);
    check_model_tag(To::MODEL);
    let key = migration_key(From::MODEL, To::MODEL);
    let mut migrations = MIGRATIONS.write();
    if migrations.contains_key(&key) {
        panic!("several migrations registered from {} to {}", From::MODEL, To::MODEL);
    }
    migrations.insert(key, convert);
}

/// Looks up the conversion registered for the given pair of tags, if any.
pub fn lookup_migration(from: &str, to: &str) -> Option<MigrationFn> {
    MIGRATIONS.read().get(&migration_key(from, to)).copied()
}

pub(crate) fn check_model_tag(tag: &str) {
    if !MODEL_TAG_PATTERN.is_match(tag) {
        panic!("the declared model tag {tag:?} must match ^[A-Za-z_]+/[0-9]+$");
    }
}

/// Copies the declared model tag into the record, validating it on the
/// way. Runs after every get and before every write.
pub(crate) fn sync_model<T: CosmosEntity>(entity: &mut T) {
    check_model_tag(T::MODEL);
    *entity.model_mut() = T::MODEL.to_string();
}

/// Asserts that the record's model field agrees with its declared tag and
/// returns the tag. Disagreement is a bug and panics.
pub fn check_model<T: CosmosEntity>(entity: &T) -> &'static str {
    check_model_tag(T::MODEL);
    if entity.model() != T::MODEL {
        panic!(
            "entity has a model field {:?} that disagrees with the declared tag {:?}",
            entity.model(),
            T::MODEL
        );
    }
    T::MODEL
}

pub(crate) fn post_get_hook<T: CosmosEntity>(
    entity: &mut T,
    txn: Option<&Transaction>,
) -> Result<(), Error> {
    // The model field always reflects the declaration, whatever was
    // stored.
    sync_model(entity);
    entity.post_get(txn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseModel;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct V1 {
        #[serde(flatten)]
        base: BaseModel,
        model: String,
        x: i64,
    }

    impl CosmosEntity for V1 {
        const MODEL: &'static str = "Thing/1";

        fn base(&self) -> &BaseModel {
            &self.base
        }
        fn base_mut(&mut self) -> &mut BaseModel {
            &mut self.base
        }
        fn model(&self) -> &str {
            &self.model
        }
        fn model_mut(&mut self) -> &mut String {
            &mut self.model
        }
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct V2 {
        #[serde(flatten)]
        base: BaseModel,
        model: String,
        x: i64,
        y: i64,
    }

    impl CosmosEntity for V2 {
        const MODEL: &'static str = "Thing/2";

        fn base(&self) -> &BaseModel {
            &self.base
        }
        fn base_mut(&mut self) -> &mut BaseModel {
            &mut self.base
        }
        fn model(&self) -> &str {
            &self.model
        }
        fn model_mut(&mut self) -> &mut String {
            &mut self.model
        }
    }

    #[test]
    fn register_and_look_up() {
        add_migration::<V1, V2>(|mut value| {
            value["y"] = serde_json::json!(0);
            Ok(value)
        });
        assert!(lookup_migration("Thing/1", "Thing/2").is_some());
        assert!(lookup_migration("Thing/2", "Thing/1").is_none());
    }

    #[test]
    fn sync_model_stamps_the_declared_tag() {
        let mut entity = V1::default();
        assert_eq!(entity.model, "");
        sync_model(&mut entity);
        assert_eq!(entity.model, "Thing/1");
        assert_eq!(check_model(&entity), "Thing/1");
    }

    #[test]
    #[should_panic(expected = "disagrees with the declared tag")]
    fn check_model_panics_on_disagreement() {
        let entity = V1 {
            model: "Thing/9".to_string(),
            ..Default::default()
        };
        check_model(&entity);
    }

    #[test]
    fn tag_pattern() {
        check_model_tag("MyModel/1");
        check_model_tag("my_model/123");
    }

    #[test]
    #[should_panic(expected = "must match")]
    fn bad_tag_panics() {
        check_model_tag("MyModel-1");
    }
}
