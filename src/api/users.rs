//! The `user` resource served by the binary.
//!
//! v3 is the native shape. v2 consumers never saw `address`, v1 consumers
//! saw neither `address` nor `phone`.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::AppError;
use crate::store::{run_native, MemoryStore, ResourceStore};
use crate::versioning::{ActionKind, ResourceDefinition, TransformRegistry};

pub const RESOURCE: &str = "user";
pub const PREFIX: &str = "vnd.example.user";

/// Fields each legacy version does not know about.
const LEGACY_HIDDEN: [(&str, &[&str]); 2] = [("v1", &["address", "phone"]), ("v2", &["address"])];

pub fn version_config() -> Value {
    json!({
        "versions": ["v1", "v2", "v3"],
        "representationPrefix": PREFIX,
    })
}

pub async fn seed_store() -> Result<MemoryStore, AppError> {
    MemoryStore::new(RESOURCE)
        .with_records([
            json!({ "name": "Ada Lovelace", "phone": "555-0100", "address": "12 St James's Square" }),
            json!({ "name": "Grace Hopper", "phone": "555-0199", "address": "1 Navy Yard" }),
        ])
        .await
}

/// Definition plus the complete set of legacy transforms.
#[tracing::instrument(name = "user_resource", skip(store))]
pub fn user_resource(store: Arc<dyn ResourceStore>) -> (ResourceDefinition, TransformRegistry) {
    let mut transforms = TransformRegistry::new();

    for (version, hidden) in LEGACY_HIDDEN {
        for action in ActionKind::ALL {
            let store = store.clone();
            transforms.register(version, RESOURCE, action, move |input| {
                let store = store.clone();
                async move {
                    let native = run_native(store.as_ref(), action, input).await?;
                    Ok(hide_fields(native.unwrap_or(Value::Null), hidden))
                }
            });
        }
    }

    let definition = ResourceDefinition::new(RESOURCE, store).with_version_config(version_config());
    (definition, transforms)
}

/// Removes `fields` from a record or from every record of a list.
pub fn hide_fields(mut value: Value, fields: &[&str]) -> Value {
    match &mut value {
        Value::Array(records) => {
            for record in records.iter_mut() {
                if let Some(map) = record.as_object_mut() {
                    fields.iter().for_each(|f| {
                        map.remove(*f);
                    });
                }
            }
        }
        Value::Object(map) => fields.iter().for_each(|f| {
            map.remove(*f);
        }),
        _ => {}
    }
    value
}
