//! The resource store seen by the versioning layer.
//!
//! Native (latest-version) handling of every versioned action goes through
//! [`ResourceStore`]; the layer itself has no opinion on persistence.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AppError;
use crate::versioning::ActionKind;

pub use memory::MemoryStore;

/// What a request hands to a native action or a transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionInput {
    pub id: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl ActionInput {
    pub fn require_id(&self) -> Result<&str, AppError> {
        self.id
            .as_deref()
            .ok_or_else(|| AppError::Validation("Missing record id".to_string()))
    }

    pub fn require_body(&self) -> Result<&Value, AppError> {
        self.body
            .as_ref()
            .ok_or_else(|| AppError::Validation("Missing JSON body".to_string()))
    }
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn find(&self, query: &HashMap<String, String>) -> Result<Vec<Value>, AppError>;

    async fn find_one(&self, id: &str) -> Result<Value, AppError>;

    async fn create(&self, record: Value) -> Result<Value, AppError>;

    async fn update(&self, id: &str, patch: Value) -> Result<Value, AppError>;

    /// Removes the record and returns it as it was.
    async fn destroy(&self, id: &str) -> Result<Value, AppError>;
}

/// Runs `action` against the store. This is the latest representation.
#[tracing::instrument(name = "native_action", skip(store, input, action), fields(action = %action))]
pub async fn run_native(
    store: &dyn ResourceStore,
    action: ActionKind,
    input: ActionInput,
) -> Result<Option<Value>, AppError> {
    let value = match action {
        ActionKind::Find => Value::Array(store.find(&input.query).await?),
        ActionKind::FindOne => store.find_one(input.require_id()?).await?,
        ActionKind::Create => store.create(input.require_body()?.clone()).await?,
        ActionKind::Update => {
            store
                .update(input.require_id()?, input.require_body()?.clone())
                .await?
        }
        ActionKind::Destroy => store.destroy(input.require_id()?).await?,
    };
    Ok(Some(value))
}
