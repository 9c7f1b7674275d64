use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::store::ResourceStore;

/// In-process store with auto-increment numeric ids.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    records: RwLock<BTreeMap<u64, Map<String, Value>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seeds records, assigning ids in order.
    pub async fn with_records<I>(self, records: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = Value>,
    {
        for record in records {
            self.create(record).await?;
        }
        Ok(self)
    }

    fn parse_id(&self, id: &str) -> Result<u64, AppError> {
        id.parse()
            .map_err(|_| AppError::NotFound(format!("No {} with id '{}'", self.name, id)))
    }

    fn not_found(&self, id: u64) -> AppError {
        AppError::NotFound(format!("No {} with id '{}'", self.name, id))
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Validation(format!(
            "Expected a JSON object, got {}",
            other
        ))),
    }
}

fn with_id(id: u64, record: &Map<String, Value>) -> Value {
    let mut out = record.clone();
    out.insert("id".to_string(), Value::from(id));
    Value::Object(out)
}

fn matches_query(id: u64, record: &Map<String, Value>, query: &HashMap<String, String>) -> bool {
    query.iter().all(|(key, expected)| {
        if key == "id" {
            return id.to_string() == *expected;
        }
        match record.get(key) {
            Some(Value::String(s)) => s == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        }
    })
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn find(&self, query: &HashMap<String, String>) -> Result<Vec<Value>, AppError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(id, record)| matches_query(**id, record, query))
            .map(|(id, record)| with_id(*id, record))
            .collect())
    }

    async fn find_one(&self, id: &str) -> Result<Value, AppError> {
        let id = self.parse_id(id)?;
        let records = self.records.read().await;
        records
            .get(&id)
            .map(|record| with_id(id, record))
            .ok_or_else(|| self.not_found(id))
    }

    async fn create(&self, record: Value) -> Result<Value, AppError> {
        let mut record = into_object(record)?;
        record.remove("id");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let out = with_id(id, &record);
        self.records.write().await.insert(id, record);
        tracing::debug!(resource = %self.name, id, "Record created");
        Ok(out)
    }

    async fn update(&self, id: &str, patch: Value) -> Result<Value, AppError> {
        let id = self.parse_id(id)?;
        let patch = into_object(patch)?;
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| self.not_found(id))?;
        for (key, value) in patch {
            if key != "id" {
                record.insert(key, value);
            }
        }
        Ok(with_id(id, record))
    }

    async fn destroy(&self, id: &str) -> Result<Value, AppError> {
        let id = self.parse_id(id)?;
        let removed = self
            .records
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| self.not_found(id))?;
        tracing::debug!(resource = %self.name, id, "Record destroyed");
        Ok(with_id(id, &removed))
    }
}
