//! In-memory student store (non-persistent).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{StoreError, StudentRecord, StudentStore, StudentUpdate};

#[derive(Clone)]
pub struct InMemoryStudentStore {
    records: Arc<RwLock<HashMap<String, StudentRecord>>>,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStudentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn list(&self) -> Result<Vec<StudentRecord>, StoreError> {
        let mut records: Vec<StudentRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<StudentRecord, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, record: StudentRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update(&self, id: &str, update: StudentUpdate) -> Result<StudentRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(department) = update.department {
            record.department = department;
        }
        if let Some(email) = update.email {
            record.email = email;
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn count_by_department(&self) -> Result<HashMap<String, u64>, StoreError> {
        let records = self.records.read().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in records.values() {
            *counts.entry(record.department.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StudentRecord>, StoreError> {
        let mut records: Vec<StudentRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn active_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.created_at >= cutoff).count() as u64)
    }
}
