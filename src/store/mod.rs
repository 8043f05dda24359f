//! Student roster persistence.
//!
//! The store is an explicitly constructed dependency injected into the tool
//! registry and the HTTP layer at startup. Every operation is independently
//! atomic; there are no multi-record transactions.

mod memory;

pub use memory::InMemoryStudentStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single student record.
///
/// The `id` is externally assigned (e.g. "23-1001") and unique within the
/// roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub department: String,
    pub email: String,
    /// When the record was inserted. Drives the recent-onboarded and
    /// active-students analytics.
    pub created_at: DateTime<Utc>,
}

/// Partial update for a student record. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.department.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No student found with ID {0}")]
    NotFound(String),

    #[error("Student with ID {0} already exists")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Roster storage operations.
///
/// Implementations must support safe concurrent independent operations;
/// uniqueness of `id` is enforced by `insert`.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// All records, in unspecified order.
    async fn list(&self) -> Result<Vec<StudentRecord>, StoreError>;

    /// Look up a record by id.
    async fn get(&self, id: &str) -> Result<StudentRecord, StoreError>;

    /// Insert a new record. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, record: StudentRecord) -> Result<(), StoreError>;

    /// Apply a partial update; returns the updated record.
    async fn update(&self, id: &str, update: StudentUpdate) -> Result<StudentRecord, StoreError>;

    /// Remove a record by id.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Total number of records.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Record counts grouped by department.
    async fn count_by_department(&self) -> Result<HashMap<String, u64>, StoreError>;

    /// The `limit` most recently inserted records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<StudentRecord>, StoreError>;

    /// Number of records inserted at or after `cutoff`.
    async fn active_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Seed the roster with the fixed demo records used at startup.
///
/// Existing records with the same ids are left untouched.
pub async fn seed_demo_students(store: &dyn StudentStore) -> Result<(), StoreError> {
    let demo = [
        ("23-1001", "Ayesha Khan", "Computer Science", "ayesha@saylani.edu"),
        ("23-1002", "Usman Ali", "Software Engineering", "usman@saylani.edu"),
        ("23-1003", "Fatima Rehman", "Data Science", "fatima@saylani.edu"),
        ("23-1004", "Bilal Ahmed", "Computer Science", "bilal@saylani.edu"),
        ("23-1005", "Sana Ejaz", "Software Engineering", "sana@saylani.edu"),
    ];

    for (id, name, department, email) in demo {
        let record = StudentRecord {
            id: id.to_string(),
            name: name.to_string(),
            department: department.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        match store.insert(record).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Seeded demo student roster");
    Ok(())
}
