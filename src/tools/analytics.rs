//! Roster analytics tools.
//!
//! The recent-onboarded and active-students figures are derived from each
//! record's insertion timestamp rather than mocked.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use super::{store_error_string, Tool};
use crate::store::StudentStore;

const DEFAULT_RECENT_LIMIT: usize = 5;

pub struct GetTotalStudents {
    store: Arc<dyn StudentStore>,
}

impl GetTotalStudents {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetTotalStudents {
    fn name(&self) -> &str {
        "get_total_students"
    }

    fn description(&self) -> &str {
        "Returns the total count of students in the roster."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        match self.store.count().await {
            Ok(count) => Ok(count.to_string()),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct GetStudentsByDepartment {
    store: Arc<dyn StudentStore>,
}

impl GetStudentsByDepartment {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetStudentsByDepartment {
    fn name(&self) -> &str {
        "get_students_by_department"
    }

    fn description(&self) -> &str {
        "Returns a count of students grouped by their department, as a JSON object."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        match self.store.count_by_department().await {
            Ok(counts) => Ok(serde_json::to_string_pretty(&counts)?),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct GetRecentOnboardedStudents {
    store: Arc<dyn StudentStore>,
}

impl GetRecentOnboardedStudents {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetRecentOnboardedStudents {
    fn name(&self) -> &str {
        "get_recent_onboarded_students"
    }

    fn description(&self) -> &str {
        "Returns the most recently onboarded students, newest first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "The number of recent students to return (default: 5)"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let limit = args["limit"]
            .as_u64()
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_RECENT_LIMIT);
        match self.store.recent(limit).await {
            Ok(students) => Ok(serde_json::to_string_pretty(&students)?),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct GetActiveStudentsLast7Days {
    store: Arc<dyn StudentStore>,
}

impl GetActiveStudentsLast7Days {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetActiveStudentsLast7Days {
    fn name(&self) -> &str {
        "get_active_students_last_7_days"
    }

    fn description(&self) -> &str {
        "Returns the number of students onboarded within the last 7 days."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        let cutoff = Utc::now() - Duration::days(7);
        match self.store.active_since(cutoff).await {
            Ok(count) => Ok(count.to_string()),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}
