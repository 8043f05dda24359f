//! Student roster CRUD tools.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::{required_str, store_error_string, Tool};
use crate::store::{StudentRecord, StudentStore, StudentUpdate};

pub struct ListStudents {
    store: Arc<dyn StudentStore>,
}

impl ListStudents {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListStudents {
    fn name(&self) -> &str {
        "list_students"
    }

    fn description(&self) -> &str {
        "Lists all students in the roster as a JSON array."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        match self.store.list().await {
            Ok(students) => Ok(serde_json::to_string_pretty(&students)?),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct GetStudent {
    store: Arc<dyn StudentStore>,
}

impl GetStudent {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetStudent {
    fn name(&self) -> &str {
        "get_student"
    }

    fn description(&self) -> &str {
        "Retrieves a single student's record by their ID."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The ID of the student to retrieve"
                }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let id = required_str(&args, "id")?;
        match self.store.get(&id).await {
            Ok(student) => Ok(serde_json::to_string_pretty(&student)?),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct AddStudent {
    store: Arc<dyn StudentStore>,
}

impl AddStudent {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddStudent {
    fn name(&self) -> &str {
        "add_student"
    }

    fn description(&self) -> &str {
        "Adds a new student record to the roster. Fails if the ID is already taken."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The new student's ID"
                },
                "name": {
                    "type": "string",
                    "description": "The new student's full name"
                },
                "department": {
                    "type": "string",
                    "description": "The new student's department"
                },
                "email": {
                    "type": "string",
                    "description": "The new student's email"
                }
            },
            "required": ["id", "name", "department", "email"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let id = required_str(&args, "id")?;
        let name = required_str(&args, "name")?;
        let department = required_str(&args, "department")?;
        let email = required_str(&args, "email")?;

        let record = StudentRecord {
            id: id.clone(),
            name: name.clone(),
            department,
            email,
            created_at: Utc::now(),
        };

        match self.store.insert(record).await {
            Ok(()) => Ok(format!(
                "Success: Student {} with ID {} has been added.",
                name, id
            )),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct UpdateStudent {
    store: Arc<dyn StudentStore>,
}

impl UpdateStudent {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateStudent {
    fn name(&self) -> &str {
        "update_student"
    }

    fn description(&self) -> &str {
        "Updates a single field (name, department, or email) of a student record."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The ID of the student to update"
                },
                "field": {
                    "type": "string",
                    "description": "The field to update: 'name', 'department', or 'email'"
                },
                "new_value": {
                    "type": "string",
                    "description": "The new value for the field"
                }
            },
            "required": ["id", "field", "new_value"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let id = required_str(&args, "id")?;
        let field = required_str(&args, "field")?;
        let new_value = required_str(&args, "new_value")?;

        let mut update = StudentUpdate::default();
        match field.as_str() {
            "name" => update.name = Some(new_value),
            "department" => update.department = Some(new_value),
            "email" => update.email = Some(new_value),
            other => {
                return Ok(format!(
                    "Error: Unknown field '{}'. Expected one of name, department, email.",
                    other
                ));
            }
        }

        match self.store.update(&id, update).await {
            Ok(_) => Ok(format!(
                "Success: Student with ID {} updated successfully.",
                id
            )),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}

pub struct DeleteStudent {
    store: Arc<dyn StudentStore>,
}

impl DeleteStudent {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteStudent {
    fn name(&self) -> &str {
        "delete_student"
    }

    fn description(&self) -> &str {
        "Deletes a student record by their ID."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The ID of the student to delete"
                }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let id = required_str(&args, "id")?;
        match self.store.delete(&id).await {
            Ok(()) => Ok(format!(
                "Success: Student with ID {} has been deleted.",
                id
            )),
            Err(e) => Ok(store_error_string(&e)),
        }
    }
}
