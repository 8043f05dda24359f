//! Notification stub: mock email delivery.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{required_str, store_error_string, Tool};
use crate::store::StudentStore;

pub struct SendEmail {
    store: Arc<dyn StudentStore>,
}

impl SendEmail {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SendEmail {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Sends a mock email to a student. The student must exist in the roster."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "student_id": {
                    "type": "string",
                    "description": "The ID of the student to email"
                },
                "subject": {
                    "type": "string",
                    "description": "The email subject line"
                },
                "body": {
                    "type": "string",
                    "description": "The content of the email"
                }
            },
            "required": ["student_id", "subject", "body"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let student_id = required_str(&args, "student_id")?;
        let subject = required_str(&args, "subject")?;
        let body = required_str(&args, "body")?;

        let student = match self.store.get(&student_id).await {
            Ok(student) => student,
            Err(e) => return Ok(store_error_string(&e)),
        };

        // No mail transport: log the message instead of delivering it.
        tracing::info!(
            to = %student.email,
            student_id = %student.id,
            subject = %subject,
            body = %body,
            "mock email sent"
        );

        Ok(format!(
            "Success: A mock email has been sent to student ID {}.",
            student_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStudentStore, StudentRecord};
    use chrono::Utc;

    #[tokio::test]
    async fn email_to_known_student_succeeds() {
        let store = Arc::new(InMemoryStudentStore::new());
        store
            .insert(StudentRecord {
                id: "23-1001".to_string(),
                name: "Ayesha Khan".to_string(),
                department: "Computer Science".to_string(),
                email: "ayesha@saylani.edu".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let result = SendEmail::new(store)
            .execute(json!({
                "student_id": "23-1001",
                "subject": "Fee reminder",
                "body": "Your semester fee is due."
            }))
            .await
            .unwrap();
        assert_eq!(
            result,
            "Success: A mock email has been sent to student ID 23-1001."
        );
    }

    #[tokio::test]
    async fn email_to_unknown_student_yields_error_string() {
        let store = Arc::new(InMemoryStudentStore::new());
        let result = SendEmail::new(store)
            .execute(json!({
                "student_id": "00-0000",
                "subject": "Hello",
                "body": "Hi"
            }))
            .await
            .unwrap();
        assert_eq!(result, "Error: No student found with ID 00-0000.");
    }
}
