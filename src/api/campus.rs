//! Campus information, analytics, and communication endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::campus::{CAFETERIA_TIMINGS, EVENT_SCHEDULE, LIBRARY_HOURS};

use super::{error_response, store_error_response, AppState};

const RECENT_LIMIT: usize = 5;

/// `GET /analytics`
pub async fn analytics(State(state): State<Arc<AppState>>) -> Response {
    let total = match state.store.count().await {
        Ok(n) => n,
        Err(e) => return store_error_response(e),
    };
    let by_department = match state.store.count_by_department().await {
        Ok(counts) => counts,
        Err(e) => return store_error_response(e),
    };

    Json(json!({
        "total_students": total,
        "students_by_department": by_department,
    }))
    .into_response()
}

/// `GET /analytics/recent-onboarded`
pub async fn recent_onboarded(State(state): State<Arc<AppState>>) -> Response {
    match state.store.recent(RECENT_LIMIT).await {
        Ok(students) => Json(json!({ "recent_students": students })).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// `GET /analytics/active-students`
pub async fn active_students(State(state): State<Arc<AppState>>) -> Response {
    let cutoff = Utc::now() - Duration::days(7);
    match state.store.active_since(cutoff).await {
        Ok(count) => Json(json!({ "active_students": count })).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// `GET /campus/cafeteria`
pub async fn cafeteria() -> Response {
    Json(json!({ "timings": CAFETERIA_TIMINGS })).into_response()
}

/// `GET /campus/library`
pub async fn library() -> Response {
    Json(json!({ "hours": LIBRARY_HOURS })).into_response()
}

/// `GET /campus/events`
pub async fn events() -> Response {
    Json(json!({ "events": EVENT_SCHEDULE })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    student_id: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

/// `POST /communication/email` - mock send; the student must exist.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendEmailRequest>,
) -> Response {
    let (Some(student_id), Some(subject), Some(body)) = (req.student_id, req.subject, req.body)
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Error: student_id, subject, and body are required.",
        );
    };

    let student = match state.store.get(&student_id).await {
        Ok(student) => student,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Error: {}.", e));
        }
    };

    tracing::info!(
        to = %student.email,
        student_id = %student.id,
        subject = %subject,
        body = %body,
        "mock email sent"
    );

    Json(MessageBody {
        message: format!(
            "Success: A mock email has been sent to student ID {}.",
            student_id
        ),
    })
    .into_response()
}
