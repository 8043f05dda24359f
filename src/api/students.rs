//! Student roster CRUD endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::store::{StudentRecord, StudentUpdate};

use super::{error_response, store_error_response, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateStudent {
    id: Option<String>,
    name: Option<String>,
    department: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

/// `GET /students`
pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list().await {
        Ok(students) => Json(students).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// `GET /students/:id`
pub async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store.get(&id).await {
        Ok(student) => Json(student).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// `POST /students`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudent>,
) -> Response {
    let (Some(id), Some(name), Some(department), Some(email)) =
        (req.id, req.name, req.department, req.email)
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Error: id, name, department, and email are required.",
        );
    };
    if id.trim().is_empty() || name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Error: id and name must not be empty.");
    }

    let record = StudentRecord {
        id,
        name,
        department,
        email,
        created_at: Utc::now(),
    };

    match state.store.insert(record.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// `PUT /students/:id`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<StudentUpdate>,
) -> Response {
    if req.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Error: at least one of name, department, email is required.",
        );
    }

    match state.store.update(&id, req).await {
        Ok(student) => Json(student).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// `DELETE /students/:id`
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store.delete(&id).await {
        Ok(()) => Json(MessageBody {
            message: format!("Success: Student with ID {} has been deleted.", id),
        })
        .into_response(),
        Err(e) => store_error_response(e),
    }
}
