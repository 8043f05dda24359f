//! HTTP API surface.
//!
//! Routes the chat endpoints (synchronous and streaming), the student CRUD
//! endpoints, and the campus/analytics lookups. All collaborators are built
//! once at startup and shared through [`AppState`].

mod campus;
mod chat;
mod students;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agent::Agent;
use crate::config::Config;
use crate::llm::{LlmClient, OpenAiClient};
use crate::store::{seed_demo_students, InMemoryStudentStore, StoreError, StudentStore};
use crate::tools::ToolRegistry;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn StudentStore>,
    pub registry: Arc<ToolRegistry>,
    pub llm: Arc<dyn LlmClient>,
}

impl AppState {
    /// A fresh agent for one run. Runs own their transcript; nothing is
    /// shared between requests except the store.
    pub fn agent(&self) -> Agent {
        Agent::new(
            self.config.clone(),
            self.llm.clone(),
            self.registry.clone(),
        )
    }
}

/// Build the router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/students", get(students::list).post(students::create))
        .route(
            "/students/:id",
            get(students::get_one)
                .put(students::update)
                .delete(students::delete),
        )
        .route("/analytics", get(campus::analytics))
        .route("/analytics/recent-onboarded", get(campus::recent_onboarded))
        .route("/analytics/active-students", get(campus::active_students))
        .route("/campus/cafeteria", get(campus::cafeteria))
        .route("/campus/library", get(campus::library))
        .route("/campus/events", get(campus::events))
        .route("/communication/email", post(campus::send_email))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Construct the collaborators, seed the roster, and serve until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn StudentStore> = Arc::new(InMemoryStudentStore::new());
    seed_demo_students(store.as_ref()).await?;

    let registry = Arc::new(ToolRegistry::new(store.clone())?);
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(
        config.api_key.clone(),
        config.base_url.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        registry,
        llm,
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map store failures to the HTTP taxonomy: not-found 404, validation 400,
/// unavailability 500. The message keeps the `Error: ` prefix.
pub(crate) fn store_error_response(e: StoreError) -> Response {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Duplicate(_) => StatusCode::BAD_REQUEST,
        StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, format!("Error: {}.", e))
}
