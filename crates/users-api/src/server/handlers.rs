//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    error::ErrorBody,
    protocol::{HealthResponse, MessageResponse, RegisterRequest, RegisterResponse},
    ServiceError,
};
use tracing::error;

use super::state::AppState;
use crate::db::users::{id_to_string, public_view, user_document};

/// `POST /api/register` — store a user; the driver encrypts sensitive fields.
///
/// The body is not validated: whatever subset of `name`, `email`, `password`
/// and `ssn` is present gets inserted as-is.
pub async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Response {
    let user = match user_document(req) {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "register failed");
            return error_response(ServiceError::Internal(e.to_string()));
        }
    };

    match state.users.insert(user).await {
        Ok(id) => (StatusCode::OK, Json(RegisterResponse::new(id_to_string(id)))).into_response(),
        Err(e) => {
            error!(error = %e, "register failed");
            error_response(ServiceError::Database(e.to_string()))
        }
    }
}

/// `GET /api/user/:email` — look a user up by exact email.
///
/// `password` and `ssn` are removed before the record is returned.
pub async fn user_by_email(State(state): State<AppState>, Path(email): Path<String>) -> Response {
    match state.users.find_by_email(&email).await {
        Ok(Some(user)) => (StatusCode::OK, Json(public_view(user))).into_response(),
        Ok(None) => error_response(ServiceError::NotFound("User not found".into())),
        Err(e) => {
            error!(error = %e, "user lookup failed");
            error_response(ServiceError::Database(e.to_string()))
        }
    }
}

/// `GET /health` — liveness only; does not touch the database.
pub async fn health() -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse::new("the requested resource does not exist")),
    )
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match err.body() {
        ErrorBody::Message(body) => (status, Json(body)).into_response(),
        ErrorBody::Error(body) => (status, Json(body)).into_response(),
    }
}
