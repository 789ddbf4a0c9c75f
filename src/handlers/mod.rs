//! handlers/mod.rs
//! Endpoints HTTP. Todas las respuestas JSON llevan `"success"`.

pub mod campaign_handler;
pub mod customer_handler;
pub mod dispatch_handler;
pub mod log_handler;
pub mod tracking_handler;

use actix_web::{http::StatusCode, HttpResponse};
use serde_json::json;

use crate::errors::{DispatchError, GenerationError};

/// Validación -> 400, generador o transporte -> 502, resto -> 500.
pub fn error_response(operation: &str, e: &anyhow::Error) -> HttpResponse {
    let status = if let Some(err) = e.downcast_ref::<DispatchError>() {
        match err {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Transport(_) | DispatchError::Configuration(_) => StatusCode::BAD_GATEWAY,
            DispatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    } else if e.downcast_ref::<GenerationError>().is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    if status.is_server_error() {
        log::error!("({}) {:#}", operation, e);
    } else {
        log::warn!("({}) {:#}", operation, e);
    }

    HttpResponse::build(status).json(json!({
        "success": false,
        "error": format!("{:#}", e)
    }))
}

/// `user_id` vacío es un 400 antes de tocar el store.
pub fn missing_user(user_id: &str) -> Option<HttpResponse> {
    if user_id.trim().is_empty() {
        Some(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "user_id is required"
        })))
    } else {
        None
    }
}

/// GET /health
pub async fn health_endpoint() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "status": "ok" }))
}
