//! handlers/dispatch_handler.rs
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::{
    handlers::{error_response, missing_user},
    models::dispatch_model::PollRequest,
    services::dispatch_service::DispatchEngine,
};

/// POST /api/dispatch/poll
/// Lo que antes hacía el cliente con su temporizador: un ciclo para un usuario.
pub async fn poll_endpoint(
    engine: web::Data<DispatchEngine>,
    body: web::Json<PollRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Some(resp) = missing_user(&req.user_id) {
        return resp;
    }

    match engine.poll_and_dispatch(&req.user_id, Utc::now()).await {
        Ok(summary) => HttpResponse::Ok().json(json!({
            "success": true,
            "summary": summary
        })),
        Err(e) => error_response("poll_endpoint", &e),
    }
}
