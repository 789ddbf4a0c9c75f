//! handlers/log_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    handlers::{error_response, missing_user},
    models::campaign_model::UserQuery,
    services::campaign_service::CampaignService,
};

/// GET /api/logs?user_id=
pub async fn list_logs_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<UserQuery>,
) -> HttpResponse {
    if let Some(resp) = missing_user(&query.user_id) {
        return resp;
    }

    match campaign_service.list_logs(&query.user_id).await {
        Ok(logs) => HttpResponse::Ok().json(json!({ "success": true, "logs": logs })),
        Err(e) => error_response("list_logs_endpoint", &e),
    }
}

/// GET /api/scheduled?user_id=
pub async fn list_scheduled_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<UserQuery>,
) -> HttpResponse {
    if let Some(resp) = missing_user(&query.user_id) {
        return resp;
    }

    match campaign_service.list_scheduled(&query.user_id).await {
        Ok(scheduled) => HttpResponse::Ok().json(json!({
            "success": true,
            "scheduled": scheduled
        })),
        Err(e) => error_response("list_scheduled_endpoint", &e),
    }
}
