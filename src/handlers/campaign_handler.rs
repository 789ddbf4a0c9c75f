//! handlers/campaign_handler.rs
//! Endpoints de campaigns: generar, enviar, programar, borradores y listado.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::{
    handlers::{error_response, missing_user},
    models::{
        campaign_model::{SaveDraftRequest, ScheduleCampaignRequest, SendCampaignRequest, UserQuery},
        content_model::GenerateCampaignRequest,
    },
    services::campaign_service::CampaignService,
};

/// POST /api/campaigns/generate
pub async fn generate_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<GenerateCampaignRequest>,
) -> HttpResponse {
    match campaign_service.generate_campaign(&body).await {
        Ok(emails) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Personalized emails created for {} customers.", emails.len()),
            "emails": emails
        })),
        Err(e) => error_response("generate_campaign_endpoint", &e),
    }
}

/// POST /api/campaigns/send
pub async fn send_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<SendCampaignRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Some(resp) = missing_user(&req.user_id) {
        return resp;
    }

    match campaign_service
        .send_campaign(&req.user_id, req.emails, Utc::now())
        .await
    {
        Ok(result) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_id": result.campaign_id,
            "summary": result.summary
        })),
        Err(e) => error_response("send_campaign_endpoint", &e),
    }
}

/// POST /api/campaigns/schedule
pub async fn schedule_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<ScheduleCampaignRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Some(resp) = missing_user(&req.user_id) {
        return resp;
    }

    match campaign_service
        .schedule_campaign(&req.user_id, req.emails, req.send_at)
        .await
    {
        Ok(result) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_id": result.campaign_id,
            "scheduled": result.scheduled,
            "send_at": result.send_at
        })),
        Err(e) => error_response("schedule_campaign_endpoint", &e),
    }
}

/// POST /api/campaigns/draft
pub async fn save_draft_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<SaveDraftRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Some(resp) = missing_user(&req.user_id) {
        return resp;
    }

    match campaign_service.save_draft(&req, Utc::now()).await {
        Ok(campaign) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign": campaign
        })),
        Err(e) => error_response("save_draft_endpoint", &e),
    }
}

/// GET /api/campaigns?user_id=
pub async fn list_campaigns_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<UserQuery>,
) -> HttpResponse {
    if let Some(resp) = missing_user(&query.user_id) {
        return resp;
    }

    match campaign_service.list_campaigns(&query.user_id).await {
        Ok(campaigns) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaigns": campaigns
        })),
        Err(e) => error_response("list_campaigns_endpoint", &e),
    }
}
