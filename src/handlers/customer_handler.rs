//! handlers/customer_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    handlers::{error_response, missing_user},
    models::{
        campaign_model::UserQuery,
        customer_model::{AddCustomersRequest, SummarizeRequest},
    },
    services::campaign_service::CampaignService,
};

/// POST /api/customers
pub async fn add_customers_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<AddCustomersRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Some(resp) = missing_user(&req.user_id) {
        return resp;
    }

    match campaign_service
        .add_customers(&req.user_id, req.customers)
        .await
    {
        Ok(customers) => HttpResponse::Ok().json(json!({
            "success": true,
            "added": customers.len(),
            "customers": customers
        })),
        Err(e) => error_response("add_customers_endpoint", &e),
    }
}

/// GET /api/customers?user_id=
pub async fn list_customers_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<UserQuery>,
) -> HttpResponse {
    if let Some(resp) = missing_user(&query.user_id) {
        return resp;
    }

    match campaign_service.list_customers(&query.user_id).await {
        Ok(customers) => HttpResponse::Ok().json(json!({
            "success": true,
            "customers": customers
        })),
        Err(e) => error_response("list_customers_endpoint", &e),
    }
}

/// POST /api/customers/summarize
pub async fn summarize_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<SummarizeRequest>,
) -> HttpResponse {
    match campaign_service.summarize(&body.customer_data).await {
        Ok(summary) => HttpResponse::Ok().json(json!({
            "success": true,
            "summary": summary.summary
        })),
        Err(e) => error_response("summarize_endpoint", &e),
    }
}
