//! app.rs
use crate::handlers::{
    self, campaign_handler, customer_handler, dispatch_handler, log_handler, tracking_handler,
};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/track/{log_id}/pixel.gif",
        web::get().to(tracking_handler::track_open_endpoint),
    )
    .route("/health", web::get().to(handlers::health_endpoint))
    .service(
        web::scope("/api")
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::get().to(campaign_handler::list_campaigns_endpoint),
                    )
                    .route(
                        "/generate",
                        web::post().to(campaign_handler::generate_campaign_endpoint),
                    )
                    .route(
                        "/send",
                        web::post().to(campaign_handler::send_campaign_endpoint),
                    )
                    .route(
                        "/schedule",
                        web::post().to(campaign_handler::schedule_campaign_endpoint),
                    )
                    .route(
                        "/draft",
                        web::post().to(campaign_handler::save_draft_endpoint),
                    ),
            )
            .route(
                "/dispatch/poll",
                web::post().to(dispatch_handler::poll_endpoint),
            )
            .route("/logs", web::get().to(log_handler::list_logs_endpoint))
            .route(
                "/scheduled",
                web::get().to(log_handler::list_scheduled_endpoint),
            )
            .service(
                web::scope("/customers")
                    .route(
                        "",
                        web::post().to(customer_handler::add_customers_endpoint),
                    )
                    .route(
                        "",
                        web::get().to(customer_handler::list_customers_endpoint),
                    )
                    .route(
                        "/summarize",
                        web::post().to(customer_handler::summarize_endpoint),
                    ),
            ),
    );
}
