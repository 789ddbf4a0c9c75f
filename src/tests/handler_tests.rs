//! tests/handler_tests.rs
//! Pruebas HTTP de los endpoints con `actix_web::test`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, web, App};
    use serde_json::{json, Value};

    use crate::app::init_app;
    use crate::models::email_log_model::EmailLogStatus;
    use crate::services::campaign_service::CampaignService;
    use crate::services::dispatch_service::DispatchEngine;
    use crate::services::tracking_service::{TrackingRecorder, PIXEL_GIF};
    use crate::tests::support::{
        fast_config, seed_log, seed_scheduled, test_db, ts, FakeGenerator, FakeTransport, TestDb,
    };

    fn app_data(db: &TestDb, transport: Arc<FakeTransport>) -> (DispatchEngine, CampaignService, TrackingRecorder) {
        let engine = DispatchEngine::new(db.store.clone(), transport.clone(), fast_config());
        let campaigns = CampaignService::new(
            db.store.clone(),
            transport,
            Arc::new(FakeGenerator::default()),
            Some("https://mail.example.com".to_string()),
            fast_config(),
        );
        let recorder = TrackingRecorder::new(db.store.clone());
        (engine, campaigns, recorder)
    }

    macro_rules! init {
        ($db:expr, $transport:expr) => {{
            let (engine, campaigns, recorder) = app_data($db, $transport);
            test::init_service(
                App::new()
                    .app_data(web::Data::new(engine))
                    .app_data(web::Data::new(campaigns))
                    .app_data(web::Data::new(recorder))
                    .configure(init_app),
            )
            .await
        }};
    }

    fn assert_pixel_headers(resp: &actix_web::dev::ServiceResponse) {
        let headers = resp.headers();
        assert_eq!(headers.get("content-type").unwrap(), "image/gif");
        assert_eq!(
            headers.get("cache-control").unwrap(),
            "no-store, no-cache, must-revalidate, proxy-revalidate"
        );
        assert_eq!(headers.get("pragma").unwrap(), "no-cache");
        assert_eq!(headers.get("expires").unwrap(), "0");
        assert_eq!(headers.get("surrogate-control").unwrap(), "no-store");
    }

    #[actix_rt::test]
    async fn pixel_records_open_and_returns_gif() {
        let db = test_db().await;
        let log_id = seed_log(&db.store, "u1", None, EmailLogStatus::Sent).await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));

        let req = test::TestRequest::get()
            .uri(&format!("/track/{}/pixel.gif", log_id))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_pixel_headers(&resp);
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), PIXEL_GIF);

        let log = db.store.get_log(&log_id).await.unwrap().unwrap();
        assert_eq!(log.status, EmailLogStatus::Opened);
    }

    #[actix_rt::test]
    async fn pixel_for_unknown_log_is_still_a_gif() {
        let db = test_db().await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));

        let req = test::TestRequest::get()
            .uri("/track/nope/pixel.gif")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_pixel_headers(&resp);
        assert_eq!(test::read_body(resp).await.as_ref(), PIXEL_GIF);
    }

    #[actix_rt::test]
    async fn pixel_survives_store_outage() {
        let db = test_db().await;
        let log_id = seed_log(&db.store, "u1", None, EmailLogStatus::Sent).await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));
        db.sqlite.pool().close().await;

        let req = test::TestRequest::get()
            .uri(&format!("/track/{}/pixel.gif", log_id))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(test::read_body(resp).await.as_ref(), PIXEL_GIF);
    }

    #[actix_rt::test]
    async fn poll_endpoint_returns_summary() {
        let db = test_db().await;
        seed_scheduled(
            &db.store,
            "u1",
            "ana@example.com",
            ts("2020-01-01T00:00:00Z"),
            None,
            None,
        )
        .await;
        let transport = Arc::new(FakeTransport::succeeding());
        let app = init!(&db, transport.clone());

        let req = test::TestRequest::post()
            .uri("/api/dispatch/poll")
            .set_json(json!({ "user_id": "u1" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["summary"]["sent"], 1);
        assert_eq!(transport.calls().len(), 1);
    }

    #[actix_rt::test]
    async fn poll_endpoint_requires_user() {
        let db = test_db().await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));

        let req = test::TestRequest::post()
            .uri("/api/dispatch/poll")
            .set_json(json!({ "user_id": " " }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_rt::test]
    async fn schedule_endpoint_validates_and_lists() {
        let db = test_db().await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));

        let empty = test::TestRequest::post()
            .uri("/api/campaigns/schedule")
            .set_json(json!({ "user_id": "u1", "emails": [], "send_at": "2030-01-01T09:00:00Z" }))
            .to_request();
        let resp = test::call_service(&app, empty).await;
        assert_eq!(resp.status(), 400);

        let ok = test::TestRequest::post()
            .uri("/api/campaigns/schedule")
            .set_json(json!({
                "user_id": "u1",
                "send_at": "2030-01-01T09:00:00Z",
                "emails": [
                    { "recipient_email": "ana@example.com", "subject": "Hola", "content": "Hi" }
                ]
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, ok).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["scheduled"], 1);

        let list = test::TestRequest::get()
            .uri("/api/scheduled?user_id=u1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, list).await;
        assert_eq!(body["scheduled"].as_array().unwrap().len(), 1);
        assert_eq!(body["scheduled"][0]["status"], "Scheduled");

        let campaigns = test::TestRequest::get()
            .uri("/api/campaigns?user_id=u1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, campaigns).await;
        assert_eq!(body["campaigns"][0]["status"], "Scheduled");
        assert_eq!(body["campaigns"][0]["recipientCount"], 1);
    }

    #[actix_rt::test]
    async fn customers_endpoint_rejects_missing_email() {
        let db = test_db().await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));

        let req = test::TestRequest::post()
            .uri("/api/customers")
            .set_json(json!({ "user_id": "u1", "customers": [ { "name": "Ana" } ] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_rt::test]
    async fn health_is_ok() {
        let db = test_db().await;
        let app = init!(&db, Arc::new(FakeTransport::succeeding()));

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
    }
}
