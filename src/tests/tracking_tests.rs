//! tests/tracking_tests.rs
//! Pruebas para el registro de aperturas.

#[cfg(test)]
mod tests {
    use actix_rt::test;
    use futures_util::future::join_all;

    use crate::models::campaign_model::CampaignStatus;
    use crate::models::email_log_model::EmailLogStatus;
    use crate::services::tracking_service::{
        pixel_tag, pixel_url, OpenOutcome, TrackingRecorder, PIXEL_GIF,
    };
    use crate::tests::support::{seed_campaign, seed_log, test_db, ts};

    #[test]
    async fn concurrent_opens_count_once() {
        let db = test_db().await;
        let campaign_id = seed_campaign(&db.store, "u1", CampaignStatus::Sent).await;
        let log_id = seed_log(&db.store, "u1", Some(&campaign_id), EmailLogStatus::Sent).await;
        let recorder = TrackingRecorder::new(db.store.clone());
        let now = ts("2024-01-02T10:00:00Z");

        let outcomes = join_all((0..8).map(|_| recorder.record_open(&log_id, now))).await;

        let recorded = outcomes
            .iter()
            .filter(|o| **o == OpenOutcome::Recorded)
            .count();
        assert_eq!(recorded, 1);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, OpenOutcome::Recorded | OpenOutcome::AlreadyOpened)));

        let log = db.store.get_log(&log_id).await.unwrap().unwrap();
        assert_eq!(log.status, EmailLogStatus::Opened);
        assert_eq!(log.opened_at, Some(now));

        let campaign = db.store.get_campaign("u1", &campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.opened_count, 1);
    }

    #[test]
    async fn reopen_later_is_a_no_op() {
        let db = test_db().await;
        let campaign_id = seed_campaign(&db.store, "u1", CampaignStatus::Sent).await;
        let log_id = seed_log(&db.store, "u1", Some(&campaign_id), EmailLogStatus::Sent).await;
        let recorder = TrackingRecorder::new(db.store.clone());

        let first = ts("2024-01-02T10:00:00Z");
        assert_eq!(recorder.record_open(&log_id, first).await, OpenOutcome::Recorded);
        assert_eq!(
            recorder.record_open(&log_id, ts("2024-01-03T10:00:00Z")).await,
            OpenOutcome::AlreadyOpened
        );

        let log = db.store.get_log(&log_id).await.unwrap().unwrap();
        assert_eq!(log.opened_at, Some(first));

        // Un envío tardío no pisa el Opened
        assert!(!db
            .store
            .set_log_status(&log_id, EmailLogStatus::Sent, Some(first))
            .await
            .unwrap());
        let campaign = db.store.get_campaign("u1", &campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.opened_count, 1);
    }

    #[test]
    async fn unknown_and_empty_ids_touch_nothing() {
        let db = test_db().await;
        let recorder = TrackingRecorder::new(db.store.clone());
        let now = ts("2024-01-02T10:00:00Z");

        assert_eq!(recorder.record_open("does-not-exist", now).await, OpenOutcome::UnknownLog);
        assert_eq!(recorder.record_open("   ", now).await, OpenOutcome::UnknownLog);
    }

    #[test]
    async fn log_without_campaign_still_opens() {
        let db = test_db().await;
        let log_id = seed_log(&db.store, "u1", None, EmailLogStatus::Sent).await;
        let recorder = TrackingRecorder::new(db.store.clone());

        assert_eq!(
            recorder.record_open(&log_id, ts("2024-01-02T10:00:00Z")).await,
            OpenOutcome::Recorded
        );
        let log = db.store.get_log(&log_id).await.unwrap().unwrap();
        assert_eq!(log.status, EmailLogStatus::Opened);
    }

    #[test]
    async fn store_failure_is_swallowed() {
        let db = test_db().await;
        let log_id = seed_log(&db.store, "u1", None, EmailLogStatus::Sent).await;
        let recorder = TrackingRecorder::new(db.store.clone());
        db.sqlite.pool().close().await;

        assert_eq!(
            recorder.record_open(&log_id, ts("2024-01-02T10:00:00Z")).await,
            OpenOutcome::Errored
        );
    }

    #[test]
    async fn pixel_markup_and_bytes() {
        assert_eq!(
            pixel_url("https://mail.example.com/", "abc 1"),
            "https://mail.example.com/track/abc%201/pixel.gif"
        );
        assert_eq!(
            pixel_tag("https://mail.example.com", "L1"),
            r#"<img src="https://mail.example.com/track/L1/pixel.gif" width="1" height="1" alt="" />"#
        );

        #[allow(deprecated)]
        let expected =
            base64::decode("R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7").unwrap();
        assert_eq!(PIXEL_GIF, expected.as_slice());
        assert_eq!(PIXEL_GIF.len(), 42);
    }
}
