//! services/tracking_service.rs
//! Registro de aperturas vía pixel 1x1. Nunca falla hacia afuera.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::services::store_service::{CampaignStore, OpenRecord};

/// GIF transparente de 1x1 (42 bytes)
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

/// Cabeceras anti-caché: cada carga del pixel tiene que llegar al servidor.
pub const NO_CACHE_HEADERS: [(&str, &str); 4] = [
    (
        "Cache-Control",
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
    ("Surrogate-Control", "no-store"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Recorded,
    AlreadyOpened,
    UnknownLog,
    Errored,
}

#[derive(Clone)]
pub struct TrackingRecorder {
    store: Arc<dyn CampaignStore>,
}

impl TrackingRecorder {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }

    /// Primera apertura gana; las siguientes son no-op. Los errores se loguean y se tragan.
    pub async fn record_open(&self, log_id: &str, now: DateTime<Utc>) -> OpenOutcome {
        let log_id = log_id.trim();
        if log_id.is_empty() {
            return OpenOutcome::UnknownLog;
        }

        match self.store.record_open(log_id, now).await {
            Ok(OpenRecord::Recorded { campaign_id }) => {
                log::info!(
                    "(record_open) log_id={} opened, campaign={}",
                    log_id,
                    campaign_id.as_deref().unwrap_or("-")
                );
                OpenOutcome::Recorded
            }
            Ok(OpenRecord::AlreadyOpened) => {
                log::debug!("(record_open) log_id={} already opened", log_id);
                OpenOutcome::AlreadyOpened
            }
            Ok(OpenRecord::UnknownLog) => {
                log::debug!("(record_open) log_id={} not found", log_id);
                OpenOutcome::UnknownLog
            }
            Err(e) => {
                log::error!("(record_open) Error tracking open for log_id={}: {}", log_id, e);
                OpenOutcome::Errored
            }
        }
    }
}

/// URL pública del pixel de un log.
pub fn pixel_url(app_url: &str, log_id: &str) -> String {
    format!(
        "{}/track/{}/pixel.gif",
        app_url.trim_end_matches('/'),
        urlencoding::encode(log_id)
    )
}

/// `<img>` de tracking a concatenar al HTML del email.
pub fn pixel_tag(app_url: &str, log_id: &str) -> String {
    format!(
        r#"<img src="{}" width="1" height="1" alt="" />"#,
        pixel_url(app_url, log_id)
    )
}
