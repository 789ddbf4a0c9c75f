//! handlers/tracking_handler.rs
//! Pixel de apertura. Siempre 200 con el GIF, pase lo que pase por dentro.

use actix_web::{web, HttpResponse};
use bytes::Bytes;
use chrono::Utc;

use crate::services::tracking_service::{TrackingRecorder, NO_CACHE_HEADERS, PIXEL_GIF};

/// GET /track/{log_id}/pixel.gif
pub async fn track_open_endpoint(
    recorder: web::Data<TrackingRecorder>,
    path: web::Path<String>,
) -> HttpResponse {
    let log_id = path.into_inner();
    recorder.record_open(&log_id, Utc::now()).await;

    pixel_response()
}

pub fn pixel_response() -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response.content_type("image/gif");
    for header in NO_CACHE_HEADERS {
        response.append_header(header);
    }
    response.body(Bytes::from_static(PIXEL_GIF))
}
