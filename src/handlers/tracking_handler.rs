use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::delivery_log_model::BounceEventRequest;
use crate::services::tracking_service::TrackingService;

/// GIF transparente de 1×1 para el pixel de apertura.
const TRACKING_PIXEL: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// GET /api/track/open/{log_id}
/// Sin auth por diseño: es el fetch del pixel. Pase lo que pase se
/// responde la imagen; el lado servidor solo anota la primera apertura.
pub async fn open_tracking_endpoint(
    tracking_service: web::Data<TrackingService>,
    path: web::Path<i64>,
) -> HttpResponse {
    let log_id = path.into_inner();

    if let Err(e) = tracking_service.record_open(log_id).await {
        log::error!("Open tracking error for log {}: {}", log_id, e);
    }

    HttpResponse::Ok()
        .content_type("image/gif")
        .append_header(("Cache-Control", "no-store, no-cache, must-revalidate"))
        .body(TRACKING_PIXEL)
}

/// POST /api/track/bounce
pub async fn bounce_webhook_endpoint(
    tracking_service: web::Data<TrackingService>,
    body: web::Json<BounceEventRequest>,
) -> HttpResponse {
    let event = body.into_inner();
    log::info!(
        "(bounce_webhook) email={}, campaign_id={}, event='{}'",
        event.email,
        event.campaign_id,
        event.event
    );

    match tracking_service
        .record_bounce(&event.email, &event.campaign_id)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true })),
        Err(e) => {
            log::error!("Bounce webhook error: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub email: String,
}

/// GET /api/track/unsubscribe?email=<base64 urlencoded>
pub async fn unsubscribe_endpoint(
    tracking_service: web::Data<TrackingService>,
    query: web::Query<UnsubscribeQuery>,
) -> HttpResponse {
    match tracking_service.unsubscribe(&query.email).await {
        Ok(email) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(format!(
            "<html><body><h1>Unsubscribed</h1><p>{email} will not receive further emails.</p></body></html>"
        )),
        Err(e) => {
            log::warn!("Unsubscribe error: {}", e);
            HttpResponse::BadRequest()
                .content_type("text/html; charset=utf-8")
                .body("<html><body><h1>Invalid unsubscribe link</h1></body></html>")
        }
    }
}
