use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::import_model::ImportRecipientsRequest;
use crate::services::import_service::ImportService;

/// POST /api/campaigns/{id}/recipients/import
/// El CSV viaja como base64 dentro del JSON (email,nombre por línea).
pub async fn import_recipients_endpoint(
    import_service: web::Data<ImportService>,
    path: web::Path<String>,
    body: web::Json<ImportRecipientsRequest>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    let req = body.into_inner();

    log::info!(
        "(import_recipients) Campaña {}: archivo '{}' ({} bytes).",
        campaign_id,
        req.file_name,
        req.content.len()
    );

    match import_service.import_csv(&campaign_id, &req.content).await {
        Ok(summary) => HttpResponse::Ok().json(json!({
            "success": true,
            "valid": summary.valid,
            "invalid": summary.invalid,
            "duplicates": summary.duplicates
        })),
        Err(e) => {
            log::error!("Import error for {}: {}", campaign_id, e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}
