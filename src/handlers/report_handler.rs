use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::services::report_service::ReportService;

/// GET /api/campaigns/{id}/report
pub async fn campaign_report_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    match report_service.campaign_report(&campaign_id).await {
        Ok(rows) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_id": campaign_id,
            "rows": rows
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/campaigns/{id}/report/export
pub async fn export_report_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    match report_service.campaign_report_csv(&campaign_id).await {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .append_header((
                "Content-Disposition",
                format!("attachment; filename=\"campaign_report_{campaign_id}.csv\""),
            ))
            .body(csv),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/contacts/export
pub async fn export_contacts_endpoint(
    report_service: web::Data<ReportService>,
) -> HttpResponse {
    match report_service.contacts_csv().await {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .append_header((
                "Content-Disposition",
                "attachment; filename=\"contacts.csv\"",
            ))
            .body(csv),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}
