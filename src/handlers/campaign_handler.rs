use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::campaign_model::CreateCampaignRequest;
use crate::services::campaign_service::CampaignService;
use crate::services::scheduler_service::SchedulerService;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// POST /api/campaigns
pub async fn create_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<CreateCampaignRequest>,
) -> HttpResponse {
    match campaign_service.create_campaign(body.into_inner()).await {
        Ok(resp) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_id": resp.id,
            "message": resp.message
        })),
        Err(e) => {
            log::error!("Campaign create error: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// GET /api/campaigns
pub async fn list_campaigns_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    match campaign_service.list_campaigns(page, page_size).await {
        Ok(resp) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaigns": resp
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();

    let campaign = match campaign_service.get_campaign(&campaign_id).await {
        Ok(c) => c,
        Err(e) => return not_found_or_error(e),
    };
    match campaign_service.progress(&campaign_id).await {
        Ok(progress) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign": campaign,
            "progress": progress
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// POST /api/campaigns/{id}/publish
pub async fn publish_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    match scheduler.publish(&campaign_id).await {
        Ok(status) => HttpResponse::Ok().json(json!({
            "success": true,
            "status": status,
            "message": "Campaign sending started"
        })),
        Err(e) => {
            log::error!("Publish error for {}: {}", campaign_id, e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// POST /api/campaigns/{id}/pause
pub async fn pause_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    match scheduler.pause(&campaign_id).await {
        Ok(status) => HttpResponse::Ok().json(json!({ "success": true, "status": status })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// POST /api/campaigns/{id}/resume
pub async fn resume_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    match scheduler.resume(&campaign_id).await {
        Ok(status) => HttpResponse::Ok().json(json!({ "success": true, "status": status })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// POST /api/campaigns/{id}/cancel
pub async fn cancel_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    match scheduler.cancel(&campaign_id).await {
        Ok(status) => HttpResponse::Ok().json(json!({ "success": true, "status": status })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

fn not_found_or_error(e: anyhow::Error) -> HttpResponse {
    let status_code = if e.to_string().contains("not found") {
        actix_web::http::StatusCode::NOT_FOUND
    } else {
        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
    };
    HttpResponse::build(status_code).json(json!({
        "success": false,
        "error": e.to_string()
    }))
}
