//! app.rs
use crate::handlers::{campaign_handler, import_handler, report_handler, tracking_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::post().to(campaign_handler::create_campaign_endpoint),
                    )
                    .route("", web::get().to(campaign_handler::list_campaigns_endpoint))
                    .route(
                        "/{id}",
                        web::get().to(campaign_handler::get_campaign_endpoint),
                    )
                    .route(
                        "/{id}/publish",
                        web::post().to(campaign_handler::publish_campaign_endpoint),
                    )
                    .route(
                        "/{id}/pause",
                        web::post().to(campaign_handler::pause_campaign_endpoint),
                    )
                    .route(
                        "/{id}/resume",
                        web::post().to(campaign_handler::resume_campaign_endpoint),
                    )
                    .route(
                        "/{id}/cancel",
                        web::post().to(campaign_handler::cancel_campaign_endpoint),
                    )
                    .route(
                        "/{id}/recipients/import",
                        web::post().to(import_handler::import_recipients_endpoint),
                    )
                    .route(
                        "/{id}/report",
                        web::get().to(report_handler::campaign_report_endpoint),
                    )
                    .route(
                        "/{id}/report/export",
                        web::get().to(report_handler::export_report_endpoint),
                    ),
            )
            .service(
                web::scope("/contacts")
                    .route("/export", web::get().to(report_handler::export_contacts_endpoint)),
            )
            .service(
                web::scope("/track")
                    .route(
                        "/open/{log_id}",
                        web::get().to(tracking_handler::open_tracking_endpoint),
                    )
                    .route(
                        "/bounce",
                        web::post().to(tracking_handler::bounce_webhook_endpoint),
                    )
                    .route(
                        "/unsubscribe",
                        web::get().to(tracking_handler::unsubscribe_endpoint),
                    ),
            ),
    );
}
