use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite};

use crate::config::campaign_config::CampaignGlobalConfig;
use crate::logger::init_logger;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::delivery_service::DeliveryService;
use crate::services::import_service::ImportService;
use crate::services::mailer::{MailTransport, SmtpMailer};
use crate::services::recipient_service::RecipientService;
use crate::services::report_service::ReportService;
use crate::services::scheduler_service::SchedulerService;
use crate::services::task_queue::{SendWorker, SqliteTaskQueue, TaskQueue};
use crate::services::tracking_service::TrackingService;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database() -> Pool<Sqlite> {
    // 1) Crear carpeta "data"
    std::fs::create_dir_all("data").expect("No se pudo crear directorio 'data'");

    // 2) Ruta final: ./data/campaigns.db
    let db_path = std::env::current_dir()
        .expect("No se pudo obtener el current_dir")
        .join("data")
        .join("campaigns.db");

    log::info!("Conectando a SQLite en {}", db_path.to_string_lossy());

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);

    Pool::<Sqlite>::connect_with(options)
        .await
        .expect("No se pudo conectar a la base de datos SQLite.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let campaign_config = CampaignGlobalConfig::from_env();

    // Conectarnos a la DB
    let db_pool = setup_database().await;

    // CampaignService corre las migraciones de todas las tablas
    let campaign_service = CampaignService::new(db_pool.clone());
    if let Err(e) = campaign_service.run_migrations().await {
        panic!("Fallo en migraciones: {:?}", e);
    }

    let recipient_service = RecipientService::new(db_pool.clone());
    let contact_service = ContactService::new(db_pool.clone());

    let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(db_pool.clone()));

    let scheduler_service = SchedulerService::new(
        campaign_service.clone(),
        recipient_service.clone(),
        queue.clone(),
        campaign_config.clone(),
    );

    // Transporte SMTP real desde el entorno
    let transport: Arc<dyn MailTransport> = Arc::new(
        SmtpMailer::from_env(&campaign_config.sender_name, &campaign_config.sender_email)
            .expect("No se pudo inicializar el transporte SMTP"),
    );

    let delivery_service = DeliveryService::new(
        db_pool.clone(),
        campaign_service.clone(),
        recipient_service.clone(),
        contact_service.clone(),
        scheduler_service.clone(),
        queue.clone(),
        transport,
        campaign_config.clone(),
    );

    let import_service = ImportService::new(
        campaign_service.clone(),
        recipient_service.clone(),
        contact_service.clone(),
    );
    let report_service = ReportService::new(db_pool.clone(), contact_service.clone());
    let tracking_service = TrackingService::new(
        db_pool.clone(),
        contact_service.clone(),
        recipient_service.clone(),
        scheduler_service.clone(),
    );

    // Worker de envíos: procesa las tasks vencidas cada segundo
    let worker = SendWorker::new(queue.clone(), delivery_service.clone());
    tokio::spawn(worker.run());

    // Levantar servidor
    log::info!("Levantando servidor en 0.0.0.0:5023");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(scheduler_service.clone()))
            .app_data(web::Data::new(import_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .app_data(web::Data::new(tracking_service.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind(("0.0.0.0", 5023))?
    .run()
    .await
}
