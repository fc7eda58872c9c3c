//! tests/helpers.rs
//! Armado común de los tests: DB en memoria, transporte stub y el wiring
//! completo de servicios.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};

use crate::config::campaign_config::CampaignGlobalConfig;
use crate::models::campaign_model::CreateCampaignRequest;
use crate::models::import_model::ImportSummary;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::delivery_service::DeliveryService;
use crate::services::import_service::ImportService;
use crate::services::mailer::MailTransport;
use crate::services::recipient_service::RecipientService;
use crate::services::report_service::ReportService;
use crate::services::scheduler_service::SchedulerService;
use crate::services::task_queue::{SendWorker, SqliteTaskQueue, TaskQueue};
use crate::services::tracking_service::TrackingService;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
}

/// Transporte de mentira: captura lo enviado y permite guionar fallos
/// por destinatario (N fallos y después éxito).
#[derive(Default)]
pub struct StubTransport {
    sent: Mutex<Vec<SentMail>>,
    failures: Mutex<HashMap<String, u32>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(StubTransport::default())
    }

    /// Los próximos `times` envíos a `email` fallan con un error transitorio.
    pub fn fail_times(&self, email: &str, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(email.to_string(), times);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for StubTransport {
    async fn deliver(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<()> {
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(to_email) {
                if *left > 0 {
                    *left -= 1;
                    return Err(anyhow!("SMTP 451: fallo transitorio (stub)"));
                }
            }
        }
        self.sent.lock().unwrap().push(SentMail {
            to_email: to_email.to_string(),
            to_name: to_name.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

/// Todos los servicios cableados sobre una misma DB en memoria.
pub struct TestEnv {
    pub pool: Pool<Sqlite>,
    pub campaigns: CampaignService,
    pub recipients: RecipientService,
    pub contacts: ContactService,
    pub queue: Arc<dyn TaskQueue>,
    pub scheduler: SchedulerService,
    pub import: ImportService,
    pub tracking: TrackingService,
    pub reports: ReportService,
    pub worker: SendWorker,
    pub transport: Arc<StubTransport>,
    pub config: CampaignGlobalConfig,
}

pub async fn setup() -> TestEnv {
    // Una sola conexión: con :memory:, cada conexión del pool sería una
    // DB distinta.
    let options =
        SqliteConnectOptions::from_str("sqlite::memory:").expect("Opciones SQLite inválidas");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("No se pudo abrir la DB en memoria");

    let campaigns = CampaignService::new(pool.clone());
    campaigns
        .run_migrations()
        .await
        .expect("Fallo en migraciones de test");

    let recipients = RecipientService::new(pool.clone());
    let contacts = ContactService::new(pool.clone());
    let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(pool.clone()));
    let config = CampaignGlobalConfig::default();

    let scheduler = SchedulerService::new(
        campaigns.clone(),
        recipients.clone(),
        queue.clone(),
        config.clone(),
    );

    let transport = StubTransport::new();
    let delivery = DeliveryService::new(
        pool.clone(),
        campaigns.clone(),
        recipients.clone(),
        contacts.clone(),
        scheduler.clone(),
        queue.clone(),
        transport.clone(),
        config.clone(),
    );

    let import = ImportService::new(campaigns.clone(), recipients.clone(), contacts.clone());
    let tracking = TrackingService::new(
        pool.clone(),
        contacts.clone(),
        recipients.clone(),
        scheduler.clone(),
    );
    let reports = ReportService::new(pool.clone(), contacts.clone());
    let worker = SendWorker::new(queue.clone(), delivery);

    TestEnv {
        pool,
        campaigns,
        recipients,
        contacts,
        queue,
        scheduler,
        import,
        tracking,
        reports,
        worker,
        transport,
        config,
    }
}

pub async fn draft_campaign(env: &TestEnv, subject: &str, body_template: &str) -> String {
    env.campaigns
        .create_campaign(CreateCampaignRequest {
            subject: subject.to_string(),
            preheader: "Preview text".to_string(),
            body_template: body_template.to_string(),
        })
        .await
        .expect("No se pudo crear la campaña")
        .id
}

pub async fn import_lines(env: &TestEnv, campaign_id: &str, csv: &str) -> ImportSummary {
    env.import
        .import_csv(campaign_id, csv.as_bytes())
        .await
        .expect("Fallo el import de test")
}

pub async fn recipient_status(env: &TestEnv, campaign_id: &str, email: &str) -> String {
    sqlx::query(r#"SELECT status FROM recipients WHERE campaign_id = ?1 AND email = ?2"#)
        .bind(campaign_id)
        .bind(email)
        .fetch_one(&env.pool)
        .await
        .expect("Recipient no encontrado")
        .get("status")
}

/// (status, attempt_count, opened_at, bounced_at) de la fila de log, si hay.
pub async fn log_entry(
    env: &TestEnv,
    campaign_id: &str,
    email: &str,
) -> Option<(String, i64, Option<String>, Option<String>)> {
    sqlx::query(
        r#"
        SELECT status, attempt_count, opened_at, bounced_at
        FROM delivery_log
        WHERE campaign_id = ?1 AND email = ?2
        "#,
    )
    .bind(campaign_id)
    .bind(email)
    .fetch_optional(&env.pool)
    .await
    .expect("Fallo leyendo delivery_log")
    .map(|r| {
        (
            r.get("status"),
            r.get("attempt_count"),
            r.get("opened_at"),
            r.get("bounced_at"),
        )
    })
}

pub async fn log_id(env: &TestEnv, campaign_id: &str, email: &str) -> i64 {
    sqlx::query(r#"SELECT id FROM delivery_log WHERE campaign_id = ?1 AND email = ?2"#)
        .bind(campaign_id)
        .bind(email)
        .fetch_one(&env.pool)
        .await
        .expect("Fila de log no encontrada")
        .get("id")
}

pub async fn log_rows_for(env: &TestEnv, campaign_id: &str, email: &str) -> i64 {
    sqlx::query(
        r#"SELECT COUNT(*) as cnt FROM delivery_log WHERE campaign_id = ?1 AND email = ?2"#,
    )
    .bind(campaign_id)
    .bind(email)
    .fetch_one(&env.pool)
    .await
    .expect("Fallo contando filas de log")
    .get("cnt")
}
