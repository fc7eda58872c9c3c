//! services/delivery_service.rs
//! Motor de entrega: un intento de envío por task, con log, supresión,
//! personalización y reintento acotado.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::{Pool, Row, Sqlite};

use crate::config::campaign_config::CampaignGlobalConfig;
use crate::models::campaign_model::{CampaignRecord, CampaignStatus};
use crate::models::delivery_log_model::DeliveryStatus;
use crate::models::recipient_model::{RecipientRecord, RecipientStatus};
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::mailer::MailTransport;
use crate::services::recipient_service::RecipientService;
use crate::services::scheduler_service::SchedulerService;
use crate::services::task_queue::{SendTask, TaskQueue};

#[derive(Clone)]
pub struct DeliveryService {
    db_pool: Pool<Sqlite>,
    campaigns: CampaignService,
    recipients: RecipientService,
    contacts: ContactService,
    scheduler: SchedulerService,
    queue: Arc<dyn TaskQueue>,
    transport: Arc<dyn MailTransport>,
    config: CampaignGlobalConfig,
}

impl DeliveryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: Pool<Sqlite>,
        campaigns: CampaignService,
        recipients: RecipientService,
        contacts: ContactService,
        scheduler: SchedulerService,
        queue: Arc<dyn TaskQueue>,
        transport: Arc<dyn MailTransport>,
        config: CampaignGlobalConfig,
    ) -> Self {
        DeliveryService {
            db_pool,
            campaigns,
            recipients,
            contacts,
            scheduler,
            queue,
            transport,
            config,
        }
    }

    /// Ejecuta un intento de envío. Idempotente por recipient: si la task
    /// llega duplicada o tardía, las guardas de estado la convierten en no-op.
    pub async fn process_task(&self, task: &SendTask) -> Result<()> {
        // 1) Re-chequeo del estado de campaña AL EJECUTAR, no al encolar:
        //    una task puede quedar en cola a través de una pausa.
        let campaign = self.campaigns.get_campaign(&task.campaign_id).await?;
        if campaign.status != CampaignStatus::InProgress {
            log::info!(
                "(process_task) Campaña {} está '{}', se omite el envío al recipient {}.",
                task.campaign_id,
                campaign.status,
                task.recipient_id
            );
            return Ok(());
        }

        // 2) El recipient tiene que existir y estar en un estado enviable.
        let Some(recipient) = self
            .recipients
            .get_recipient(&task.campaign_id, task.recipient_id)
            .await?
        else {
            log::warn!(
                "(process_task) Recipient {} no existe para la campaña {}.",
                task.recipient_id,
                task.campaign_id
            );
            return Ok(());
        };
        if !recipient.status.is_sendable() {
            log::info!(
                "(process_task) Recipient {} ya está '{}', no se reenvía.",
                recipient.id,
                recipient.status
            );
            return Ok(());
        }

        // 3) Supresión global: unsubscribed/bounced nunca reciben el envío.
        if let Some(contact_status) = self.contacts.get_status(&recipient.email).await? {
            if contact_status.is_suppressed() {
                log::info!(
                    "(process_task) {} está '{}' en el registro de contactos, marcando skipped.",
                    recipient.email,
                    contact_status
                );
                self.recipients
                    .set_status(recipient.id, RecipientStatus::SkippedUnsubscribed)
                    .await?;
                self.scheduler.check_completion(&task.campaign_id).await?;
                return Ok(());
            }
        }

        // 4-6) Render + transmisión.
        let subject = replace_tokens(&campaign.subject, &recipient);
        let body = self.render_body(&campaign, &recipient);

        let sent = self
            .transport
            .deliver(&recipient.email, &recipient.name, &subject, &body)
            .await;

        match sent {
            Ok(()) => {
                let attempts = self
                    .record_attempt(&campaign.id, &recipient, DeliveryStatus::Sent)
                    .await?;
                self.recipients
                    .set_status(recipient.id, RecipientStatus::Sent)
                    .await?;
                log::info!(
                    "(process_task) Enviado a {} (campaña {}, intento {}).",
                    recipient.email,
                    campaign.id,
                    attempts
                );
            }
            Err(e) => {
                self.handle_failure(&campaign.id, &recipient, e).await?;
            }
        }

        // 9) Chequeo reactivo de completitud tras cada intento.
        self.scheduler.check_completion(&task.campaign_id).await?;
        Ok(())
    }

    /// Fallo transitorio: reintento con backoff fijo hasta max_attempts,
    /// después `failed` terminal.
    async fn handle_failure(
        &self,
        campaign_id: &str,
        recipient: &RecipientRecord,
        error: anyhow::Error,
    ) -> Result<()> {
        let attempts = self.last_attempt_count(recipient.id).await? + 1;

        if attempts < self.config.max_attempts {
            self.write_attempt(campaign_id, recipient, DeliveryStatus::Retrying, attempts)
                .await?;
            self.recipients
                .set_status(recipient.id, RecipientStatus::Retrying)
                .await?;
            let run_at = Utc::now() + Duration::seconds(self.config.retry_backoff_seconds);
            self.queue
                .enqueue(campaign_id, recipient.id, run_at)
                .await
                .context("No se pudo agendar el reintento")?;
            log::warn!(
                "(handle_failure) Fallo al enviar a {} (intento {}): {:?}. Reintento agendado.",
                recipient.email,
                attempts,
                error
            );
        } else {
            self.write_attempt(campaign_id, recipient, DeliveryStatus::Failed, attempts)
                .await?;
            self.recipients
                .set_status(recipient.id, RecipientStatus::Failed)
                .await?;
            log::error!(
                "(handle_failure) Máximo de intentos alcanzado para {} (campaña {}): {:?}",
                recipient.email,
                campaign_id,
                error
            );
        }
        Ok(())
    }

    /// Registra el intento actual en el log y devuelve el attempt_count
    /// resultante (monótono a través de los reintentos).
    async fn record_attempt(
        &self,
        campaign_id: &str,
        recipient: &RecipientRecord,
        status: DeliveryStatus,
    ) -> Result<i64> {
        let attempts = self.last_attempt_count(recipient.id).await? + 1;
        self.write_attempt(campaign_id, recipient, status, attempts)
            .await?;
        Ok(attempts)
    }

    async fn last_attempt_count(&self, recipient_id: i64) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT attempt_count FROM delivery_log
            WHERE recipient_id = ?1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(recipient_id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(row.map(|r| r.get::<i64, _>("attempt_count")).unwrap_or(0))
    }

    /// Una fila de log por recipient; los reintentos actualizan la misma
    /// fila subiendo attempt_count.
    async fn write_attempt(
        &self,
        campaign_id: &str,
        recipient: &RecipientRecord,
        status: DeliveryStatus,
        attempts: i64,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = sqlx::query(
            r#"
            UPDATE delivery_log
            SET status = ?1, attempt_count = ?2, sent_at = ?3
            WHERE recipient_id = ?4 AND campaign_id = ?5
            "#,
        )
        .bind(status.as_str())
        .bind(attempts)
        .bind(&now)
        .bind(recipient.id)
        .bind(campaign_id)
        .execute(&self.db_pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO delivery_log (
                    campaign_id, recipient_id, email, status, attempt_count, sent_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(campaign_id)
            .bind(recipient.id)
            .bind(&recipient.email)
            .bind(status.as_str())
            .bind(attempts)
            .bind(&now)
            .execute(&self.db_pool)
            .await
            .context("Fallo al insertar en delivery_log")?;
        }
        Ok(())
    }

    /// Cuerpo final: preheader oculto + template personalizado + link de
    /// unsubscribe + dirección física (CAN-SPAM, no opcional).
    fn render_body(&self, campaign: &CampaignRecord, recipient: &RecipientRecord) -> String {
        let content = replace_tokens(&campaign.body_template, recipient);
        let preheader = replace_tokens(&campaign.preheader, recipient);
        let unsubscribe_url = self.unsubscribe_url(&recipient.email);

        format!(
            r#"<div style="font-family: Arial, sans-serif; line-height: 1.6;">
<span style="display:none; max-height:0; overflow:hidden;">{preheader}</span>
{content}
<p style="font-size: 10px; color: #888; margin-top: 20px;">
This email was sent to {email}. <a href="{unsubscribe_url}" style="color: #0073aa;">Unsubscribe</a> from future emails.<br/>
{address}
</p>
</div>"#,
            preheader = preheader,
            content = content,
            email = recipient.email,
            unsubscribe_url = unsubscribe_url,
            address = self.config.physical_address,
        )
    }

    fn unsubscribe_url(&self, email: &str) -> String {
        let token = urlencoding::encode(&base64::encode(email)).into_owned();
        format!(
            "{}/api/track/unsubscribe?email={}",
            self.config.base_url, token
        )
    }
}

/// Sustitución de tokens de personalización: {name}/{NAME} y
/// {email}/{EMAIL}. Los tokens sin dato quedan tal cual (contrato de
/// sustitución, no un error).
pub fn replace_tokens(content: &str, recipient: &RecipientRecord) -> String {
    content
        .replace("{name}", &recipient.name)
        .replace("{NAME}", &recipient.name)
        .replace("{email}", &recipient.email)
        .replace("{EMAIL}", &recipient.email)
}
