//! services/tracking_service.rs
//! Ingesta de señales externas: apertura (pixel), rebote (webhook del
//! proveedor) y unsubscribe. Mutaciones chicas sobre log/contactos.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::contact_model::ContactStatus;
use crate::services::contact_service::ContactService;
use crate::services::recipient_service::RecipientService;
use crate::services::scheduler_service::SchedulerService;

#[derive(Clone)]
pub struct TrackingService {
    db_pool: Pool<Sqlite>,
    contacts: ContactService,
    recipients: RecipientService,
    scheduler: SchedulerService,
}

impl TrackingService {
    pub fn new(
        db_pool: Pool<Sqlite>,
        contacts: ContactService,
        recipients: RecipientService,
        scheduler: SchedulerService,
    ) -> Self {
        TrackingService {
            db_pool,
            contacts,
            recipients,
            scheduler,
        }
    }

    /// Apertura por pixel. Idempotente: gana el primer opened_at, los hits
    /// repetidos no lo pisan ni fallan.
    pub async fn record_open(&self, log_id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE delivery_log
            SET opened_at = ?1, status = 'opened'
            WHERE id = ?2 AND opened_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(log_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al registrar apertura")?;
        Ok(())
    }

    /// Rebote del proveedor: suprime el contacto a nivel global (pegajoso,
    /// cruza campañas) y marca rebotado el recipient/log de la campaña
    /// señalada. Otras campañas con ese email se resuelven solas al
    /// momento del envío vía la supresión.
    pub async fn record_bounce(&self, email: &str, campaign_id: &str) -> Result<()> {
        let email = email.trim().to_lowercase();

        self.contacts
            .ensure_suppressed(&email, ContactStatus::Bounced)
            .await?;

        let flipped = self.recipients.mark_bounced(campaign_id, &email).await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE delivery_log
            SET bounced_at = ?1, status = 'bounced'
            WHERE campaign_id = ?2 AND email = ?3 AND bounced_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(campaign_id)
        .bind(&email)
        .execute(&self.db_pool)
        .await
        .context("Fallo al registrar rebote en el log")?;

        log::info!(
            "(record_bounce) {} rebotó (campaña {}), recipient actualizado: {}.",
            email,
            campaign_id,
            flipped
        );

        // Un rebote puede ser el último estado que faltaba para cerrar.
        self.scheduler.check_completion(campaign_id).await?;
        Ok(())
    }

    /// Unsubscribe desde el link del pie de página. El token es el email
    /// en base64 (urlencoded en tránsito).
    pub async fn unsubscribe(&self, token: &str) -> Result<String> {
        let decoded = base64::decode(token).context("Token de unsubscribe inválido")?;
        let email = String::from_utf8(decoded)
            .context("Token de unsubscribe inválido")?
            .trim()
            .to_lowercase();

        self.contacts
            .ensure_suppressed(&email, ContactStatus::Unsubscribed)
            .await?;
        log::info!("(unsubscribe) {} dado de baja.", email);
        Ok(email)
    }
}
