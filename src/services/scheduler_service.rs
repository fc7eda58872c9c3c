//! services/scheduler_service.rs
//! La máquina de estados de la campaña: publish, pause, resume, cancel y
//! el chequeo reactivo de completitud.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use crate::config::campaign_config::CampaignGlobalConfig;
use crate::models::campaign_model::CampaignStatus;
use crate::services::campaign_service::CampaignService;
use crate::services::recipient_service::RecipientService;
use crate::services::task_queue::TaskQueue;

#[derive(Clone)]
pub struct SchedulerService {
    campaigns: CampaignService,
    recipients: RecipientService,
    queue: Arc<dyn TaskQueue>,
    config: CampaignGlobalConfig,
}

impl SchedulerService {
    pub fn new(
        campaigns: CampaignService,
        recipients: RecipientService,
        queue: Arc<dyn TaskQueue>,
        config: CampaignGlobalConfig,
    ) -> Self {
        SchedulerService {
            campaigns,
            recipients,
            queue,
            config,
        }
    }

    /// draft → in_progress, una sola vez. Encola una task por recipient
    /// pendiente con delay k·Δ en orden estable por id.
    ///
    /// Si el encolado falla, la campaña vuelve a draft y el error sube al
    /// operador: nunca queda `in_progress` sin tasks confirmadas.
    pub async fn publish(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.campaigns
            .transition_status(campaign_id, &[CampaignStatus::Draft], CampaignStatus::InProgress)
            .await?;

        match self.enqueue_sendable(campaign_id).await {
            Ok(0) => {
                // Sin pendientes: campaña vacía o ya resuelta.
                log::info!(
                    "(publish) Campaña {} sin recipients pendientes, marcando completed.",
                    campaign_id
                );
                self.campaigns
                    .set_status(campaign_id, CampaignStatus::Completed)
                    .await?;
                Ok(CampaignStatus::Completed)
            }
            Ok(n) => {
                log::info!("(publish) Campaña {}: {} envíos agendados.", campaign_id, n);
                Ok(CampaignStatus::InProgress)
            }
            Err(e) => {
                // Rollback: mejor un publish fallido visible que una
                // campaña colgada en in_progress sin nada encolado.
                self.queue.cancel_for_campaign(campaign_id).await.ok();
                self.campaigns
                    .set_status(campaign_id, CampaignStatus::Draft)
                    .await
                    .ok();
                Err(e.context("No se pudo agendar el envío de la campaña"))
            }
        }
    }

    /// in_progress → paused. Cancela las tasks aún no iniciadas; lo que ya
    /// está corriendo termina solo y se frena en el re-chequeo de estado.
    pub async fn pause(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.campaigns
            .transition_status(
                campaign_id,
                &[CampaignStatus::InProgress],
                CampaignStatus::Paused,
            )
            .await?;
        let cancelled = self.queue.cancel_for_campaign(campaign_id).await?;
        log::info!(
            "(pause) Campaña {} pausada, {} tasks canceladas.",
            campaign_id,
            cancelled
        );
        Ok(CampaignStatus::Paused)
    }

    /// paused → in_progress. Re-escanea SOLO pending/retrying; nunca
    /// re-encola lo ya enviado, por eso el resume es seguro.
    pub async fn resume(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.campaigns
            .transition_status(
                campaign_id,
                &[CampaignStatus::Paused],
                CampaignStatus::InProgress,
            )
            .await?;

        match self.enqueue_sendable(campaign_id).await {
            Ok(0) => {
                let completed = self.check_completion(campaign_id).await?;
                if completed {
                    Ok(CampaignStatus::Completed)
                } else {
                    Ok(CampaignStatus::InProgress)
                }
            }
            Ok(n) => {
                log::info!("(resume) Campaña {}: {} envíos re-agendados.", campaign_id, n);
                Ok(CampaignStatus::InProgress)
            }
            Err(e) => {
                self.queue.cancel_for_campaign(campaign_id).await.ok();
                self.campaigns
                    .set_status(campaign_id, CampaignStatus::Paused)
                    .await
                    .ok();
                Err(e.context("No se pudo re-agendar la campaña"))
            }
        }
    }

    /// in_progress|paused → cancelled. Terminal, sin vuelta.
    pub async fn cancel(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.campaigns
            .transition_status(
                campaign_id,
                &[CampaignStatus::InProgress, CampaignStatus::Paused],
                CampaignStatus::Cancelled,
            )
            .await?;
        let cancelled = self.queue.cancel_for_campaign(campaign_id).await?;
        log::info!(
            "(cancel) Campaña {} cancelada, {} tasks removidas.",
            campaign_id,
            cancelled
        );
        Ok(CampaignStatus::Cancelled)
    }

    /// Se corre después de cada intento de entrega. La campaña completa
    /// cuando todos los recipients quedaron en un estado terminal contado
    /// (sent + failed + skipped_unsubscribed + bounced ≥ total).
    pub async fn check_completion(&self, campaign_id: &str) -> Result<bool> {
        let campaign = self.campaigns.get_campaign(campaign_id).await?;
        if campaign.status != CampaignStatus::InProgress {
            return Ok(false);
        }

        let terminal = self.recipients.count_terminal(campaign_id).await?;
        if campaign.total_recipients > 0 && terminal >= campaign.total_recipients {
            self.campaigns
                .set_status(campaign_id, CampaignStatus::Completed)
                .await?;
            // Limpieza defensiva de tasks huérfanas.
            let leftover = self.queue.cancel_for_campaign(campaign_id).await?;
            log::info!(
                "(check_completion) Campaña {} completada ({} terminales de {}), {} tasks sobrantes canceladas.",
                campaign_id,
                terminal,
                campaign.total_recipients,
                leftover
            );
            return Ok(true);
        }
        Ok(false)
    }

    /// Encola una task por recipient enviable, con delay k·Δ desde ahora.
    /// El ritmo fijo hace el plan determinista y recomputable en resume.
    async fn enqueue_sendable(&self, campaign_id: &str) -> Result<usize> {
        let sendable = self
            .recipients
            .list_sendable(campaign_id)
            .await
            .context("No se pudieron leer los recipients pendientes")?;

        let now = Utc::now();
        for (k, recipient) in sendable.iter().enumerate() {
            let run_at = now + Duration::seconds(k as i64 * self.config.pacing_seconds);
            self.queue
                .enqueue(campaign_id, recipient.id, run_at)
                .await
                .context("El servicio de tasks rechazó el encolado")?;
        }
        Ok(sendable.len())
    }
}
