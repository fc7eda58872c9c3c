//! services/campaign_service.rs
//! CRUD de campañas y transiciones de estado con guardas.

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::models::campaign_model::{
    CampaignProgress, CampaignRecord, CampaignStatus, CampaignSummary, CreateCampaignRequest,
    CreateCampaignResponse, ListCampaignsResponse,
};

#[derive(Debug, Clone)]
pub struct CampaignService {
    db_pool: Pool<Sqlite>,
}

impl CampaignService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CampaignService { db_pool }
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run campaign service migrations")?;
        Ok(())
    }

    /// Crea la campaña en DB con estado "draft"
    pub async fn create_campaign(
        &self,
        req: CreateCampaignRequest,
    ) -> Result<CreateCampaignResponse> {
        let campaign_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, subject, preheader, body_template,
                status, total_recipients, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, 'draft', 0, ?5, ?5)
            "#,
        )
        .bind(&campaign_id)
        .bind(&req.subject)
        .bind(&req.preheader)
        .bind(&req.body_template)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar campaña")?;

        Ok(CreateCampaignResponse {
            id: campaign_id,
            message: "Campaña creada".to_string(),
        })
    }

    /// Obtiene la campaña completa o error si no existe
    pub async fn get_campaign(&self, campaign_id: &str) -> Result<CampaignRecord> {
        let row = sqlx::query(
            r#"
            SELECT id, subject, preheader, body_template,
                   status, total_recipients, created_at, updated_at
            FROM campaigns
            WHERE id = ?1
            "#,
        )
        .bind(campaign_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Campaign not found")?;

        Ok(CampaignRecord {
            id: row.get("id"),
            subject: row.get("subject"),
            preheader: row.get("preheader"),
            body_template: row.get("body_template"),
            status: CampaignStatus::from_str(row.get::<String, _>("status").as_str())?,
            total_recipients: row.get("total_recipients"),
            created_at: row.get::<String, _>("created_at").parse()?,
            updated_at: row.get::<String, _>("updated_at").parse()?,
        })
    }

    pub async fn get_status(&self, campaign_id: &str) -> Result<CampaignStatus> {
        let row = sqlx::query(r#"SELECT status FROM campaigns WHERE id = ?1"#)
            .bind(campaign_id)
            .fetch_one(&self.db_pool)
            .await
            .context("Campaign not found")?;
        CampaignStatus::from_str(row.get::<String, _>("status").as_str())
    }

    /// Transición de estado con guarda: solo aplica si el estado actual
    /// está dentro de `expected_from`. Devuelve error si no.
    pub async fn transition_status(
        &self,
        campaign_id: &str,
        expected_from: &[CampaignStatus],
        to: CampaignStatus,
    ) -> Result<()> {
        let current = self.get_status(campaign_id).await?;
        if !expected_from.contains(&current) {
            return Err(anyhow!(
                "Transición inválida: la campaña {campaign_id} está '{current}', no se puede pasar a '{to}'"
            ));
        }
        self.set_status(campaign_id, to).await
    }

    pub async fn set_status(&self, campaign_id: &str, status: CampaignStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(r#"UPDATE campaigns SET status = ?1, updated_at = ?2 WHERE id = ?3"#)
            .bind(status.as_str())
            .bind(&now)
            .bind(campaign_id)
            .execute(&self.db_pool)
            .await
            .context("Fallo al actualizar estado de campaña")?;
        Ok(())
    }

    /// total_recipients se fija en el import y no se recalcula en vuelo.
    pub async fn set_total_recipients(&self, campaign_id: &str, total: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"UPDATE campaigns SET total_recipients = ?1, updated_at = ?2 WHERE id = ?3"#,
        )
        .bind(total)
        .bind(&now)
        .bind(campaign_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar total_recipients")?;
        Ok(())
    }

    /// Conteos por estado para progreso/completion.
    pub async fn progress(&self, campaign_id: &str) -> Result<CampaignProgress> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) as cnt
            FROM recipients
            WHERE campaign_id = ?1
            GROUP BY status
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.db_pool)
        .await?;

        let total_row = sqlx::query(r#"SELECT total_recipients FROM campaigns WHERE id = ?1"#)
            .bind(campaign_id)
            .fetch_one(&self.db_pool)
            .await
            .context("Campaign not found")?;

        let mut progress = CampaignProgress {
            total: total_row.get("total_recipients"),
            ..Default::default()
        };

        for row in rows {
            let status: String = row.get("status");
            let cnt: i64 = row.get("cnt");
            match status.as_str() {
                "pending" => progress.pending = cnt,
                "sent" => progress.sent = cnt,
                "failed" => progress.failed = cnt,
                "retrying" => progress.retrying = cnt,
                "bounced" => progress.bounced = cnt,
                "skipped_unsubscribed" => progress.skipped_unsubscribed = cnt,
                _ => {}
            }
        }

        Ok(progress)
    }

    /// Lista campañas con paginación
    pub async fn list_campaigns(&self, page: u64, page_size: u64) -> Result<ListCampaignsResponse> {
        let offset = (page.saturating_sub(1)) * page_size;
        let page_size_i64 = page_size as i64;
        let offset_i64 = offset as i64;

        // total
        let total_row = sqlx::query("SELECT COUNT(*) as cnt FROM campaigns")
            .fetch_one(&self.db_pool)
            .await?;
        let total = total_row.get::<i64, _>("cnt") as u64;

        // items
        let rows = sqlx::query(
            r#"
            SELECT id, subject, status, total_recipients, created_at
            FROM campaigns
            ORDER BY created_at DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page_size_i64)
        .bind(offset_i64)
        .fetch_all(&self.db_pool)
        .await?;

        let mut items = Vec::new();
        for r in rows {
            items.push(CampaignSummary {
                id: r.get("id"),
                subject: r.get("subject"),
                status: CampaignStatus::from_str(r.get::<String, _>("status").as_str())?,
                total_recipients: r.get("total_recipients"),
                created_at: r.get("created_at"),
            });
        }

        Ok(ListCampaignsResponse {
            total,
            page,
            page_size,
            items,
        })
    }
}
