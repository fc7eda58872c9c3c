//! services/recipient_service.rs
//! Ledger de recipients por campaña: el scheduler trabaja sobre esta tabla.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::models::recipient_model::{RecipientRecord, RecipientStatus};

#[derive(Debug, Clone)]
pub struct RecipientService {
    db_pool: Pool<Sqlite>,
}

impl RecipientService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        RecipientService { db_pool }
    }

    /// Inserta el recipient solo si (campaign_id, email) no existe todavía.
    /// Devuelve `false` cuando era duplicado dentro de la campaña.
    pub async fn insert_if_absent(
        &self,
        campaign_id: &str,
        email: &str,
        name: &str,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO recipients (campaign_id, email, name, status, created_at)
            VALUES (?1, ?2, ?3, 'pending', ?4)
            "#,
        )
        .bind(campaign_id)
        .bind(email)
        .bind(name)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar recipient")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_recipient(
        &self,
        campaign_id: &str,
        recipient_id: i64,
    ) -> Result<Option<RecipientRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, campaign_id, email, name, status, created_at
            FROM recipients
            WHERE id = ?1 AND campaign_id = ?2
            "#,
        )
        .bind(recipient_id)
        .bind(campaign_id)
        .fetch_optional(&self.db_pool)
        .await?;

        match row {
            Some(r) => Ok(Some(RecipientRecord {
                id: r.get("id"),
                campaign_id: r.get("campaign_id"),
                email: r.get("email"),
                name: r.get("name"),
                status: RecipientStatus::from_str(r.get::<String, _>("status").as_str())?,
                created_at: r.get("created_at"),
            })),
            None => Ok(None),
        }
    }

    /// Recipients aún enviables de la campaña, en orden estable por id.
    /// El enqueue SIEMPRE parte de este escaneo (nunca de la lista subida),
    /// que es lo que hace seguro el resume.
    pub async fn list_sendable(&self, campaign_id: &str) -> Result<Vec<RecipientRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, campaign_id, email, name, status, created_at
            FROM recipients
            WHERE campaign_id = ?1 AND status IN ('pending', 'retrying')
            ORDER BY id ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut result = Vec::new();
        for r in rows {
            result.push(RecipientRecord {
                id: r.get("id"),
                campaign_id: r.get("campaign_id"),
                email: r.get("email"),
                name: r.get("name"),
                status: RecipientStatus::from_str(r.get::<String, _>("status").as_str())?,
                created_at: r.get("created_at"),
            });
        }
        Ok(result)
    }

    pub async fn set_status(&self, recipient_id: i64, status: RecipientStatus) -> Result<()> {
        sqlx::query(r#"UPDATE recipients SET status = ?1 WHERE id = ?2"#)
            .bind(status.as_str())
            .bind(recipient_id)
            .execute(&self.db_pool)
            .await
            .context("Fallo al actualizar estado de recipient")?;
        Ok(())
    }

    /// Marca `bounced` el recipient de esa campaña/email, solo si su estado
    /// admite la transición (nunca se pisa un estado terminal distinto).
    pub async fn mark_bounced(&self, campaign_id: &str, email: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE recipients
            SET status = 'bounced'
            WHERE campaign_id = ?1 AND email = ?2
              AND status IN ('pending', 'retrying', 'sent')
            "#,
        )
        .bind(campaign_id)
        .bind(email)
        .execute(&self.db_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cuántos recipients ya están en un estado terminal contabilizado
    /// (sent, failed, skipped_unsubscribed, bounced).
    pub async fn count_terminal(&self, campaign_id: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as cnt
            FROM recipients
            WHERE campaign_id = ?1
              AND status IN ('sent', 'failed', 'skipped_unsubscribed', 'bounced')
            "#,
        )
        .bind(campaign_id)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(row.get("cnt"))
    }

    pub async fn count_by_status(
        &self,
        campaign_id: &str,
        status: RecipientStatus,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) as cnt FROM recipients WHERE campaign_id = ?1 AND status = ?2"#,
        )
        .bind(campaign_id)
        .bind(status.as_str())
        .fetch_one(&self.db_pool)
        .await?;
        Ok(row.get("cnt"))
    }
}
