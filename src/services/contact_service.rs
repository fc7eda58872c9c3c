//! services/contact_service.rs
//! Registro global de contactos (cruza campañas) con estado de supresión.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::models::contact_model::{ContactRecord, ContactStatus};

#[derive(Debug, Clone)]
pub struct ContactService {
    db_pool: Pool<Sqlite>,
}

impl ContactService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        ContactService { db_pool }
    }

    /// Upsert de import: inserta como `active`; si ya existe, actualiza el
    /// nombre solo cuando está vacío y el last_campaign_id, sin tocar
    /// NUNCA el estado (unsubscribed/bounced son pegajosos).
    pub async fn upsert_from_import(
        &self,
        email: &str,
        name: &str,
        campaign_id: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO contacts (email, name, status, last_campaign_id, created_at)
            VALUES (?1, ?2, 'active', ?3, ?4)
            ON CONFLICT (email) DO UPDATE SET
                name = CASE WHEN contacts.name = '' THEN excluded.name ELSE contacts.name END,
                last_campaign_id = excluded.last_campaign_id
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(campaign_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo en upsert de contacto")?;
        Ok(())
    }

    pub async fn get_status(&self, email: &str) -> Result<Option<ContactStatus>> {
        let row = sqlx::query(r#"SELECT status FROM contacts WHERE email = ?1"#)
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        match row {
            Some(r) => Ok(Some(ContactStatus::from_str(
                r.get::<String, _>("status").as_str(),
            )?)),
            None => Ok(None),
        }
    }

    /// Supresión permanente. Update condicional: un contacto ya suprimido
    /// no cambia de estado, así los races con envíos son benignos.
    pub async fn suppress(&self, email: &str, status: ContactStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET status = ?1
            WHERE email = ?2 AND status NOT IN ('unsubscribed', 'bounced')
            "#,
        )
        .bind(status.as_str())
        .bind(email)
        .execute(&self.db_pool)
        .await
        .context("Fallo al suprimir contacto")?;
        Ok(result.rows_affected() > 0)
    }

    /// Alta directa de un contacto suprimido que no existía aún (un rebote
    /// puede llegar de una dirección que nunca pasó por un import).
    pub async fn ensure_suppressed(&self, email: &str, status: ContactStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO contacts (email, name, status, last_campaign_id, created_at)
            VALUES (?1, '', ?2, '', ?3)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(status.as_str())
        .bind(&now)
        .execute(&self.db_pool)
        .await?;
        self.suppress(email, status).await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<ContactRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, name, status, last_campaign_id, created_at
            FROM contacts
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let mut result = Vec::new();
        for r in rows {
            result.push(ContactRecord {
                id: r.get("id"),
                email: r.get("email"),
                name: r.get("name"),
                status: ContactStatus::from_str(r.get::<String, _>("status").as_str())?,
                last_campaign_id: r.get("last_campaign_id"),
                created_at: r.get("created_at"),
            });
        }
        Ok(result)
    }
}
