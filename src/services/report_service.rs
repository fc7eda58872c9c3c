//! services/report_service.rs
//! Proyección de solo-lectura: reporte por campaña y exports CSV.

use anyhow::Result;
use sqlx::{Pool, Row, Sqlite};

use crate::models::delivery_log_model::ReportRow;
use crate::services::contact_service::ContactService;

#[derive(Clone)]
pub struct ReportService {
    db_pool: Pool<Sqlite>,
    contacts: ContactService,
}

impl ReportService {
    pub fn new(db_pool: Pool<Sqlite>, contacts: ContactService) -> Self {
        ReportService { db_pool, contacts }
    }

    /// Filas del reporte: recipients con su última entrada de log (si la
    /// hay). Los skipped aparecen aunque nunca tuvieron intento de envío.
    pub async fn campaign_report(&self, campaign_id: &str) -> Result<Vec<ReportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT r.email AS email,
                   r.status AS recipient_status,
                   l.status AS log_status,
                   l.attempt_count AS attempt_count,
                   l.sent_at AS sent_at,
                   l.opened_at AS opened_at,
                   l.bounced_at AS bounced_at
            FROM recipients r
            LEFT JOIN delivery_log l ON l.recipient_id = r.id
            WHERE r.campaign_id = ?1
            ORDER BY r.id ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut report = Vec::new();
        for row in rows {
            let recipient_status: String = row.get("recipient_status");
            let opened_at: Option<String> = row.get("opened_at");
            let bounced_at: Option<String> = row.get("bounced_at");
            report.push(ReportRow {
                email: row.get("email"),
                delivery_status: delivery_status_label(&recipient_status),
                opened: opened_at.is_some(),
                bounced: bounced_at.is_some(),
                sent_at: row.get("sent_at"),
                opened_at,
                bounced_at,
                attempt_count: row.get::<Option<i64>, _>("attempt_count").unwrap_or(0),
            });
        }
        Ok(report)
    }

    /// Export CSV del reporte, con el mismo layout de columnas que la
    /// vista tabular.
    pub async fn campaign_report_csv(&self, campaign_id: &str) -> Result<String> {
        let rows = self.campaign_report(campaign_id).await?;
        let mut csv = String::from(
            "Email,Delivery Status,Open Status,Bounce Status,Sent At,Opened At,Bounced At,Attempts\n",
        );
        for row in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                csv_field(&row.email),
                csv_field(&row.delivery_status),
                if row.opened { "Yes" } else { "No" },
                if row.bounced { "Yes" } else { "No" },
                csv_field(row.sent_at.as_deref().unwrap_or("")),
                csv_field(row.opened_at.as_deref().unwrap_or("")),
                csv_field(row.bounced_at.as_deref().unwrap_or("")),
                row.attempt_count,
            ));
        }
        Ok(csv)
    }

    /// Export CSV del registro global de contactos.
    pub async fn contacts_csv(&self) -> Result<String> {
        let contacts = self.contacts.list_all().await?;
        let mut csv = String::from("ID,Email,Name,Status,Created At,Last Campaign ID\n");
        for c in contacts {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                c.id,
                csv_field(&c.email),
                csv_field(&c.name),
                c.status,
                csv_field(&c.created_at),
                csv_field(&c.last_campaign_id),
            ));
        }
        Ok(csv)
    }
}

/// Colapsa el estado fino del recipient a la etiqueta del reporte.
fn delivery_status_label(status: &str) -> String {
    match status {
        "sent" => "Sent".to_string(),
        "failed" => "Failed".to_string(),
        "pending" | "retrying" => "Pending".to_string(),
        "bounced" => "Bounced".to_string(),
        "skipped_unsubscribed" => "Skipped (Unsubscribed)".to_string(),
        other => {
            let mut label = other.to_string();
            if let Some(first) = label.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            label
        }
    }
}

/// Escapado CSV mínimo: comillas cuando hace falta.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
