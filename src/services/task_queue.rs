//! services/task_queue.rs
//! Cola durable de tasks de envío. El scheduler y el motor de entrega solo
//! conocen el trait angosto; la implementación vive en SQLite.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// Una task pendiente: enviar un email a un recipient en `run_at`.
#[derive(Debug, Clone)]
pub struct SendTask {
    pub id: String,
    pub campaign_id: String,
    pub recipient_id: i64,
    pub run_at: DateTime<Utc>,
}

/// Interfaz mínima del servicio de tasks programadas.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Agenda una task para `run_at`. Devuelve el id generado.
    async fn enqueue(
        &self,
        campaign_id: &str,
        recipient_id: i64,
        run_at: DateTime<Utc>,
    ) -> Result<String>;

    /// Cancela toda task aún no iniciada de la campaña. Devuelve cuántas.
    /// Una task ya corriendo termina sola: el corte real es el re-chequeo
    /// de estado al momento de ejecutar.
    async fn cancel_for_campaign(&self, campaign_id: &str) -> Result<u64>;

    /// Reclama atómicamente la próxima task vencida (pending → running).
    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<SendTask>>;

    async fn mark_done(&self, task_id: &str) -> Result<()>;

    /// Tasks aún en cola para una campaña (para asserts y diagnóstico).
    async fn pending_for_campaign(&self, campaign_id: &str) -> Result<Vec<SendTask>>;
}

#[derive(Debug, Clone)]
pub struct SqliteTaskQueue {
    db_pool: Pool<Sqlite>,
}

impl SqliteTaskQueue {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        SqliteTaskQueue { db_pool }
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(
        &self,
        campaign_id: &str,
        recipient_id: i64,
        run_at: DateTime<Utc>,
    ) -> Result<String> {
        let task_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO send_tasks (id, campaign_id, recipient_id, run_at, status, created_at)
            VALUES (?1, ?2, ?3, ?4, 'pending', ?5)
            "#,
        )
        .bind(&task_id)
        .bind(campaign_id)
        .bind(recipient_id)
        .bind(run_at.to_rfc3339())
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al encolar send_task")?;
        Ok(task_id)
    }

    async fn cancel_for_campaign(&self, campaign_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE send_tasks
            SET status = 'cancelled'
            WHERE campaign_id = ?1 AND status = 'pending'
            "#,
        )
        .bind(campaign_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al cancelar send_tasks")?;
        Ok(result.rows_affected())
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<SendTask>> {
        let row = sqlx::query(
            r#"
            SELECT id, campaign_id, recipient_id, run_at
            FROM send_tasks
            WHERE status = 'pending' AND run_at <= ?1
            ORDER BY run_at ASC
            LIMIT 1
            "#,
        )
        .bind(now.to_rfc3339())
        .fetch_optional(&self.db_pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let task_id: String = row.get("id");

        // pending → running en un solo UPDATE: si otro worker ganó la
        // carrera, rows_affected es 0 y no ejecutamos nada.
        let claimed = sqlx::query(
            r#"UPDATE send_tasks SET status = 'running' WHERE id = ?1 AND status = 'pending'"#,
        )
        .bind(&task_id)
        .execute(&self.db_pool)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(SendTask {
            id: task_id,
            campaign_id: row.get("campaign_id"),
            recipient_id: row.get("recipient_id"),
            run_at: row.get::<String, _>("run_at").parse()?,
        }))
    }

    async fn mark_done(&self, task_id: &str) -> Result<()> {
        sqlx::query(r#"UPDATE send_tasks SET status = 'done' WHERE id = ?1"#)
            .bind(task_id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn pending_for_campaign(&self, campaign_id: &str) -> Result<Vec<SendTask>> {
        let rows = sqlx::query(
            r#"
            SELECT id, campaign_id, recipient_id, run_at
            FROM send_tasks
            WHERE campaign_id = ?1 AND status = 'pending'
            ORDER BY run_at ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.db_pool)
        .await?;

        let mut tasks = Vec::new();
        for r in rows {
            tasks.push(SendTask {
                id: r.get("id"),
                campaign_id: r.get("campaign_id"),
                recipient_id: r.get("recipient_id"),
                run_at: r.get::<String, _>("run_at").parse()?,
            });
        }
        Ok(tasks)
    }
}

/// Worker que dispara las tasks vencidas contra el motor de entrega.
#[derive(Clone)]
pub struct SendWorker {
    queue: Arc<dyn TaskQueue>,
    delivery: crate::services::delivery_service::DeliveryService,
}

impl SendWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        delivery: crate::services::delivery_service::DeliveryService,
    ) -> Self {
        SendWorker { queue, delivery }
    }

    /// Procesa todas las tasks vencidas a `now`. Separado del loop para
    /// poder manejar el tiempo sintéticamente en tests.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut processed = 0;
        while let Some(task) = self.queue.claim_next(now).await? {
            if let Err(e) = self.delivery.process_task(&task).await {
                log::error!(
                    "(process_due) Error procesando task {} (campaña {}, recipient {}): {:?}",
                    task.id,
                    task.campaign_id,
                    task.recipient_id,
                    e
                );
            }
            self.queue.mark_done(&task.id).await?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Loop de polling. Se lanza una vez desde main con tokio::spawn.
    pub async fn run(self) {
        loop {
            if let Err(e) = self.process_due(Utc::now()).await {
                log::error!("(SendWorker) Error en el ciclo de tasks: {:?}", e);
            }
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }
}
