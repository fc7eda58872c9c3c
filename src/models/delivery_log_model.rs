use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Estado de una entrada del log de entregas. El log es append-only por
/// recipient; los reintentos actualizan `attempt_count` sobre la misma fila.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Retrying,
    Opened,
    Bounced,
    Skipped,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Retrying => "retrying",
            DeliveryStatus::Opened => "opened",
            DeliveryStatus::Bounced => "bounced",
            DeliveryStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            "retrying" => Ok(DeliveryStatus::Retrying),
            "opened" => Ok(DeliveryStatus::Opened),
            "bounced" => Ok(DeliveryStatus::Bounced),
            "skipped" => Ok(DeliveryStatus::Skipped),
            other => Err(anyhow::anyhow!("Estado de log desconocido: {other}")),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryLogRecord {
    pub id: i64,
    pub campaign_id: String,
    pub recipient_id: i64,
    pub email: String,
    pub status: DeliveryStatus,
    pub attempt_count: i64,
    pub sent_at: Option<String>,
    pub opened_at: Option<String>,
    pub bounced_at: Option<String>,
}

/// Fila del reporte por campaña (proyección de log + recipient).
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub email: String,
    pub delivery_status: String,
    pub opened: bool,
    pub bounced: bool,
    pub sent_at: Option<String>,
    pub opened_at: Option<String>,
    pub bounced_at: Option<String>,
    pub attempt_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignReportResponse {
    pub campaign_id: String,
    pub rows: Vec<ReportRow>,
}

/// Payload del webhook de rebotes del proveedor.
#[derive(Debug, Clone, Deserialize)]
pub struct BounceEventRequest {
    pub email: String,
    pub campaign_id: String,
    #[serde(default)]
    pub event: String,
}
