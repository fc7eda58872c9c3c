use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estados de una campaña. Enum cerrado: nada de strings sueltos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::InProgress => "in_progress",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }

    /// `completed` y `cancelled` son terminales: no se agenda nada después.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Cancelled)
    }
}

impl FromStr for CampaignStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "in_progress" => Ok(CampaignStatus::InProgress),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            other => Err(anyhow::anyhow!("Estado de campaña desconocido: {other}")),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignRecord {
    pub id: String,
    pub subject: String,
    pub preheader: String,
    pub body_template: String,
    pub status: CampaignStatus,
    pub total_recipients: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request para crear una campaña en borrador
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub subject: String,
    #[serde(default)]
    pub preheader: String,
    pub body_template: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCampaignResponse {
    pub id: String,
    pub message: String,
}

/// Conteos por estado de recipient, para progreso y completion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CampaignProgress {
    pub total: i64,
    pub pending: i64,
    pub sent: i64,
    pub failed: i64,
    pub retrying: i64,
    pub bounced: i64,
    pub skipped_unsubscribed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: String,
    pub subject: String,
    pub status: CampaignStatus,
    pub total_recipients: i64,
    pub created_at: String,
}

/// Para listar campañas con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListCampaignsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<CampaignSummary>,
}
