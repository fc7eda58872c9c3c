use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Estado de un recipient dentro de una campaña.
/// `sent`, `failed`, `bounced` y `skipped_unsubscribed` son terminales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Failed,
    Retrying,
    Bounced,
    SkippedUnsubscribed,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientStatus::Pending => "pending",
            RecipientStatus::Sent => "sent",
            RecipientStatus::Failed => "failed",
            RecipientStatus::Retrying => "retrying",
            RecipientStatus::Bounced => "bounced",
            RecipientStatus::SkippedUnsubscribed => "skipped_unsubscribed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecipientStatus::Sent
                | RecipientStatus::Failed
                | RecipientStatus::Bounced
                | RecipientStatus::SkippedUnsubscribed
        )
    }

    /// Solo estos estados admiten un intento de envío (guardia contra
    /// ejecución duplicada de la misma task).
    pub fn is_sendable(&self) -> bool {
        matches!(self, RecipientStatus::Pending | RecipientStatus::Retrying)
    }
}

impl FromStr for RecipientStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecipientStatus::Pending),
            "sent" => Ok(RecipientStatus::Sent),
            "failed" => Ok(RecipientStatus::Failed),
            "retrying" => Ok(RecipientStatus::Retrying),
            "bounced" => Ok(RecipientStatus::Bounced),
            "skipped_unsubscribed" => Ok(RecipientStatus::SkippedUnsubscribed),
            other => Err(anyhow::anyhow!("Estado de recipient desconocido: {other}")),
        }
    }
}

impl fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientRecord {
    pub id: i64,
    pub campaign_id: String,
    pub email: String,
    pub name: String,
    pub status: RecipientStatus,
    pub created_at: String,
}
