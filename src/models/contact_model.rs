use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Estado global de un contacto (cruza campañas).
/// `unsubscribed` y `bounced` son pegajosos: nunca vuelven a `active`
/// de forma automática.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Active,
    Unsubscribed,
    Bounced,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Active => "active",
            ContactStatus::Unsubscribed => "unsubscribed",
            ContactStatus::Bounced => "bounced",
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, ContactStatus::Unsubscribed | ContactStatus::Bounced)
    }
}

impl FromStr for ContactStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ContactStatus::Active),
            "unsubscribed" => Ok(ContactStatus::Unsubscribed),
            "bounced" => Ok(ContactStatus::Bounced),
            other => Err(anyhow::anyhow!("Estado de contacto desconocido: {other}")),
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactRecord {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub status: ContactStatus,
    pub last_campaign_id: String,
    pub created_at: String,
}
