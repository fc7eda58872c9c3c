//! config/campaign_config.rs
//! Configuración global del servicio de campañas (ritmo de envío,
//! reintentos, identidad del remitente, etc.)

use serde::{Deserialize, Serialize};

/// Valores por defecto del scheduler y del motor de entrega
/// (pueden venir de variables de entorno).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignGlobalConfig {
    /// Segundos entre envíos consecutivos de una misma campaña (Δ).
    pub pacing_seconds: i64,
    /// Intentos máximos por recipient antes de marcarlo `failed`.
    pub max_attempts: i64,
    /// Espera fija antes de reintentar un envío fallido (sin backoff exponencial).
    pub retry_backoff_seconds: i64,
    /// Nombre visible del remitente.
    pub sender_name: String,
    /// Dirección del remitente.
    pub sender_email: String,
    /// Dirección física para el pie de página (CAN-SPAM).
    pub physical_address: String,
    /// URL pública base para armar links de tracking y unsubscribe.
    pub base_url: String,
}

impl Default for CampaignGlobalConfig {
    fn default() -> Self {
        CampaignGlobalConfig {
            pacing_seconds: 3,
            max_attempts: 3,
            retry_backoff_seconds: 300,
            sender_name: "Campaign Service".to_string(),
            sender_email: "no-reply@example.com".to_string(),
            physical_address: "123 Main Street, Anytown, CA 12345".to_string(),
            base_url: "http://localhost:5023".to_string(),
        }
    }
}

impl CampaignGlobalConfig {
    /// Lee overrides del entorno; lo que falte queda en default.
    pub fn from_env() -> Self {
        let mut cfg = CampaignGlobalConfig::default();
        if let Ok(v) = std::env::var("CAMPAIGN_PACING_SECONDS") {
            if let Ok(n) = v.parse() {
                cfg.pacing_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("CAMPAIGN_MAX_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                cfg.max_attempts = n;
            }
        }
        if let Ok(v) = std::env::var("CAMPAIGN_RETRY_BACKOFF_SECONDS") {
            if let Ok(n) = v.parse() {
                cfg.retry_backoff_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("CAMPAIGN_SENDER_NAME") {
            cfg.sender_name = v;
        }
        if let Ok(v) = std::env::var("CAMPAIGN_SENDER_EMAIL") {
            cfg.sender_email = v;
        }
        if let Ok(v) = std::env::var("CAMPAIGN_PHYSICAL_ADDRESS") {
            cfg.physical_address = v;
        }
        if let Ok(v) = std::env::var("CAMPAIGN_BASE_URL") {
            cfg.base_url = v;
        }
        cfg
    }
}
