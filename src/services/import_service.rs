//! services/import_service.rs
//! Importa pares (email, nombre) desde un CSV subido y alimenta el ledger
//! de recipients más el registro global de contactos.

use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use regex::Regex;

use crate::models::campaign_model::CampaignStatus;
use crate::models::import_model::ImportSummary;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::recipient_service::RecipientService;

#[derive(Clone)]
pub struct ImportService {
    campaigns: CampaignService,
    recipients: RecipientService,
    contacts: ContactService,
    email_re: Regex,
}

impl ImportService {
    pub fn new(
        campaigns: CampaignService,
        recipients: RecipientService,
        contacts: ContactService,
    ) -> Self {
        // Sintaxis básica, suficiente para filtrar filas rotas; la validez
        // real la decide el transporte al entregar.
        let email_re = Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("regex de email inválida");
        ImportService {
            campaigns,
            recipients,
            contacts,
            email_re,
        }
    }

    /// Procesa el contenido CSV (email,nombre por línea; tolera una fila
    /// de encabezado). Inserta recipients `pending`, upserta contactos y
    /// devuelve {valid, invalid, duplicates}.
    ///
    /// La supresión NO se aplica acá: un contacto unsubscribed/bounced
    /// entra igual como pending y se salta recién al momento del envío,
    /// así total_recipients refleja la lista subida.
    pub async fn import_csv(&self, campaign_id: &str, content: &[u8]) -> Result<ImportSummary> {
        let campaign = self
            .campaigns
            .get_campaign(campaign_id)
            .await
            .context("Campaign not found")?;
        if campaign.status != CampaignStatus::Draft {
            return Err(anyhow!(
                "La campaña {campaign_id} ya está '{}', no admite re-importación",
                campaign.status
            ));
        }

        let text = String::from_utf8_lossy(content);
        let mut summary = ImportSummary::default();
        let mut seen_in_file: HashSet<String> = HashSet::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.splitn(2, ',');
            let email = parts.next().unwrap_or("").trim().to_lowercase();
            let name = parts
                .next()
                .unwrap_or("")
                .trim()
                .trim_matches('"')
                .to_string();

            // Encabezado opcional en la primera fila.
            if line_no == 0 && email.eq_ignore_ascii_case("email") {
                continue;
            }

            if !self.email_re.is_match(&email) {
                summary.invalid += 1;
                continue;
            }

            // Duplicado dentro del archivo o ya presente en la campaña:
            // mismo resultado, se cuenta y no se inserta.
            if !seen_in_file.insert(email.clone()) {
                summary.duplicates += 1;
                continue;
            }
            let inserted = self
                .recipients
                .insert_if_absent(campaign_id, &email, &name)
                .await?;
            if !inserted {
                summary.duplicates += 1;
                continue;
            }

            self.contacts
                .upsert_from_import(&email, &name, campaign_id)
                .await?;
            summary.valid += 1;
        }

        // total_recipients queda fijado acá y no se recalcula en vuelo.
        let total = self
            .recipients
            .count_by_status(campaign_id, crate::models::recipient_model::RecipientStatus::Pending)
            .await?;
        self.campaigns
            .set_total_recipients(campaign_id, total)
            .await?;

        log::info!(
            "(import_csv) Campaña {}: {} válidos, {} inválidos, {} duplicados.",
            campaign_id,
            summary.valid,
            summary.invalid,
            summary.duplicates
        );
        Ok(summary)
    }
}
