//! services/mailer.rs
//! Transporte de correo. El motor de entrega solo ve el trait; SMTP real
//! vive acá y los tests enchufan un stub.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// El transporte responde éxito/fallo por intento; los detalles SMTP no
/// son problema del motor de entrega.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<()>;
}

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Arma el transporte desde el entorno: SMTP_HOST, SMTP_PORT,
    /// SMTP_USER, SMTP_PASS y el remitente de la config.
    pub fn from_env(sender_name: &str, sender_email: &str) -> Result<Self> {
        let smtp_host = std::env::var("SMTP_HOST").context("No se definió SMTP_HOST")?;
        let smtp_port: u16 = std::env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .context("SMTP_PORT inválido")?;
        let smtp_user = std::env::var("SMTP_USER").context("No se definió SMTP_USER")?;
        let smtp_pass = std::env::var("SMTP_PASS").context("No se definió SMTP_PASS")?;

        let from: Mailbox = format!("{sender_name} <{sender_email}>")
            .parse()
            .context("Invalid from address")?;

        let tls_params = TlsParameters::new(smtp_host.clone())?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)?
            .port(smtp_port)
            .credentials(Credentials::new(smtp_user, smtp_pass))
            .tls(Tls::Required(tls_params))
            .build();

        Ok(SmtpMailer { mailer, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<()> {
        let to: Mailbox = if to_name.is_empty() {
            to_email.parse().context("Invalid recipient address")?
        } else {
            format!("{to_name} <{to_email}>")
                .parse()
                .context("Invalid recipient address")?
        };

        let html_part = SinglePart::builder()
            .header(ContentType::parse("text/html; charset=utf-8")?)
            .body(html_body.to_string());

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .singlepart(html_part)?;

        tokio::time::timeout(std::time::Duration::from_secs(30), self.mailer.send(message))
            .await
            .context("SMTP send timed out")??;

        Ok(())
    }
}
