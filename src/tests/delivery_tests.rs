//! tests/delivery_tests.rs
//! Pruebas del motor de entrega: personalización, supresión, reintentos
//! acotados y contabilidad de completitud.

#[cfg(test)]
mod tests {
    use actix_rt::test;
    use chrono::{Duration, Utc};

    use crate::models::campaign_model::CampaignStatus;
    use crate::models::contact_model::ContactStatus;
    use crate::models::recipient_model::{RecipientRecord, RecipientStatus};
    use crate::services::delivery_service::replace_tokens;
    use crate::tests::helpers::{self, draft_campaign, import_lines};

    fn sample_recipient() -> RecipientRecord {
        RecipientRecord {
            id: 1,
            campaign_id: "c-1".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            status: RecipientStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    async fn tokens_are_replaced_in_both_cases() {
        let recipient = sample_recipient();
        let out = replace_tokens("Hi {name} / {NAME}, mail to {email} ({EMAIL})", &recipient);
        assert_eq!(out, "Hi Alice / Alice, mail to alice@example.com (alice@example.com)");
    }

    #[test]
    async fn unknown_tokens_stay_verbatim() {
        let recipient = sample_recipient();
        let out = replace_tokens("Hola {nombre}, {name}", &recipient);
        assert_eq!(out, "Hola {nombre}, Alice");
    }

    #[test]
    async fn successful_send_personalizes_and_logs() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello {name}", "<p>Hi {name}</p>").await;
        import_lines(&env, &campaign_id, "alice@example.com,Alice\n").await;

        env.scheduler.publish(&campaign_id).await.unwrap();
        env.worker
            .process_due(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();

        let sent = env.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "alice@example.com");
        assert_eq!(sent[0].subject, "Hello Alice");
        assert!(sent[0].html_body.contains("<p>Hi Alice</p>"));
        // Pie obligatorio: link de unsubscribe con el token en base64 y
        // dirección física.
        let token = urlencoding::encode(&base64::encode("alice@example.com")).into_owned();
        assert!(sent[0]
            .html_body
            .contains(&format!("/api/track/unsubscribe?email={token}")));
        assert!(sent[0].html_body.contains(&env.config.physical_address));

        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "alice@example.com").await,
            "sent"
        );
        let (status, attempts, _, _) = helpers::log_entry(&env, &campaign_id, "alice@example.com")
            .await
            .unwrap();
        assert_eq!(status, "sent");
        assert_eq!(attempts, 1);
        assert_eq!(
            env.campaigns.get_status(&campaign_id).await.unwrap(),
            CampaignStatus::Completed
        );
    }

    #[test]
    async fn suppressed_contact_is_skipped_at_send_time() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;
        import_lines(&env, &campaign_id, "gone@example.com,Gone\n").await;

        // La supresión llega después del import y antes del envío.
        env.contacts
            .suppress("gone@example.com", ContactStatus::Unsubscribed)
            .await
            .unwrap();

        env.scheduler.publish(&campaign_id).await.unwrap();
        env.worker
            .process_due(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();

        assert!(env.transport.sent().is_empty());
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "gone@example.com").await,
            "skipped_unsubscribed"
        );
        // El skip cuenta como terminal y cierra la campaña.
        assert_eq!(
            env.campaigns.get_status(&campaign_id).await.unwrap(),
            CampaignStatus::Completed
        );
    }

    #[test]
    async fn retries_are_bounded_and_tracked_on_one_log_row() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;
        import_lines(&env, &campaign_id, "flaky@example.com,Flaky\n").await;
        env.transport.fail_times("flaky@example.com", 3);

        env.scheduler.publish(&campaign_id).await.unwrap();
        let backoff = env.config.retry_backoff_seconds;

        // Intento 1: falla, queda retrying con reintento agendado.
        env.worker
            .process_due(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "flaky@example.com").await,
            "retrying"
        );
        assert_eq!(
            env.queue
                .pending_for_campaign(&campaign_id)
                .await
                .unwrap()
                .len(),
            1
        );

        // Intento 2: sigue fallando.
        env.worker
            .process_due(Utc::now() + Duration::seconds(backoff + 5))
            .await
            .unwrap();
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "flaky@example.com").await,
            "retrying"
        );

        // Intento 3: tope alcanzado, terminal `failed` y SIN cuarta task.
        env.worker
            .process_due(Utc::now() + Duration::seconds(2 * backoff + 10))
            .await
            .unwrap();
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "flaky@example.com").await,
            "failed"
        );
        assert!(env
            .queue
            .pending_for_campaign(&campaign_id)
            .await
            .unwrap()
            .is_empty());

        // Una sola fila de log con el conteo monótono de intentos.
        assert_eq!(
            helpers::log_rows_for(&env, &campaign_id, "flaky@example.com").await,
            1
        );
        let (status, attempts, _, _) = helpers::log_entry(&env, &campaign_id, "flaky@example.com")
            .await
            .unwrap();
        assert_eq!(status, "failed");
        assert_eq!(attempts, 3);
        assert_eq!(
            env.campaigns.get_status(&campaign_id).await.unwrap(),
            CampaignStatus::Completed
        );
    }

    #[test]
    async fn transient_failure_recovers_on_retry() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;
        import_lines(&env, &campaign_id, "bumpy@example.com,Bumpy\n").await;
        env.transport.fail_times("bumpy@example.com", 1);

        env.scheduler.publish(&campaign_id).await.unwrap();
        env.worker
            .process_due(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        env.worker
            .process_due(Utc::now() + Duration::seconds(env.config.retry_backoff_seconds + 5))
            .await
            .unwrap();

        assert_eq!(env.transport.sent().len(), 1);
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "bumpy@example.com").await,
            "sent"
        );
        let (status, attempts, _, _) = helpers::log_entry(&env, &campaign_id, "bumpy@example.com")
            .await
            .unwrap();
        assert_eq!(status, "sent");
        assert_eq!(attempts, 2);
    }

    #[test]
    async fn completion_accounts_every_terminal_state() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;
        import_lines(
            &env,
            &campaign_id,
            "ok@example.com,Ok\nflaky@example.com,Flaky\ngone@example.com,Gone\n",
        )
        .await;
        env.transport.fail_times("flaky@example.com", 3);
        env.contacts
            .suppress("gone@example.com", ContactStatus::Unsubscribed)
            .await
            .unwrap();

        env.scheduler.publish(&campaign_id).await.unwrap();
        let backoff = env.config.retry_backoff_seconds;
        for step in [10, backoff + 15, 2 * backoff + 20] {
            env.worker
                .process_due(Utc::now() + Duration::seconds(step))
                .await
                .unwrap();
        }

        let progress = env.campaigns.progress(&campaign_id).await.unwrap();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.sent, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.skipped_unsubscribed, 1);
        assert_eq!(
            progress.sent + progress.failed + progress.skipped_unsubscribed + progress.bounced,
            progress.total
        );
        assert_eq!(
            env.campaigns.get_status(&campaign_id).await.unwrap(),
            CampaignStatus::Completed
        );
    }
}
