//! tests/import_tests.rs
//! Pruebas del import CSV: conteos, duplicados, encabezado y la regla de
//! solo-en-borrador.

#[cfg(test)]
mod tests {
    use actix_rt::test;

    use crate::models::contact_model::ContactStatus;
    use crate::models::import_model::ImportRecipientsRequest;
    use crate::tests::helpers::{self, draft_campaign, import_lines};

    #[test]
    async fn import_counts_valid_invalid_and_duplicate_rows() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;

        let summary = import_lines(
            &env,
            &campaign_id,
            "alice@example.com,Alice\nnot-an-email,Broken\nalice@example.com,Alice Again\n",
        )
        .await;

        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.duplicates, 1);

        let campaign = env.campaigns.get_campaign(&campaign_id).await.unwrap();
        assert_eq!(campaign.total_recipients, 1);
    }

    #[test]
    async fn header_row_and_blank_lines_are_tolerated() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;

        let summary = import_lines(
            &env,
            &campaign_id,
            "email,name\nbob@example.com,Bob\n\nCAROL@Example.com,Carol\n",
        )
        .await;

        assert_eq!(summary.valid, 2);
        assert_eq!(summary.invalid, 0);
        // Los emails se normalizan a minúsculas.
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "carol@example.com").await,
            "pending"
        );
    }

    #[test]
    async fn second_import_merges_against_existing_recipients() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;

        import_lines(&env, &campaign_id, "alice@example.com,Alice\n").await;
        let summary = import_lines(
            &env,
            &campaign_id,
            "alice@example.com,Alice\ndave@example.com,Dave\n",
        )
        .await;

        assert_eq!(summary.valid, 1);
        assert_eq!(summary.duplicates, 1);
        let campaign = env.campaigns.get_campaign(&campaign_id).await.unwrap();
        assert_eq!(campaign.total_recipients, 2);
    }

    #[test]
    async fn import_is_rejected_after_publish() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;
        import_lines(&env, &campaign_id, "alice@example.com,Alice\n").await;
        env.scheduler.publish(&campaign_id).await.unwrap();

        let result = env
            .import
            .import_csv(&campaign_id, b"late@example.com,Late\n")
            .await;
        assert!(result.is_err());
    }

    #[test]
    async fn import_never_resurrects_a_suppressed_contact() {
        let env = helpers::setup().await;
        let campaign_id = draft_campaign(&env, "Hello", "<p>Hi</p>").await;

        env.contacts
            .ensure_suppressed("gone@example.com", ContactStatus::Unsubscribed)
            .await
            .unwrap();

        let summary = import_lines(&env, &campaign_id, "gone@example.com,Gone\n").await;

        // Entra como recipient pending (el total refleja la lista subida),
        // pero el contacto global sigue suprimido.
        assert_eq!(summary.valid, 1);
        assert_eq!(
            helpers::recipient_status(&env, &campaign_id, "gone@example.com").await,
            "pending"
        );
        assert_eq!(
            env.contacts.get_status("gone@example.com").await.unwrap(),
            Some(ContactStatus::Unsubscribed)
        );
    }

    #[test]
    async fn import_request_decodes_base64_content() {
        let raw = serde_json::json!({
            "file_name": "list.csv",
            "content": base64::encode("alice@example.com,Alice\n"),
        });
        let req: ImportRecipientsRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.file_name, "list.csv");
        assert_eq!(req.content, b"alice@example.com,Alice\n");
    }
}
