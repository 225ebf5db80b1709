use std::collections::HashMap;
use std::time::Duration;

use callbatch::application::ports::{NotificationError, NotificationProvider};
use callbatch::application::services::RetryPolicy;
use callbatch::domain::{
    ErrorCode, FileRecordId, FolderId, Notification, NotificationChannel, NotificationChannelConfig,
    NotificationCondition, Severity,
};
use callbatch::infrastructure::notification::{
    ChatNotifier, EmailNotifier, SIGNATURE_HEADER, SmsNotifier, WebhookNotifier, sign,
};

use crate::helpers::MockServer;

fn failure() -> Notification {
    Notification::new(
        NotificationCondition::FileFailed,
        Severity::Critical,
        "Processing failed",
        "call-001.mp3 failed after 3 retries",
    )
    .for_folder(FolderId::new())
    .with_error_code(ErrorCode::ProcessingError)
}

fn webhook(url: String, secret: Option<&str>) -> NotificationChannelConfig {
    NotificationChannelConfig::Webhook {
        url,
        secret: secret.map(str::to_string),
        headers: HashMap::from([("X-Tenant".to_string(), "north".to_string())]),
        timeout_secs: 5,
    }
}

#[test]
fn given_secret_and_body_when_signing_then_prefixed_hex_sha256() {
    let signature = sign("whsec", b"{}");

    assert!(signature.starts_with("sha256="));
    assert_eq!(signature.len(), "sha256=".len() + 64);
    assert_eq!(signature, sign("whsec", b"{}"));
    assert_ne!(signature, sign("other", b"{}"));
}

#[tokio::test]
async fn given_webhook_with_secret_when_sending_then_signed_json_delivered() {
    let server = MockServer::start(200, r#"{"id":"evt_42"}"#).await;
    let notifier = WebhookNotifier::new(&webhook(server.url("/hooks/calls"), Some("whsec"))).unwrap();
    let notification = failure();

    let receipt = notifier.send_notification(&notification).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/hooks/calls");
    assert_eq!(
        request.header(SIGNATURE_HEADER),
        Some(sign("whsec", &request.body).as_str())
    );
    assert_eq!(
        request.header("X-Notification-Id"),
        Some(notification.id.to_string().as_str())
    );
    assert_eq!(request.header("X-Tenant"), Some("north"));
    let body = request.json();
    assert_eq!(body["condition"], "file_failed");
    assert_eq!(body["error_code"], "PROCESSING_ERROR");
    assert_eq!(receipt.provider_message_id.as_deref(), Some("evt_42"));
}

#[tokio::test]
async fn given_webhook_without_secret_when_sending_then_no_signature() {
    let server = MockServer::start(204, "").await;
    let notifier = WebhookNotifier::new(&webhook(server.url("/"), None)).unwrap();

    notifier.send_notification(&failure()).await.unwrap();

    assert!(server.requests()[0].header(SIGNATURE_HEADER).is_none());
}

#[tokio::test]
async fn given_server_error_when_sending_webhook_then_rejected_and_retryable() {
    let server = MockServer::start(503, "busy").await;
    let notifier = WebhookNotifier::new(&webhook(server.url("/"), None)).unwrap();

    let error = notifier.send_notification(&failure()).await.unwrap_err();

    assert!(matches!(
        &error,
        NotificationError::Rejected { status: 503, body } if body == "busy"
    ));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn given_client_error_when_sending_webhook_then_not_retryable() {
    let server = MockServer::start(400, "bad payload").await;
    let notifier = WebhookNotifier::new(&webhook(server.url("/"), None)).unwrap();

    let error = notifier.send_notification(&failure()).await.unwrap_err();

    assert!(!error.is_retryable());
}

#[tokio::test]
async fn given_unreachable_endpoint_when_sending_then_delivery_failed() {
    let server = MockServer::start(200, "").await;
    let url = server.url("/");
    drop(server);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let notifier = WebhookNotifier::new(&webhook(url, None)).unwrap();

    let error = notifier.send_notification(&failure()).await.unwrap_err();

    assert!(matches!(error, NotificationError::DeliveryFailed(_)));
    assert!(error.is_retryable());
}

#[test]
fn given_invalid_config_when_building_webhook_then_invalid_config() {
    let error = WebhookNotifier::new(&webhook("ftp://example.com".into(), None))
        .err()
        .unwrap();

    assert!(matches!(error, NotificationError::InvalidConfig(_)));
}

#[test]
fn given_live_notifier_when_configured_with_other_channel_then_mismatch_and_previous_kept() {
    let notifier = WebhookNotifier::new(&webhook("https://hooks.example.com".into(), None)).unwrap();
    let chat = NotificationChannelConfig::Chat {
        webhook_url: "https://hooks.slack.com/services/T/B/X".into(),
        channel: None,
        username: None,
    };

    let error = notifier.configure(&chat).unwrap_err();

    assert!(matches!(
        error,
        NotificationError::ChannelMismatch {
            expected: NotificationChannel::Webhook,
            actual: NotificationChannel::Chat,
        }
    ));
    notifier
        .configure(&webhook("https://hooks.example.com/v2".into(), Some("s")))
        .unwrap();
}

#[tokio::test]
async fn given_chat_channel_when_sending_then_text_carries_title_and_code() {
    let server = MockServer::start(200, "ok").await;
    let notifier = ChatNotifier::new(&NotificationChannelConfig::Chat {
        webhook_url: server.url("/services/T/B/X"),
        channel: Some("#call-ops".into()),
        username: Some("callbatch".into()),
    })
    .unwrap();

    let receipt = notifier.send_notification(&failure()).await.unwrap();

    let body = server.requests()[0].json();
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with(":rotating_light: *Processing failed*"));
    assert!(text.contains("`PROCESSING_ERROR`"));
    assert_eq!(body["channel"], "#call-ops");
    assert_eq!(receipt.channel, NotificationChannel::Chat);
}

#[tokio::test]
async fn given_email_channel_when_sending_then_bearer_auth_and_prefixed_subject() {
    let server = MockServer::start(202, r#"{"id":"msg-7"}"#).await;
    let notifier = EmailNotifier::new(&NotificationChannelConfig::Email {
        api_url: server.url("/v1/send"),
        api_key: Some("mail-key".into()),
        from: "calls@example.com".into(),
        to: vec!["ops@example.com".into(), "lead@example.com".into()],
        subject_prefix: Some("[calls]".into()),
    })
    .unwrap();

    let receipt = notifier
        .send_notification(&failure().for_file(FileRecordId::new(), "call-001.mp3"))
        .await
        .unwrap();

    let request = &server.requests()[0];
    assert_eq!(request.header("authorization"), Some("Bearer mail-key"));
    let body = request.json();
    assert_eq!(body["subject"], "[calls] Processing failed");
    assert_eq!(body["to"].as_array().unwrap().len(), 2);
    assert!(body["text"].as_str().unwrap().contains("File: call-001.mp3"));
    assert_eq!(receipt.provider_message_id.as_deref(), Some("msg-7"));
}

#[tokio::test]
async fn given_sms_channel_when_sending_then_one_form_post_per_recipient() {
    let server = MockServer::start(201, r#"{"sid":"SM123"}"#).await;
    let notifier = SmsNotifier::new(&NotificationChannelConfig::Sms {
        api_url: server.url("/2010-04-01/Accounts/AC1/Messages.json"),
        account_sid: "AC1".into(),
        auth_token: Some("token".into()),
        from: "+4712345678".into(),
        to: vec!["+4798765432".into(), "+4791234567".into()],
    })
    .unwrap();

    let receipt = notifier.send_notification(&failure()).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].header("authorization").unwrap().starts_with("Basic "));
    assert!(requests[1].text().contains("To=%2B4791234567"));
    assert!(!notifier.supports_concurrent_calls());
    assert_eq!(receipt.provider_message_id.as_deref(), Some("SM123"));
}

#[tokio::test]
async fn given_second_recipient_failing_once_when_retried_then_first_recipient_texted_once() {
    let server = MockServer::scripted(
        vec![(201, r#"{"sid":"SM1"}"#), (503, "busy")],
        201,
        r#"{"sid":"SM2"}"#,
    )
    .await;
    let notifier = SmsNotifier::new(&NotificationChannelConfig::Sms {
        api_url: server.url("/Messages.json"),
        account_sid: "AC1".into(),
        auth_token: Some("token".into()),
        from: "+4712345678".into(),
        to: vec!["+4798765432".into(), "+4791234567".into()],
    })
    .unwrap();
    let notification = failure();

    let (receipt, attempts) = RetryPolicy::fixed(3, Duration::from_millis(10))
        .run(
            |_| notifier.send_notification(&notification),
            NotificationError::is_retryable,
        )
        .await
        .unwrap();

    let requests = server.requests();
    let texts_to = |number: &str| {
        requests
            .iter()
            .filter(|r| r.text().contains(&format!("To=%2B{number}")))
            .count()
    };
    assert_eq!(attempts, 2);
    assert_eq!(requests.len(), 3);
    assert_eq!(texts_to("4798765432"), 1);
    assert_eq!(texts_to("4791234567"), 2);
    assert_eq!(receipt.provider_message_id.as_deref(), Some("SM2"));
}

#[tokio::test]
async fn given_delivered_notification_when_sent_again_then_every_recipient_texted_again() {
    let server = MockServer::start(201, r#"{"sid":"SM1"}"#).await;
    let notifier = SmsNotifier::new(&NotificationChannelConfig::Sms {
        api_url: server.url("/Messages.json"),
        account_sid: "AC1".into(),
        auth_token: None,
        from: "+4712345678".into(),
        to: vec!["+4798765432".into(), "+4791234567".into()],
    })
    .unwrap();
    let notification = failure();

    notifier.send_notification(&notification).await.unwrap();
    notifier.send_notification(&notification).await.unwrap();

    assert_eq!(server.requests().len(), 4);
}
