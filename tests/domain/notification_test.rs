use std::collections::HashMap;

use callbatch::domain::{
    FolderId, Notification, NotificationChannelConfig, NotificationCondition, NotificationConfig,
    REDACTED, Severity,
};

fn webhook() -> NotificationChannelConfig {
    NotificationChannelConfig::Webhook {
        url: "https://hooks.example.com/calls".into(),
        secret: Some("whsec".into()),
        headers: HashMap::new(),
        timeout_secs: 10,
    }
}

fn failure() -> Notification {
    Notification::new(
        NotificationCondition::FileFailed,
        Severity::Critical,
        "Failed",
        "call-001.mp3 failed",
    )
}

#[test]
fn given_matching_condition_when_unscoped_then_matches_any_folder() {
    let config = NotificationConfig::new(
        "ops".into(),
        webhook(),
        vec![NotificationCondition::FileFailed],
        None,
    );

    assert!(config.matches(&failure().for_folder(FolderId::new())));
    assert!(config.matches(&failure()));
}

#[test]
fn given_folder_scope_when_matching_then_only_that_folder() {
    let folder = FolderId::new();
    let config = NotificationConfig::new(
        "ops".into(),
        webhook(),
        vec![NotificationCondition::FileFailed],
        Some(folder),
    );

    assert!(config.matches(&failure().for_folder(folder)));
    assert!(!config.matches(&failure().for_folder(FolderId::new())));
    assert!(!config.matches(&failure()));
}

#[test]
fn given_disabled_config_when_matching_then_never_matches() {
    let mut config = NotificationConfig::new(
        "ops".into(),
        webhook(),
        vec![NotificationCondition::FileFailed],
        None,
    );
    config.enabled = false;

    assert!(!config.matches(&failure()));
}

#[test]
fn given_other_condition_when_matching_then_no_match() {
    let config = NotificationConfig::new(
        "ops".into(),
        webhook(),
        vec![NotificationCondition::BatchCompleted],
        None,
    );
    assert!(!config.matches(&failure()));
}

#[test]
fn given_secrets_when_redacted_then_masked() {
    let config = NotificationConfig::new(
        "ops".into(),
        webhook(),
        vec![NotificationCondition::FileFailed],
        None,
    );

    let json = serde_json::to_value(config.redacted()).unwrap();

    assert_eq!(json["channel"]["secret"], REDACTED);
    assert_eq!(json["channel"]["type"], "webhook");
}

#[test]
fn given_condition_names_when_parsing_then_snake_case() {
    assert_eq!(
        "batch_cancelled".parse::<NotificationCondition>().unwrap(),
        NotificationCondition::BatchCancelled
    );
    assert!("whenever".parse::<NotificationCondition>().is_err());
}

#[test]
fn given_severities_when_ordered_then_critical_is_highest() {
    assert!(Severity::Critical > Severity::Warning);
    assert!(Severity::Warning > Severity::Info);
}
