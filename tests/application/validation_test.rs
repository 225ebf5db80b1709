use std::collections::HashMap;

use callbatch::application::validation::{
    FileValidator, ValidationReport, validate_channel_config, validate_folder_config,
    validate_monitor_config, validate_notification_config, validate_processing_config,
    validate_storage_config,
};
use callbatch::domain::{
    ErrorCode, FolderConfig, MIB, MonitorConfig, MonitorKind, NotificationChannelConfig,
    NotificationConfig, ProcessingConfig, ProcessingOverrides, RemoteFile, StorageConfig,
};

fn s3(bucket: &str) -> StorageConfig {
    StorageConfig::S3 {
        bucket: Some(bucket.into()),
        region: Some("eu-west-1".into()),
        access_key_id: Some("AKIA".into()),
        secret_access_key: Some("s3cr3t".into()),
        endpoint: None,
        prefix: None,
    }
}

#[test]
fn given_relative_local_path_when_validated_then_rejected() {
    let report = validate_storage_config(&StorageConfig::Local {
        path: "recordings".into(),
    });

    assert!(!report.valid);
    assert!(report.errors[0].contains("storage.path must be absolute"));
}

#[test]
fn given_absolute_local_path_when_validated_then_valid() {
    let report = validate_storage_config(&StorageConfig::Local {
        path: "/srv/recordings".into(),
    });
    assert_eq!(report, ValidationReport::ok());
}

#[test]
fn given_azure_without_credentials_when_validated_then_every_missing_field_reported() {
    let report = validate_storage_config(&StorageConfig::Azure {
        account: None,
        access_key: Some("  ".into()),
        container: Some("Calls_Container".into()),
        prefix: None,
    });

    assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    assert!(report.errors.iter().any(|e| e == "storage.account is required"));
    assert!(report.errors.iter().any(|e| e == "storage.access_key is required"));
    assert!(report.errors.iter().any(|e| e.contains("not a valid container name")));
}

#[test]
fn given_s3_bucket_names_when_validated_then_dns_rules_apply() {
    assert!(validate_storage_config(&s3("calls-eu.archive")).valid);
    assert!(!validate_storage_config(&s3("Calls_EU")).valid);
}

#[test]
fn given_s3_endpoint_without_http_scheme_when_validated_then_rejected() {
    let mut storage = s3("calls-eu");
    if let StorageConfig::S3 { endpoint, .. } = &mut storage {
        *endpoint = Some("ftp://minio.internal".into());
    }

    let report = validate_storage_config(&storage);

    assert!(report.errors[0].starts_with("storage.endpoint"));
}

#[test]
fn given_monitor_timings_out_of_range_when_validated_then_both_reported() {
    let monitor = MonitorConfig {
        scan_interval_secs: 5,
        debounce_ms: 120_000,
        ..MonitorConfig::new(MonitorKind::Polling)
    };

    let report = validate_monitor_config(&monitor);

    assert_eq!(
        report.errors,
        vec![
            "monitor.scan_interval_secs must be between 30 and 3600, got 5".to_string(),
            "monitor.debounce_ms must be between 100 and 60000, got 120000".to_string(),
        ]
    );
}

#[test]
fn given_default_processing_when_validated_then_valid() {
    assert!(validate_processing_config(&ProcessingConfig::default()).valid);
}

#[test]
fn given_bad_processing_values_when_validated_then_each_field_named() {
    let config = ProcessingConfig {
        max_file_size_bytes: 10,
        allowed_extensions: vec!["mp3".into(), "m p3".into()],
        filename_pattern: Some("([".into()),
        max_concurrent_files: 50,
        max_retries: 11,
        retry_delay_secs: 1,
        ..ProcessingConfig::default()
    };

    let report = validate_processing_config(&config);

    for field in [
        "processing.max_file_size_bytes",
        "processing.allowed_extensions",
        "processing.filename_pattern",
        "processing.max_concurrent_files",
        "processing.max_retries",
        "processing.retry_delay_secs",
    ] {
        assert!(
            report.errors.iter().any(|e| e.starts_with(field)),
            "missing {field} in {:?}",
            report.errors
        );
    }
}

#[test]
fn given_event_monitor_on_cloud_storage_when_validating_folder_then_rejected() {
    let folder = FolderConfig::new(
        "Cloud line".into(),
        s3("calls-eu"),
        MonitorConfig::new(MonitorKind::Events),
        ProcessingOverrides::default(),
    );

    let report = validate_folder_config(&folder, &ProcessingConfig::default());

    assert_eq!(
        report.errors,
        vec!["monitor type 'events' requires local storage, got 's3'".to_string()]
    );
}

#[test]
fn given_folder_with_several_problems_when_validated_then_errors_merged() {
    let folder = FolderConfig::new(
        " ".into(),
        StorageConfig::Local {
            path: "relative".into(),
        },
        MonitorConfig::new(MonitorKind::Polling),
        ProcessingOverrides {
            max_concurrent_files: Some(0),
            ..ProcessingOverrides::default()
        },
    );

    let report = validate_folder_config(&folder, &ProcessingConfig::default());

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    assert_eq!(report.errors[0], "name is required");
}

#[test]
fn given_webhook_channel_when_validated_then_url_and_timeout_checked() {
    let channel = NotificationChannelConfig::Webhook {
        url: "not a url".into(),
        secret: None,
        headers: HashMap::new(),
        timeout_secs: 0,
    };

    let report = validate_channel_config(&channel);

    assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
}

#[test]
fn given_sms_channel_with_bad_numbers_when_validated_then_rejected() {
    let channel = NotificationChannelConfig::Sms {
        api_url: "https://api.twilio.com".into(),
        account_sid: "AC123".into(),
        auth_token: Some("token".into()),
        from: "+4712345678".into(),
        to: vec!["12345".into()],
    };

    let report = validate_channel_config(&channel);

    assert_eq!(
        report.errors,
        vec!["channel.to contains an invalid E.164 phone number: '12345'".to_string()]
    );
}

#[test]
fn given_email_channel_without_recipients_when_validated_then_rejected() {
    let channel = NotificationChannelConfig::Email {
        api_url: "https://mail.example.com/send".into(),
        api_key: None,
        from: "calls@example.com".into(),
        to: vec![],
        subject_prefix: None,
    };

    let report = validate_channel_config(&channel);

    assert_eq!(
        report.errors,
        vec!["channel.to must contain at least one recipient".to_string()]
    );
}

#[test]
fn given_notification_without_conditions_when_validated_then_rejected() {
    let config = NotificationConfig::new(
        "ops".into(),
        NotificationChannelConfig::Chat {
            webhook_url: "https://hooks.slack.com/services/T/B/X".into(),
            channel: None,
            username: None,
        },
        vec![],
        None,
    );

    let report = validate_notification_config(&config);

    assert_eq!(
        report.errors,
        vec!["conditions must contain at least one trigger condition".to_string()]
    );
}

#[test]
fn given_reports_when_merged_then_validity_follows_errors() {
    let merged = ValidationReport::ok().merge(ValidationReport::from_errors(vec!["x".into()]));

    assert!(!merged.valid);
    assert_eq!(merged.clone().into_result(), Err(vec!["x".to_string()]));
    assert!(ValidationReport::ok().merge(ValidationReport::ok()).valid);
}

#[test]
fn given_file_over_limit_when_checked_then_file_too_large() {
    let validator = FileValidator::new(&ProcessingConfig::default()).unwrap();

    let error = validator
        .check(&RemoteFile::new("long-call.wav", 600 * MIB))
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::FileTooLarge);
}

#[test]
fn given_file_checks_when_failing_then_matching_codes() {
    let config = ProcessingConfig {
        filename_pattern: Some(r"^call-\d+\.".into()),
        ..ProcessingConfig::default()
    };
    let validator = FileValidator::new(&config).unwrap();

    let code = |path: &str, size: u64| validator.check(&RemoteFile::new(path, size)).err().map(|e| e.code);

    assert_eq!(code("call-1.mp3", 1_024), None);
    assert_eq!(code("call-2.mp3", 0), Some(ErrorCode::CorruptedFile));
    assert_eq!(code(".call-3.mp3", 10), Some(ErrorCode::InvalidFilename));
    assert_eq!(code("call-4.txt", 10), Some(ErrorCode::InvalidFormat));
    assert_eq!(code("meeting.mp3", 10), Some(ErrorCode::InvalidFilename));
}

#[test]
fn given_uncompilable_pattern_when_building_validator_then_error() {
    let config = ProcessingConfig {
        filename_pattern: Some("([".into()),
        ..ProcessingConfig::default()
    };
    assert!(FileValidator::new(&config).is_err());
}
