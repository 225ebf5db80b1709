use callbatch::domain::{
    FolderConfig, MIB, MonitorConfig, MonitorKind, ProcessingConfig, ProcessingOverrides, REDACTED,
    StorageConfig,
};

#[test]
fn given_storage_json_when_deserialized_then_tagged_by_type() {
    let json = r#"{"type":"s3","bucket":"calls-eu","region":"eu-west-1","access_key_id":"AKIA","secret_access_key":"s3cr3t","prefix":"inbound/"}"#;

    let storage: StorageConfig = serde_json::from_str(json).unwrap();

    assert_eq!(storage.kind().as_str(), "s3");
    assert_eq!(storage.root(), "inbound");
    assert_eq!(storage.location_key(), "s3:aws/calls-eu/inbound");
}

#[test]
fn given_s3_storage_when_redacted_then_secret_masked_and_key_id_kept() {
    let storage = StorageConfig::S3 {
        bucket: Some("calls-eu".into()),
        region: Some("eu-west-1".into()),
        access_key_id: Some("AKIA".into()),
        secret_access_key: Some("s3cr3t".into()),
        endpoint: None,
        prefix: None,
    };

    match storage.redacted() {
        StorageConfig::S3 {
            access_key_id,
            secret_access_key,
            ..
        } => {
            assert_eq!(access_key_id.as_deref(), Some("AKIA"));
            assert_eq!(secret_access_key.as_deref(), Some(REDACTED));
        }
        other => panic!("unexpected variant {other:?}"),
    }
}

#[test]
fn given_local_paths_with_trailing_slash_when_keyed_then_same_location() {
    let a = StorageConfig::Local {
        path: "/srv/calls".into(),
    };
    let b = StorageConfig::Local {
        path: "/srv/calls/".into(),
    };
    assert_eq!(a.location_key(), b.location_key());
}

#[test]
fn given_local_paths_with_dot_and_repeated_separators_when_keyed_then_same_location() {
    let key = |path: &str| StorageConfig::Local { path: path.into() }.location_key();

    assert_eq!(key("/data/."), key("/data"));
    assert_eq!(key("/data//"), key("/data"));
    assert_eq!(key("/srv/other/../data"), key("/srv/data"));
    assert_ne!(key("/data"), key("/data2"));
}

#[test]
fn given_monitor_json_without_timings_when_deserialized_then_defaults_apply() {
    let monitor: MonitorConfig = serde_json::from_str(r#"{"type":"cloud-events"}"#).unwrap();

    assert_eq!(monitor.kind, MonitorKind::CloudEvents);
    assert_eq!(monitor.scan_interval_secs, 300);
    assert_eq!(monitor.debounce_ms, 2_000);
    assert!(!monitor.recursive);
}

#[test]
fn given_partial_overrides_when_resolved_then_defaults_fill_the_rest() {
    let defaults = ProcessingConfig::default();
    let overrides = ProcessingOverrides {
        max_file_size_bytes: Some(100 * MIB),
        max_concurrent_files: Some(5),
        ..ProcessingOverrides::default()
    };

    let resolved = overrides.resolve(&defaults);

    assert_eq!(resolved.max_file_size_bytes, 100 * MIB);
    assert_eq!(resolved.max_concurrent_files, 5);
    assert_eq!(resolved.max_retries, defaults.max_retries);
    assert_eq!(resolved.allowed_extensions, defaults.allowed_extensions);
}

#[test]
fn given_default_processing_when_checking_extensions_then_case_insensitive() {
    let config = ProcessingConfig::default();

    assert_eq!(config.max_file_size_bytes, 500 * MIB);
    assert_eq!(config.max_concurrent_files, 3);
    assert!(config.is_extension_allowed("WAV"));
    assert!(!config.is_extension_allowed("txt"));
}

#[test]
fn given_new_folder_when_created_then_active() {
    let folder = FolderConfig::new(
        "Support line".into(),
        StorageConfig::Local {
            path: "/srv/support".into(),
        },
        MonitorConfig::new(MonitorKind::Events),
        ProcessingOverrides::default(),
    );

    assert!(folder.active);
    assert_eq!(folder.created_at, folder.updated_at);
}
