use callbatch::domain::{ErrorCode, FileStatus};

#[test]
fn given_happy_path_when_checking_transitions_then_each_step_is_allowed() {
    assert!(FileStatus::Discovered.can_transition_to(FileStatus::Queued));
    assert!(FileStatus::Queued.can_transition_to(FileStatus::Processing));
    assert!(FileStatus::Processing.can_transition_to(FileStatus::Completed));
}

#[test]
fn given_retry_loop_when_checking_transitions_then_failed_and_retrying_alternate() {
    assert!(FileStatus::Processing.can_transition_to(FileStatus::Failed));
    assert!(FileStatus::Failed.can_transition_to(FileStatus::Retrying));
    assert!(FileStatus::Retrying.can_transition_to(FileStatus::Processing));
    assert!(FileStatus::Retrying.can_transition_to(FileStatus::Failed));
}

#[test]
fn given_terminal_states_when_checking_transitions_then_no_shortcuts_exist() {
    assert!(!FileStatus::Completed.can_transition_to(FileStatus::Processing));
    assert!(!FileStatus::Skipped.can_transition_to(FileStatus::Queued));
    assert!(!FileStatus::Discovered.can_transition_to(FileStatus::Processing));
    assert!(!FileStatus::Queued.can_transition_to(FileStatus::Completed));
    assert!(!FileStatus::Failed.can_transition_to(FileStatus::Processing));
}

#[test]
fn given_every_status_when_transitioning_to_itself_then_rejected() {
    for status in FileStatus::all() {
        assert!(!status.can_transition_to(status), "{status} -> {status}");
    }
}

#[test]
fn given_status_names_when_parsing_then_round_trip_through_display() {
    for status in FileStatus::all() {
        assert_eq!(status.to_string().parse::<FileStatus>().unwrap(), status);
    }
    assert!("done".parse::<FileStatus>().is_err());
}

#[test]
fn given_status_when_serialized_then_lowercase() {
    let json = serde_json::to_string(&FileStatus::Retrying).unwrap();
    assert_eq!(json, "\"retrying\"");
}

#[test]
fn given_error_codes_when_checking_retryability_then_only_transient_codes_retry() {
    assert!(ErrorCode::NetworkError.is_retryable());
    assert!(ErrorCode::ProcessingError.is_retryable());
    assert!(ErrorCode::SystemError.is_retryable());
    assert!(!ErrorCode::FileTooLarge.is_retryable());
    assert!(!ErrorCode::CorruptedFile.is_retryable());
    assert!(!ErrorCode::DuplicateFile.is_retryable());
    assert!(!ErrorCode::FileNotFound.is_retryable());
}

#[test]
fn given_error_code_when_serialized_then_screaming_snake_case() {
    let json = serde_json::to_string(&ErrorCode::FileTooLarge).unwrap();
    assert_eq!(json, "\"FILE_TOO_LARGE\"");
    assert_eq!("ACCESS_DENIED".parse::<ErrorCode>().unwrap(), ErrorCode::AccessDenied);
}
