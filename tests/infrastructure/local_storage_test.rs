use std::fs;

use tempfile::TempDir;

use callbatch::application::ports::{StorageError, StorageProvider};
use callbatch::domain::ErrorCode;
use callbatch::infrastructure::storage::ObjectStorageProvider;

fn recordings() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("b-call.wav"), b"RIFF....WAVE").unwrap();
    fs::write(dir.path().join("a-call.mp3"), b"ID3").unwrap();
    fs::create_dir(dir.path().join("archive")).unwrap();
    fs::write(dir.path().join("archive/old.mp3"), b"ID3old").unwrap();
    dir
}

#[tokio::test]
async fn given_existing_directory_when_connecting_then_ok() {
    let dir = recordings();
    let storage = ObjectStorageProvider::local(dir.path()).unwrap();

    storage.connect().await.unwrap();
}

#[tokio::test]
async fn given_missing_directory_when_building_or_connecting_then_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not-there");

    let outcome = match ObjectStorageProvider::local(&missing) {
        Ok(storage) => storage.connect().await,
        Err(e) => Err(e),
    };

    assert!(outcome.is_err());
}

#[tokio::test]
async fn given_directory_when_listing_then_relative_paths_sorted_with_sizes() {
    let dir = recordings();
    let storage = ObjectStorageProvider::local(dir.path()).unwrap();

    let files = storage.list_files("").await.unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a-call.mp3", "archive/old.mp3", "b-call.wav"]);
    assert_eq!(files[2].name, "b-call.wav");
    assert_eq!(files[2].size, 12);
    assert!(files[0].last_modified.is_some());
}

#[tokio::test]
async fn given_subdirectory_when_listing_then_only_its_files() {
    let dir = recordings();
    let storage = ObjectStorageProvider::local(dir.path()).unwrap();

    let files = storage.list_files("archive").await.unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "archive/old.mp3");
}

#[tokio::test]
async fn given_file_when_downloading_then_bytes_copied_to_working_path() {
    let dir = recordings();
    let work = TempDir::new().unwrap();
    let storage = ObjectStorageProvider::local(dir.path()).unwrap();
    let target = work.path().join("job/a-call.mp3");

    let written = storage.download_file("a-call.mp3", &target).await.unwrap();

    assert_eq!(written, 3);
    assert_eq!(fs::read(&target).unwrap(), b"ID3");
}

#[tokio::test]
async fn given_unknown_file_when_downloading_then_not_found_and_terminal() {
    let dir = recordings();
    let work = TempDir::new().unwrap();
    let storage = ObjectStorageProvider::local(dir.path()).unwrap();

    let error = storage
        .download_file("gone.mp3", &work.path().join("gone.mp3"))
        .await
        .unwrap_err();

    assert!(matches!(error, StorageError::NotFound(_)), "{error:?}");
    assert!(!error.is_retryable());
    assert_eq!(error.error_code(), ErrorCode::FileNotFound);
}
