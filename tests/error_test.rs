//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use endo_lens::error::{AnalysisError, EndoLensError};
use endo_lens::scanner::{self, LoadedImage};
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"));
    assert!(matches!(result, Err(EndoLensError::FolderNotFound(_))));
}

/// 画像のないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path()).unwrap();
    assert!(result.is_empty());
}

/// 拡張子だけ画像の壊れたファイル
#[test]
fn test_load_broken_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();

    let result = LoadedImage::load(&path);
    assert!(matches!(result, Err(EndoLensError::ImageLoad(_))));
}

/// EndoLensErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        EndoLensError::Config("テスト設定エラー".to_string()),
        EndoLensError::FileNotFound("test.jpg".to_string()),
        EndoLensError::FolderNotFound("/path/to/folder".to_string()),
        EndoLensError::ImageLoad("decode".to_string()),
        EndoLensError::NoImagesFound("フォルダ".to_string()),
        EndoLensError::Export("overlay".to_string()),
        EndoLensError::Analysis(AnalysisError::EmptyResponse),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// AnalysisErrorからの変換
#[test]
fn test_analysis_error_conversion() {
    let err: EndoLensError = AnalysisError::Status { status: 429, body: "quota".into() }.into();
    assert!(matches!(err, EndoLensError::Analysis(AnalysisError::Status { status: 429, .. })));
    assert!(err.to_string().contains("429"));
}

/// APIキー未設定のメッセージ
#[test]
fn test_missing_api_key_message() {
    let display = AnalysisError::MissingApiKey.to_string();
    assert!(display.contains("APIキー"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: EndoLensError = io_err.into();

    assert!(matches!(err, EndoLensError::Io(_)));
    assert!(err.to_string().contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: EndoLensError = json_err.into();

    assert!(matches!(err, EndoLensError::JsonParse(_)));
}
