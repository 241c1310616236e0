//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use density_ai_rust::data;
use density_ai_rust::error::DensityAiError;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないリファレンスCSVを読み込んだ場合
#[test]
fn test_load_nonexistent_reference() {
    let result = data::load_catalog(Path::new("/nonexistent/path/density_reference.csv"));
    assert!(matches!(result, Err(DensityAiError::FileNotFound(_))));
}

/// 存在しない未解決食材CSVを読み込んだ場合
#[test]
fn test_load_nonexistent_missing() {
    let result = data::load_unresolved(Path::new("/nonexistent/path/missing_ingredients.csv"));
    assert!(matches!(result, Err(DensityAiError::FileNotFound(_))));
}

/// ヘッダーのみのCSVはエラーではなく空
#[test]
fn test_load_header_only() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("density_reference.csv");
    std::fs::write(&path, "id,ingredient,normalised_form,density,source\n").unwrap();

    let catalog = data::load_catalog(&path).unwrap();
    assert!(catalog.is_empty());
}

/// DensityAiErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        DensityAiError::Config("テスト設定エラー".to_string()),
        DensityAiError::MissingApiKey,
        DensityAiError::FileNotFound("density_reference.csv".to_string()),
        DensityAiError::ApiCall("API呼び出し失敗".to_string()),
        DensityAiError::ApiParse("content missing".to_string()),
        DensityAiError::CliExecution("exit status 1".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// MissingApiKeyエラーのメッセージ確認
#[test]
fn test_missing_api_key_message() {
    let display = format!("{}", DensityAiError::MissingApiKey);

    assert!(display.contains("APIキー"));
    assert!(display.contains("density-ai config"));
    assert!(display.contains("ANTHROPIC_API_KEY"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: DensityAiError = io_err.into();

    assert!(matches!(err, DensityAiError::Io(_)));
    assert!(format!("{}", err).contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: DensityAiError = json_err.into();

    assert!(matches!(err, DensityAiError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_conversion() {
    let common_err = density_ai_common::Error::InvalidDensity("abc".to_string());
    let err: DensityAiError = common_err.into();

    assert!(matches!(err, DensityAiError::Common(_)));
    assert_eq!(format!("{}", err), "invalid density: abc");
}
