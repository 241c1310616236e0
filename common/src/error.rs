//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// 応答テキストが期待した形式に一致しない（元のテキストを保持）
    #[error("could not parse response: {0}")]
    Parse(String),

    #[error("invalid density: {0}")]
    InvalidDensity(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
