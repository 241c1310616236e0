use crate::error::{DensityAiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    /// 1回の応答の最大出力トークン
    pub max_tokens: u32,
    pub temperature: f32,
    /// 1食材あたりの最大試行回数
    pub max_attempts: usize,
    /// HTTPタイムアウト（秒）
    pub timeout_seconds: u64,
    /// 同時に処理する食材数
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-20250514".into(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            max_tokens: 10000,
            temperature: 0.3,
            max_attempts: 5,
            timeout_seconds: 120,
            concurrency: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 書き換え用に読み込み
    ///
    /// 設定ファイルが壊れている場合は初期値を返し、上書き保存で修復できるようにする
    pub fn load_for_update_from(path: &Path) -> Result<Self> {
        match Self::load_from(path) {
            Err(DensityAiError::JsonParse(e)) => {
                tracing::warn!(file = %path.display(), error = %e, "config file is malformed, starting from defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn load_for_update() -> Result<Self> {
        Self::load_for_update_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DensityAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("density-ai").join("config.json"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or(DensityAiError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// 値の妥当性チェック
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(DensityAiError::Config("max_attempts は1以上にしてください".into()));
        }
        if self.concurrency == 0 {
            return Err(DensityAiError::Config("concurrency は1以上にしてください".into()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(DensityAiError::Config(format!(
                "temperature は0.0〜1.0の範囲で指定してください: {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
