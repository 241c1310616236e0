//! 補完サービス連携モジュール
//!
//! 会話ターン列を送り、アシスタントの応答テキストを受け取る。
//! - anthropic: Anthropic Messages API（プロンプトキャッシュ対応）
//! - claude_cli: ローカルの Claude CLI（ターン列を1つのプロンプトに展開）
//! - scripted: 固定応答を返すテスト用実装

mod anthropic;
mod claude_cli;
mod scripted;

pub use anthropic::AnthropicClient;
pub use claude_cli::ClaudeCliClient;
pub use scripted::{ScriptedCompletion, ScriptedReply};

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use density_ai_common::ConversationTurn;
use serde::{Deserialize, Serialize};

/// 生成パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 10000,
            temperature: 0.3,
        }
    }
}

impl From<&Config> for GenerationParams {
    fn from(config: &Config) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// トークン使用量（ログ出力のみに使用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// 補完結果
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// 補完サービス
///
/// エラーはすべてトランスポートエラーとして扱われ、呼び出し側で再試行はしない
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn invoke(&self, turns: &[ConversationTurn], params: &GenerationParams) -> Result<Completion>;
}

/// プロバイダに応じたクライアントを生成
pub fn build_service(
    provider: AiProvider,
    config: &Config,
    verbose: bool,
) -> Result<Box<dyn CompletionService>> {
    match provider {
        AiProvider::Anthropic => Ok(Box::new(AnthropicClient::new(
            config.get_api_key()?,
            config.model.clone(),
            config.api_base_url.clone(),
            config.timeout_seconds,
        )?)),
        AiProvider::Claude => {
            tracing::debug!(
                max_tokens = config.max_tokens,
                temperature = config.temperature,
                "Claude CLI does not accept generation parameters, ignoring"
            );
            Ok(Box::new(ClaudeCliClient::new(
                Some(config.model.clone()),
                verbose,
            )))
        }
    }
}
