//! Anthropic Messages API クライアント
//!
//! 最初のターンに `cache_control: ephemeral` を付与し、ベースプロンプトをキャッシュさせる。

use super::{Completion, CompletionService, GenerationParams, Usage};
use crate::error::{DensityAiError, Result};
use async_trait::async_trait;
use density_ai_common::ConversationTurn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CACHE_CONTROL_EPHEMERAL: &str = "ephemeral";

/// Messages APIリクエスト
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
struct ContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Messages APIレスポンス
#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| DensityAiError::ApiCall(format!("HTTPクライアント初期化エラー: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn build_request<'a>(
    model: &'a str,
    turns: &'a [ConversationTurn],
    params: &GenerationParams,
) -> MessagesRequest<'a> {
    let messages = turns
        .iter()
        .map(|turn| Message {
            role: turn.role.as_str(),
            content: vec![ContentBlock {
                kind: "text",
                text: &turn.text,
                cache_control: turn.cache_breakpoint.then_some(CacheControl {
                    kind: CACHE_CONTROL_EPHEMERAL,
                }),
            }],
        })
        .collect();

    MessagesRequest {
        model,
        max_tokens: params.max_tokens,
        temperature: params.temperature,
        messages,
    }
}

/// テキストブロックを連結
///
/// テキストがない場合は空文字列を返し、パース失敗として再試行させる
fn response_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect()
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn invoke(&self, turns: &[ConversationTurn], params: &GenerationParams) -> Result<Completion> {
        let request = build_request(&self.model, turns, params);

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DensityAiError::ApiCall(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DensityAiError::ApiCall(format!(
                "Anthropic API failed (status {}): {}",
                status, body
            )));
        }

        let payload: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DensityAiError::ApiParse(e.to_string()))?;

        Ok(Completion {
            text: response_text(&payload),
            usage: payload.usage,
        })
    }
}
