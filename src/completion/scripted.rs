//! テスト用の補完サービス
//!
//! あらかじめ用意した応答を順番に返し、受け取ったターン列を記録する。

use super::{Completion, CompletionService, GenerationParams, Usage};
use crate::error::{DensityAiError, Result};
use async_trait::async_trait;
use density_ai_common::ConversationTurn;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    /// トランスポートエラー
    Fail(String),
    /// 応答を返さない（キャンセルのテスト用）
    Hang,
}

#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// テキスト応答のみのスクリプト
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedReply::Text(t.into())).collect())
    }

    /// 呼び出し回数
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 各呼び出しで受け取ったターン列
    pub fn requests(&self) -> Vec<Vec<ConversationTurn>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn invoke(&self, turns: &[ConversationTurn], _params: &GenerationParams) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(turns.to_vec());
        }

        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(ScriptedReply::Text(text)) => Ok(Completion {
                text,
                usage: Usage {
                    input_tokens: turns.len() as u64,
                    output_tokens: 1,
                    ..Usage::default()
                },
            }),
            Some(ScriptedReply::Fail(message)) => Err(DensityAiError::ApiCall(message)),
            Some(ScriptedReply::Hang) => std::future::pending::<Result<Completion>>().await,
            None => Err(DensityAiError::ApiCall("script exhausted".into())),
        }
    }
}
