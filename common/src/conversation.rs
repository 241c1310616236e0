//! 会話ターンの管理
//!
//! 1食材分の会話履歴。最初のターン（ベースプロンプト）にのみキャッシュブレークポイントを付ける。

use crate::prompts::{build_question, PRIMING_FRAGMENT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// 会話の1ターン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    /// プロンプトキャッシュの境界（照合ロジックには影響しない）
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cache_breakpoint: bool,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            cache_breakpoint: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            cache_breakpoint: false,
        }
    }

    fn cached_user(text: impl Into<String>) -> Self {
        Self {
            cache_breakpoint: true,
            ..Self::user(text)
        }
    }
}

/// 順序付きの会話履歴
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    /// 初期状態: [user: ベースプロンプト(キャッシュ), user: 質問, assistant: "Confidence:"]
    pub fn start(base_prompt: &str, ingredient: &str) -> Self {
        Self {
            turns: vec![
                ConversationTurn::cached_user(base_prompt),
                ConversationTurn::user(build_question(ingredient)),
                ConversationTurn::assistant(PRIMING_FRAGMENT),
            ],
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::assistant(text));
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
