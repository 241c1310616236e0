//! 照合エンジン
//!
//! 1食材分の会話を最大`max_attempts`回まで往復させ、最終結果を決める。
//!
//! 各試行の扱い:
//! - 補完サービスのエラー: 再試行せず即終了（フォールバック判定は行う）
//! - パース失敗（空応答を含む）: 応答と訂正プロンプトを追加して次の試行へ（空応答は訂正プロンプトのみ）
//! - NO MATCH: 即終了
//! - 候補がカタログにない: 応答と訂正プロンプトを追加して次の試行へ
//! - LOW: フォールバックとして保持し、より汎用的な候補を探させる
//! - MEDIUM / HIGH: 採用して終了
//!
//! 終了後、採用候補がない（またはNO MATCH）でフォールバックがあればそれを採用する。
//! キャンセル時はフォールバックを使わず未解決とする。
//!
//! エンジン自体はログを出力しない。試行ごとのイベントを`ConversationReport`で返す。

use crate::completion::{CompletionService, GenerationParams, Usage};
use density_ai_common::prompts::{build_escalation_prompt, build_unknown_candidate_prompt, FORMAT_RETRY_PROMPT};
use density_ai_common::{
    parse_response, Confidence, Conversation, ConversationTurn, MatchCandidate, MatchOutcome,
    ReferenceCatalog,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// 会話が終了した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// MEDIUM / HIGH の候補を採用
    Accepted,
    /// NO MATCH 応答
    NoMatch,
    /// 試行回数を使い切った
    Exhausted,
    /// 補完サービスのエラー
    TransportFailed,
    Cancelled,
}

/// 1試行の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptKind {
    Unparseable { reply: String },
    UnknownCandidate { confidence: Confidence, candidate: String },
    Escalated { candidate: String },
    Accepted { confidence: Confidence, candidate: String },
    NoMatch,
    TransportFailed { error: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptEvent {
    /// 1始まり
    pub attempt: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub kind: AttemptKind,
}

/// 1食材分の会話結果
#[derive(Debug, Clone, Serialize)]
pub struct ConversationReport {
    pub ingredient: String,
    /// Noneなら未解決
    pub outcome: Option<MatchOutcome>,
    /// 補完サービスを呼び出した回数
    pub attempts: usize,
    pub termination: Termination,
    /// LOWのフォールバックを採用したか
    pub used_fallback: bool,
    pub events: Vec<AttemptEvent>,
    pub turns: Vec<ConversationTurn>,
}

impl ConversationReport {
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}

pub struct ConversationEngine<'a> {
    service: &'a dyn CompletionService,
    catalog: &'a ReferenceCatalog,
    base_prompt: &'a str,
    params: GenerationParams,
    max_attempts: usize,
}

impl<'a> ConversationEngine<'a> {
    pub fn new(
        service: &'a dyn CompletionService,
        catalog: &'a ReferenceCatalog,
        base_prompt: &'a str,
    ) -> Self {
        Self {
            service,
            catalog,
            base_prompt,
            params: GenerationParams::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// 1食材分の会話を実行
    pub async fn resolve(&self, ingredient: &str, cancel: &CancellationToken) -> ConversationReport {
        let mut conversation = Conversation::start(self.base_prompt, ingredient);
        let mut current: Option<MatchOutcome> = None;
        let mut fallback: Option<MatchOutcome> = None;
        let mut events = Vec::new();
        let mut attempts = 0;
        let mut termination = Termination::Exhausted;

        while attempts < self.max_attempts {
            if cancel.is_cancelled() {
                termination = Termination::Cancelled;
                break;
            }
            attempts += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.service.invoke(conversation.turns(), &self.params) => Some(result),
            };

            let completion = match result {
                None => {
                    events.push(AttemptEvent {
                        attempt: attempts,
                        usage: None,
                        kind: AttemptKind::Cancelled,
                    });
                    termination = Termination::Cancelled;
                    break;
                }
                Some(Err(e)) => {
                    events.push(AttemptEvent {
                        attempt: attempts,
                        usage: None,
                        kind: AttemptKind::TransportFailed { error: e.to_string() },
                    });
                    termination = Termination::TransportFailed;
                    break;
                }
                Some(Ok(completion)) => completion,
            };

            let usage = Some(completion.usage);
            let kind = match parse_response(&completion.text) {
                Err(_) => {
                    // 空白のみのテキストブロックはAPIが受け付けない
                    if !completion.text.trim().is_empty() {
                        conversation.push_assistant(completion.text.as_str());
                    }
                    conversation.push_user(FORMAT_RETRY_PROMPT);
                    AttemptKind::Unparseable { reply: completion.text }
                }
                Ok(MatchCandidate::NoMatch) => {
                    current = Some(MatchOutcome::no_match());
                    termination = Termination::NoMatch;
                    events.push(AttemptEvent { attempt: attempts, usage, kind: AttemptKind::NoMatch });
                    break;
                }
                Ok(MatchCandidate::Matched { confidence, name }) => match self.catalog.lookup(&name) {
                    None => {
                        conversation.push_assistant(completion.text.as_str());
                        conversation.push_user(build_unknown_candidate_prompt(&name));
                        current = None;
                        AttemptKind::UnknownCandidate { confidence, candidate: name }
                    }
                    Some(reference) if confidence == Confidence::Low => {
                        // 直近のLOWで上書きする
                        fallback = Some(MatchOutcome::matched(Confidence::Low, reference.clone()));
                        current = None;
                        conversation.push_user(build_escalation_prompt(ingredient, &reference.normalised));
                        AttemptKind::Escalated { candidate: reference.normalised.clone() }
                    }
                    Some(reference) => {
                        current = Some(MatchOutcome::matched(confidence, reference.clone()));
                        termination = Termination::Accepted;
                        events.push(AttemptEvent {
                            attempt: attempts,
                            usage,
                            kind: AttemptKind::Accepted {
                                confidence,
                                candidate: reference.normalised.clone(),
                            },
                        });
                        break;
                    }
                },
            };
            events.push(AttemptEvent { attempt: attempts, usage, kind });
        }

        let mut used_fallback = false;
        let outcome = if termination == Termination::Cancelled {
            None
        } else {
            let needs_fallback = current
                .as_ref()
                .map_or(true, |c| c.confidence == Confidence::NoMatch);
            match fallback {
                Some(low) if needs_fallback => {
                    used_fallback = true;
                    Some(low)
                }
                _ => current,
            }
        };

        ConversationReport {
            ingredient: ingredient.to_string(),
            outcome,
            attempts,
            termination,
            used_fallback,
            events,
            turns: conversation.into_turns(),
        }
    }
}
