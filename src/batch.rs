//! バッチ処理
//!
//! 未解決食材を順に照合エンジンへ渡し、結果を出力先へ書き出す。
//! 複数レコードを同時に処理する場合も、出力はレコード順に行う。

use crate::completion::{CompletionService, GenerationParams};
use crate::data::RecordSink;
use crate::engine::{AttemptKind, ConversationEngine, ConversationReport, Termination, DEFAULT_MAX_ATTEMPTS};
use crate::error::Result;
use density_ai_common::{apply_outcome, build_base_prompt, Action, ReferenceCatalog, UnresolvedIngredient};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 処理件数の上限（0は無制限）
    pub limit: usize,
    /// 同時に処理するレコード数
    pub concurrency: usize,
    pub max_attempts: usize,
    pub params: GenerationParams,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            concurrency: 1,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            params: GenerationParams::default(),
        }
    }
}

/// バッチ処理の集計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// 会話を完了したレコード数
    pub processed: usize,
    pub auto_filled: usize,
    pub review: usize,
    pub no_match: usize,
    pub unresolved: usize,
    /// 途中でキャンセルされたか
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn resolved(&self) -> usize {
        self.auto_filled + self.review + self.no_match
    }

    fn count(&mut self, action: Option<Action>) {
        match action {
            Some(Action::AutoFill) => self.auto_filled += 1,
            Some(Action::Review) => self.review += 1,
            Some(Action::NoMatch) => self.no_match += 1,
            None => self.unresolved += 1,
        }
    }
}

/// バッチ処理の結果
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub summary: BatchSummary,
    /// 照合結果を付与したレコード（処理順）
    pub resolved: Vec<UnresolvedIngredient>,
    /// 全レコードの会話結果（処理順、キャンセルで未着手のレコードは含まない）
    pub reports: Vec<ConversationReport>,
}

pub struct BatchDriver<'a> {
    catalog: &'a ReferenceCatalog,
    service: &'a dyn CompletionService,
    options: BatchOptions,
    progress: ProgressBar,
}

impl<'a> BatchDriver<'a> {
    pub fn new(catalog: &'a ReferenceCatalog, service: &'a dyn CompletionService, options: BatchOptions) -> Self {
        Self {
            catalog,
            service,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// 対象レコード数（limit適用後）
    pub fn target_count(&self, total: usize) -> usize {
        if self.options.limit > 0 {
            total.min(self.options.limit)
        } else {
            total
        }
    }

    pub async fn run(
        &self,
        records: &[UnresolvedIngredient],
        mut sink: Option<&mut dyn RecordSink>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        // ベースプロンプトはバッチ全体で共有（プロンプトキャッシュのため）
        let base_prompt = build_base_prompt(self.catalog);
        let engine = ConversationEngine::new(self.service, self.catalog, &base_prompt)
            .with_params(self.options.params)
            .with_max_attempts(self.options.max_attempts);
        let engine = &engine;

        let target = self.target_count(records.len());
        self.progress.set_length(target as u64);

        let mut conversations = stream::iter(records.iter().take(target).enumerate())
            .map(|(index, record)| async move {
                if cancel.is_cancelled() {
                    return (index, record, None);
                }
                let report = engine.resolve(&record.ingredient, cancel).await;
                (index, record, Some(report))
            })
            .buffered(self.options.concurrency.max(1));

        let mut summary = BatchSummary::default();
        let mut resolved = Vec::new();
        let mut reports = Vec::new();

        while let Some((index, record, report)) = conversations.next().await {
            let Some(report) = report else {
                continue;
            };
            log_report(index, &report);
            self.progress.inc(1);

            if report.termination == Termination::Cancelled {
                summary.unresolved += 1;
                reports.push(report);
                continue;
            }
            summary.processed += 1;

            match &report.outcome {
                Some(outcome) => {
                    let updated = apply_outcome(record, outcome);
                    summary.count(updated.resolution.action);
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.write_record(&updated)?;
                    }
                    resolved.push(updated);
                }
                None => summary.count(None),
            }
            reports.push(report);
        }

        summary.cancelled = cancel.is_cancelled();
        self.progress.finish_and_clear();

        tracing::info!(
            processed = summary.processed,
            auto_filled = summary.auto_filled,
            review = summary.review,
            no_match = summary.no_match,
            unresolved = summary.unresolved,
            cancelled = summary.cancelled,
            "batch finished"
        );

        Ok(BatchResult {
            summary,
            resolved,
            reports,
        })
    }
}

/// 1レコード分の会話をログ出力
fn log_report(index: usize, report: &ConversationReport) {
    let record = index + 1;
    let ingredient = report.ingredient.as_str();

    for event in &report.events {
        if let Some(usage) = event.usage {
            tracing::debug!(
                record,
                ingredient,
                attempt = event.attempt,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                cache_creation_input_tokens = usage.cache_creation_input_tokens,
                cache_read_input_tokens = usage.cache_read_input_tokens,
                "completion usage"
            );
        }

        match &event.kind {
            AttemptKind::Unparseable { reply } => tracing::warn!(
                record, ingredient, attempt = event.attempt, reply = %reply,
                "could not parse response"
            ),
            AttemptKind::UnknownCandidate { confidence, candidate } => tracing::warn!(
                record, ingredient, attempt = event.attempt, candidate = %candidate, confidence = %confidence,
                "claimed match not found in references"
            ),
            AttemptKind::Escalated { candidate } => tracing::info!(
                record, ingredient, attempt = event.attempt, candidate = %candidate,
                "low confidence match, asking for a more generic one"
            ),
            AttemptKind::Accepted { confidence, candidate } => tracing::info!(
                record, ingredient, attempt = event.attempt, candidate = %candidate, confidence = %confidence,
                "matched"
            ),
            AttemptKind::NoMatch => tracing::info!(
                record, ingredient, attempt = event.attempt,
                "no match found"
            ),
            AttemptKind::TransportFailed { error } => tracing::error!(
                record, ingredient, attempt = event.attempt, error = %error,
                "completion request failed"
            ),
            AttemptKind::Cancelled => tracing::warn!(
                record, ingredient, attempt = event.attempt,
                "cancelled"
            ),
        }
    }

    if report.used_fallback {
        tracing::info!(record, ingredient, "using previous best match due to low confidence");
    }

    match &report.outcome {
        Some(outcome) => tracing::info!(
            record,
            ingredient,
            confidence = %outcome.confidence,
            match_to = outcome.reference.as_ref().map(|r| r.normalised.as_str()).unwrap_or(""),
            density = outcome.reference.as_ref().map(|r| r.density).unwrap_or_default(),
            attempts = report.attempts,
            "resolved"
        ),
        None => tracing::warn!(
            record,
            ingredient,
            attempts = report.attempts,
            termination = ?report.termination,
            "left unresolved"
        ),
    }
}
