//! プロンプト生成モジュール
//!
//! - build_base_prompt: 照合ルール + リファレンス一覧（バッチ全体で1回だけ生成し、プロンプトキャッシュに載せる）
//! - build_question: 食材ごとの質問
//! - 再試行・エスカレーション用の訂正プロンプト

use crate::catalog::ReferenceCatalog;

/// 応答形式を誘導するためのアシスタント側プレフィル
pub const PRIMING_FRAGMENT: &str = "Confidence:";

/// 応答がパースできなかった場合の訂正プロンプト
pub const FORMAT_RETRY_PROMPT: &str = "Your response could not be parsed. Please respond in the format 'Confidence: <confidence>, Match <ingredient>' or 'NO MATCH'.";

const MATCHING_INSTRUCTIONS: &str = r#"Your job is to cross-reference ingredients between two lists. We are trying to perform weight->volume
conversions, so the purpose of matching is not to find a valid substitute per se but something of the same density
and consistency. Flavour profile is irrelevant.

You will be presented with an unknown ingredient and you must choose the best matching ingredient from the reference list.
If there is no good match, you should respond with "NO MATCH".

When choosing a match, consider that ingredients may be described in different ways. For example, "chopped tomatoes" and
"tomato, chopped" should be considered a match. However, "tomato sauce" and "tomato paste" are different ingredients and
should not be considered a match for "tomatoes".

Do not confuse fresh and dried ingredients. For example, "dried basil" and "fresh basil" are different ingredients; as are
dried fruits and fresh fruits.
Also, "dried potato flake" and "potato" are different ingredients as are "potato powder" and "potato".

Use the following guidelines when determining your confidence level:
- HIGH: The ingredients are clearly the same, just worded differently (e.g., "chopped tomatoes" vs "tomato, chopped").
- MEDIUM: The ingredients are similar but there are slight differences that may or may not be significant (e.g., "whole milk" vs "2% milk").
- LOW: The ingredients have some similarities but also notable differences that could affect their densities (e.g., "tomato sauce" vs "tomatoes",
"mashed potato" vs "potatoes").

You must ONLY use the ingredients in the reference list to make your match. Do NOT attempt to use any external knowledge.

Your response should be in the form "Confidence: <confidence>, Match <ingredient>" where <confidence> is one of "HIGH", "MEDIUM", or "LOW". If there is no good match, respond with "NO MATCH"."#;

/// ベースプロンプト生成
///
/// 照合ルールの後に、カタログの正規化名を1行1件の箇条書きで並べる。
/// カタログのみに依存する純粋関数。
pub fn build_base_prompt(catalog: &ReferenceCatalog) -> String {
    let reference_list: String = catalog
        .iter()
        .map(|entry| format!("- {}\n", entry.normalised))
        .collect();

    format!(
        "{MATCHING_INSTRUCTIONS}\n\nHere is the reference list:\n{reference_list}"
    )
}

/// 食材ごとの質問
pub fn build_question(ingredient: &str) -> String {
    format!("What is the best match for the ingredient: {}?", ingredient)
}

/// 候補がリファレンスに存在しなかった場合の訂正プロンプト
pub fn build_unknown_candidate_prompt(candidate: &str) -> String {
    format!(
        "The ingredient '{}' does not appear in the reference list.  Please try again.",
        candidate
    )
}

/// LOW確信度の候補に対し、より汎用的な候補を探させるプロンプト
pub fn build_escalation_prompt(ingredient: &str, candidate: &str) -> String {
    format!(
        "Check if there are not any more generic matches for '{}' that might fit better than '{}'",
        ingredient, candidate
    )
}
