//! AIレスポンスパーサー
//!
//! 自由記述のAI応答から確信度と照合候補を抽出する。
//! AIには "Confidence: <confidence>, Match <ingredient>" 形式を指示しているが、
//! 必ず守られるとは限らないため、大文字小文字・コロン・アスタリスクの揺れを許容する。

use crate::error::{Error, Result};
use crate::types::{Confidence, MatchCandidate};
use regex::Regex;

lazy_static::lazy_static! {
    /// "NO MATCH" で終わる応答
    static ref NO_MATCH_RE: Regex = Regex::new(r"(?i)\bNO[\s_-]?MATCH[.!]*$").unwrap();
    /// "<HIGH|MEDIUM|LOW>, Match <name>"
    static ref MATCH_RE: Regex = Regex::new(
        r"(?i)\b(HIGH|MEDIUM|LOW)\b[\s*]*[,;\-]?[\s*]*MATCH\b[\s:*]*(.+)"
    ).unwrap();
}

/// AI応答1回分をパース
///
/// 判定順序:
/// 1. 前後の装飾（コロン、アスタリスク、引用符、空白）を除去
/// 2. "NO MATCH" と一致、または "NO MATCH" で終わる → NoMatch
/// 3. "<確信度>, Match <食材名>" を検索 → Matched
/// 4. どちらでもない → `Error::Parse`（元のテキストを保持）
///
/// # Examples
/// ```
/// use density_ai_common::{parse_response, Confidence, MatchCandidate};
///
/// let candidate = parse_response("Confidence: HIGH, Match: flour").unwrap();
/// assert_eq!(candidate.confidence(), Confidence::High);
/// assert_eq!(candidate.name(), Some("flour"));
///
/// assert_eq!(parse_response("NO MATCH").unwrap(), MatchCandidate::NoMatch);
/// assert!(parse_response("xyz").is_err());
/// ```
pub fn parse_response(response: &str) -> Result<MatchCandidate> {
    let trimmed = trim_decoration(response);

    if NO_MATCH_RE.is_match(trimmed) {
        return Ok(MatchCandidate::NoMatch);
    }

    if let Some(caps) = MATCH_RE.captures(trimmed) {
        let confidence = match caps[1].to_uppercase().as_str() {
            "HIGH" => Confidence::High,
            "MEDIUM" => Confidence::Medium,
            _ => Confidence::Low,
        };
        let name = trim_decoration(&caps[2]).trim_end_matches('.').trim_end();
        if !name.is_empty() {
            return Ok(MatchCandidate::Matched {
                confidence,
                name: name.to_string(),
            });
        }
    }

    Err(Error::Parse(response.to_string()))
}

fn trim_decoration(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '*' | '"' | '`'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(confidence: Confidence, name: &str) -> MatchCandidate {
        MatchCandidate::Matched {
            confidence,
            name: name.to_string(),
        }
    }

    // =============================================
    // 正常系
    // =============================================

    #[test]
    fn test_parse_full_format() {
        let result = parse_response("Confidence: HIGH, Match: flour").unwrap();
        assert_eq!(result, matched(Confidence::High, "flour"));
    }

    #[test]
    fn test_parse_after_priming_prefix() {
        // "Confidence:" はアシスタントのプレフィルとして送るため、応答はその続きから始まる
        let result = parse_response(" MEDIUM, Match whole milk").unwrap();
        assert_eq!(result, matched(Confidence::Medium, "whole milk"));
    }

    #[test]
    fn test_parse_markdown_emphasis() {
        let result = parse_response(": **LOW**, Match: **tomato sauce**").unwrap();
        assert_eq!(result, matched(Confidence::Low, "tomato sauce"));
    }

    #[test]
    fn test_parse_case_insensitive_tokens() {
        let result = parse_response("confidence: high, match: brown sugar").unwrap();
        assert_eq!(result, matched(Confidence::High, "brown sugar"));
    }

    #[test]
    fn test_parse_name_keeps_internal_commas() {
        let result = parse_response("HIGH, Match tomato, chopped").unwrap();
        assert_eq!(result, matched(Confidence::High, "tomato, chopped"));
    }

    #[test]
    fn test_parse_ignores_trailing_explanation_lines() {
        let response = "HIGH, Match: rolled oats\n\nBoth are flaked oats with similar density.";
        let result = parse_response(response).unwrap();
        assert_eq!(result, matched(Confidence::High, "rolled oats"));
    }

    #[test]
    fn test_parse_trailing_period() {
        let result = parse_response("LOW, Match: rice.").unwrap();
        assert_eq!(result, matched(Confidence::Low, "rice"));
    }

    // =============================================
    // NO MATCH
    // =============================================

    #[test]
    fn test_parse_no_match_exact() {
        assert_eq!(parse_response("NO MATCH").unwrap(), MatchCandidate::NoMatch);
    }

    #[test]
    fn test_parse_no_match_suffix() {
        let response = "I could not find anything similar in the list. NO MATCH";
        assert_eq!(parse_response(response).unwrap(), MatchCandidate::NoMatch);
    }

    #[test]
    fn test_parse_no_match_variants() {
        assert_eq!(parse_response(" **NO MATCH**").unwrap(), MatchCandidate::NoMatch);
        assert_eq!(parse_response("no match.").unwrap(), MatchCandidate::NoMatch);
        assert_eq!(parse_response("NO_MATCH").unwrap(), MatchCandidate::NoMatch);
    }

    #[test]
    fn test_parse_no_match_takes_precedence() {
        assert_eq!(parse_response("LOW, Match: NO MATCH").unwrap(), MatchCandidate::NoMatch);
        assert_eq!(
            parse_response("Confidence: HIGH, Match: **NO MATCH**").unwrap(),
            MatchCandidate::NoMatch
        );
    }

    // =============================================
    // エラー系
    // =============================================

    #[test]
    fn test_parse_error_keeps_text() {
        let result = parse_response("xyz");
        match result {
            Err(Error::Parse(text)) => assert_eq!(text, "xyz"),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_response("").is_err());
        assert!(parse_response("   ").is_err());
    }

    #[test]
    fn test_parse_error_missing_name() {
        assert!(parse_response("HIGH, Match: **").is_err());
    }

    #[test]
    fn test_parse_error_unknown_confidence() {
        assert!(parse_response("Confidence: CERTAIN, Match: flour").is_err());
    }
}
