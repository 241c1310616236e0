//! 照合結果の反映
//!
//! 会話の最終結果から確信度・照合先・密度・アクションを決め、レコードに付与する。
//!
//! | 確信度 | アクション |
//! |---|---|
//! | HIGH / MEDIUM | AUTO-FILL |
//! | LOW | REVIEW |
//! | NO MATCH | NO-MATCH |

use crate::types::{MatchOutcome, Resolution, UnresolvedIngredient};

/// 最終結果から照合結果を作成
pub fn resolution_for(outcome: &MatchOutcome) -> Resolution {
    Resolution {
        action: Some(outcome.confidence.action()),
        match_to: outcome.reference.as_ref().map(|r| r.normalised.clone()),
        density: outcome.reference.as_ref().map(|r| r.density),
        confidence: Some(outcome.confidence),
    }
}

/// 照合結果を付与したレコードを返す（元のレコードは変更しない）
pub fn apply_outcome(record: &UnresolvedIngredient, outcome: &MatchOutcome) -> UnresolvedIngredient {
    record.with_resolution(resolution_for(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Confidence, ReferenceIngredient};

    fn sugar() -> ReferenceIngredient {
        ReferenceIngredient {
            id: Some(4),
            ingredient: "Granulated Sugar".to_string(),
            normalised: "sugar".to_string(),
            density: 0.85,
            source: "USDA".to_string(),
        }
    }

    fn record() -> UnresolvedIngredient {
        UnresolvedIngredient::new(1, "caster sugar", "2 tbsp caster sugar")
    }

    #[test]
    fn test_apply_high_is_auto_fill() {
        let resolved = apply_outcome(&record(), &MatchOutcome::matched(Confidence::High, sugar()));
        assert_eq!(resolved.resolution.action, Some(Action::AutoFill));
        assert_eq!(resolved.resolution.match_to.as_deref(), Some("sugar"));
        assert_eq!(resolved.resolution.density, Some(0.85));
        assert_eq!(resolved.resolution.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_apply_medium_is_auto_fill() {
        let resolved = apply_outcome(&record(), &MatchOutcome::matched(Confidence::Medium, sugar()));
        assert_eq!(resolved.resolution.action, Some(Action::AutoFill));
    }

    #[test]
    fn test_apply_low_is_review() {
        let resolved = apply_outcome(&record(), &MatchOutcome::matched(Confidence::Low, sugar()));
        assert_eq!(resolved.resolution.action, Some(Action::Review));
        assert_eq!(resolved.resolution.density, Some(0.85));
    }

    #[test]
    fn test_apply_no_match_clears_match_fields() {
        let mut previous = record();
        previous.resolution.match_to = Some("stale".to_string());
        previous.resolution.density = Some(9.9);

        let resolved = apply_outcome(&previous, &MatchOutcome::no_match());
        assert_eq!(resolved.resolution.action, Some(Action::NoMatch));
        assert_eq!(resolved.resolution.confidence, Some(Confidence::NoMatch));
        assert_eq!(resolved.resolution.match_to, None);
        assert_eq!(resolved.resolution.density, None);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let outcome = MatchOutcome::matched(Confidence::Low, sugar());
        let once = apply_outcome(&record(), &outcome);
        let twice = apply_outcome(&once, &outcome);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_keeps_identity_fields() {
        let resolved = apply_outcome(&record(), &MatchOutcome::no_match());
        assert_eq!(resolved.popularity, 1);
        assert_eq!(resolved.ingredient, "caster sugar");
        assert_eq!(resolved.example, "2 tbsp caster sugar");
    }
}
