//! 照合処理の型定義
//!
//! CLIと共通ライブラリで共有される型:
//! - ReferenceIngredient: 密度リファレンス（既知の密度を持つ食材）
//! - UnresolvedIngredient: 密度が未知の食材と、その照合結果
//! - MatchCandidate: AI応答1回分のパース結果
//! - MatchOutcome: 会話の最終結果

use serde::{Deserialize, Serialize};

/// AIが自己申告する確信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    NoMatch,
}

impl Confidence {
    /// CSV出力用のラベル
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
            Confidence::NoMatch => "NO MATCH",
        }
    }

    /// 確信度から決まるアクション
    pub fn action(&self) -> Action {
        match self {
            Confidence::High | Confidence::Medium => Action::AutoFill,
            Confidence::Low => Action::Review,
            Confidence::NoMatch => Action::NoMatch,
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HIGH" => Ok(Confidence::High),
            "MEDIUM" => Ok(Confidence::Medium),
            "LOW" => Ok(Confidence::Low),
            "NO MATCH" | "NO_MATCH" | "NO-MATCH" => Ok(Confidence::NoMatch),
            _ => Err(format!("Unknown confidence: {}", s)),
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 照合後に取るべきアクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "AUTO-FILL")]
    AutoFill,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "NO-MATCH")]
    NoMatch,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::AutoFill => "AUTO-FILL",
            Action::Review => "REVIEW",
            Action::NoMatch => "NO-MATCH",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AUTO-FILL" | "AUTO_FILL" | "AUTOFILL" => Ok(Action::AutoFill),
            "REVIEW" => Ok(Action::Review),
            "NO-MATCH" | "NO MATCH" | "NO_MATCH" => Ok(Action::NoMatch),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 密度リファレンス1件（読み込み後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceIngredient {
    /// 未採番の場合はNone
    pub id: Option<i64>,
    pub ingredient: String,
    /// 照合キー
    pub normalised: String,
    /// g/ml
    pub density: f64,
    pub source: String,
}

/// 照合結果（未照合ならすべて空）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: Option<Action>,
    pub match_to: Option<String>,
    pub density: Option<f64>,
    pub confidence: Option<Confidence>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.action.is_none()
            && self.match_to.is_none()
            && self.density.is_none()
            && self.confidence.is_none()
    }
}

/// 密度が未知の食材
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedIngredient {
    pub popularity: i64,
    pub ingredient: String,
    /// レシピでの使用例
    pub example: String,
    #[serde(default)]
    pub resolution: Resolution,
}

impl UnresolvedIngredient {
    pub fn new(popularity: i64, ingredient: impl Into<String>, example: impl Into<String>) -> Self {
        Self {
            popularity,
            ingredient: ingredient.into(),
            example: example.into(),
            resolution: Resolution::default(),
        }
    }

    /// 照合結果を差し替えた新しいレコードを返す
    pub fn with_resolution(&self, resolution: Resolution) -> Self {
        Self {
            resolution,
            ..self.clone()
        }
    }
}

/// AI応答1回分のパース結果
///
/// NO MATCHの場合は候補名を持たない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchCandidate {
    Matched { confidence: Confidence, name: String },
    NoMatch,
}

impl MatchCandidate {
    pub fn confidence(&self) -> Confidence {
        match self {
            MatchCandidate::Matched { confidence, .. } => *confidence,
            MatchCandidate::NoMatch => Confidence::NoMatch,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            MatchCandidate::Matched { name, .. } => Some(name.as_str()),
            MatchCandidate::NoMatch => None,
        }
    }
}

/// 会話の最終結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub confidence: Confidence,
    /// NO MATCHの場合はNone
    pub reference: Option<ReferenceIngredient>,
}

impl MatchOutcome {
    pub fn matched(confidence: Confidence, reference: ReferenceIngredient) -> Self {
        Self {
            confidence,
            reference: Some(reference),
        }
    }

    pub fn no_match() -> Self {
        Self {
            confidence: Confidence::NoMatch,
            reference: None,
        }
    }
}
