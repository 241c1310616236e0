//! 密度リファレンスカタログ
//!
//! 既知の密度を持つ食材の一覧を保持し、正規化名の完全一致で検索する。
//! 読み込み後は不変で、バッチ全体から読み取り専用で共有される。

use crate::error::Result;
use crate::records::{read_reference_csv, SkippedRow};
use crate::types::ReferenceIngredient;
use std::io::Read;

/// 密度リファレンスカタログ
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: Vec<ReferenceIngredient>,
}

impl ReferenceCatalog {
    pub fn new(entries: Vec<ReferenceIngredient>) -> Self {
        Self { entries }
    }

    /// CSVから読み込み
    ///
    /// パースできなかった行はスキップし、呼び出し側へ返す
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<(Self, Vec<SkippedRow>)> {
        let loaded = read_reference_csv(reader)?;
        Ok((Self::new(loaded.records), loaded.skipped))
    }

    /// 正規化名で検索（装飾文字を除去した完全一致、最初の一致を返す）
    ///
    /// # Examples
    /// ```
    /// use density_ai_common::{ReferenceCatalog, ReferenceIngredient};
    ///
    /// let catalog = ReferenceCatalog::new(vec![ReferenceIngredient {
    ///     id: Some(1),
    ///     ingredient: "Flour".into(),
    ///     normalised: "flour".into(),
    ///     density: 0.59,
    ///     source: "USDA".into(),
    /// }]);
    /// assert!(catalog.lookup("**flour**").is_some());
    /// assert!(catalog.lookup("Flour").is_none());
    /// ```
    pub fn lookup(&self, name: &str) -> Option<&ReferenceIngredient> {
        let query = strip_decoration(name);
        self.entries.iter().find(|entry| entry.normalised == query)
    }

    pub fn entries(&self) -> &[ReferenceIngredient] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceIngredient> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// マークダウンの強調（`*`、`` ` ``）と前後の空白を除去
pub fn strip_decoration(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '*' && *c != '`')
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(normalised: &str, density: f64) -> ReferenceIngredient {
        ReferenceIngredient {
            id: None,
            ingredient: normalised.to_string(),
            normalised: normalised.to_string(),
            density,
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_lookup_strips_decoration() {
        let catalog = ReferenceCatalog::new(vec![entry("flour", 0.59)]);
        let found = catalog.lookup("**flour**").expect("flour should match");
        assert_eq!(found.normalised, "flour");
        assert!(catalog.lookup(" `flour` ").is_some());
    }

    #[test]
    fn test_lookup_is_exact() {
        let catalog = ReferenceCatalog::new(vec![entry("tomato, chopped", 0.9)]);
        assert!(catalog.lookup("tomato, chopped").is_some());
        assert!(catalog.lookup("tomato").is_none());
        assert!(catalog.lookup("Tomato, Chopped").is_none());
    }

    #[test]
    fn test_lookup_returns_first_match() {
        let catalog = ReferenceCatalog::new(vec![entry("milk", 1.03), entry("milk", 1.5)]);
        assert_eq!(catalog.lookup("milk").map(|e| e.density), Some(1.03));
    }

    #[test]
    fn test_lookup_empty_catalog() {
        let catalog = ReferenceCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.lookup("flour").is_none());
    }

    #[test]
    fn test_from_csv_reader() {
        let csv = "id,ingredient,normalised_form,density,source\n\
                   1,Flour,flour,0.59,USDA\n\
                   bad,Sugar,sugar,0.85,USDA\n";
        let (catalog, skipped) = ReferenceCatalog::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].reason.contains("invalid id"));
    }

    #[test]
    fn test_strip_decoration() {
        assert_eq!(strip_decoration("**brown sugar**"), "brown sugar");
        assert_eq!(strip_decoration("  rice  "), "rice");
        assert_eq!(strip_decoration("*"), "");
    }
}
