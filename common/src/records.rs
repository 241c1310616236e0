//! CSVレコード変換モジュール
//!
//! 密度リファレンスCSVと未解決食材CSVの行⇔型の変換を行う。
//! 不正な行はスキップし、理由を`Loaded::skipped`に残す（読み込み全体は中断しない）。

use crate::error::{Error, Result};
use crate::types::{Action, Confidence, ReferenceIngredient, Resolution, UnresolvedIngredient};
use csv::StringRecord;
use regex::Regex;
use std::io::Read;

/// 密度リファレンスCSVのヘッダー
pub const REFERENCE_HEADER: [&str; 5] = ["id", "ingredient", "normalised_form", "density", "source"];

/// 未解決食材CSVのヘッダー
pub const UNRESOLVED_HEADER: [&str; 7] = [
    "popularity",
    "density_ingredient",
    "action",
    "match_to",
    "density",
    "example",
    "confidence",
];

/// スキップされた行
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// データ行の番号（ヘッダーを除き1始まり）
    pub row: usize,
    pub reason: String,
}

/// 読み込み結果
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedRow>,
}

/// 密度の値をパース
///
/// 単一の値（"1.5"）と範囲（"1.0-2.0"）に対応。範囲の場合は上限を採用する。
///
/// # Examples
/// ```
/// use density_ai_common::parse_density_value;
///
/// assert_eq!(parse_density_value("1.5").unwrap(), 1.5);
/// assert_eq!(parse_density_value("1.0-2.0").unwrap(), 2.0);
/// assert!(parse_density_value("abc").is_err());
/// ```
pub fn parse_density_value(value: &str) -> Result<f64> {
    lazy_static::lazy_static! {
        static ref RANGE_RE: Regex = Regex::new(r"^\s*([\d.]+)\s*-\s*([\d.]+)\s*$").unwrap();
        static ref SINGLE_RE: Regex = Regex::new(r"^\s*([\d.]+)\s*$").unwrap();
    }

    let number = if let Some(caps) = RANGE_RE.captures(value) {
        caps.get(2).map(|m| m.as_str())
    } else if let Some(caps) = SINGLE_RE.captures(value) {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    };

    let number = number.ok_or_else(|| Error::InvalidDensity(value.to_string()))?;
    let density: f64 = number
        .parse()
        .map_err(|_| Error::InvalidDensity(value.to_string()))?;

    if density <= 0.0 {
        return Err(Error::InvalidDensity(value.to_string()));
    }
    Ok(density)
}

/// 密度リファレンスの1行をパース
pub fn parse_reference_row(row: &StringRecord) -> Result<ReferenceIngredient> {
    if row.len() < 5 {
        return Err(Error::InvalidRow(format!(
            "unexpected number of fields: {}",
            row.len()
        )));
    }

    let id = match row[0].trim() {
        "" => None,
        raw => Some(
            raw.parse::<i64>()
                .map_err(|e| Error::InvalidRow(format!("invalid id: {}", e)))?,
        ),
    };
    let density = parse_density_value(&row[3])?;

    Ok(ReferenceIngredient {
        id,
        ingredient: row[1].to_string(),
        normalised: row[2].to_string(),
        density,
        source: row[4].to_string(),
    })
}

/// 密度リファレンスを1行分の文字列に変換
pub fn reference_to_row(record: &ReferenceIngredient) -> Vec<String> {
    vec![
        record.id.map(|id| id.to_string()).unwrap_or_default(),
        record.ingredient.clone(),
        record.normalised.clone(),
        format_density(record.density),
        record.source.clone(),
    ]
}

/// 未解決食材の1行をパース
///
/// 列: popularity, density_ingredient, action?, match_to?, density?, example, confidence?
pub fn parse_unresolved_row(row: &StringRecord) -> Result<UnresolvedIngredient> {
    if row.len() < 6 {
        return Err(Error::InvalidRow(format!(
            "unexpected number of fields: {}",
            row.len()
        )));
    }

    let popularity = row[0]
        .trim()
        .parse::<i64>()
        .map_err(|e| Error::InvalidRow(format!("invalid popularity: {}", e)))?;

    let action = non_empty(&row[2])
        .map(|s| s.parse::<Action>().map_err(Error::InvalidRow))
        .transpose()?;
    let match_to = non_empty(&row[3]).map(str::to_string);
    let density = non_empty(&row[4]).map(parse_density_value).transpose()?;
    let confidence = row
        .get(6)
        .and_then(non_empty)
        .map(|s| s.parse::<Confidence>().map_err(Error::InvalidRow))
        .transpose()?;

    Ok(UnresolvedIngredient {
        popularity,
        ingredient: row[1].to_string(),
        example: row[5].to_string(),
        resolution: Resolution {
            action,
            match_to,
            density,
            confidence,
        },
    })
}

/// 未解決食材を1行分の文字列に変換
pub fn unresolved_to_row(record: &UnresolvedIngredient) -> Vec<String> {
    let resolution = &record.resolution;
    vec![
        record.popularity.to_string(),
        record.ingredient.clone(),
        resolution.action.map(|a| a.label().to_string()).unwrap_or_default(),
        resolution.match_to.clone().unwrap_or_default(),
        resolution.density.map(format_density).unwrap_or_default(),
        record.example.clone(),
        resolution
            .confidence
            .map(|c| c.label().to_string())
            .unwrap_or_default(),
    ]
}

/// 密度を小数点以下6桁で出力
pub fn format_density(density: f64) -> String {
    format!("{:.6}", density)
}

/// 密度リファレンスCSVを読み込み（ヘッダーはスキップ）
pub fn read_reference_csv<R: Read>(reader: R) -> Result<Loaded<ReferenceIngredient>> {
    read_rows(reader, parse_reference_row)
}

/// 未解決食材CSVを読み込み（ヘッダーはスキップ）
pub fn read_unresolved_csv<R: Read>(reader: R) -> Result<Loaded<UnresolvedIngredient>> {
    read_rows(reader, parse_unresolved_row)
}

fn read_rows<R, T, F>(reader: R, parse: F) -> Result<Loaded<T>>
where
    R: Read,
    F: Fn(&StringRecord) -> Result<T>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // CSVとして読めない行は致命的エラー
        let row = result?;
        match parse(&row) {
            Ok(record) => records.push(record),
            Err(e) => skipped.push(SkippedRow {
                row: idx + 1,
                reason: e.to_string(),
            }),
        }
    }

    Ok(Loaded { records, skipped })
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
