//! CSVファイルの読み書き
//!
//! - 密度リファレンスCSV / 未解決食材CSVの読み込み（不正行は警告してスキップ）
//! - 照合結果の出力先（1件ごとにflush）

use crate::error::{DensityAiError, Result};
use density_ai_common::{
    read_unresolved_csv, reference_to_row, unresolved_to_row, ReferenceCatalog, SkippedRow,
    UnresolvedIngredient, REFERENCE_HEADER, UNRESOLVED_HEADER,
};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

fn open(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(DensityAiError::FileNotFound(path.display().to_string()));
    }
    Ok(BufReader::new(File::open(path)?))
}

fn warn_skipped(path: &Path, skipped: &[SkippedRow]) {
    for row in skipped {
        tracing::warn!(
            file = %path.display(),
            row = row.row,
            reason = %row.reason,
            "could not parse row, skipping"
        );
    }
}

/// 密度リファレンスCSVを読み込み
pub fn load_catalog(path: &Path) -> Result<ReferenceCatalog> {
    let (catalog, skipped) = ReferenceCatalog::from_csv_reader(open(path)?)?;
    warn_skipped(path, &skipped);
    tracing::info!(
        file = %path.display(),
        loaded = catalog.len(),
        skipped = skipped.len(),
        "loaded density reference records"
    );
    Ok(catalog)
}

/// 未解決食材CSVを読み込み
pub fn load_unresolved(path: &Path) -> Result<Vec<UnresolvedIngredient>> {
    let loaded = read_unresolved_csv(open(path)?)?;
    warn_skipped(path, &loaded.skipped);
    tracing::info!(
        file = %path.display(),
        loaded = loaded.records.len(),
        skipped = loaded.skipped.len(),
        "loaded missing density records"
    );
    Ok(loaded.records)
}

/// 密度リファレンスを書き出し（範囲は上限値に正規化済み）
pub fn save_catalog(path: &Path, catalog: &ReferenceCatalog) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(REFERENCE_HEADER)?;
    for entry in catalog.iter() {
        writer.write_record(reference_to_row(entry))?;
    }
    writer.flush()?;
    Ok(())
}

/// 照合結果の出力先
pub trait RecordSink {
    fn write_record(&mut self, record: &UnresolvedIngredient) -> Result<()>;
}

/// CSV出力（ヘッダー付き、1件ごとにflush）
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(UNRESOLVED_HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| DensityAiError::Io(e.into_error()))
    }
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &UnresolvedIngredient) -> Result<()> {
        self.writer.write_record(unresolved_to_row(record))?;
        self.writer.flush()?;
        Ok(())
    }
}

impl RecordSink for Vec<UnresolvedIngredient> {
    fn write_record(&mut self, record: &UnresolvedIngredient) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use density_ai_common::{Action, Confidence, Resolution};

    #[test]
    fn test_csv_sink_writes_header_and_rows() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        let record = UnresolvedIngredient::new(5, "caster sugar", "2 tbsp").with_resolution(Resolution {
            action: Some(Action::AutoFill),
            match_to: Some("sugar".into()),
            density: Some(0.85),
            confidence: Some(Confidence::High),
        });
        sink.write_record(&record).unwrap();

        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(
            output,
            "popularity,density_ingredient,action,match_to,density,example,confidence\n\
             5,caster sugar,AUTO-FILL,sugar,0.850000,2 tbsp,HIGH\n"
        );
    }

    #[test]
    fn test_csv_sink_no_match_row() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        let record = UnresolvedIngredient::new(8, "unobtainium", "1 pinch").with_resolution(Resolution {
            action: Some(Action::NoMatch),
            match_to: None,
            density: None,
            confidence: Some(Confidence::NoMatch),
        });
        sink.write_record(&record).unwrap();

        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert!(output.ends_with("8,unobtainium,NO-MATCH,,,1 pinch,NO MATCH\n"));
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let result = load_catalog(Path::new("/nonexistent/density_reference.csv"));
        assert!(matches!(result, Err(DensityAiError::FileNotFound(_))));
    }
}
