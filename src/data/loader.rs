// ============================================================
// Layer 4 — CSV Loader
// ============================================================
// Loads a student table from a CSV file using the csv crate.
//
// Every cell becomes a FeatureValue:
//   ""      → Missing
//   "65.5"  → Number(65.5)
//   "Rural" → Text("Rural")
//
// Column typing (numeric vs categorical) is NOT decided here;
// the preprocessing pipeline owns that.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::student::{FeatureValue, RawTable};
use crate::domain::traits::TableSource;

/// Loads a RawTable from a CSV file with a header row.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSource for CsvLoader {
    fn load_table(&self) -> Result<RawTable> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Cannot open data file '{}'", self.path.display()))?;
        let table = read_table(file)
            .with_context(|| format!("Cannot parse CSV '{}'", self.path.display()))?;
        tracing::info!(
            "Loaded {} rows x {} columns from '{}'",
            table.len(),
            table.columns.len(),
            self.path.display()
        );
        Ok(table)
    }
}

/// Parse CSV from any reader. Ragged rows are padded with Missing.
pub fn read_table<R: std::io::Read>(reader: R) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut table = RawTable::new(columns);

    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV record at data row {}", i + 1))?;
        table.push_row(record.iter().map(FeatureValue::parse_cell).collect());
    }

    Ok(table)
}

/// Write a table as CSV with a header row. Missing cells are left empty.
pub fn write_table(table: &RawTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create CSV '{}'", path.display()))?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| match v {
            FeatureValue::Missing => String::new(),
            other                 => other.to_string(),
        }))?;
    }
    wtr.flush()?;
    tracing::debug!("Wrote {} rows to '{}'", table.len(), path.display());
    Ok(())
}
