//! Cumulative results table
//!
//! Per-sample result files are tab-separated with a header row. Appending
//! takes the union of columns (in order of first appearance) and leaves
//! cells empty where a file lacks a column. The table is always rewritten in
//! full through a temporary file in the same directory.

use crate::layout::{OutputLayout, RESULT_SUFFIX};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A header plus rows read from a TSV file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn read(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open results: {}", path.display()))?;

        let columns: Vec<String> = rdr
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.with_context(|| format!("Failed to read row in {}", path.display()))?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        Ok(ResultTable { columns, rows })
    }

    /// Append `other`, adding any columns this table does not have yet
    pub fn append(&mut self, other: &ResultTable) {
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .map(|col| match self.columns.iter().position(|c| c == col) {
                Some(idx) => idx,
                None => {
                    self.columns.push(col.clone());
                    self.columns.len() - 1
                }
            })
            .collect();

        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        for src in &other.rows {
            let mut row = vec![String::new(); width];
            for (value, &idx) in src.iter().zip(&mapping) {
                row[idx] = value.clone();
            }
            self.rows.push(row);
        }
    }

    /// Write atomically: temp file in the target directory, then rename
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

        {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(temp.as_file_mut());
            wtr.write_record(&self.columns)?;
            for row in &self.rows {
                wtr.write_record(row)?;
            }
            wtr.flush()?;
        }
        temp.flush()?;

        temp.persist(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Append one sample's result file to the cumulative table.
///
/// The first append copies the file as-is.
pub fn append_result(table: &Path, result: &Path) -> Result<()> {
    if !table.exists() {
        std::fs::copy(result, table).with_context(|| {
            format!("Failed to create {} from {}", table.display(), result.display())
        })?;
        return Ok(());
    }

    let mut cumulative = ResultTable::read(table)?;
    let addition = ResultTable::read(result)?;
    cumulative.append(&addition);
    cumulative.write(table)
}

/// Per-sample result files in an output directory, sorted by file name
pub fn find_results(layout: &OutputLayout) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();
    for entry in std::fs::read_dir(&layout.outdir)
        .with_context(|| format!("Failed to read directory: {}", layout.outdir.display()))?
    {
        let path = entry?.path();
        let is_result = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(RESULT_SUFFIX) && n.len() > RESULT_SUFFIX.len())
            .unwrap_or(false);
        if is_result && path.is_file() {
            results.push(path);
        }
    }
    results.sort();
    Ok(results)
}

/// Rebuild the cumulative table from every per-sample result in `layout`
pub fn rebuild(layout: &OutputLayout) -> Result<usize> {
    let results = find_results(layout)?;
    if results.is_empty() {
        anyhow::bail!(
            "No *{} files found in {}",
            RESULT_SUFFIX,
            layout.outdir.display()
        );
    }

    let mut cumulative = ResultTable::default();
    for path in &results {
        log::debug!("Adding {}", path.display());
        cumulative.append(&ResultTable::read(path)?);
    }
    cumulative.write(&layout.results_table())?;
    Ok(results.len())
}
