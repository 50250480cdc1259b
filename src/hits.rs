//! Tabular hit records produced by the external search tools
//!
//! Both tools write headerless, tab-separated rows (`--outfmt 6` / `-outfmt 6`)
//! with a fixed column list. Fields are kept as the raw text the tool wrote so
//! that a selected row is written back byte-for-byte; only the e-value and bit
//! score columns are parsed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Marker written in place of a hit when a search found nothing
pub const NO_HIT: &str = "no hit";

/// DIAMOND blastx output columns
pub const DIAMOND_COLUMNS: [&str; 17] = [
    "qseqid", "sseqid", "slen", "pident", "scovhsp", "length", "mismatch", "gapopen",
    "qstart", "qend", "sstart", "send", "evalue", "bitscore", "qstrand",
    "qseq_translated", "full_sseq",
];

/// blastn output columns
pub const BLASTN_COLUMNS: [&str; 15] = [
    "qseqid", "sseqid", "slen", "pident", "qcovs", "length", "mismatch", "gaps",
    "gapopen", "qstart", "qend", "sstart", "send", "evalue", "bitscore",
];

/// The three searches run against every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Protein-coding region search (DIAMOND blastx against the OprD protein)
    Diamond,
    /// Nucleotide search against the oprD promoter region
    BlastnPromoter,
    /// Nucleotide search against the full oprD gene
    BlastnOprd,
}

impl SearchKind {
    pub const ALL: [SearchKind; 3] = [
        SearchKind::Diamond,
        SearchKind::BlastnPromoter,
        SearchKind::BlastnOprd,
    ];

    /// Column names the tool emits for this search
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            SearchKind::Diamond => &DIAMOND_COLUMNS,
            SearchKind::BlastnPromoter | SearchKind::BlastnOprd => &BLASTN_COLUMNS,
        }
    }

    pub fn evalue_column(&self) -> usize {
        match self {
            SearchKind::Diamond => 12,
            SearchKind::BlastnPromoter | SearchKind::BlastnOprd => 13,
        }
    }

    pub fn bitscore_column(&self) -> usize {
        self.evalue_column() + 1
    }

    /// Name of the per-search directory under the output directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            SearchKind::Diamond => "temp_dir_diamond",
            SearchKind::BlastnPromoter => "temp_dir_blastn_prom",
            SearchKind::BlastnOprd => "temp_dir_blastn_oprd",
        }
    }

    pub fn is_protein(&self) -> bool {
        matches!(self, SearchKind::Diamond)
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SearchKind::Diamond => "DIAMOND",
            SearchKind::BlastnPromoter => "blastn promoter sequence",
            SearchKind::BlastnOprd => "blastn oprD",
        };
        f.write_str(label)
    }
}

/// One row of search output
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    /// Raw fields in tool column order
    pub fields: Vec<String>,
    pub evalue: f64,
    pub bitscore: f64,
}

impl HitRecord {
    /// Build a record from raw fields, parsing the e-value and bit score.
    ///
    /// Returns `None` when the row is too short or either score is not a number.
    pub fn from_fields(fields: Vec<String>, kind: SearchKind) -> Option<Self> {
        let evalue = parse_score(fields.get(kind.evalue_column())?)?;
        let bitscore = parse_score(fields.get(kind.bitscore_column())?)?;
        Some(HitRecord {
            fields,
            evalue,
            bitscore,
        })
    }

    /// Subject (reference) identifier
    pub fn subject(&self) -> &str {
        self.fields.get(1).map(String::as_str).unwrap_or("")
    }
}

fn parse_score(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// All rows from one search against one sample, in file order
#[derive(Debug, Clone, Default)]
pub struct HitTable {
    pub records: Vec<HitRecord>,
    /// Sample tag found in an extra trailing column, if the table was
    /// already selected once
    pub tagged_sample: Option<String>,
    /// Rows that could not be interpreted
    pub skipped: usize,
}

impl HitTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Parse a headerless tab-separated table
    pub fn parse<R: Read>(reader: R, kind: SearchKind) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let width = kind.columns().len();
        let mut table = HitTable::default();

        for (line_no, row) in rdr.records().enumerate() {
            let row = row.with_context(|| format!("Failed to read {} row {}", kind, line_no + 1))?;
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            // Sentinel from an earlier selection: nothing to read, nothing to report
            if row.get(0) == Some(NO_HIT) {
                table.tagged_sample = row.get(1).map(str::to_string);
                continue;
            }

            let mut fields: Vec<String> = row.iter().map(|f| f.to_string()).collect();
            // A trailing sample column means this row went through selection before
            if fields.len() == width + 1 {
                table.tagged_sample = fields.pop();
            }

            match HitRecord::from_fields(fields, kind) {
                Some(record) => table.records.push(record),
                None => {
                    log::warn!(
                        "Skipping unreadable {} row {}: expected numeric e-value and bit score",
                        kind,
                        line_no + 1
                    );
                    table.skipped += 1;
                }
            }
        }

        Ok(table)
    }

    /// Read a table from disk. A missing or zero-byte file is an empty table.
    pub fn from_path(path: &Path, kind: SearchKind) -> Result<Self> {
        if !path.exists() {
            log::warn!("{} produced no output file at {}", kind, path.display());
            return Ok(HitTable::default());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open hit table: {}", path.display()))?;
        HitTable::parse(file, kind)
            .with_context(|| format!("Failed to parse hit table: {}", path.display()))
    }
}
