//! Output directory layout

use crate::hits::SearchKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File name of the cumulative results table
pub const RESULTS_TABLE: &str = "PorinPredict_results_table.tsv";

/// Suffix of the per-sample result written by the classifier
pub const RESULT_SUFFIX: &str = "_PorinPredict.tsv";

/// Paths under one output directory
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub outdir: PathBuf,
}

impl OutputLayout {
    /// Create the output directory and its subdirectories if missing
    pub fn create(outdir: &Path) -> Result<Self> {
        std::fs::create_dir_all(outdir)
            .with_context(|| format!("Failed to create output directory: {}", outdir.display()))?;
        let outdir = outdir
            .canonicalize()
            .with_context(|| format!("Failed to resolve output directory: {}", outdir.display()))?;

        let layout = OutputLayout { outdir };
        for dir in SearchKind::ALL
            .iter()
            .map(|k| layout.search_dir(*k))
            .chain(std::iter::once(layout.logs_dir()))
        {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(layout)
    }

    /// Layout over an existing directory, without creating anything
    pub fn existing(outdir: &Path) -> Result<Self> {
        if !outdir.is_dir() {
            anyhow::bail!("Output directory not found: {}", outdir.display());
        }
        Ok(OutputLayout {
            outdir: outdir.to_path_buf(),
        })
    }

    pub fn search_dir(&self, kind: SearchKind) -> PathBuf {
        self.outdir.join(kind.dir_name())
    }

    /// Raw (then selected) hit table for one search
    pub fn hit_table(&self, kind: SearchKind, sample: &str) -> PathBuf {
        self.search_dir(kind).join(format!("{}.tsv", sample))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.outdir.join("logs")
    }

    pub fn log_file(&self, sample: &str) -> PathBuf {
        self.logs_dir().join(format!("{}.log", sample))
    }

    pub fn report_file(&self, sample: &str) -> PathBuf {
        self.logs_dir().join(format!("{}.json", sample))
    }

    pub fn result_file(&self, sample: &str) -> PathBuf {
        self.outdir.join(format!("{}{}", sample, RESULT_SUFFIX))
    }

    pub fn results_table(&self) -> PathBuf {
        self.outdir.join(RESULTS_TABLE)
    }
}
