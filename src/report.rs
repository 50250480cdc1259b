//! Run report (JSON) written next to the sample log

use crate::hits::SearchKind;
use crate::select::Selection;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Execution metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionMetadata {
    /// Command line used
    pub command_line: String,
    /// Timestamp of execution
    pub timestamp: String,
    /// Duration in seconds
    pub duration_secs: f64,
    pub threads: usize,
}

/// Input assembly summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSummary {
    pub path: String,
    pub num_contigs: usize,
    pub total_length: usize,
}

/// Outcome of one search after best-hit selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub search: SearchKind,
    /// Selected-hit table on disk
    pub table: PathBuf,
    /// Usable rows the tool reported
    pub candidates: usize,
    /// `None` when the search found nothing
    pub selected: Option<SelectedHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedHit {
    pub subject: String,
    pub evalue: f64,
    pub bitscore: f64,
}

impl SearchSummary {
    pub fn new(selection: &Selection, table: &Path) -> Self {
        SearchSummary {
            search: selection.kind,
            table: table.to_path_buf(),
            candidates: selection.candidates,
            selected: selection.hit.as_ref().map(|hit| SelectedHit {
                subject: hit.subject().to_string(),
                evalue: hit.evalue,
                bitscore: hit.bitscore,
            }),
            warning: selection.warning.clone(),
        }
    }
}

/// Complete record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub version: String,
    pub sample: String,
    pub metadata: ExecutionMetadata,
    pub input: InputSummary,
    pub searches: Vec<SearchSummary>,
    /// Per-sample classifier output
    pub result_file: PathBuf,
    /// Cumulative table, when --summarize was given
    #[serde(default)]
    pub results_table: Option<PathBuf>,
}

impl RunReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("Failed to write JSON report")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::HitRecord;

    #[test]
    fn test_report_json_fields() {
        let fields: Vec<String> = "c1\toprD_PAO1\t1332\t100\t100\t1332\t0\t0\t0\t1\t1332\t1\t1332\t0.0\t2460"
            .split('\t')
            .map(String::from)
            .collect();
        let hit = HitRecord::from_fields(fields, SearchKind::BlastnOprd).unwrap();
        let with_hit = Selection {
            kind: SearchKind::BlastnOprd,
            sample: "S1".into(),
            hit: Some(hit),
            candidates: 2,
            warning: Some("WARNING: 2 candidate hits for blastn oprD in S1".into()),
        };
        let no_hit = Selection {
            kind: SearchKind::Diamond,
            sample: "S1".into(),
            hit: None,
            candidates: 0,
            warning: None,
        };

        let report = RunReport {
            version: "1.0.0".into(),
            sample: "S1".into(),
            metadata: ExecutionMetadata::default(),
            input: InputSummary {
                path: "S1.fasta".into(),
                num_contigs: 60,
                total_length: 6_300_000,
            },
            searches: vec![
                SearchSummary::new(&no_hit, Path::new("d.tsv")),
                SearchSummary::new(&with_hit, Path::new("o.tsv")),
            ],
            result_file: PathBuf::from("S1_PorinPredict.tsv"),
            results_table: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S1.json");
        report.save(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["sample"], "S1");
        assert_eq!(json["searches"][0]["search"], "diamond");
        assert!(json["searches"][0]["selected"].is_null());
        assert_eq!(json["searches"][1]["search"], "blastn_oprd");
        assert_eq!(json["searches"][1]["selected"]["subject"], "oprD_PAO1");
        assert_eq!(json["searches"][1]["selected"]["bitscore"], 2460.0);
        assert!(json["searches"][0].get("warning").is_none());
        assert_eq!(
            json["searches"][1]["warning"],
            "WARNING: 2 candidate hits for blastn oprD in S1"
        );
    }
}
