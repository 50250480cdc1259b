//! Best-hit selection
//!
//! Every raw hit table is reduced to a single row per sample: the lowest
//! e-value wins, ties on e-value go to the highest bit score, and complete
//! ties keep the row the tool reported first. An empty table becomes the
//! `no hit` sentinel row. Neither case is an error.

use crate::hits::{HitRecord, HitTable, SearchKind, NO_HIT};
use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::path::Path;

/// Outcome of selecting over one hit table
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub kind: SearchKind,
    pub sample: String,
    /// Chosen record, `None` for the sentinel
    pub hit: Option<HitRecord>,
    /// Number of usable records the choice was made from
    pub candidates: usize,
    /// Multi-candidate warning, logged when the selection was made
    pub warning: Option<String>,
}

impl Selection {
    /// Render the selected row with the sample identifier appended
    pub fn to_row(&self) -> String {
        match &self.hit {
            Some(record) => format!("{}\t{}\n", record.fields.join("\t"), self.sample),
            None => format!("{}\t{}\n", NO_HIT, self.sample),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_row())
            .with_context(|| format!("Failed to write selected hit: {}", path.display()))
    }
}

/// Ranking used for selection: ascending e-value, then descending bit score
pub fn rank(a: &HitRecord, b: &HitRecord) -> Ordering {
    a.evalue
        .total_cmp(&b.evalue)
        .then_with(|| b.bitscore.total_cmp(&a.bitscore))
}

/// Warning for a table with more than one usable record
fn multi_candidate_warning(kind: SearchKind, sample: &str, candidates: usize) -> Option<String> {
    if candidates < 2 {
        return None;
    }
    let message = if kind.is_protein() {
        format!(
            "WARNING: More than one OprD detected in {}, likely representing more than one P. aeruginosa strain in the sample. PorinPredict analyzes only the first hit.",
            sample
        )
    } else {
        format!(
            "WARNING: {} candidate hits for {} in {}; keeping the lowest e-value (highest bit score on ties).",
            candidates, kind, sample
        )
    };
    Some(message)
}

/// Choose the best record of `table` for `sample`
pub fn select_best(table: &HitTable, kind: SearchKind, sample: &str) -> Selection {
    let candidates = table.len();

    let warning = multi_candidate_warning(kind, sample, candidates);
    if let Some(message) = &warning {
        log::warn!("{}", message);
    }

    if table.is_empty() {
        log::info!("No {} hit for {}", kind, sample);
    }

    // min_by keeps the first of several equal minima
    let hit = table.records.iter().min_by(|a, b| rank(a, b)).cloned();

    Selection {
        kind,
        sample: sample.to_string(),
        hit,
        candidates,
        warning,
    }
}

/// Read a raw search table, select the best hit and rewrite the file in place
pub fn select_file(path: &Path, kind: SearchKind, sample: &str) -> Result<Selection> {
    let table = HitTable::from_path(path, kind)?;
    if table.skipped > 0 {
        log::warn!(
            "{}: ignored {} unreadable row(s) in {}",
            kind,
            table.skipped,
            path.display()
        );
    }
    if let Some(tag) = table.tagged_sample.as_deref().filter(|tag| *tag != sample) {
        log::warn!(
            "{} was already selected for sample {}; re-tagging it as {}",
            path.display(),
            tag,
            sample
        );
    }

    let selection = select_best(&table, kind, sample);
    selection.write(path)?;

    if let Some(hit) = &selection.hit {
        log::debug!(
            "{}: selected {} (e-value {:e}, bit score {}) from {} candidate(s)",
            kind,
            hit.subject(),
            hit.evalue,
            hit.bitscore,
            selection.candidates
        );
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond_record(subject: &str, evalue: f64, bitscore: f64) -> HitRecord {
        let mut fields: Vec<String> = vec![
            "contig_7", subject, "443", "99.8", "100", "443", "1", "0", "2001", "3329", "1",
            "443", "", "", "+", "MKVMKWSAIALAVSAGSTQFAVA", "MKVMKWSAIALAVSAGSTQFAVA",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        fields[12] = format!("{:e}", evalue);
        fields[13] = bitscore.to_string();
        HitRecord::from_fields(fields, SearchKind::Diamond).unwrap()
    }

    fn blastn_record(subject: &str, evalue: f64, bitscore: f64) -> HitRecord {
        let mut fields: Vec<String> = vec![
            "contig_7", subject, "1332", "98.5", "100", "1332", "20", "0", "0", "500", "1831",
            "1", "1332", "", "",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        fields[13] = format!("{:e}", evalue);
        fields[14] = bitscore.to_string();
        HitRecord::from_fields(fields, SearchKind::BlastnOprd).unwrap()
    }

    fn table(records: Vec<HitRecord>) -> HitTable {
        HitTable {
            records,
            ..Default::default()
        }
    }

    #[test]
    fn test_lower_evalue_beats_higher_bitscore() {
        let t = table(vec![
            diamond_record("OprD_PAO1", 1e-50, 200.0),
            diamond_record("OprD_PA14", 1e-80, 150.0),
        ]);
        let sel = select_best(&t, SearchKind::Diamond, "S1");

        let hit = sel.hit.as_ref().unwrap();
        assert_eq!(hit.evalue, 1e-80);
        assert_eq!(hit.subject(), "OprD_PA14");
        assert_eq!(sel.candidates, 2);
        assert!(sel.to_row().ends_with("\tS1\n"));

        let warning = sel.warning.unwrap();
        assert!(warning.starts_with("WARNING: More than one OprD detected in S1"));
    }

    #[test]
    fn test_equal_evalue_prefers_higher_bitscore() {
        let t = table(vec![
            blastn_record("oprD_a", 1e-30, 120.0),
            blastn_record("oprD_b", 1e-30, 180.0),
        ]);
        let sel = select_best(&t, SearchKind::BlastnOprd, "S2");

        let hit = sel.hit.unwrap();
        assert_eq!(hit.bitscore, 180.0);
        assert_eq!(hit.subject(), "oprD_b");
        assert_eq!(
            sel.warning.as_deref(),
            Some("WARNING: 2 candidate hits for blastn oprD in S2; keeping the lowest e-value (highest bit score on ties).")
        );
    }

    #[test]
    fn test_complete_tie_keeps_first_row() {
        let t = table(vec![
            blastn_record("first", 1e-30, 180.0),
            blastn_record("second", 1e-30, 180.0),
        ]);
        let sel = select_best(&t, SearchKind::BlastnPromoter, "S2");
        assert_eq!(sel.hit.unwrap().subject(), "first");
    }

    #[test]
    fn test_empty_table_gives_sentinel() {
        for kind in SearchKind::ALL {
            let sel = select_best(&HitTable::default(), kind, "S3");
            assert!(sel.hit.is_none());
            assert_eq!(sel.candidates, 0);
            assert!(sel.warning.is_none());
            assert_eq!(sel.to_row(), "no hit\tS3\n");
        }
    }

    #[test]
    fn test_single_record_returned_unchanged() {
        let record = blastn_record("oprD_a", 1e-100, 2000.0);
        let t = table(vec![record.clone()]);
        let sel = select_best(&t, SearchKind::BlastnOprd, "S4");

        assert_eq!(sel.hit.as_ref(), Some(&record));
        assert!(sel.warning.is_none());
        assert_eq!(sel.to_row(), format!("{}\tS4\n", record.fields.join("\t")));
    }

    #[test]
    fn test_selected_hit_is_minimal() {
        let records = vec![
            blastn_record("a", 1e-20, 300.0),
            blastn_record("b", 1e-45, 90.0),
            blastn_record("c", 1e-45, 95.0),
            blastn_record("d", 1e-44, 500.0),
            blastn_record("e", 0.0, 10.0),
            blastn_record("f", 0.0, 12.0),
        ];
        let t = table(records.clone());
        let hit = select_best(&t, SearchKind::BlastnPromoter, "S5").hit.unwrap();

        for other in &records {
            assert!(hit.evalue <= other.evalue);
            if other.evalue == hit.evalue {
                assert!(hit.bitscore >= other.bitscore);
            }
        }
        assert_eq!(hit.subject(), "f");
    }

    #[test]
    fn test_select_file_rewrites_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S6.tsv");
        let rows: String = [
            blastn_record("oprD_a", 1e-30, 120.0),
            blastn_record("oprD_b", 1e-30, 180.0),
        ]
        .iter()
        .map(|r| format!("{}\n", r.fields.join("\t")))
        .collect();
        std::fs::write(&path, rows).unwrap();

        let first = select_file(&path, SearchKind::BlastnOprd, "S6").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert_eq!(written, first.to_row());

        let second = select_file(&path, SearchKind::BlastnOprd, "S6").unwrap();
        assert_eq!(second.hit, first.hit);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }

    #[test]
    fn test_select_file_zero_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S3.tsv");
        std::fs::write(&path, "").unwrap();

        let sel = select_file(&path, SearchKind::Diamond, "S3").unwrap();
        assert!(sel.hit.is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "no hit\tS3\n");

        // Re-selecting the sentinel keeps the sentinel
        let table = HitTable::from_path(&path, SearchKind::Diamond).unwrap();
        assert_eq!(table.skipped, 0);
        assert_eq!(table.tagged_sample.as_deref(), Some("S3"));
        let again = select_file(&path, SearchKind::Diamond, "S3").unwrap();
        assert!(again.hit.is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "no hit\tS3\n");
    }
}
