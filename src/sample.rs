//! Input assembly handling and sample naming

use crate::error::PipelineError;
use needletail::parse_fastx_file;
use std::path::{Path, PathBuf};

/// A genome assembly to analyze
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Sample identifier (file name without its final extension)
    pub name: String,
    pub path: PathBuf,
    pub num_contigs: usize,
    pub total_length: usize,
}

/// Derive the sample identifier from an input path.
///
/// Only the final extension is removed: `S1.contigs.fa` -> `S1.contigs`.
pub fn sample_name(path: &Path) -> Result<String, PipelineError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim())
        .unwrap_or("");

    if name.is_empty() {
        return Err(PipelineError::SampleName(path.to_path_buf()));
    }
    Ok(name.to_string())
}

/// Check that the assembly exists and parses as FASTA
pub fn load_assembly(path: &Path) -> Result<Assembly, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let name = sample_name(path)?;

    let invalid = |reason: String| PipelineError::InvalidAssembly {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = parse_fastx_file(path).map_err(|e| invalid(e.to_string()))?;

    let mut num_contigs = 0;
    let mut total_length = 0;
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| invalid(e.to_string()))?;
        num_contigs += 1;
        total_length += record.seq().len();
    }

    Ok(Assembly {
        name,
        path: path.to_path_buf(),
        num_contigs,
        total_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_name_strips_final_extension() {
        assert_eq!(sample_name(Path::new("/data/S1.fasta")).unwrap(), "S1");
        assert_eq!(sample_name(Path::new("S1.contigs.fa")).unwrap(), "S1.contigs");
        assert_eq!(sample_name(Path::new("asm/genome")).unwrap(), "genome");
    }

    #[test]
    fn test_sample_name_rejects_empty() {
        assert!(sample_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_load_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PA01.fasta");
        std::fs::write(&path, ">contig_1\nACGTACGTAC\n>contig_2\nGGCC\n").unwrap();

        let asm = load_assembly(&path).unwrap();
        assert_eq!(asm.name, "PA01");
        assert_eq!(asm.num_contigs, 2);
        assert_eq!(asm.total_length, 14);
    }

    #[test]
    fn test_load_assembly_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_assembly(&dir.path().join("nope.fasta")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_load_assembly_not_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "this is not a sequence file\n").unwrap();

        let err = load_assembly(&path).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidAssembly { .. }));
    }
}
