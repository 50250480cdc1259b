//! Configuration for porinpredict
//!
//! Every setting has a default matching the published pipeline, so the YAML
//! file is optional and may override any subset of it.

use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External executables
    #[serde(default)]
    pub tools: ToolPaths,

    /// Reference databases and classifier script
    #[serde(default)]
    pub resources: Resources,

    /// DIAMOND blastx parameters
    #[serde(default)]
    pub diamond: DiamondSettings,

    /// blastn parameters for the promoter reference
    #[serde(default = "BlastnSettings::promoter")]
    pub promoter: BlastnSettings,

    /// blastn parameters for the full oprD reference
    #[serde(default = "BlastnSettings::oprd")]
    pub oprd: BlastnSettings,
}

/// Executable names (looked up on PATH) or explicit paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_diamond")]
    pub diamond: String,
    #[serde(default = "default_blastn")]
    pub blastn: String,
    #[serde(default = "default_rscript")]
    pub rscript: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            diamond: default_diamond(),
            blastn: default_blastn(),
            rscript: default_rscript(),
        }
    }
}

fn default_diamond() -> String {
    "diamond".to_string()
}

fn default_blastn() -> String {
    "blastn".to_string()
}

fn default_rscript() -> String {
    "Rscript".to_string()
}

/// Locations of the bundled reference data
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Resources {
    /// Directory with PA_OprD.dmnd and the two blastn databases
    /// (default: `db/` next to the executable)
    #[serde(default)]
    pub db_dir: Option<PathBuf>,

    /// Classification script (default: `porinpredict.R` next to the executable)
    #[serde(default)]
    pub classifier: Option<PathBuf>,
}

/// DIAMOND blastx settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiamondSettings {
    /// Query genetic code (11 = bacterial)
    #[serde(default = "default_genetic_code")]
    pub genetic_code: u8,
    /// Minimum percent identity
    #[serde(default = "default_diamond_identity")]
    pub identity: f64,
    /// Minimum subject coverage (percent)
    #[serde(default = "default_subject_cover")]
    pub subject_cover: f64,
    /// Sequence block size in billions of letters
    #[serde(default = "default_block_size")]
    pub block_size: f64,
    #[serde(default = "default_diamond_targets")]
    pub max_target_seqs: u32,
}

impl Default for DiamondSettings {
    fn default() -> Self {
        DiamondSettings {
            genetic_code: default_genetic_code(),
            identity: default_diamond_identity(),
            subject_cover: default_subject_cover(),
            block_size: default_block_size(),
            max_target_seqs: default_diamond_targets(),
        }
    }
}

fn default_genetic_code() -> u8 {
    11
}

fn default_diamond_identity() -> f64 {
    95.0
}

fn default_subject_cover() -> f64 {
    60.0
}

fn default_block_size() -> f64 {
    6.0
}

fn default_diamond_targets() -> u32 {
    1
}

/// blastn settings for one nucleotide reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastnSettings {
    pub perc_identity: f64,
    /// E-value cutoff, passed through verbatim
    #[serde(default = "default_evalue")]
    pub evalue: String,
    #[serde(default = "default_blastn_targets")]
    pub max_target_seqs: u32,
    #[serde(default = "default_culling_limit")]
    pub culling_limit: u32,
}

impl BlastnSettings {
    pub fn promoter() -> Self {
        BlastnSettings {
            perc_identity: 95.0,
            evalue: default_evalue(),
            max_target_seqs: default_blastn_targets(),
            culling_limit: default_culling_limit(),
        }
    }

    pub fn oprd() -> Self {
        BlastnSettings {
            perc_identity: 90.0,
            ..BlastnSettings::promoter()
        }
    }
}

fn default_evalue() -> String {
    "1E-20".to_string()
}

fn default_blastn_targets() -> u32 {
    10
}

fn default_culling_limit() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tools: ToolPaths::default(),
            resources: Resources::default(),
            diamond: DiamondSettings::default(),
            promoter: BlastnSettings::promoter(),
            oprd: BlastnSettings::oprd(),
        }
    }
}

/// Reference files resolved against the install directory
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResources {
    pub db_dir: PathBuf,
    /// DIAMOND database (without the .dmnd extension, as diamond expects)
    pub diamond_db: PathBuf,
    pub promoter_db: PathBuf,
    pub oprd_db: PathBuf,
    pub classifier: PathBuf,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate numeric settings
    pub fn validate(&self) -> Result<()> {
        let percentages = [
            ("diamond.identity", self.diamond.identity),
            ("diamond.subject_cover", self.diamond.subject_cover),
            ("promoter.perc_identity", self.promoter.perc_identity),
            ("oprd.perc_identity", self.oprd.perc_identity),
        ];
        for (name, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("{} must be between 0 and 100, got {}", name, value);
            }
        }

        for (name, evalue) in [
            ("promoter.evalue", &self.promoter.evalue),
            ("oprd.evalue", &self.oprd.evalue),
        ] {
            let parsed: f64 = evalue
                .parse()
                .with_context(|| format!("{} is not a number: {}", name, evalue))?;
            if parsed < 0.0 {
                anyhow::bail!("{} must not be negative, got {}", name, evalue);
            }
        }

        if self.diamond.max_target_seqs == 0
            || self.promoter.max_target_seqs == 0
            || self.oprd.max_target_seqs == 0
        {
            anyhow::bail!("max_target_seqs must be at least 1");
        }

        Ok(())
    }

    /// Resolve database and classifier paths. `db_dir_override` (from the
    /// command line) takes precedence over the configuration file.
    pub fn resolve_resources(
        &self,
        install_dir: &Path,
        db_dir_override: Option<&Path>,
    ) -> ResolvedResources {
        let db_dir = db_dir_override
            .map(Path::to_path_buf)
            .or_else(|| self.resources.db_dir.clone())
            .unwrap_or_else(|| install_dir.join("db"));
        let classifier = self
            .resources
            .classifier
            .clone()
            .unwrap_or_else(|| install_dir.join("porinpredict.R"));

        ResolvedResources {
            diamond_db: db_dir.join("PA_OprD"),
            promoter_db: db_dir.join("PA_oprD_promoter_200bp_plus_10.fasta"),
            oprd_db: db_dir.join("PA_oprD.fasta"),
            db_dir,
            classifier,
        }
    }
}

impl ResolvedResources {
    /// Check that the database directory and classifier script exist
    pub fn check(&self) -> Result<(), PipelineError> {
        if !self.db_dir.is_dir() {
            return Err(PipelineError::MissingResource {
                what: "Database directory".to_string(),
                path: self.db_dir.clone(),
            });
        }
        if !self.classifier.is_file() {
            return Err(PipelineError::MissingResource {
                what: "Classifier script".to_string(),
                path: self.classifier.clone(),
            });
        }
        Ok(())
    }
}

/// Directory containing the running executable
pub fn install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the porinpredict executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_parameters() {
        let config = Config::default();
        assert_eq!(config.diamond.genetic_code, 11);
        assert_eq!(config.diamond.identity, 95.0);
        assert_eq!(config.diamond.subject_cover, 60.0);
        assert_eq!(config.diamond.max_target_seqs, 1);
        assert_eq!(config.promoter.perc_identity, 95.0);
        assert_eq!(config.oprd.perc_identity, 90.0);
        assert_eq!(config.oprd.evalue, "1E-20");
        assert_eq!(config.oprd.culling_limit, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_partial_override() {
        let yaml = r#"
tools:
  blastn: /opt/blast/bin/blastn

resources:
  db_dir: /srv/porinpredict/db

oprd:
  perc_identity: 85
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tools.blastn, "/opt/blast/bin/blastn");
        assert_eq!(config.tools.diamond, "diamond");
        assert_eq!(config.oprd.perc_identity, 85.0);
        assert_eq!(config.oprd.evalue, "1E-20");
        assert_eq!(config.promoter.perc_identity, 95.0);
        assert_eq!(config.resources.db_dir, Some(PathBuf::from("/srv/porinpredict/db")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.promoter.perc_identity = 120.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.oprd.evalue = "tiny".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_resources() {
        let config = Config::default();
        let res = config.resolve_resources(Path::new("/opt/pp"), None);
        assert_eq!(res.diamond_db, PathBuf::from("/opt/pp/db/PA_OprD"));
        assert_eq!(res.oprd_db, PathBuf::from("/opt/pp/db/PA_oprD.fasta"));
        assert_eq!(res.classifier, PathBuf::from("/opt/pp/porinpredict.R"));

        let res = config.resolve_resources(Path::new("/opt/pp"), Some(Path::new("/data/db")));
        assert_eq!(
            res.promoter_db,
            PathBuf::from("/data/db/PA_oprD_promoter_200bp_plus_10.fasta")
        );
    }

    #[test]
    fn test_resources_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let res = config.resolve_resources(dir.path(), None);
        assert!(matches!(res.check(), Err(PipelineError::MissingResource { .. })));

        std::fs::create_dir(dir.path().join("db")).unwrap();
        std::fs::write(dir.path().join("porinpredict.R"), "# classifier\n").unwrap();
        assert!(res.check().is_ok());
    }
}
