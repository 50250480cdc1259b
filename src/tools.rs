//! External tool discovery and invocation
//!
//! DIAMOND, blastn and Rscript are run with fixed argument lists. Exit status
//! is always checked: a failing tool is reported as
//! [`PipelineError::ToolFailed`] instead of being mistaken for "no hit".

use crate::config::{BlastnSettings, Config, DiamondSettings};
use crate::error::PipelineError;
use crate::hits::{BLASTN_COLUMNS, DIAMOND_COLUMNS};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Find an executable by name on PATH, or check an explicit path
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolved locations of the three external programs
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub diamond: PathBuf,
    pub blastn: PathBuf,
    pub rscript: PathBuf,
}

impl Toolchain {
    /// Locate every tool, failing on the first one that is missing
    pub fn locate(config: &Config) -> Result<Self, PipelineError> {
        let find = |label: &str, name: &str| {
            find_executable(name).ok_or_else(|| PipelineError::MissingDependency {
                tool: label.to_string(),
            })
        };

        let diamond = find("Diamond", &config.tools.diamond)?;
        let blastn = find("Blastn", &config.tools.blastn)?;
        let rscript = find("Rscript", &config.tools.rscript)?;

        log::debug!("diamond: {}", diamond.display());
        log::debug!("blastn: {}", blastn.display());
        log::debug!("Rscript: {}", rscript.display());

        Ok(Toolchain {
            diamond,
            blastn,
            rscript,
        })
    }
}

/// A program plus its argument list, kept printable for the log
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: &Path) -> Self {
        ToolCommand {
            program: program.to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Space-joined command line as written to the log
    pub fn display(&self) -> String {
        let mut parts = vec![self.program_name()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Run to completion, capturing output, and fail on a non-zero exit
    pub fn run(&self) -> Result<Output, PipelineError> {
        let tool = self.program_name();
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| PipelineError::ToolLaunch {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PipelineError::ToolFailed {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if !line.trim().is_empty() {
                log::debug!("[{}] {}", tool, line);
            }
        }
        Ok(output)
    }
}

/// DIAMOND blastx against the OprD protein database
pub fn diamond_command(
    diamond: &Path,
    settings: &DiamondSettings,
    database: &Path,
    query: &Path,
    output: &Path,
    threads: usize,
) -> ToolCommand {
    ToolCommand::new(diamond)
        .args(["blastx", "--query-gencode"])
        .arg(settings.genetic_code.to_string())
        .arg("-d")
        .arg(database)
        .arg("-q")
        .arg(query)
        .arg("-o")
        .arg(output)
        .arg("-p")
        .arg(threads.to_string())
        .arg("--id")
        .arg(format_number(settings.identity))
        .arg("--subject-cover")
        .arg(format_number(settings.subject_cover))
        .args(["--outfmt", "6"])
        .args(DIAMOND_COLUMNS)
        .arg("-b")
        .arg(format_number(settings.block_size))
        .arg("--max-target-seqs")
        .arg(settings.max_target_seqs.to_string())
        .args(["--sensitive", "-c1", "--masking", "0", "--quiet"])
}

/// blastn against one nucleotide reference
pub fn blastn_command(
    blastn: &Path,
    settings: &BlastnSettings,
    database: &Path,
    query: &Path,
    output: &Path,
    threads: usize,
) -> ToolCommand {
    ToolCommand::new(blastn)
        .arg("-db")
        .arg(database)
        .arg("-query")
        .arg(query)
        .arg("-out")
        .arg(output)
        .arg("-perc_identity")
        .arg(format_number(settings.perc_identity))
        .arg("-outfmt")
        .arg(format!("6 {}", BLASTN_COLUMNS.join(" ")))
        .arg("-max_target_seqs")
        .arg(settings.max_target_seqs.to_string())
        .arg("-evalue")
        .arg(&settings.evalue)
        .arg("-culling_limit")
        .arg(settings.culling_limit.to_string())
        .arg("-num_threads")
        .arg(threads.to_string())
}

/// Rscript invocation of the classifier.
///
/// Positional arguments: promoter table, oprD table, DIAMOND table, sample,
/// output directory (with trailing separator).
pub fn classifier_command(
    rscript: &Path,
    script: &Path,
    promoter_table: &Path,
    oprd_table: &Path,
    diamond_table: &Path,
    sample: &str,
    outdir: &Path,
) -> ToolCommand {
    let mut outdir_arg = outdir.as_os_str().to_os_string();
    if !outdir_arg.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) {
        outdir_arg.push(std::path::MAIN_SEPARATOR_STR);
    }

    ToolCommand::new(rscript)
        .arg(script)
        .arg(promoter_table)
        .arg(oprd_table)
        .arg(diamond_table)
        .arg(sample)
        .arg(outdir_arg)
}

/// Whole numbers without a fractional part (95.0 -> "95")
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
