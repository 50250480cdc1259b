//! Error kinds raised by the pipeline
//!
//! Empty search results and multiple candidate hits are not errors: they are
//! represented as data by [`crate::select::Selection`].

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{tool} could not be found")]
    MissingDependency { tool: String },

    #[error("Assembly file not found: {0}. Check path and spelling.")]
    MissingInput(PathBuf),

    #[error("Failed to parse assembly {path}: {reason}")]
    InvalidAssembly { path: PathBuf, reason: String },

    #[error("{what} not found: {path}")]
    MissingResource { what: String, path: PathBuf },

    #[error("Failed to execute '{tool}' - is it installed?")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed ({status}):\n{stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Classifier finished but did not write {0}")]
    MissingResult(PathBuf),

    #[error("Cannot derive a sample name from {0}")]
    SampleName(PathBuf),
}
