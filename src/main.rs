//! porinpredict: OprD porin detection and classification for
//! *Pseudomonas aeruginosa* genome assemblies
//!
//! Runs three external searches against the assembly:
//! 1. DIAMOND blastx against the OprD protein (coding region)
//! 2. blastn against the oprD promoter region
//! 3. blastn against the full oprD gene
//!
//! keeps the best hit of each, and hands them to `porinpredict.R` for the
//! genotype call. Results can be collected into one table across samples.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

mod config;
mod error;
mod hits;
mod layout;
mod logging;
mod pipeline;
mod report;
mod sample;
mod select;
mod summary;
mod tools;

use crate::config::Config;
use crate::layout::OutputLayout;
use crate::logging::SessionLog;
use crate::pipeline::RunOptions;

/// Detect and classify OprD in a genome assembly
#[derive(Parser, Debug)]
#[command(name = "porinpredict")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
#[command(about = "Detect and classify the OprD porin in P. aeruginosa genome assemblies")]
#[command(override_usage = "porinpredict -i </path/to/genome.fasta> -o </path/to/output/directory/> [other options]")]
#[command(disable_version_flag = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: Args,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the cumulative results table from every per-sample result in a directory
    Summarize(SummarizeArgs),
}

/// Arguments for the summarize subcommand
#[derive(Parser, Debug)]
struct SummarizeArgs {
    /// Output directory holding *_PorinPredict.tsv files
    #[arg(short, long)]
    outdir: PathBuf,

    /// Verbose output
    #[arg(long)]
    verbose: bool,
}

/// Arguments for a pipeline run (default command)
#[derive(Parser, Debug)]
struct Args {
    /// Path to input genome in fasta format
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to desired output directory
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Summarize results in output folder
    #[arg(long)]
    summarize: bool,

    /// Number of CPU threads
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// YAML configuration file (tool paths, databases, search thresholds)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing the OprD reference databases
    #[arg(long)]
    db_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(cmd) = cli.command {
        return match cmd {
            Commands::Summarize(summarize_args) => run_summarize(summarize_args),
        };
    }

    run_pipeline(cli.args)
}

/// Run the summarize subcommand: per-sample results -> cumulative table
fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let _session = SessionLog::init(args.verbose)?;

    info!("porinpredict summarize v{}", env!("CARGO_PKG_VERSION"));
    let layout = OutputLayout::existing(&args.outdir)?;
    let count = summary::rebuild(&layout)?;
    info!(
        "Summarized {} samples into {}",
        count,
        layout.results_table().display()
    );
    Ok(())
}

/// Run the detection pipeline on one assembly
fn run_pipeline(args: Args) -> Result<()> {
    let session = SessionLog::init(args.verbose)?;

    let Some(input) = args.input else {
        anyhow::bail!("--input is required (see --help)");
    };
    let Some(outdir) = args.outdir else {
        anyhow::bail!("--outdir is required (see --help)");
    };
    if args.threads == 0 {
        anyhow::bail!("--threads must be at least 1");
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            Config::from_yaml(path)?
        }
        None => Config::default(),
    };

    let options = RunOptions {
        input,
        outdir,
        threads: args.threads,
        summarize: args.summarize,
        db_dir: args.db_dir,
        install_dir: config::install_dir()?,
    };

    let result = pipeline::run(&options, &config, &session);
    if let Err(e) = &result {
        // Also lands in the sample log when the failure came after setup
        log::error!("ERROR: {:#}", e);
        session.detach();
        std::process::exit(1);
    }
    session.detach();
    Ok(())
}
