//! One porinpredict run over a single assembly
//!
//! Stages run strictly in order: dependency and input checks, DIAMOND,
//! blastn against the promoter and the full gene (each followed by best-hit
//! selection), the R classifier, and optionally the cumulative table.

use crate::config::{Config, ResolvedResources};
use crate::error::PipelineError;
use crate::hits::SearchKind;
use crate::layout::OutputLayout;
use crate::logging::SessionLog;
use crate::report::{ExecutionMetadata, InputSummary, RunReport, SearchSummary};
use crate::sample::load_assembly;
use crate::select::{select_file, Selection};
use crate::summary;
use crate::tools::{self, ToolCommand, Toolchain};
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Settings for one run, as given on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub outdir: PathBuf,
    pub threads: usize,
    pub summarize: bool,
    pub db_dir: Option<PathBuf>,
    /// Directory the default databases and classifier are resolved against
    pub install_dir: PathBuf,
}

pub fn run(options: &RunOptions, config: &Config, session: &SessionLog) -> Result<RunReport> {
    let start_time = Instant::now();
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let now = chrono::Local::now();

    // Dependencies first, then the input, as nothing can run without either
    let toolchain = Toolchain::locate(config)?;
    let assembly = load_assembly(&options.input)?;
    let resources = config.resolve_resources(&options.install_dir, options.db_dir.as_deref());
    resources.check()?;

    let layout = OutputLayout::create(&options.outdir)?;
    let sample = assembly.name.clone();
    session.attach(&layout.log_file(&sample))?;

    info!("PorinPredict {}", env!("CARGO_PKG_VERSION"));
    info!("{}", now.format("%Y-%m-%d %H:%M"));
    info!("Analyzing {}", sample);
    info!(
        "  {} contigs, {} bp",
        assembly.num_contigs, assembly.total_length
    );

    let mut searches = Vec::new();
    for kind in SearchKind::ALL {
        let table = layout.hit_table(kind, &sample);
        let command = search_command(
            kind,
            &toolchain,
            config,
            &resources,
            &assembly.path,
            &table,
            options.threads,
        );
        let selection = run_search(kind, &command, &table, &sample)?;
        searches.push(SearchSummary::new(&selection, &table));
    }

    let result_file = run_classifier(&toolchain, &resources, &layout, &sample)?;

    let results_table = if options.summarize {
        let table = layout.results_table();
        summary::append_result(&table, &result_file)?;
        info!("Summary table updated: {}", table.display());
        Some(table)
    } else {
        None
    };

    info!("Results written to {}", result_file.display());

    let report = RunReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        sample: sample.clone(),
        metadata: ExecutionMetadata {
            command_line,
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            duration_secs: start_time.elapsed().as_secs_f64(),
            threads: options.threads,
        },
        input: InputSummary {
            path: assembly.path.display().to_string(),
            num_contigs: assembly.num_contigs,
            total_length: assembly.total_length,
        },
        searches,
        result_file,
        results_table,
    };
    report.save(&layout.report_file(&sample))?;

    Ok(report)
}

fn search_command(
    kind: SearchKind,
    toolchain: &Toolchain,
    config: &Config,
    resources: &ResolvedResources,
    query: &Path,
    output: &Path,
    threads: usize,
) -> ToolCommand {
    match kind {
        SearchKind::Diamond => tools::diamond_command(
            &toolchain.diamond,
            &config.diamond,
            &resources.diamond_db,
            query,
            output,
            threads,
        ),
        SearchKind::BlastnPromoter => tools::blastn_command(
            &toolchain.blastn,
            &config.promoter,
            &resources.promoter_db,
            query,
            output,
            threads,
        ),
        SearchKind::BlastnOprd => tools::blastn_command(
            &toolchain.blastn,
            &config.oprd,
            &resources.oprd_db,
            query,
            output,
            threads,
        ),
    }
}

/// Run one search and reduce its output to the selected hit
fn run_search(kind: SearchKind, command: &ToolCommand, table: &Path, sample: &str) -> Result<Selection> {
    // A table left over from an earlier run must not pass for this run's output
    remove_stale(table)?;

    info!("Running {}: {}", kind, command.display());
    command.run()?;

    select_file(table, kind, sample)
}

fn run_classifier(
    toolchain: &Toolchain,
    resources: &ResolvedResources,
    layout: &OutputLayout,
    sample: &str,
) -> Result<PathBuf> {
    let result_file = layout.result_file(sample);
    remove_stale(&result_file)?;

    let command = tools::classifier_command(
        &toolchain.rscript,
        &resources.classifier,
        &layout.hit_table(SearchKind::BlastnPromoter, sample),
        &layout.hit_table(SearchKind::BlastnOprd, sample),
        &layout.hit_table(SearchKind::Diamond, sample),
        sample,
        &layout.outdir,
    );

    info!("Running porinpredict.R");
    log::debug!("{}", command.display());
    let output = command.run()?;
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if !line.trim().is_empty() {
            info!("{}", line);
        }
    }

    if !result_file.is_file() {
        return Err(PipelineError::MissingResult(result_file).into());
    }
    Ok(result_file)
}

fn remove_stale(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove previous output: {}", path.display()))?;
    }
    Ok(())
}
