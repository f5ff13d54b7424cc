//! Run orchestration: turns parsed CLI arguments into a sequence of walk,
//! fingerprint, detect, reconcile and act phases.
//!
//! Three modes, chosen by the arguments:
//!
//! - no destination: duplicates across the union of sources, optionally
//!   deleted
//! - destination + `--report-missing`: explain destination-only files
//! - destination otherwise: copy pass, then orphan pass
//!
//! Every source tree (and the destination in report-missing mode) keeps its
//! own fingerprint cache at its top level.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{
    copy_file, delete_records, permanent_delete, remove_directory, BatchCopyResult,
    BatchDeleteResult,
};
use crate::cache::FingerprintCache;
use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{detect, EngineConfig, EngineError, HashStats, HashingEngine};
use crate::error::{ExitCode, UsageError};
use crate::output::{ReportFormat, Reporter};
use crate::progress::{Progress, ProgressCallback};
use crate::reconcile::{plan_copies, plan_orphans, reconcile};
use crate::scanner::{is_media_file, FileRecord, Fingerprinter, PixelFingerprinter, Walker};
use crate::signal::install_handler;

/// Shared collaborators for one run.
struct RunEnv {
    config: Config,
    fingerprinter: Arc<dyn Fingerprinter>,
    progress: Arc<dyn ProgressCallback>,
    shutdown: Arc<AtomicBool>,
}

/// A fully indexed and fingerprinted tree.
struct IndexedTree {
    records: Vec<FileRecord>,
    stats: HashStats,
}

/// Run photosweep, writing the report to stdout.
///
/// # Errors
///
/// Returns an error for invalid invocations ([`UsageError`]), worker faults
/// and interrupts ([`EngineError`]), and unexpected I/O failures. Map it to
/// a process exit code with [`ExitCode::for_error`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let color = io::stdout().is_terminal();
    run_app_with_output(cli, io::stdout().lock(), color)
}

/// Run photosweep, writing the report to `out`.
///
/// `color` is the caller's terminal check; it is further gated by the
/// config file and `--no-color`.
///
/// # Errors
///
/// See [`run_app`].
pub fn run_app_with_output<W: Write>(cli: Cli, out: W, color: bool) -> Result<ExitCode> {
    if cli.dest.is_some() && cli.sources.len() > 1 {
        log::error!(
            "A destination can only be reconciled against one source ({} given); nothing done",
            cli.sources.len()
        );
        return Ok(ExitCode::Success);
    }

    validate_directories(&cli)?;
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.hash_workers = workers.max(1);
    }
    log::debug!("Effective configuration: {:?}", config);

    let handler = install_handler().context("Failed to set up Ctrl+C handling")?;
    let show_progress = config.show_progress && !cli.quiet;
    let env = RunEnv {
        fingerprinter: Arc::new(PixelFingerprinter::new()),
        progress: Arc::new(Progress::new(!show_progress)),
        shutdown: handler.get_flag(),
        config,
    };

    let format = if cli.html {
        ReportFormat::Html
    } else {
        ReportFormat::Text
    };
    let mut reporter = Reporter::new(out, format)
        .with_color(color && env.config.color && !cli.no_color);
    reporter.begin()?;

    match cli.dest.as_deref() {
        None => run_duplicates(&cli, &env, &mut reporter)?,
        Some(dest) if cli.report_missing => {
            run_report_missing(&cli.sources[0], dest, &env, &mut reporter)?;
        }
        Some(dest) => run_mirror(&cli, &cli.sources[0], dest, &env, &mut reporter)?,
    }

    reporter.finish()?;
    Ok(ExitCode::Success)
}

fn validate_directories(cli: &Cli) -> Result<()> {
    for dir in cli.sources.iter().chain(cli.dest.iter()) {
        if !dir.is_dir() {
            return Err(UsageError(format!("Not a directory: {}", dir.display())).into());
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let loaded = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    loaded.map_err(|e| UsageError(e.to_string()).into())
}

/// Walk and fingerprint one tree, saving its cache.
///
/// On a worker fault or interrupt the partial cache is saved before the
/// error is returned.
fn index_tree<W: Write>(root: &Path, env: &RunEnv, reporter: &mut Reporter<W>) -> Result<IndexedTree> {
    log::info!("Indexing {}", root.display());
    env.progress.on_message(&root.display().to_string());

    let walk = Walker::new(root)
        .with_shutdown_flag(Arc::clone(&env.shutdown))
        .with_progress_callback(Arc::clone(&env.progress))
        .walk()
        .with_context(|| format!("Failed to walk {}", root.display()))?;
    if walk.interrupted {
        return Err(EngineError::Interrupted.into());
    }
    reporter.walk_summary(root, &walk)?;

    let cache = FingerprintCache::for_root(root).unwrap_or_else(|e| {
        log::warn!("Ignoring unusable fingerprint cache: {}", e);
        FingerprintCache::empty(FingerprintCache::sidecar_path(root))
    });

    let engine_config = EngineConfig::default()
        .with_workers(env.config.hash_workers)
        .with_poll_interval(env.config.progress_interval())
        .with_shutdown_flag(Arc::clone(&env.shutdown))
        .with_progress_callback(Arc::clone(&env.progress));
    let engine = HashingEngine::new(Arc::clone(&env.fingerprinter), engine_config);

    match engine.hash_all(walk.records, cache) {
        Ok(run) => {
            if let Err(e) = run.cache.save() {
                log::warn!("Failed to save fingerprint cache: {}", e);
            }
            reporter.hash_summary(&run.stats)?;
            Ok(IndexedTree {
                records: run.records,
                stats: run.stats,
            })
        }
        Err(failure) => {
            match failure.partial_cache.save() {
                Ok(true) => log::info!(
                    "Saved {} fingerprints before stopping",
                    failure.partial_cache.computed()
                ),
                Ok(false) => {}
                Err(e) => log::error!("Failed to save partial fingerprint cache: {}", e),
            }
            Err(anyhow::Error::new(failure.error)
                .context(format!("Fingerprinting stopped under {}", root.display())))
        }
    }
}

fn run_duplicates<W: Write>(cli: &Cli, env: &RunEnv, reporter: &mut Reporter<W>) -> Result<()> {
    let mut records = Vec::new();
    for source in &cli.sources {
        records.extend(index_tree(source, env, reporter)?.records);
    }

    let detection = detect(records);
    log::info!(
        "{} duplicate(s), {} corrupt, {} protected pairing(s) skipped",
        detection.duplicates.len(),
        detection.corrupt.len(),
        detection.protected_skips
    );
    reporter.duplicates(&detection)?;

    if cli.delete {
        let result = delete_records(
            detection
                .duplicates
                .iter()
                .filter(|record| is_media_file(&record.path)),
        );
        reporter.deletions(&result)?;
    }
    Ok(())
}

fn run_report_missing<W: Write>(
    source_root: &Path,
    dest_root: &Path,
    env: &RunEnv,
    reporter: &mut Reporter<W>,
) -> Result<()> {
    let source = index_tree(source_root, env, reporter)?;
    let dest = index_tree(dest_root, env, reporter)?;
    log::debug!(
        "Reconciling {} source against {} destination records ({} + {} fingerprinted)",
        source.records.len(),
        dest.records.len(),
        source.stats.hashed,
        dest.stats.hashed
    );

    let source_seen = detect(source.records).first_seen;
    let dest_detection = detect(dest.records);
    let result = reconcile(&source_seen, &dest_detection.first_seen);
    reporter.reconciliation(
        source_root,
        dest_root,
        dest_detection.duplicates.len(),
        &result,
    )?;
    Ok(())
}

fn run_mirror<W: Write>(
    cli: &Cli,
    source_root: &Path,
    dest_root: &Path,
    env: &RunEnv,
    reporter: &mut Reporter<W>,
) -> Result<()> {
    let source = index_tree(source_root, env, reporter)?;
    let source_seen = detect(source.records).first_seen;

    let plan = plan_copies(source_root, dest_root, &source_seen);
    let copied = cli.copy.then(|| {
        let mut result = BatchCopyResult::default();
        for candidate in &plan {
            result.push(copy_file(&candidate.source.path, &candidate.dest));
        }
        log::info!("{}", result.summary());
        result
    });
    reporter.copy_plan(&plan, copied.as_ref())?;

    let orphans = plan_orphans(source_root, dest_root);
    reporter.orphan_plan(&orphans, cli.delete)?;
    if cli.delete && !orphans.is_empty() {
        let result = delete_orphans(&orphans.files, &orphans.directories);
        reporter.deletions(&result)?;
    }
    Ok(())
}

fn delete_orphans(files: &[PathBuf], directories: &[PathBuf]) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();
    for file in files {
        result.push(permanent_delete(file));
    }
    for dir in directories {
        result.push(remove_directory(dir));
    }
    log::info!("Orphans: {}", result.summary());
    result
}
