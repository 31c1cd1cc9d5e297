// src/lib.rs

pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod import;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::analysis::AnalysisEngine;
use crate::backend::{EventBus, FsIndexClient, LocalBackend};
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_or_default};
use crate::fs::{FileSystem, RealFileSystem};
use crate::import::{ImportController, ImportStatus, ImportStep};
use crate::types::ItemKind;

/// High-level entry point used by `main.rs`.
///
/// Loads the config (defaults when the file is missing) and dispatches the
/// subcommand against the local tools backend.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    match args.command {
        Command::CheckConfig => {
            print_config(&args.config, &cfg);
            Ok(())
        }
        Command::Import {
            file,
            title,
            output,
            overwrite,
        } => run_import(&cfg, &file, &title, output.as_deref(), overwrite).await,
        Command::Analyze {
            project,
            kind,
            item,
        } => run_analyze(&cfg, &project, kind, item.as_deref()).await,
        Command::Status { project } => run_status(&cfg, &project).await,
    }
}

async fn run_import(
    cfg: &ConfigFile,
    file: &Path,
    title: &str,
    output: Option<&str>,
    overwrite: bool,
) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let bus = EventBus::new();
    let backend = LocalBackend::new(cfg, fs, bus.clone());
    let mut controller = ImportController::new(backend, bus);

    controller.open().await;
    controller.submit_file(&file.to_string_lossy()).await?;
    controller.submit_title(title).await?;

    if let Some(collision) = controller.session().collision()
        && output.is_none()
        && !overwrite
    {
        bail!(
            "A project already exists at {}. Re-run with --overwrite, or pick another --output (suggested: {})",
            collision.existing_path,
            collision.suggested_names.join(", ")
        );
    }

    controller.confirm_and_execute(output, overwrite).await?;

    let mut printed = 0;
    print_new_lines(controller.session().log(), &mut printed);

    while controller.is_importing() {
        tokio::select! {
            disposition = controller.recv_event() => {
                if disposition.is_none() {
                    warn!("import event stream closed before completion");
                    break;
                }
                print_new_lines(controller.session().log(), &mut printed);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("Ctrl+C received; cancelling import");
                controller.cancel().await;
            }
        }
    }

    let session = controller.session();
    match (session.status(), session.step()) {
        (ImportStatus::Success, ImportStep::Result) => {
            println!("Imported \"{}\" to {}", session.title(), session.output_path());
            Ok(())
        }
        _ => bail!(
            "{}",
            session.error().unwrap_or(crate::import::DEFAULT_FAILURE)
        ),
    }
}

fn print_new_lines(log: &[String], printed: &mut usize) {
    for line in log.iter().skip(*printed) {
        println!("{line}");
    }
    *printed = log.len();
}

fn analysis_engine(cfg: &ConfigFile) -> AnalysisEngine<LocalBackend, FsIndexClient> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let bus = EventBus::new();
    let backend = LocalBackend::new(cfg, Arc::clone(&fs), bus.clone());
    let index = FsIndexClient::new(Arc::clone(&fs), cfg.analysis.index_dir.clone());
    AnalysisEngine::new(backend, index, bus, fs)
}

async fn run_analyze(
    cfg: &ConfigFile,
    project: &Path,
    kind: ItemKind,
    item: Option<&str>,
) -> Result<()> {
    let project = project_arg(project);
    let mut engine = analysis_engine(cfg);

    engine.load_project(&project).await?;
    engine.switch_kind(kind);

    match item {
        Some(id) => engine.analyze_one(id).await?,
        None => engine.analyze_all(kind).await?,
    }
    engine.drive_until_idle().await;

    for entry in engine.items_with_state() {
        match entry.error {
            Some(err) => println!("{:<10} {} ({err})", entry.phase, entry.id),
            None => println!("{:<10} {}", entry.phase, entry.id),
        }
    }
    let progress = engine.progress();
    println!("{kind}: {}/{} analyzed", progress.analyzed, progress.total);

    if let Some(err) = engine.error() {
        bail!("{err}");
    }
    if let Some(id) = item
        && let Some(state) = engine.states().get(kind, id)
        && let Some(err) = &state.error
    {
        bail!("{err}");
    }
    Ok(())
}

async fn run_status(cfg: &ConfigFile, project: &Path) -> Result<()> {
    let project = project_arg(project);
    let mut engine = analysis_engine(cfg);
    engine.load_project(&project).await?;

    println!("project: {project}");
    println!("daemon: {:?}", engine.reachability());
    for kind in ItemKind::ALL {
        engine.switch_kind(kind);
        let progress = engine.progress();
        println!("  {kind}: {}/{} analyzed", progress.analyzed, progress.total);
    }
    Ok(())
}

fn project_arg(project: &Path) -> String {
    project.to_string_lossy().into_owned()
}

/// Print the effective configuration.
fn print_config(path: &str, cfg: &ConfigFile) {
    let source = if PathBuf::from(path).exists() {
        path
    } else {
        "(defaults)"
    };
    println!("backstage config: {source}");
    println!("  backend.tools_path = {}", cfg.backend.tools_path);
    println!(
        "  backend.projects_root = {}",
        cfg.backend.projects_root.display()
    );
    println!(
        "  import.allowed_extensions = {:?}",
        cfg.import.allowed_extensions
    );
    println!(
        "  import.project_extension = {}",
        cfg.import.project_extension
    );
    println!("  import.suggestion_count = {}", cfg.import.suggestion_count);
    println!("  analysis.index_dir = {}", cfg.analysis.index_dir.display());
}
