// src/lib.rs

pub mod change;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod fs;
pub mod hash;
pub mod history;
pub mod logging;
pub mod task;
pub mod types;
pub mod vfs;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::ConfigFile;
use crate::engine::{print_reports, Runtime, RuntimeEvent, Session};
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the VFS, scanner, history store and up-to-date checker (via `Session`)
/// - (for `watch`) the file watcher and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let (record, watch) = match args.command {
        Command::DryRun => {
            print_dry_run(&cfg);
            return Ok(());
        }
        Command::Check { record } => (record, false),
        Command::Watch { record } => (record, true),
    };

    let root_dir = config_root_dir(&config_path);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let session = Session::from_config(&cfg, root_dir, fs)?;

    let reports = session.check_all(record)?;
    print_reports(&reports);

    if !watch {
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::unbounded_channel::<RuntimeEvent>();
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();

    let roots = session.roots();
    for root in &roots {
        session.vfs().add_watched_root(root);
    }
    let _watcher_handle = crate::watch::spawn_watcher(&roots, watch_tx)?;

    // Watch events → runtime.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = watch_rx.recv().await {
                if tx.send(RuntimeEvent::FileChanged(event)).is_err() {
                    break;
                }
            }
        });
    }

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested);
        });
    }
    drop(rt_tx);

    info!(roots = roots.len(), "watching for changes");
    Runtime::new(session, rt_rx, record).run().await?;
    Ok(())
}

/// Directory that relative task paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Snapcheck.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Snapcheck.toml" (parent = ""),
///   we fall back to the current working directory.
///
/// The result is absolute.
fn config_root_dir(config_path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd,
    }
}

/// Simple dry-run output: print tasks, deps and file properties.
fn print_dry_run(cfg: &ConfigFile) {
    println!("snapcheck dry-run");
    println!("  config.case_sensitive = {}", cfg.config.case_sensitive);
    println!("  config.history = {:?}", cfg.config.history);
    println!("  config.history_dir = {}", cfg.config.history_dir);
    if !cfg.default.exclude.is_empty() {
        println!("  default.exclude = {:?}", cfg.default.exclude);
    }
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        match &task.implementation {
            Some(implementation) => println!("      implementation: {implementation}"),
            None => println!("      implementation: <unknown>"),
        }
        if task.incremental {
            println!("      incremental: true");
        }
        if !task.cacheable {
            println!("      cacheable: false");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        for (key, value) in &task.properties {
            println!("      property {key} = {value:?}");
        }
        for input in &task.inputs {
            println!(
                "      input {} ({:?}): {:?}",
                input.name, input.sensitivity, input.paths
            );
        }
        for output in &task.outputs {
            println!("      output {}: {:?}", output.name, output.paths);
        }
    }

    debug!("dry-run complete (nothing evaluated)");
}
