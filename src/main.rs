//! Verbena CLI - content-addressed static asset publisher
//!
//! Usage: verbena <COMMAND>
//!
//! Commands:
//!   publish       Publish a source directory to every target of a cluster
//!   remove-entry  Retract published entries from a cluster's manifests

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use verbena::fs::LocalFileSystem;
use verbena::{
    gc, ClusterConfig, DirectorySource, Distributor, PublishEngine, PublishOptions, RunLock,
};

/// Verbena - content-addressed static asset publisher
#[derive(Parser, Debug)]
#[command(name = "verbena")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish a source directory to every target of a cluster
    Publish {
        /// Directory holding the assets to publish
        source: PathBuf,

        /// Cluster configuration file
        #[arg(short, long, default_value = "verbena.toml")]
        cluster: PathBuf,

        /// Group name recorded for the source (defaults to the directory name)
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Retract published entries from a cluster's manifests
    RemoveEntry {
        /// Original paths to retract
        #[arg(required = true)]
        paths: Vec<String>,

        /// Cluster configuration file
        #[arg(short, long, default_value = "verbena.toml")]
        cluster: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Publish {
            source,
            cluster,
            group,
        } => publish(&source, &cluster, group),
        Commands::RemoveEntry { paths, cluster } => remove_entry(&paths, &cluster),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn publish(source: &Path, cluster: &Path, group: Option<String>) -> Result<()> {
    let config = ClusterConfig::load(cluster)
        .with_context(|| format!("loading cluster config {}", cluster.display()))?;
    let _lock = RunLock::acquire(&config.lock_path())?;

    let targets = config.targets();
    let distributor = Distributor::open(targets.clone())?;
    let group = group.unwrap_or_else(|| directory_group(source));
    let engine = PublishEngine::new(
        distributor,
        PublishOptions {
            base_url: config.base_url.clone(),
            prefix: config.prefix.clone(),
        },
    );

    let (next, stats) = engine.run(&DirectorySource::new(source, group))?;
    gc::update_all_indexes(&LocalFileSystem, &targets, &next)?;

    println!(
        "published {} resources to {} targets: {} changed, {} unchanged, {} bytes transferred",
        next.len(),
        targets.len(),
        stats.changed,
        stats.unchanged,
        stats.bytes_written
    );
    Ok(())
}

fn remove_entry(paths: &[String], cluster: &Path) -> Result<()> {
    let config = ClusterConfig::load(cluster)
        .with_context(|| format!("loading cluster config {}", cluster.display()))?;
    let _lock = RunLock::acquire(&config.lock_path())?;

    let removed = gc::remove_entries(&LocalFileSystem, &config.targets(), paths)?;
    println!("retracted {removed} of {} entries", paths.len());
    Ok(())
}

fn directory_group(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "web".to_string())
}
