//! netwalk - Main entry point
//!
//! Walks the network breadth-first from the configured seed devices and
//! writes the discovered topology as a JSON report.

mod config;
mod report;

use anyhow::Result;
use clap::Parser;
use netwalk_discovery::{Classifier, DiscoveryWalker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::report::Report;

#[derive(Parser, Debug)]
#[command(name = "netwalk")]
#[command(about = "Discover network topology by walking CDP neighbors over SSH")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "netwalk.toml")]
    config: PathBuf,

    /// Additional seed host, using the [credentials] login (repeatable)
    #[arg(short, long = "seed")]
    seeds: Vec<String>,

    /// JSON report path (overrides [output].path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Devices walked at once (overrides [discovery].concurrency)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file to --config and exit
    #[arg(long)]
    init_config: bool,

    /// Do not print the edge table
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("netwalk v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    if let Some(output) = &args.output {
        config.output.path = output.display().to_string();
    }
    if let Some(concurrency) = args.concurrency {
        config.discovery.concurrency = concurrency;
    }

    let mut seeds = config.seed_credentials();
    seeds.extend(args.seeds.iter().map(|host| config.credential_for(host)));
    if seeds.is_empty() {
        anyhow::bail!(
            "No seed devices: add [[seed]] entries to {} or pass --seed",
            args.config.display()
        );
    }

    let policy = config.load_policy()?;
    info!(
        seeds = seeds.len(),
        fallbacks = config.fallbacks.len(),
        excluded = policy.excluded_addresses.len(),
        concurrency = config.discovery.concurrency,
        "Configuration loaded"
    );

    let walker = Arc::new(DiscoveryWalker::new(
        config.gateway(),
        Classifier::new(Arc::new(policy)),
        config.walker_config(),
    ));

    let seed_hosts: Vec<String> = seeds.iter().map(|s| s.host.clone()).collect();
    walker.seed(seeds);

    let edges = if config.discovery.concurrency > 1 {
        walker.drain_concurrent(config.discovery.concurrency).await
    } else {
        walker.drain().await
    };

    let failed = walker.failures();
    let visited = walker.visited();

    if !args.quiet {
        print!("{}", report::edge_table(&edges));
        println!();
        println!(
            "Visited {} devices, recorded {} edges, {} failed",
            visited.len(),
            edges.len(),
            failed.len()
        );
        for device in &failed {
            println!("  - {}: {}", device.host, device.error);
        }
    }

    let report = Report::build(seed_hosts, visited, failed, edges);
    report.write(Path::new(&config.output.path))?;

    Ok(())
}
