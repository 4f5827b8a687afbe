//! Run a simulation described by a JSON config file.
//!
//! The config declares hosts, routers, links and flows by name; see
//! `ticknet::config` for the schema.

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use ticknet::{config, Network, Runner, SimTime};

#[derive(Debug, Parser)]
#[command(name = "from-config", about = "Run a JSON-described topology")]
struct Args {
    /// Path to the JSON simulation config
    #[arg(long)]
    config: PathBuf,

    /// Tick length in milliseconds
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Simulated-time budget in milliseconds
    #[arg(long, default_value_t = 600_000)]
    until_ms: u64,

    /// Write the analytics report as JSON to this path
    #[arg(long)]
    metrics_json: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let text = fs::read_to_string(&args.config)
        .unwrap_or_else(|e| panic!("read config {}: {e}", args.config.display()));
    let cfg = config::load_json(&text).unwrap_or_else(|e| panic!("parse config: {e}"));
    let mut net = match config::build(&cfg) {
        Ok(net) => net,
        Err(e) => {
            eprintln!("invalid topology: {e}");
            std::process::exit(2);
        }
    };

    let runner = Runner::new(SimTime(args.tick_ms), SimTime(args.until_ms));
    let stopped = runner.run(&mut net, Network::all_flows_complete);

    println!("stopped_ms {}", stopped.0);
    println!(
        "all_flows_complete {}",
        net.all_flows_complete()
    );

    if let Some(path) = args.metrics_json {
        let json = serde_json::to_string_pretty(&net.report()).expect("serialize report");
        fs::write(&path, json).expect("write metrics json");
        println!("metrics_json {}", path.display());
    }
}
