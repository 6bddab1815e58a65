mod audit;
mod autopilot;
mod captain;
mod catalog;
mod cli;
mod config;
mod coordinator;
mod detector;
mod forecast;
mod manifest;
mod model;
mod monitor;
mod planner;
mod procedure;
mod radio;
mod request;
mod safety;
mod scheduler;
mod selector;
mod station;
mod storage;

use std::process;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;
use storage::Storage;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (config, source) = match Config::resolve(cli.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };
    if let Some(path) = &source {
        tracing::debug!(path = %path.display(), "config loaded");
    }

    let root = config
        .storage_root
        .clone()
        .or_else(Storage::default_root)
        .unwrap_or_else(|| {
            eprintln!("Could not determine home directory.");
            process::exit(1);
        });

    let storage = match Storage::new(root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli.command, &config, &storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
