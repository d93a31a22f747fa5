//! tareas server binary.
//!
//! Boots the store, seeds example rows into a fresh database and serves
//! the HTTP API until interrupted.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use tareas::cli::{Cli, Command};
use tareas::config::Config;
use tareas::db::Database;
use tareas::server;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn init_logging(destination: &str, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    match destination {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log, cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };

    if let Some(db_path) = cli.database {
        config.server.db_path = db_path;
    }

    let (port, no_seed) = match cli.command.unwrap_or(Command::Serve {
        port: None,
        no_seed: false,
    }) {
        Command::Serve { port, no_seed } => (port, no_seed),
    };

    if let Some(port) = port {
        config.server.port = port;
    }

    config.ensure_db_dir()?;

    // A connection failure here is fatal; there is no retry loop.
    let db = Database::open(&config.server.db_path)?;
    info!("store ready at {}", config.server.db_path.display());

    if config.server.seed_examples && !no_seed {
        let inserted = db.seed_example_tasks()?;
        if inserted > 0 {
            info!("seeded {} example tasks", inserted);
        }
    }

    let (shutdown_tx, _addr) = server::start_server(db, &config.server).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(());

    Ok(())
}
