// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OctoFit Tracker API Server
//!
//! Serves the fitness tracking REST API and provides the administrative
//! commands that seed sample data and rebuild the leaderboard.

use clap::{Parser, Subcommand};
use octofit_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{LeaderboardService, Seeder},
    AppState,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Delete all data and load the superhero sample set
    Populate {
        /// Seed for reproducible sample data
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Rebuild the leaderboard from all activities
    RecomputeLeaderboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    let args = Args::parse();

    // Load configuration from environment
    let config = Config::from_env()?;

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await?,
        Command::Populate { seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            Seeder::new(db).populate(&mut rng).await?;
        }
        Command::RecomputeLeaderboard => {
            let summary = LeaderboardService::new(db).recompute().await?;
            tracing::info!(
                snapshot = %summary.snapshot_id,
                activities = summary.activities,
                entries = summary.entries,
                removed = summary.removed,
                dangling_references = summary.dangling_references,
                "Leaderboard recomputed"
            );
        }
    }

    Ok(())
}

async fn serve(config: Config, db: FirestoreDb) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(port = config.port, "Starting OctoFit Tracker API");

    let addr = format!("0.0.0.0:{}", config.port);

    // Build shared state
    let state = Arc::new(AppState { config, db });

    // Build router
    let app = octofit_tracker::routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("octofit_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
