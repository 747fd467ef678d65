// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project board job engine binary.

use std::path::PathBuf;
use std::sync::Arc;

use board_server::{build_scheduler, jira_reader, utc_offset};
use board_server_config::{BoardConfig, LogFormat, LoggingConfig};
use board_server_jobs::{JobRunStatus, SystemClock};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod version;

/// Runs the project board's periodic jobs.
#[derive(Parser, Debug)]
#[command(name = "board-server", about = "Project board job engine", version)]
struct Args {
	/// Config file to use instead of /etc/project-board/server.toml
	#[arg(long, short, env = "BOARD_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the job executor until interrupted (default)
	Run,
	/// Run one job immediately, whether or not it is due
	Trigger { job_id: String },
	/// Print job health as JSON
	Status,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => board_server_config::load_config_with_file(path)?,
		None => board_server_config::load_config()?,
	};

	init_tracing(&config.logging);

	tracing::info!(
		database = %config.database.url,
		jira_enabled = config.jira.enabled,
		"starting board-server"
	);

	let pool = board_server_db::create_pool(&config.database.url).await?;
	board_server_db::run_migrations(&pool).await?;

	let executor = Arc::new(build_scheduler(&config, pool, Arc::new(SystemClock))?);

	match args.command.unwrap_or(Command::Run) {
		Command::Trigger { job_id } => {
			let result = executor.trigger(&job_id).await?;
			match result.status {
				JobRunStatus::Failed { error, .. } => {
					tracing::error!(job_id = %result.job_id, error = %error, "triggered run failed");
					return Err(error.into());
				}
				status => tracing::info!(job_id = %result.job_id, ?status, "triggered run finished"),
			}
		}
		Command::Status => {
			let health = executor.health_status().await;
			println!("{}", serde_json::to_string_pretty(&health)?);
		}
		Command::Run => {
			check_jira(&config).await;

			executor.start().await;

			tokio::signal::ctrl_c().await?;
			tracing::info!("shutdown signal received");

			executor.shutdown().await;
		}
		// Printed before configuration is loaded.
		Command::Version => {}
	}

	Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
	}
}

// Startup check only; an unreachable Jira shows up as failed sync runs.
async fn check_jira(config: &BoardConfig) {
	if config.jira.server_info_url.is_none() {
		return;
	}

	let reader = match utc_offset(config.jobs.utc_offset_minutes)
		.and_then(|offset| jira_reader(&config.jira, offset))
	{
		Ok(Some(reader)) => reader,
		Ok(None) => return,
		Err(e) => {
			tracing::warn!(error = %e, "could not build Jira client for server info check");
			return;
		}
	};

	match reader.server_info().await {
		Ok(info) => tracing::info!(
			server_title = %info.server_title,
			version = %info.version,
			"connected to Jira"
		),
		Err(e) => tracing::warn!(error = %e, "Jira server info check failed"),
	}
}
