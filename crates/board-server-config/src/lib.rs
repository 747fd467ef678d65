// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the project board server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`BOARD_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use board_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Ticking every {}s", config.jobs.tick_interval_secs);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use board_server_secret::SecretString;
pub use error::ConfigError;
pub use layer::BoardConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, DEFAULT_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct BoardConfig {
	pub database: DatabaseConfig,
	pub jobs: JobsConfig,
	pub jira: JiraConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`BOARD_SERVER_*`)
/// 2. Config file (`/etc/project-board/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<BoardConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<BoardConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<BoardConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = BoardConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: BoardConfigLayer) -> Result<BoardConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let jobs = layer.jobs.unwrap_or_default().finalize();
	let jira = layer.jira.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	jobs.validate()?;
	jira.validate()?;

	info!(
		database = %database.url,
		tick_interval_secs = jobs.tick_interval_secs,
		project_sync_enabled = jobs.project_sync_enabled,
		project_sync_interval_mins = jobs.project_sync_interval_mins,
		log_retention_days = jobs.log_retention_days,
		jira_enabled = jira.enabled,
		"Server configuration loaded"
	);

	Ok(BoardConfig {
		database,
		jobs,
		jira,
		logging,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	struct StaticSource(Precedence, fn() -> BoardConfigLayer);

	impl ConfigSource for StaticSource {
		fn name(&self) -> &'static str {
			"static"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<BoardConfigLayer, ConfigError> {
			Ok((self.1)())
		}
	}

	fn jira_disabled() -> BoardConfigLayer {
		BoardConfigLayer {
			jira: Some(JiraConfigLayer {
				enabled: Some(false),
				..Default::default()
			}),
			..Default::default()
		}
	}

	fn env_like() -> BoardConfigLayer {
		BoardConfigLayer {
			jobs: Some(JobsConfigLayer {
				project_sync_interval_mins: Some(10),
				..Default::default()
			}),
			..Default::default()
		}
	}

	fn file_like() -> BoardConfigLayer {
		BoardConfigLayer {
			jobs: Some(JobsConfigLayer {
				project_sync_interval_mins: Some(60),
				log_retention_days: Some(14),
				..Default::default()
			}),
			jira: Some(JiraConfigLayer {
				enabled: Some(false),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let config = load_from_sources(vec![
			Box::new(StaticSource(Precedence::Environment, env_like)),
			Box::new(StaticSource(Precedence::ConfigFile, file_like)),
			Box::new(DefaultsSource),
		])
		.unwrap();

		assert_eq!(config.jobs.project_sync_interval_mins, 10);
		assert_eq!(config.jobs.log_retention_days, 14);
		assert_eq!(config.jobs.tick_interval_secs, 45);
	}

	#[test]
	fn test_defaults_with_jira_disabled() {
		let config = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(StaticSource(Precedence::ConfigFile, jira_disabled)),
		])
		.unwrap();

		assert_eq!(config.database.url, "sqlite:./project-board.db");
		assert_eq!(config.logging.level, "info");
		assert!(!config.jira.enabled);
	}

	#[test]
	fn test_enabled_jira_without_url_fails_validation() {
		let err = load_from_sources(vec![Box::new(DefaultsSource)]).unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_load_config_with_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite:/var/lib/project-board/board.db"

[jobs]
log_retention_hour = 5

[jira]
request_url = "https://jira.example.com/rest/api/2/search?jql={{jql}}"
username = "svc-board"
"#
		)
		.unwrap();

		let config = load_config_with_file(file.path()).unwrap();
		assert_eq!(config.jira.username, "svc-board");
		assert_eq!(config.jobs.log_retention_hour, 5);
		assert!(config.jira.request_url.unwrap().contains("{jql}"));
	}
}
