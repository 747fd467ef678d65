// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use board_server_secret::SecretString;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::BoardConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, JiraConfigLayer, JobsConfigLayer, LogFormat, LoggingConfigLayer,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/project-board/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<BoardConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<BoardConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(BoardConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(DEFAULT_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<BoardConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(BoardConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: BoardConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: BOARD_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<BoardConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(BoardConfigLayer {
			database: Some(load_database_from_env()),
			jobs: Some(load_jobs_from_env()?),
			jira: Some(load_jira_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T>(name: &str) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid value '{v}': {e}"),
		}),
		None => Ok(None),
	}
}

/// Reads `name`, or the contents of the file named by `<name>_FILE`.
fn env_secret(name: &str) -> Result<Option<String>, ConfigError> {
	if let Some(value) = env_var(name) {
		return Ok(Some(value));
	}

	let file_var = format!("{name}_FILE");
	match env_var(&file_var) {
		Some(path) => std::fs::read_to_string(&path)
			.map(|s| Some(s.trim_end_matches(['\r', '\n']).to_string()))
			.map_err(|e| ConfigError::FileRead {
				path: PathBuf::from(path),
				source: e,
			}),
		None => Ok(None),
	}
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("BOARD_SERVER_DATABASE_URL"),
	}
}

fn load_jobs_from_env() -> Result<JobsConfigLayer, ConfigError> {
	Ok(JobsConfigLayer {
		tick_interval_secs: env_parse("BOARD_SERVER_JOBS_TICK_INTERVAL_SECS")?,
		project_sync_enabled: env_bool("BOARD_SERVER_PROJECT_SYNC_ENABLED"),
		project_sync_interval_mins: env_parse("BOARD_SERVER_PROJECT_SYNC_INTERVAL_MINS")?,
		log_retention_days: env_parse("BOARD_SERVER_JOB_LOG_RETENTION_DAYS")?,
		log_retention_hour: env_parse("BOARD_SERVER_JOB_LOG_RETENTION_HOUR")?,
		utc_offset_minutes: env_parse("BOARD_SERVER_JOBS_UTC_OFFSET_MINUTES")?,
	})
}

fn load_jira_from_env() -> Result<JiraConfigLayer, ConfigError> {
	Ok(JiraConfigLayer {
		enabled: env_bool("BOARD_SERVER_JIRA_ENABLED"),
		request_url: env_var("BOARD_SERVER_JIRA_REQUEST_URL"),
		server_info_url: env_var("BOARD_SERVER_JIRA_SERVER_INFO_URL"),
		username: env_var("BOARD_SERVER_JIRA_USERNAME"),
		password: env_secret("BOARD_SERVER_JIRA_PASSWORD")?.map(SecretString::new),
		timeout_secs: env_parse("BOARD_SERVER_JIRA_TIMEOUT_SECS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	Ok(LoggingConfigLayer {
		level: env_var("BOARD_SERVER_LOG_LEVEL"),
		format: env_parse::<LogFormat>("BOARD_SERVER_LOG_FORMAT")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.database.is_none());
		assert!(layer.jobs.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/config.toml").load().unwrap();
		assert!(layer.database.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[jobs]\nproject_sync_interval_mins = 5\n\n[logging]\nformat = \"json\""
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.jobs.unwrap().project_sync_interval_mins, Some(5));
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[jobs\nbroken").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_parse_reports_key() {
		std::env::set_var("BOARD_SERVER_TEST_ENV_PARSE_U64", "forty-five");
		let err = env_parse::<u64>("BOARD_SERVER_TEST_ENV_PARSE_U64").unwrap_err();
		std::env::remove_var("BOARD_SERVER_TEST_ENV_PARSE_U64");

		match err {
			ConfigError::InvalidValue { key, .. } => assert_eq!(key, "BOARD_SERVER_TEST_ENV_PARSE_U64"),
			e => panic!("Expected InvalidValue, got: {:?}", e),
		}
	}

	#[test]
	fn test_env_secret_reads_file_variant() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "s3cret").unwrap();
		std::env::set_var("BOARD_SERVER_TEST_SECRET_FILE", file.path());

		let secret = env_secret("BOARD_SERVER_TEST_SECRET").unwrap();
		std::env::remove_var("BOARD_SERVER_TEST_SECRET_FILE");

		assert_eq!(secret.as_deref(), Some("s3cret"));
	}
}
