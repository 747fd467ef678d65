// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jira connection settings.

use board_server_secret::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const JQL_PLACEHOLDER: &str = "{jql}";

#[derive(Debug, Clone)]
pub struct JiraConfig {
	pub enabled: bool,
	/// Search URL containing a `{jql}` placeholder.
	pub request_url: Option<String>,
	pub server_info_url: Option<String>,
	pub username: String,
	pub password: SecretString,
	pub timeout_secs: u64,
}

impl Default for JiraConfig {
	fn default() -> Self {
		JiraConfigLayer::default().finalize()
	}
}

impl JiraConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.enabled {
			return Ok(());
		}

		match &self.request_url {
			None => Err(ConfigError::Validation(
				"jira.request_url is required when Jira is enabled (set jira.enabled = false to run without it)"
					.to_string(),
			)),
			Some(url) if !url.contains(JQL_PLACEHOLDER) => Err(ConfigError::Validation(format!(
				"jira.request_url must contain {JQL_PLACEHOLDER}"
			))),
			Some(_) if self.timeout_secs == 0 => Err(ConfigError::Validation(
				"jira.timeout_secs must be at least 1".to_string(),
			)),
			Some(_) => Ok(()),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub request_url: Option<String>,
	#[serde(default)]
	pub server_info_url: Option<String>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<SecretString>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl JiraConfigLayer {
	pub fn merge(&mut self, other: JiraConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.request_url.is_some() {
			self.request_url = other.request_url;
		}
		if other.server_info_url.is_some() {
			self.server_info_url = other.server_info_url;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> JiraConfig {
		JiraConfig {
			enabled: self.enabled.unwrap_or(true),
			request_url: self.request_url,
			server_info_url: self.server_info_url,
			username: self.username.unwrap_or_default(),
			password: self.password.unwrap_or_default(),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn enabled_with(url: &str) -> JiraConfig {
		JiraConfigLayer {
			request_url: Some(url.to_string()),
			..Default::default()
		}
		.finalize()
	}

	#[test]
	fn test_defaults() {
		let config = JiraConfig::default();
		assert!(config.enabled);
		assert!(config.request_url.is_none());
		assert_eq!(config.timeout_secs, 30);
	}

	#[test]
	fn test_enabled_requires_request_url() {
		assert!(JiraConfig::default().validate().is_err());
		assert!(enabled_with("https://jira.example.com/rest/api/2/search?jql={jql}")
			.validate()
			.is_ok());
	}

	#[test]
	fn test_request_url_requires_placeholder() {
		let err = enabled_with("https://jira.example.com/rest/api/2/search")
			.validate()
			.unwrap_err();
		assert!(err.to_string().contains("{jql}"));
	}

	#[test]
	fn test_disabled_skips_validation() {
		let config = JiraConfigLayer {
			enabled: Some(false),
			..Default::default()
		}
		.finalize();
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_debug_redacts_password() {
		let config = JiraConfigLayer {
			password: Some(SecretString::new("hunter2".to_string())),
			..Default::default()
		};
		assert!(!format!("{config:?}").contains("hunter2"));

		let config = config.finalize();
		assert!(!format!("{config:?}").contains("hunter2"));
		assert_eq!(config.password.expose(), "hunter2");
	}
}
