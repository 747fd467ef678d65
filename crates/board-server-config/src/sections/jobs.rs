// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jobs configuration section.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_TICK_INTERVAL_SECS: u64 = 45;
const DEFAULT_PROJECT_SYNC_INTERVAL_MINS: u64 = 30;
const DEFAULT_LOG_RETENTION_DAYS: u32 = 90;
const DEFAULT_LOG_RETENTION_HOUR: u32 = 3;
const MAX_UTC_OFFSET_MINUTES: u32 = 24 * 60 - 1;
const MAX_PROJECT_SYNC_INTERVAL_MINS: u64 = 366 * 24 * 60;
const MAX_LOG_RETENTION_DAYS: u32 = 100 * 366;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobsConfigLayer {
	pub tick_interval_secs: Option<u64>,
	pub project_sync_enabled: Option<bool>,
	pub project_sync_interval_mins: Option<u64>,
	pub log_retention_days: Option<u32>,
	pub log_retention_hour: Option<u32>,
	pub utc_offset_minutes: Option<i32>,
}

impl JobsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.tick_interval_secs.is_some() {
			self.tick_interval_secs = other.tick_interval_secs;
		}
		if other.project_sync_enabled.is_some() {
			self.project_sync_enabled = other.project_sync_enabled;
		}
		if other.project_sync_interval_mins.is_some() {
			self.project_sync_interval_mins = other.project_sync_interval_mins;
		}
		if other.log_retention_days.is_some() {
			self.log_retention_days = other.log_retention_days;
		}
		if other.log_retention_hour.is_some() {
			self.log_retention_hour = other.log_retention_hour;
		}
		if other.utc_offset_minutes.is_some() {
			self.utc_offset_minutes = other.utc_offset_minutes;
		}
	}

	pub fn finalize(self) -> JobsConfig {
		JobsConfig {
			tick_interval_secs: self.tick_interval_secs.unwrap_or(DEFAULT_TICK_INTERVAL_SECS),
			project_sync_enabled: self.project_sync_enabled.unwrap_or(true),
			project_sync_interval_mins: self
				.project_sync_interval_mins
				.unwrap_or(DEFAULT_PROJECT_SYNC_INTERVAL_MINS),
			log_retention_days: self.log_retention_days.unwrap_or(DEFAULT_LOG_RETENTION_DAYS),
			log_retention_hour: self.log_retention_hour.unwrap_or(DEFAULT_LOG_RETENTION_HOUR),
			utc_offset_minutes: self.utc_offset_minutes.unwrap_or(0),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsConfig {
	pub tick_interval_secs: u64,
	pub project_sync_enabled: bool,
	pub project_sync_interval_mins: u64,
	/// Zero disables job log retention.
	pub log_retention_days: u32,
	pub log_retention_hour: u32,
	/// Offset applied to calendar days and hours of fixed-hour jobs.
	pub utc_offset_minutes: i32,
}

impl Default for JobsConfig {
	fn default() -> Self {
		JobsConfigLayer::default().finalize()
	}
}

impl JobsConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.tick_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"jobs.tick_interval_secs must be at least 1".to_string(),
			));
		}
		if self.project_sync_interval_mins == 0 {
			return Err(ConfigError::Validation(
				"jobs.project_sync_interval_mins must be at least 1".to_string(),
			));
		}
		if self.project_sync_interval_mins > MAX_PROJECT_SYNC_INTERVAL_MINS {
			return Err(ConfigError::Validation(format!(
				"jobs.project_sync_interval_mins must be at most {MAX_PROJECT_SYNC_INTERVAL_MINS}, got {}",
				self.project_sync_interval_mins
			)));
		}
		if self.log_retention_days > MAX_LOG_RETENTION_DAYS {
			return Err(ConfigError::Validation(format!(
				"jobs.log_retention_days must be at most {MAX_LOG_RETENTION_DAYS}, got {}",
				self.log_retention_days
			)));
		}
		if self.log_retention_hour > 23 {
			return Err(ConfigError::Validation(format!(
				"jobs.log_retention_hour must be between 0 and 23, got {}",
				self.log_retention_hour
			)));
		}
		if self.utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES {
			return Err(ConfigError::Validation(format!(
				"jobs.utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}, got {}",
				self.utc_offset_minutes
			)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_default_values() {
		let config = JobsConfig::default();
		assert_eq!(config.tick_interval_secs, 45);
		assert!(config.project_sync_enabled);
		assert_eq!(config.project_sync_interval_mins, 30);
		assert_eq!(config.log_retention_days, 90);
		assert_eq!(config.log_retention_hour, 3);
		assert_eq!(config.utc_offset_minutes, 0);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = JobsConfigLayer {
			project_sync_enabled: Some(true),
			project_sync_interval_mins: Some(30),
			log_retention_days: Some(90),
			..Default::default()
		};
		let overlay = JobsConfigLayer {
			project_sync_enabled: Some(false),
			log_retention_days: Some(30),
			..Default::default()
		};
		base.merge(overlay);
		assert_eq!(base.project_sync_enabled, Some(false));
		assert_eq!(base.project_sync_interval_mins, Some(30));
		assert_eq!(base.log_retention_days, Some(30));
	}

	#[test]
	fn test_validate_rejects_zero_sync_interval() {
		let config = JobsConfigLayer {
			project_sync_interval_mins: Some(0),
			..Default::default()
		}
		.finalize();
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("project_sync_interval_mins"));
	}

	#[test]
	fn test_validate_rejects_zero_tick_interval() {
		let config = JobsConfigLayer {
			tick_interval_secs: Some(0),
			..Default::default()
		}
		.finalize();
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_validate_rejects_oversized_sync_interval() {
		let config = JobsConfig {
			project_sync_interval_mins: u64::MAX,
			..Default::default()
		};
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("project_sync_interval_mins"));

		let config = JobsConfig {
			project_sync_interval_mins: MAX_PROJECT_SYNC_INTERVAL_MINS,
			..Default::default()
		};
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_validate_rejects_oversized_retention() {
		let config = JobsConfig {
			log_retention_days: u32::MAX,
			..Default::default()
		};
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("log_retention_days"));
	}

	#[test]
	fn test_validate_rejects_extreme_utc_offsets() {
		for minutes in [i32::MIN, i32::MAX, 24 * 60, -(24 * 60)] {
			let config = JobsConfig {
				utc_offset_minutes: minutes,
				..Default::default()
			};
			assert!(config.validate().is_err(), "offset {minutes} accepted");
		}
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: JobsConfigLayer = toml::from_str("log_retention_hour = 4\n").unwrap();
		assert_eq!(layer.log_retention_hour, Some(4));
		assert!(layer.tick_interval_secs.is_none());
	}

	proptest! {
		#[test]
		fn retention_hour_valid_iff_within_day(hour in 0u32..100) {
			let config = JobsConfig { log_retention_hour: hour, ..Default::default() };
			prop_assert_eq!(config.validate().is_ok(), hour <= 23);
		}

		#[test]
		fn utc_offset_valid_iff_under_a_day(minutes in -3000i32..3000) {
			let config = JobsConfig { utc_offset_minutes: minutes, ..Default::default() };
			prop_assert_eq!(config.validate().is_ok(), minutes.abs() < 24 * 60);
		}
	}
}
