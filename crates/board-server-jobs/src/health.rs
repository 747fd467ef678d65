// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use board_server_db::{JobLogEntry, JobOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct JobHealthStatus {
	pub job_id: String,
	pub name: String,
	pub enabled: bool,
	pub status: HealthState,
	pub last_run: Option<LastRunInfo>,
	pub last_success: Option<DateTime<Utc>>,
	pub consecutive_failures: u32,
	pub total_runs: u64,
	pub successful_runs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastRunInfo {
	pub entry_id: i64,
	pub outcome: JobOutcome,
	pub timestamp: DateTime<Utc>,
	pub failure_reason: Option<String>,
}

impl From<JobLogEntry> for LastRunInfo {
	fn from(entry: JobLogEntry) -> Self {
		Self {
			entry_id: entry.id,
			outcome: entry.outcome,
			timestamp: entry.timestamp,
			failure_reason: entry.failure_reason,
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

impl HealthState {
	pub fn is_healthy(&self) -> bool {
		*self == HealthState::Healthy
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	/// Ticks in a row that aborted on a job log failure.
	pub consecutive_tick_failures: u32,
	/// Set when the job log could not be read while building this report.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub log_store_error: Option<String>,
	pub jobs: Vec<JobHealthStatus>,
}

pub(crate) fn determine_health_state(last_run: Option<&LastRunInfo>, consecutive_failures: u32) -> HealthState {
	match last_run {
		None => HealthState::Healthy,
		Some(run) => match run.outcome {
			JobOutcome::Success => HealthState::Healthy,
			JobOutcome::Failure => failures_to_state(consecutive_failures),
		},
	}
}

pub(crate) fn failures_to_state(consecutive_failures: u32) -> HealthState {
	if consecutive_failures >= 3 {
		HealthState::Unhealthy
	} else if consecutive_failures >= 1 {
		HealthState::Degraded
	} else {
		HealthState::Healthy
	}
}
