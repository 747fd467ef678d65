// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use board_server_jobs::{Clock, DuePolicy, FixedHourPolicy, Job, JobError, JobLogRepository};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const JOB_LOG_RETENTION_JOB_ID: &str = "job-log-retention";

/// Deletes job log entries past the retention window, once a day.
///
/// Each job's latest success survives pruning, so retention never forces a
/// bootstrap.
pub struct JobLogRetentionJob {
	repository: Arc<JobLogRepository>,
	clock: Arc<dyn Clock>,
	policy: FixedHourPolicy,
	retention_days: u32,
}

impl JobLogRetentionJob {
	pub fn new(
		repository: Arc<JobLogRepository>,
		clock: Arc<dyn Clock>,
		policy: FixedHourPolicy,
		retention_days: u32,
	) -> Self {
		Self {
			repository,
			clock,
			policy,
			retention_days,
		}
	}

	async fn prune(&self) -> Result<(), JobError> {
		let Some(cutoff) = self
			.clock
			.now()
			.checked_sub_signed(Duration::days(i64::from(self.retention_days)))
		else {
			return Err(JobError::Failed(format!(
				"retention of {} days reaches before the earliest representable time",
				self.retention_days
			)));
		};

		match self.repository.prune_before(cutoff).await {
			Ok(count) => {
				tracing::info!(
					deleted = count,
					retention_days = self.retention_days,
					%cutoff,
					"Job log retention completed"
				);
				Ok(())
			}
			Err(e) => Err(JobError::Failed(format!("Job log retention failed: {e}"))),
		}
	}
}

#[async_trait]
impl Job for JobLogRetentionJob {
	fn id(&self) -> &str {
		JOB_LOG_RETENTION_JOB_ID
	}

	fn name(&self) -> &str {
		"Job Log Retention"
	}

	fn description(&self) -> &str {
		"Removes old job log entries"
	}

	fn policy(&self) -> DuePolicy {
		DuePolicy::FixedHour(self.policy)
	}

	async fn run_incremental(&self, _since: DateTime<Utc>) -> Result<(), JobError> {
		self.prune().await
	}

	async fn run_bootstrap(&self) -> Result<(), JobError> {
		self.prune().await
	}
}
