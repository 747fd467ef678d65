// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process wiring for the project board job engine.
//!
//! Builds the job registry from configuration: the project sync job (backed by
//! Jira, or an empty source when Jira is disabled) and the job log retention
//! job.

pub mod error;
pub mod jobs;

pub use error::{Result, ServerError};

use std::sync::Arc;
use std::time::Duration;

use board_server_config::{BoardConfig, JiraConfig};
use board_server_db::{JobLogRepository, Project, ProjectRepository};
use board_server_jira::{JiraError, JiraProjectReader, JiraReaderConfig};
use board_server_jobs::{Clock, EmptySource, FixedHourPolicy, Job, JobExecutor};
use chrono::FixedOffset;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::jobs::project_sync::project_sync_job;
use crate::jobs::JobLogRetentionJob;

/// Converts a configured offset in minutes into a [`FixedOffset`].
pub fn utc_offset(minutes: i32) -> Result<FixedOffset> {
	minutes
		.checked_mul(60)
		.and_then(FixedOffset::east_opt)
		.ok_or(ServerError::InvalidOffset(minutes))
}

/// Converts the configured sync interval in minutes into a [`Duration`].
pub fn sync_interval(minutes: u64) -> Result<Duration> {
	minutes
		.checked_mul(60)
		.map(Duration::from_secs)
		.ok_or(ServerError::InvalidInterval(minutes))
}

/// Builds the Jira reader, or `None` when Jira is disabled.
pub fn jira_reader(jira: &JiraConfig, offset: FixedOffset) -> Result<Option<JiraProjectReader>> {
	if !jira.enabled {
		return Ok(None);
	}

	let request_url = jira
		.request_url
		.clone()
		.ok_or_else(|| JiraError::InvalidUrl("no request URL configured".to_string()))?;

	let reader = JiraProjectReader::new(JiraReaderConfig {
		request_url,
		server_info_url: jira.server_info_url.clone(),
		username: jira.username.clone(),
		password: jira.password.clone(),
		timeout: Duration::from_secs(jira.timeout_secs),
	})?
	.with_offset(offset);

	Ok(Some(reader))
}

/// Registers every job the configuration asks for on a new executor.
pub fn build_scheduler(config: &BoardConfig, pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<JobExecutor> {
	let offset = utc_offset(config.jobs.utc_offset_minutes)?;
	let job_log = Arc::new(JobLogRepository::new(pool.clone()));
	let projects = Arc::new(ProjectRepository::new(pool));

	let mut executor = JobExecutor::new(
		job_log.clone(),
		clock.clone(),
		Duration::from_secs(config.jobs.tick_interval_secs),
	);

	let sync_interval = sync_interval(config.jobs.project_sync_interval_mins)?;
	let project_sync: Arc<dyn Job> = match jira_reader(&config.jira, offset)? {
		Some(reader) => Arc::new(project_sync_job(Arc::new(reader), projects, sync_interval)),
		None => {
			warn!("Jira disabled, project sync will not fetch any projects");
			Arc::new(project_sync_job(
				Arc::new(EmptySource::<Project>::new()),
				projects,
				sync_interval,
			))
		}
	};

	if config.jobs.project_sync_enabled {
		executor.register(project_sync)?;
	} else {
		executor.register_disabled(project_sync)?;
	}

	let retention_policy = FixedHourPolicy::new(config.jobs.log_retention_hour)?.with_offset(offset);
	let retention: Arc<dyn Job> = Arc::new(JobLogRetentionJob::new(
		job_log,
		clock,
		retention_policy,
		config.jobs.log_retention_days,
	));

	if config.jobs.log_retention_days > 0 {
		executor.register(retention)?;
	} else {
		executor.register_disabled(retention)?;
	}

	info!(jobs = ?executor.job_ids(), "job registry built");
	Ok(executor)
}
