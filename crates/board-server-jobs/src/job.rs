// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::JobError;
use crate::policy::DuePolicy;

/// A named, schedulable unit of work.
///
/// Jobs hold no scheduling state of their own: the executor reads the last
/// successful run from the job log and passes it in.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use board_server_jobs::{DuePolicy, Job, JobError};
///
/// pub struct MyJob;
///
/// #[async_trait]
/// impl Job for MyJob {
///     fn id(&self) -> &str { "my-job" }
///     fn name(&self) -> &str { "My Job" }
///     fn description(&self) -> &str { "Does things" }
///     fn policy(&self) -> DuePolicy { DuePolicy::every(Duration::from_secs(60)) }
///
///     async fn run_incremental(&self, since: DateTime<Utc>) -> Result<(), JobError> { Ok(()) }
///     async fn run_bootstrap(&self) -> Result<(), JobError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable key used to correlate log entries. Changing it forces a bootstrap.
	fn id(&self) -> &str;

	fn name(&self) -> &str;

	fn description(&self) -> &str;

	fn policy(&self) -> DuePolicy;

	/// Pure predicate. `last_success` is `None` when the job never succeeded.
	fn is_due(&self, last_success: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
		self.policy().is_due(last_success, now)
	}

	/// Processes changes since `since`. Must tolerate being handed an older
	/// `since` than the true last success.
	async fn run_incremental(&self, since: DateTime<Utc>) -> Result<(), JobError>;

	/// Full run, used only when no successful run has been logged.
	async fn run_bootstrap(&self) -> Result<(), JobError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunMode {
	Bootstrap,
	Incremental { since: DateTime<Utc> },
}

impl RunMode {
	pub fn for_last_success(last_success: Option<DateTime<Utc>>) -> Self {
		match last_success {
			None => RunMode::Bootstrap,
			Some(since) => RunMode::Incremental { since },
		}
	}
}
