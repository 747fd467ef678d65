// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use board_server_db::{JobLogStore, JobOutcome, NewJobLogEntry};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{ExecutorError, JobError};
use crate::health::{
	determine_health_state, failures_to_state, HealthState, JobHealthStatus, JobsHealthStatus,
	LastRunInfo,
};
use crate::job::{Job, RunMode};

struct RegisteredJob {
	id: String,
	job: Arc<dyn Job>,
	enabled: bool,
	run_lock: Arc<Mutex<()>>,
}

/// What happened to one job during a tick or trigger.
#[derive(Debug, Clone)]
pub enum JobRunStatus {
	NotDue,
	/// Another run of the same job held the run lock.
	AlreadyRunning,
	Succeeded {
		mode: RunMode,
	},
	Failed {
		mode: RunMode,
		error: JobError,
	},
}

impl JobRunStatus {
	pub fn ran(&self) -> bool {
		matches!(self, JobRunStatus::Succeeded { .. } | JobRunStatus::Failed { .. })
	}
}

#[derive(Debug, Clone)]
pub struct JobRunResult {
	pub job_id: String,
	pub status: JobRunStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
	pub results: Vec<JobRunResult>,
}

impl TickReport {
	pub fn status(&self, job_id: &str) -> Option<&JobRunStatus> {
		self
			.results
			.iter()
			.find(|r| r.job_id == job_id)
			.map(|r| &r.status)
	}

	pub fn failed(&self) -> usize {
		self
			.results
			.iter()
			.filter(|r| matches!(r.status, JobRunStatus::Failed { .. }))
			.count()
	}
}

/// Drives registered jobs from the durable job log.
///
/// Each tick visits enabled jobs in registration order, reads the last
/// successful run, asks the job whether it is due, runs bootstrap or
/// incremental work, and appends the outcome. Job failures are contained;
/// only job log failures escape a tick.
pub struct JobExecutor {
	jobs: Vec<RegisteredJob>,
	store: Arc<dyn JobLogStore>,
	clock: Arc<dyn Clock>,
	tick_interval: Duration,
	consecutive_tick_failures: AtomicU32,
	shutdown_tx: broadcast::Sender<()>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl JobExecutor {
	pub fn new(store: Arc<dyn JobLogStore>, clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: Vec::new(),
			store,
			clock,
			tick_interval,
			consecutive_tick_failures: AtomicU32::new(0),
			shutdown_tx,
			handle: Mutex::new(None),
		}
	}

	pub fn register(&mut self, job: Arc<dyn Job>) -> Result<(), ExecutorError> {
		self.insert(job, true)
	}

	/// Known to the executor and visible in health, but never ticked.
	pub fn register_disabled(&mut self, job: Arc<dyn Job>) -> Result<(), ExecutorError> {
		self.insert(job, false)
	}

	fn insert(&mut self, job: Arc<dyn Job>, enabled: bool) -> Result<(), ExecutorError> {
		let id = job.id().trim().to_string();
		if id.is_empty() {
			return Err(ExecutorError::InvalidIdentifier(job.id().to_string()));
		}
		if self.jobs.iter().any(|j| j.id == id) {
			return Err(ExecutorError::DuplicateIdentifier(id));
		}

		info!(job_id = %id, name = %job.name(), enabled, "registered job");
		self.jobs.push(RegisteredJob {
			id,
			job,
			enabled,
			run_lock: Arc::new(Mutex::new(())),
		});
		Ok(())
	}

	pub fn job_ids(&self) -> Vec<String> {
		self.jobs.iter().map(|j| j.id.clone()).collect()
	}

	pub fn tick_interval(&self) -> Duration {
		self.tick_interval
	}

	/// Runs every due, enabled job once.
	#[instrument(skip(self))]
	pub async fn tick(&self) -> Result<TickReport, ExecutorError> {
		let mut report = TickReport::default();

		for registered in self.jobs.iter().filter(|j| j.enabled) {
			let Ok(guard) = Arc::clone(&registered.run_lock).try_lock_owned() else {
				debug!(job_id = %registered.id, "job still running, skipping");
				report.results.push(JobRunResult {
					job_id: registered.id.clone(),
					status: JobRunStatus::AlreadyRunning,
				});
				continue;
			};

			let last_success = self.last_success(&registered.id).await?;
			let now = self.clock.now();

			let status = if registered.job.is_due(last_success, now) {
				self.run(registered, guard, last_success, now).await?
			} else {
				debug!(job_id = %registered.id, "job not due");
				JobRunStatus::NotDue
			};

			report.results.push(JobRunResult {
				job_id: registered.id.clone(),
				status,
			});
		}

		Ok(report)
	}

	/// Runs a job now regardless of due-ness. Waits for a run already in
	/// progress to finish first.
	#[instrument(skip(self))]
	pub async fn trigger(&self, job_id: &str) -> Result<JobRunResult, ExecutorError> {
		let registered = self
			.jobs
			.iter()
			.find(|j| j.id == job_id.trim())
			.ok_or_else(|| ExecutorError::NotFound(job_id.to_string()))?;

		let guard = Arc::clone(&registered.run_lock).lock_owned().await;
		let last_success = self.last_success(&registered.id).await?;
		let now = self.clock.now();
		let status = self.run(registered, guard, last_success, now).await?;

		Ok(JobRunResult {
			job_id: registered.id.clone(),
			status,
		})
	}

	async fn last_success(&self, job_id: &str) -> Result<Option<DateTime<Utc>>, ExecutorError> {
		Ok(self
			.store
			.find_latest_success(job_id)
			.await?
			.map(|entry| entry.timestamp))
	}

	// The run lock moves into the spawned task and is released only after the
	// outcome is logged, even if the caller stops waiting.
	async fn run(
		&self,
		registered: &RegisteredJob,
		guard: OwnedMutexGuard<()>,
		last_success: Option<DateTime<Utc>>,
		now: DateTime<Utc>,
	) -> Result<JobRunStatus, ExecutorError> {
		let mode = RunMode::for_last_success(last_success);
		let job = Arc::clone(&registered.job);
		let store = Arc::clone(&self.store);
		let job_id = registered.id.clone();

		let handle = tokio::spawn(async move {
			let _guard = guard;

			// A panicking job surfaces as a JoinError instead of unwinding the run.
			let body = tokio::spawn(async move {
				match mode {
					RunMode::Bootstrap => job.run_bootstrap().await,
					RunMode::Incremental { since } => job.run_incremental(since).await,
				}
			});
			let result = match body.await {
				Ok(result) => result,
				Err(e) => Err(JobError::Failed(format!("job task did not complete: {e}"))),
			};

			record_outcome(store.as_ref(), &job_id, mode, now, result).await
		});

		match handle.await {
			Ok(status) => status,
			Err(e) => Err(ExecutorError::RunAborted {
				job_id: registered.id.clone(),
				reason: e.to_string(),
			}),
		}
	}

	/// Spawns the run loop: tick immediately, then wait `tick_interval`
	/// between the end of one tick and the start of the next.
	#[instrument(skip(self))]
	pub async fn start(self: &Arc<Self>) {
		let mut handle = self.handle.lock().await;
		if handle.is_some() {
			warn!("job executor already started");
			return;
		}

		let executor = Arc::clone(self);
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		*handle = Some(tokio::spawn(async move {
			loop {
				executor.tick_and_record().await;

				tokio::select! {
					_ = tokio::time::sleep(executor.tick_interval) => {}
					_ = shutdown_rx.recv() => {
						info!("job executor loop stopping");
						break;
					}
				}
			}
		}));

		info!(
			job_count = self.jobs.len(),
			tick_interval_secs = self.tick_interval.as_secs(),
			"job executor started"
		);
	}

	async fn tick_and_record(&self) {
		match self.tick().await {
			Ok(report) => {
				self.consecutive_tick_failures.store(0, Ordering::Relaxed);
				let ran = report.results.iter().filter(|r| r.status.ran()).count();
				if ran > 0 {
					info!(ran, failed = report.failed(), "tick complete");
				}
			}
			Err(e) => {
				let failures = self.consecutive_tick_failures.fetch_add(1, Ordering::Relaxed) + 1;
				error!(error = %e, consecutive_failures = failures, "tick aborted");
			}
		}
	}

	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		if let Some(handle) = self.handle.lock().await.take() {
			let _ = handle.await;
		}

		info!("job executor shut down");
	}

	/// Health of one job, read from the job log.
	#[instrument(skip(self))]
	pub async fn job_status(&self, job_id: &str) -> Result<JobHealthStatus, ExecutorError> {
		let registered = self
			.jobs
			.iter()
			.find(|j| j.id == job_id.trim())
			.ok_or_else(|| ExecutorError::NotFound(job_id.to_string()))?;
		let id = registered.id.as_str();

		let last_run = self.store.find_latest(id).await?.map(LastRunInfo::from);
		let last_success = self.last_success(id).await?;
		let consecutive_failures = self.store.count_consecutive_failures(id).await?;
		let total_runs = self.store.count_entries(id).await?;
		let successful_runs = self.store.count_by_outcome(id, JobOutcome::Success).await?;

		let status = determine_health_state(last_run.as_ref(), consecutive_failures);

		Ok(JobHealthStatus {
			job_id: registered.id.clone(),
			name: registered.job.name().to_string(),
			enabled: registered.enabled,
			status,
			last_run,
			last_success,
			consecutive_failures,
			total_runs,
			successful_runs,
		})
	}

	/// Overall health. An unreadable job log makes the whole report unhealthy.
	#[instrument(skip(self))]
	pub async fn health_status(&self) -> JobsHealthStatus {
		let consecutive_tick_failures = self.consecutive_tick_failures.load(Ordering::Relaxed);
		let mut worst_state = failures_to_state(consecutive_tick_failures);
		let mut jobs = Vec::with_capacity(self.jobs.len());
		let mut log_store_error = None;

		for registered in &self.jobs {
			match self.job_status(&registered.id).await {
				Ok(status) => {
					worst_state = worst_state.max(status.status);
					jobs.push(status);
				}
				Err(e) => {
					warn!(job_id = %registered.id, error = %e, "failed to read job health");
					worst_state = HealthState::Unhealthy;
					log_store_error.get_or_insert_with(|| e.to_string());
				}
			}
		}

		JobsHealthStatus {
			status: worst_state,
			consecutive_tick_failures,
			log_store_error,
			jobs,
		}
	}
}

async fn record_outcome(
	store: &dyn JobLogStore,
	job_id: &str,
	mode: RunMode,
	now: DateTime<Utc>,
	result: Result<(), JobError>,
) -> Result<JobRunStatus, ExecutorError> {
	match result {
		Ok(()) => {
			store.append(&NewJobLogEntry::success(job_id, now)).await?;
			info!(job_id, ?mode, "job succeeded");
			Ok(JobRunStatus::Succeeded { mode })
		}
		Err(error) => {
			store
				.append(&NewJobLogEntry::failure(job_id, now, error.to_string()))
				.await?;
			warn!(job_id, ?mode, error = %error, "job failed");
			Ok(JobRunStatus::Failed { mode, error })
		}
	}
}
