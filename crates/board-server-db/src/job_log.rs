// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
	Success,
	Failure,
}

impl JobOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobOutcome::Success => "success",
			JobOutcome::Failure => "failure",
		}
	}
}

impl std::str::FromStr for JobOutcome {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"success" => Ok(JobOutcome::Success),
			"failure" => Ok(JobOutcome::Failure),
			_ => Err(format!("unknown job outcome: {s}")),
		}
	}
}

/// A run outcome that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJobLogEntry {
	pub job_id: String,
	pub timestamp: DateTime<Utc>,
	pub outcome: JobOutcome,
	pub failure_reason: Option<String>,
}

impl NewJobLogEntry {
	pub fn success(job_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
		Self {
			job_id: job_id.into(),
			timestamp,
			outcome: JobOutcome::Success,
			failure_reason: None,
		}
	}

	pub fn failure(
		job_id: impl Into<String>,
		timestamp: DateTime<Utc>,
		reason: impl Into<String>,
	) -> Self {
		Self {
			job_id: job_id.into(),
			timestamp,
			outcome: JobOutcome::Failure,
			failure_reason: Some(reason.into()),
		}
	}
}

/// One stored run of a scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogEntry {
	pub id: i64,
	pub job_id: String,
	pub timestamp: DateTime<Utc>,
	pub outcome: JobOutcome,
	pub failure_reason: Option<String>,
}

#[derive(sqlx::FromRow)]
struct JobLogRow {
	id: i64,
	job_id: String,
	timestamp: String,
	outcome: String,
	failure_reason: Option<String>,
}

impl TryFrom<JobLogRow> for JobLogEntry {
	type Error = DbError;

	fn try_from(row: JobLogRow) -> Result<Self> {
		Ok(JobLogEntry {
			id: row.id,
			job_id: row.job_id,
			timestamp: parse_timestamp(&row.timestamp)?,
			outcome: row.outcome.parse().map_err(DbError::Internal)?,
			failure_reason: row.failure_reason,
		})
	}
}

// Fixed precision keeps lexical order equal to chronological order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
	timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|t| t.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid job log timestamp '{value}': {e}")))
}

const SELECT_COLUMNS: &str = "SELECT id, job_id, timestamp, outcome, failure_reason FROM job_log";

#[derive(Clone)]
pub struct JobLogRepository {
	pool: SqlitePool,
}

impl JobLogRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, entry), fields(job_id = %entry.job_id, outcome = entry.outcome.as_str()))]
	pub async fn append(&self, entry: &NewJobLogEntry) -> Result<JobLogEntry> {
		let result = sqlx::query(
			r#"
            INSERT INTO job_log (job_id, timestamp, outcome, failure_reason)
            VALUES (?, ?, ?, ?)
            "#,
		)
		.bind(&entry.job_id)
		.bind(format_timestamp(entry.timestamp))
		.bind(entry.outcome.as_str())
		.bind(&entry.failure_reason)
		.execute(&self.pool)
		.await?;

		Ok(JobLogEntry {
			id: result.last_insert_rowid(),
			job_id: entry.job_id.clone(),
			timestamp: entry.timestamp,
			outcome: entry.outcome,
			failure_reason: entry.failure_reason.clone(),
		})
	}

	#[tracing::instrument(skip(self))]
	pub async fn find_latest_success(&self, job_id: &str) -> Result<Option<JobLogEntry>> {
		let row = sqlx::query_as::<_, JobLogRow>(&format!(
			"{SELECT_COLUMNS} WHERE job_id = ? AND outcome = 'success' ORDER BY timestamp DESC, id DESC LIMIT 1"
		))
		.bind(job_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(JobLogEntry::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn find_latest(&self, job_id: &str) -> Result<Option<JobLogEntry>> {
		let row = sqlx::query_as::<_, JobLogRow>(&format!(
			"{SELECT_COLUMNS} WHERE job_id = ? ORDER BY timestamp DESC, id DESC LIMIT 1"
		))
		.bind(job_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(JobLogEntry::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_entries(&self, job_id: &str, limit: u32, offset: u32) -> Result<Vec<JobLogEntry>> {
		let rows = sqlx::query_as::<_, JobLogRow>(&format!(
			"{SELECT_COLUMNS} WHERE job_id = ? ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?"
		))
		.bind(job_id)
		.bind(limit as i64)
		.bind(offset as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(JobLogEntry::try_from).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_consecutive_failures(&self, job_id: &str) -> Result<u32> {
		let row = sqlx::query_as::<_, (i64,)>(
			r#"
            WITH ranked AS (
                SELECT outcome,
                       ROW_NUMBER() OVER (ORDER BY timestamp DESC, id DESC) as rn
                FROM job_log
                WHERE job_id = ?
            )
            SELECT COUNT(*) as count
            FROM ranked
            WHERE outcome = 'failure'
              AND rn <= (
                  SELECT COALESCE(MIN(rn) - 1, (SELECT COUNT(*) FROM ranked))
                  FROM ranked
                  WHERE outcome != 'failure'
              )
            "#,
		)
		.bind(job_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 as u32)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_by_outcome(&self, job_id: &str, outcome: JobOutcome) -> Result<u64> {
		let row = sqlx::query_as::<_, (i64,)>(
			"SELECT COUNT(*) FROM job_log WHERE job_id = ? AND outcome = ?",
		)
		.bind(job_id)
		.bind(outcome.as_str())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 as u64)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_entries(&self, job_id: &str) -> Result<u64> {
		let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM job_log WHERE job_id = ?")
			.bind(job_id)
			.fetch_one(&self.pool)
			.await?;

		Ok(row.0 as u64)
	}

	/// Deletes entries older than `cutoff`, keeping the latest success of every job.
	///
	/// Not part of [`JobLogStore`]: the executor only ever reads and appends.
	#[tracing::instrument(skip(self))]
	pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
		let result = sqlx::query(
			r#"
            DELETE FROM job_log
            WHERE timestamp < ?
              AND id NOT IN (
                  SELECT id FROM (
                      SELECT id,
                             ROW_NUMBER() OVER (PARTITION BY job_id ORDER BY timestamp DESC, id DESC) as rn
                      FROM job_log
                      WHERE outcome = 'success'
                  )
                  WHERE rn = 1
              )
            "#,
		)
		.bind(format_timestamp(cutoff))
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}
}

/// Log store as seen by the job executor and the health report.
#[async_trait]
pub trait JobLogStore: Send + Sync {
	async fn append(&self, entry: &NewJobLogEntry) -> Result<JobLogEntry>;
	async fn find_latest_success(&self, job_id: &str) -> Result<Option<JobLogEntry>>;
	async fn find_latest(&self, job_id: &str) -> Result<Option<JobLogEntry>>;
	async fn list_entries(&self, job_id: &str, limit: u32, offset: u32) -> Result<Vec<JobLogEntry>>;
	async fn count_consecutive_failures(&self, job_id: &str) -> Result<u32>;
	async fn count_by_outcome(&self, job_id: &str, outcome: JobOutcome) -> Result<u64>;
	async fn count_entries(&self, job_id: &str) -> Result<u64>;
}

#[async_trait]
impl JobLogStore for JobLogRepository {
	async fn append(&self, entry: &NewJobLogEntry) -> Result<JobLogEntry> {
		self.append(entry).await
	}

	async fn find_latest_success(&self, job_id: &str) -> Result<Option<JobLogEntry>> {
		self.find_latest_success(job_id).await
	}

	async fn find_latest(&self, job_id: &str) -> Result<Option<JobLogEntry>> {
		self.find_latest(job_id).await
	}

	async fn list_entries(&self, job_id: &str, limit: u32, offset: u32) -> Result<Vec<JobLogEntry>> {
		self.list_entries(job_id, limit, offset).await
	}

	async fn count_consecutive_failures(&self, job_id: &str) -> Result<u32> {
		self.count_consecutive_failures(job_id).await
	}

	async fn count_by_outcome(&self, job_id: &str, outcome: JobOutcome) -> Result<u64> {
		self.count_by_outcome(job_id, outcome).await
	}

	async fn count_entries(&self, job_id: &str) -> Result<u64> {
		self.count_entries(job_id).await
	}
}
