// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};

/// A staffing project mirrored from the external tracker.
///
/// `id` is the tracker's issue key and is the upsert key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
	pub id: String,
	pub status: Option<String>,
	pub issue_type: Option<String>,
	pub title: Option<String>,
	pub labels: Vec<String>,
	pub job: Option<String>,
	pub skills: Option<String>,
	pub description: Option<String>,
	pub lob: Option<String>,
	pub customer: Option<String>,
	pub location: Option<String>,
	pub operation_start: Option<String>,
	pub operation_end: Option<String>,
	pub effort: Option<String>,
	pub daily_rate: Option<String>,
	pub created: Option<DateTime<Utc>>,
	pub updated: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
	id: String,
	status: Option<String>,
	issue_type: Option<String>,
	title: Option<String>,
	labels: String,
	job: Option<String>,
	skills: Option<String>,
	description: Option<String>,
	lob: Option<String>,
	customer: Option<String>,
	location: Option<String>,
	operation_start: Option<String>,
	operation_end: Option<String>,
	effort: Option<String>,
	daily_rate: Option<String>,
	created: Option<String>,
	updated: Option<String>,
}

impl TryFrom<ProjectRow> for Project {
	type Error = DbError;

	fn try_from(row: ProjectRow) -> Result<Self> {
		Ok(Project {
			id: row.id,
			status: row.status,
			issue_type: row.issue_type,
			title: row.title,
			labels: serde_json::from_str(&row.labels)?,
			job: row.job,
			skills: row.skills,
			description: row.description,
			lob: row.lob,
			customer: row.customer,
			location: row.location,
			operation_start: row.operation_start,
			operation_end: row.operation_end,
			effort: row.effort,
			daily_rate: row.daily_rate,
			created: row.created.as_deref().map(parse_timestamp).transpose()?,
			updated: row.updated.as_deref().map(parse_timestamp).transpose()?,
		})
	}
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
	timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|t| t.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid project timestamp '{value}': {e}")))
}

const UPSERT_SQL: &str = r#"
    INSERT INTO projects (
        id, status, issue_type, title, labels, job, skills, description, lob, customer,
        location, operation_start, operation_end, effort, daily_rate, created, updated, synced_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        status = excluded.status,
        issue_type = excluded.issue_type,
        title = excluded.title,
        labels = excluded.labels,
        job = excluded.job,
        skills = excluded.skills,
        description = excluded.description,
        lob = excluded.lob,
        customer = excluded.customer,
        location = excluded.location,
        operation_start = excluded.operation_start,
        operation_end = excluded.operation_end,
        effort = excluded.effort,
        daily_rate = excluded.daily_rate,
        created = excluded.created,
        updated = excluded.updated,
        synced_at = excluded.synced_at
"#;

const SELECT_COLUMNS: &str = "SELECT id, status, issue_type, title, labels, job, skills, description, lob, customer, location, operation_start, operation_end, effort, daily_rate, created, updated FROM projects";

/// Upsert store for synchronized projects.
#[derive(Clone)]
pub struct ProjectRepository {
	pool: SqlitePool,
}

impl ProjectRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Inserts or updates every project, keyed by issue key, in one transaction.
	#[tracing::instrument(skip(self, projects), fields(count = projects.len()))]
	pub async fn save_all(&self, projects: &[Project]) -> Result<()> {
		if projects.is_empty() {
			return Ok(());
		}

		let synced_at = format_timestamp(Utc::now());
		let mut tx = self.pool.begin().await?;

		for project in projects {
			let labels = serde_json::to_string(&project.labels)?;
			sqlx::query(UPSERT_SQL)
				.bind(&project.id)
				.bind(&project.status)
				.bind(&project.issue_type)
				.bind(&project.title)
				.bind(labels)
				.bind(&project.job)
				.bind(&project.skills)
				.bind(&project.description)
				.bind(&project.lob)
				.bind(&project.customer)
				.bind(&project.location)
				.bind(&project.operation_start)
				.bind(&project.operation_end)
				.bind(&project.effort)
				.bind(&project.daily_rate)
				.bind(project.created.map(format_timestamp))
				.bind(project.updated.map(format_timestamp))
				.bind(&synced_at)
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		tracing::debug!(count = projects.len(), "projects upserted");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: &str) -> Result<Option<Project>> {
		let row = sqlx::query_as::<_, ProjectRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		row.map(Project::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list(&self) -> Result<Vec<Project>> {
		let rows = sqlx::query_as::<_, ProjectRow>(&format!("{SELECT_COLUMNS} ORDER BY id"))
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter().map(Project::try_from).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count(&self) -> Result<u64> {
		let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM projects")
			.fetch_one(&self.pool)
			.await?;

		Ok(row.0 as u64)
	}
}
