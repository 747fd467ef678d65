// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project synchronization from the tracker into the `projects` table.

use async_trait::async_trait;
use board_server_db::{DbError, Project, ProjectRepository};
use board_server_jobs::{RecordNormalizer, RecordSink, SourceReader, SyncJob};
use std::sync::Arc;
use std::time::Duration;

pub const PROJECT_SYNC_JOB_ID: &str = "project-sync";

const DEFAULT_FIELD_LIMIT: usize = 255;
const LONG_TEXT_FIELD_LIMIT: usize = 8192;

/// Builds the project sync job around any project source.
pub fn project_sync_job<S>(source: Arc<S>, repository: Arc<ProjectRepository>, interval: Duration) -> SyncJob<S, ProjectSink>
where
	S: SourceReader<Record = Project>,
{
	SyncJob::new(PROJECT_SYNC_JOB_ID, source, Arc::new(ProjectSink::new(repository)), interval)
		.with_name("Project Sync")
		.with_description("Mirrors staffing projects from Jira into the local store")
		.with_normalizer(Arc::new(FieldTruncation::default()))
}

/// Saves projects by upserting on their issue key.
pub struct ProjectSink {
	repository: Arc<ProjectRepository>,
}

impl ProjectSink {
	pub fn new(repository: Arc<ProjectRepository>) -> Self {
		Self { repository }
	}
}

#[async_trait]
impl RecordSink<Project> for ProjectSink {
	type Error = DbError;

	async fn save(&self, records: Vec<Project>) -> Result<(), DbError> {
		self.repository.save_all(&records).await
	}
}

/// Cuts text fields to the lengths the board's columns are sized for.
///
/// Limits count characters, not bytes. The issue key is never touched.
#[derive(Debug, Clone, Copy)]
pub struct FieldTruncation {
	default_limit: usize,
	long_text_limit: usize,
}

impl Default for FieldTruncation {
	fn default() -> Self {
		Self {
			default_limit: DEFAULT_FIELD_LIMIT,
			long_text_limit: LONG_TEXT_FIELD_LIMIT,
		}
	}
}

impl FieldTruncation {
	pub fn new(default_limit: usize, long_text_limit: usize) -> Self {
		Self {
			default_limit,
			long_text_limit,
		}
	}

	fn apply(&self, mut project: Project) -> Project {
		for field in [
			&mut project.status,
			&mut project.issue_type,
			&mut project.title,
			&mut project.lob,
			&mut project.customer,
			&mut project.location,
			&mut project.operation_start,
			&mut project.operation_end,
			&mut project.effort,
			&mut project.daily_rate,
		] {
			truncate(field, self.default_limit);
		}

		for field in [&mut project.job, &mut project.skills, &mut project.description] {
			truncate(field, self.long_text_limit);
		}

		project
	}
}

impl RecordNormalizer<Project> for FieldTruncation {
	fn normalize(&self, records: Vec<Project>) -> Vec<Project> {
		records.into_iter().map(|p| self.apply(p)).collect()
	}
}

fn truncate(value: &mut Option<String>, max_chars: usize) {
	if let Some(s) = value {
		if let Some((byte_idx, _)) = s.char_indices().nth(max_chars) {
			s.truncate(byte_idx);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use board_server_db::testing::create_migrated_test_pool;
	use board_server_jobs::Job;
	use chrono::{DateTime, TimeZone, Utc};
	use std::convert::Infallible;

	fn project(id: &str, title: &str) -> Project {
		Project {
			id: id.to_string(),
			title: Some(title.to_string()),
			status: Some("open".to_string()),
			..Default::default()
		}
	}

	struct StaticSource(Vec<Project>);

	#[async_trait]
	impl SourceReader for StaticSource {
		type Record = Project;
		type Error = Infallible;

		async fn fetch_all(&self) -> Result<Vec<Project>, Infallible> {
			Ok(self.0.clone())
		}

		async fn fetch_changed_since(&self, _since: DateTime<Utc>) -> Result<Vec<Project>, Infallible> {
			Ok(self.0.clone())
		}
	}

	#[test]
	fn test_truncation_leaves_short_fields_alone() {
		let input = project("STF-1", "Java developer");
		let output = FieldTruncation::default().normalize(vec![input.clone()]);
		assert_eq!(output, vec![input]);
	}

	#[test]
	fn test_truncation_default_limit() {
		let mut input = project("STF-1", &"x".repeat(300));
		input.customer = Some("c".repeat(255));

		let output = FieldTruncation::default().normalize(vec![input]).remove(0);

		assert_eq!(output.title.unwrap().len(), 255);
		assert_eq!(output.customer.unwrap().len(), 255);
	}

	#[test]
	fn test_truncation_long_text_fields() {
		let mut input = project("STF-1", "title");
		input.description = Some("d".repeat(9000));
		input.skills = Some("s".repeat(300));
		input.job = Some("j".repeat(8192));

		let output = FieldTruncation::default().normalize(vec![input]).remove(0);

		assert_eq!(output.description.unwrap().len(), 8192);
		assert_eq!(output.skills.unwrap().len(), 300);
		assert_eq!(output.job.unwrap().len(), 8192);
	}

	#[test]
	fn test_truncation_counts_characters() {
		let input = project("STF-1", &"ä".repeat(10));
		let output = FieldTruncation::new(4, 8).normalize(vec![input]).remove(0);
		assert_eq!(output.title.as_deref(), Some("ääää"));
	}

	#[test]
	fn test_truncation_never_touches_id() {
		let input = project(&"K".repeat(300), "title");
		let output = FieldTruncation::new(4, 8).normalize(vec![input]).remove(0);
		assert_eq!(output.id.len(), 300);
	}

	#[tokio::test]
	async fn test_sink_upserts_by_issue_key() {
		let repository = Arc::new(ProjectRepository::new(create_migrated_test_pool().await));
		let sink = ProjectSink::new(repository.clone());

		sink.save(vec![project("STF-1", "First"), project("STF-2", "Second")]).await.unwrap();
		sink.save(vec![project("STF-2", "Second, revised")]).await.unwrap();

		assert_eq!(repository.count().await.unwrap(), 2);
		let updated = repository.get("STF-2").await.unwrap().unwrap();
		assert_eq!(updated.title.as_deref(), Some("Second, revised"));
	}

	#[tokio::test]
	async fn test_repeated_incremental_runs_are_idempotent() {
		let repository = Arc::new(ProjectRepository::new(create_migrated_test_pool().await));
		let source = Arc::new(StaticSource(vec![project("STF-1", "First"), project("STF-2", "Second")]));
		let job = project_sync_job(source, repository.clone(), Duration::from_secs(1800));
		let since = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

		job.run_incremental(since).await.unwrap();
		let once = repository.list().await.unwrap();

		job.run_incremental(since).await.unwrap();
		let twice = repository.list().await.unwrap();

		assert_eq!(once, twice);
		assert_eq!(twice.len(), 2);
	}

	#[tokio::test]
	async fn test_job_truncates_before_saving() {
		let repository = Arc::new(ProjectRepository::new(create_migrated_test_pool().await));
		let source = Arc::new(StaticSource(vec![project("STF-1", &"t".repeat(400))]));
		let job = project_sync_job(source, repository.clone(), Duration::from_secs(1800));

		job.run_bootstrap().await.unwrap();

		let saved = repository.get("STF-1").await.unwrap().unwrap();
		assert_eq!(saved.title.map(|t| t.len()), Some(255));
	}

	#[tokio::test]
	async fn test_job_identity_and_interval() {
		let repository = Arc::new(ProjectRepository::new(create_migrated_test_pool().await));
		let job = project_sync_job(Arc::new(StaticSource(Vec::new())), repository, Duration::from_secs(60));
		let last = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

		assert_eq!(job.id(), PROJECT_SYNC_JOB_ID);
		assert_eq!(job.name(), "Project Sync");
		assert!(!job.is_due(Some(last), last + chrono::Duration::seconds(59)));
		assert!(job.is_due(Some(last), last + chrono::Duration::seconds(60)));
	}
}
