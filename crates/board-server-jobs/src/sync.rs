// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconciliation of an external source into local storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::JobError;
use crate::job::Job;
use crate::policy::DuePolicy;

/// Supplies records from an external system.
#[async_trait]
pub trait SourceReader: Send + Sync {
	type Record: Send + Sync + 'static;
	type Error: std::error::Error + Send + Sync + 'static;

	async fn fetch_all(&self) -> Result<Vec<Self::Record>, Self::Error>;

	/// Records created or changed at or after `since`. Overlap with earlier
	/// fetches is expected.
	async fn fetch_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Self::Record>, Self::Error>;
}

/// Upserts records keyed by their external identifier.
#[async_trait]
pub trait RecordSink<R: Send + 'static>: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	async fn save(&self, records: Vec<R>) -> Result<(), Self::Error>;
}

/// Rewrites fetched records before they are saved.
pub trait RecordNormalizer<R>: Send + Sync {
	fn normalize(&self, records: Vec<R>) -> Vec<R>;
}

/// Source that never yields records. Used when the upstream system is disabled.
pub struct EmptySource<R>(PhantomData<fn() -> R>);

impl<R> EmptySource<R> {
	pub fn new() -> Self {
		Self(PhantomData)
	}
}

impl<R> Default for EmptySource<R> {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl<R: Send + Sync + 'static> SourceReader for EmptySource<R> {
	type Record = R;
	type Error = Infallible;

	async fn fetch_all(&self) -> Result<Vec<R>, Infallible> {
		Ok(Vec::new())
	}

	async fn fetch_changed_since(&self, _since: DateTime<Utc>) -> Result<Vec<R>, Infallible> {
		Ok(Vec::new())
	}
}

/// A [`Job`] that fetches from a [`SourceReader`] and saves into a [`RecordSink`].
///
/// Bootstrap fetches everything; incremental runs fetch what changed since
/// the last success. Safe to repeat because the sink upserts.
pub struct SyncJob<S, K>
where
	S: SourceReader,
	K: RecordSink<S::Record>,
{
	id: String,
	name: String,
	description: String,
	source: Arc<S>,
	sink: Arc<K>,
	normalizers: Vec<Arc<dyn RecordNormalizer<S::Record>>>,
	interval: Duration,
}

impl<S, K> SyncJob<S, K>
where
	S: SourceReader,
	K: RecordSink<S::Record>,
{
	pub fn new(id: impl Into<String>, source: Arc<S>, sink: Arc<K>, interval: Duration) -> Self {
		let id = id.into();
		Self {
			name: id.clone(),
			description: String::new(),
			id,
			source,
			sink,
			normalizers: Vec::new(),
			interval,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	/// Normalizers run in the order they were added.
	pub fn with_normalizer(mut self, normalizer: Arc<dyn RecordNormalizer<S::Record>>) -> Self {
		self.normalizers.push(normalizer);
		self
	}

	async fn save(&self, records: Vec<S::Record>) -> Result<(), JobError> {
		let records = self
			.normalizers
			.iter()
			.fold(records, |records, normalizer| normalizer.normalize(records));
		let count = records.len();

		self
			.sink
			.save(records)
			.await
			.map_err(|e| JobError::Save(e.to_string()))?;

		info!(job_id = %self.id, count, "records synchronized");
		Ok(())
	}
}

#[async_trait]
impl<S, K> Job for SyncJob<S, K>
where
	S: SourceReader + 'static,
	K: RecordSink<S::Record> + 'static,
{
	fn id(&self) -> &str {
		&self.id
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn description(&self) -> &str {
		&self.description
	}

	fn policy(&self) -> DuePolicy {
		DuePolicy::every(self.interval)
	}

	async fn run_incremental(&self, since: DateTime<Utc>) -> Result<(), JobError> {
		debug!(job_id = %self.id, %since, "fetching changed records");
		let records = self
			.source
			.fetch_changed_since(since)
			.await
			.map_err(|e| JobError::Source(e.to_string()))?;
		self.save(records).await
	}

	async fn run_bootstrap(&self) -> Result<(), JobError> {
		debug!(job_id = %self.id, "fetching all records");
		let records = self
			.source
			.fetch_all()
			.await
			.map_err(|e| JobError::Source(e.to_string()))?;
		self.save(records).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use std::collections::BTreeMap;
	use std::sync::Mutex;

	#[derive(Debug, Clone, PartialEq)]
	struct Record {
		key: String,
		title: String,
		updated: DateTime<Utc>,
	}

	fn record(key: &str, title: &str, day: u32) -> Record {
		Record {
			key: key.to_string(),
			title: title.to_string(),
			updated: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
		}
	}

	#[derive(Debug, thiserror::Error)]
	#[error("{0}")]
	struct TestError(String);

	#[derive(Default)]
	struct VecSource {
		records: Vec<Record>,
		fail: bool,
		calls: Mutex<Vec<Option<DateTime<Utc>>>>,
	}

	#[async_trait]
	impl SourceReader for VecSource {
		type Record = Record;
		type Error = TestError;

		async fn fetch_all(&self) -> Result<Vec<Record>, TestError> {
			self.calls.lock().unwrap().push(None);
			if self.fail {
				return Err(TestError("upstream unavailable".to_string()));
			}
			Ok(self.records.clone())
		}

		async fn fetch_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Record>, TestError> {
			self.calls.lock().unwrap().push(Some(since));
			if self.fail {
				return Err(TestError("upstream unavailable".to_string()));
			}
			Ok(self
				.records
				.iter()
				.filter(|r| r.updated >= since)
				.cloned()
				.collect())
		}
	}

	#[derive(Default)]
	struct MapSink {
		rows: Mutex<BTreeMap<String, Record>>,
		batches: Mutex<Vec<usize>>,
		fail: bool,
	}

	#[async_trait]
	impl RecordSink<Record> for MapSink {
		type Error = TestError;

		async fn save(&self, records: Vec<Record>) -> Result<(), TestError> {
			if self.fail {
				return Err(TestError("disk full".to_string()));
			}
			self.batches.lock().unwrap().push(records.len());
			let mut rows = self.rows.lock().unwrap();
			for r in records {
				rows.insert(r.key.clone(), r);
			}
			Ok(())
		}
	}

	struct Uppercase;

	impl RecordNormalizer<Record> for Uppercase {
		fn normalize(&self, records: Vec<Record>) -> Vec<Record> {
			records
				.into_iter()
				.map(|mut r| {
					r.title = r.title.to_uppercase();
					r
				})
				.collect()
		}
	}

	struct Suffix(&'static str);

	impl RecordNormalizer<Record> for Suffix {
		fn normalize(&self, records: Vec<Record>) -> Vec<Record> {
			records
				.into_iter()
				.map(|mut r| {
					r.title.push_str(self.0);
					r
				})
				.collect()
		}
	}

	fn job(source: VecSource, sink: Arc<MapSink>) -> SyncJob<VecSource, MapSink> {
		SyncJob::new("project-sync", Arc::new(source), sink, Duration::from_secs(30 * 60))
	}

	#[tokio::test]
	async fn test_bootstrap_saves_everything() {
		let sink = Arc::new(MapSink::default());
		let source = VecSource {
			records: vec![record("A", "a", 1), record("B", "b", 2)],
			..Default::default()
		};
		let job = job(source, Arc::clone(&sink));

		job.run_bootstrap().await.unwrap();

		assert_eq!(sink.rows.lock().unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_incremental_passes_since_to_source() {
		let sink = Arc::new(MapSink::default());
		let since = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
		let source = Arc::new(VecSource {
			records: vec![record("A", "a", 1), record("B", "b", 2)],
			..Default::default()
		});
		let job = SyncJob::new(
			"project-sync",
			Arc::clone(&source),
			Arc::clone(&sink),
			Duration::from_secs(60),
		);

		job.run_incremental(since).await.unwrap();

		assert_eq!(*source.calls.lock().unwrap(), vec![Some(since)]);
		let rows = sink.rows.lock().unwrap();
		assert_eq!(rows.keys().collect::<Vec<_>>(), vec!["B"]);
	}

	#[tokio::test]
	async fn test_overlapping_incremental_runs_are_idempotent() {
		let records = vec![record("A", "a", 1), record("B", "b", 2), record("C", "c", 3)];
		let since = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

		let once = Arc::new(MapSink::default());
		job(
			VecSource {
				records: records.clone(),
				..Default::default()
			},
			Arc::clone(&once),
		)
		.run_incremental(since)
		.await
		.unwrap();

		let twice = Arc::new(MapSink::default());
		let repeated = job(
			VecSource {
				records,
				..Default::default()
			},
			Arc::clone(&twice),
		);
		repeated.run_incremental(since).await.unwrap();
		repeated.run_incremental(since).await.unwrap();

		assert_eq!(*once.rows.lock().unwrap(), *twice.rows.lock().unwrap());
	}

	#[tokio::test]
	async fn test_zero_records_still_saves_empty_batch() {
		let sink = Arc::new(MapSink::default());
		let job = job(VecSource::default(), Arc::clone(&sink));

		job.run_bootstrap().await.unwrap();

		assert_eq!(*sink.batches.lock().unwrap(), vec![0]);
	}

	#[tokio::test]
	async fn test_source_error_maps_to_source_and_skips_save() {
		let sink = Arc::new(MapSink::default());
		let job = job(
			VecSource {
				records: vec![record("A", "a", 1)],
				fail: true,
				..Default::default()
			},
			Arc::clone(&sink),
		);

		let err = job.run_bootstrap().await.unwrap_err();

		assert!(matches!(err, JobError::Source(ref m) if m == "upstream unavailable"));
		assert!(sink.batches.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_save_error_maps_to_save() {
		let sink = Arc::new(MapSink {
			fail: true,
			..Default::default()
		});
		let job = job(
			VecSource {
				records: vec![record("A", "a", 1)],
				..Default::default()
			},
			sink,
		);

		let err = job.run_bootstrap().await.unwrap_err();
		assert!(matches!(err, JobError::Save(ref m) if m == "disk full"));
	}

	#[tokio::test]
	async fn test_normalizers_apply_in_order() {
		let sink = Arc::new(MapSink::default());
		let job = job(
			VecSource {
				records: vec![record("A", "title", 1)],
				..Default::default()
			},
			Arc::clone(&sink),
		)
		.with_normalizer(Arc::new(Suffix("-x")))
		.with_normalizer(Arc::new(Uppercase));

		job.run_bootstrap().await.unwrap();

		assert_eq!(sink.rows.lock().unwrap()["A"].title, "TITLE-X");
	}

	#[tokio::test]
	async fn test_empty_source_yields_nothing() {
		let source = EmptySource::<Record>::new();
		assert!(source.fetch_all().await.unwrap().is_empty());
		assert!(source
			.fetch_changed_since(Utc::now())
			.await
			.unwrap()
			.is_empty());
	}

	#[test]
	fn test_sync_job_uses_interval_policy() {
		let sink = Arc::new(MapSink::default());
		let job = job(VecSource::default(), sink).with_name("Project sync");
		let last = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

		assert_eq!(job.id(), "project-sync");
		assert_eq!(job.name(), "Project sync");
		assert!(!job.is_due(Some(last), last + chrono::Duration::minutes(10)));
		assert!(job.is_due(Some(last), last + chrono::Duration::minutes(31)));
		assert!(job.is_due(None, last));
	}
}
