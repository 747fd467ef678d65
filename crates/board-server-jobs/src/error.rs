// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use board_server_db::DbError;

/// Failure of a single job run. Contained at the executor boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
	#[error("source read failed: {0}")]
	Source(String),

	#[error("save failed: {0}")]
	Save(String),

	#[error("job failed: {0}")]
	Failed(String),
}

/// Errors the executor surfaces to its owner.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
	#[error("job log store failed: {0}")]
	LogStore(#[from] DbError),

	#[error("invalid job identifier: {0:?}")]
	InvalidIdentifier(String),

	#[error("multiple jobs registered with identifier '{0}'")]
	DuplicateIdentifier(String),

	#[error("job not found: {0}")]
	NotFound(String),

	#[error("run of job '{job_id}' did not complete: {reason}")]
	RunAborted { job_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
	#[error("job execution hour must be between 0 and 23, got {0}")]
	InvalidHour(u32),
}
