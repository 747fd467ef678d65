// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use board_server_config::ConfigError;
use board_server_db::DbError;
use board_server_jira::JiraError;
use board_server_jobs::{ExecutorError, PolicyError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("jira client error: {0}")]
	Jira(#[from] JiraError),

	#[error("job registration failed: {0}")]
	Executor(#[from] ExecutorError),

	#[error("invalid job policy: {0}")]
	Policy(#[from] PolicyError),

	#[error("UTC offset out of range: {0} minutes")]
	InvalidOffset(i32),

	#[error("sync interval out of range: {0} minutes")]
	InvalidInterval(u64),
}

pub type Result<T> = std::result::Result<T, ServerError>;
