// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod job_log_retention;
pub mod project_sync;

pub use job_log_retention::{JobLogRetentionJob, JOB_LOG_RETENTION_JOB_ID};
pub use project_sync::{FieldTruncation, ProjectSink, PROJECT_SYNC_JOB_ID};
