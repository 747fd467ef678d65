// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database layer for the project board job engine.
//!
//! Owns the SQLite pool, the schema migrations, the append-only job log and the
//! upsert store for projects synchronized from the external tracker.

pub mod error;
pub mod job_log;
pub mod pool;
pub mod project;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DbError, Result};
pub use job_log::{JobLogEntry, JobLogRepository, JobLogStore, JobOutcome, NewJobLogEntry};
pub use pool::{create_pool, run_migrations};
pub use project::{Project, ProjectRepository};
