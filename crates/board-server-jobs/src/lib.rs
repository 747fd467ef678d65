// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic job execution engine for the project board.
//!
//! Jobs implement [`Job`]; the [`JobExecutor`] ticks over every registered job,
//! consults the durable job log for the last successful run, asks the job
//! whether it is due and runs either a bootstrap or an incremental pass.
//! [`SyncJob`] is the building block for reconciling an external source into
//! local storage.

pub mod clock;
pub mod error;
pub mod executor;
pub mod health;
pub mod job;
pub mod policy;
pub mod sync;

pub use board_server_db::{JobLogEntry, JobLogRepository, JobLogStore, JobOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ExecutorError, JobError, PolicyError};
pub use executor::{JobExecutor, JobRunResult, JobRunStatus, TickReport};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use job::{Job, RunMode};
pub use policy::{DuePolicy, FixedHourPolicy};
pub use sync::{EmptySource, RecordNormalizer, RecordSink, SourceReader, SyncJob};
