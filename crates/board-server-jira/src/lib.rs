// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jira source for the project board.
//!
//! [`JiraProjectReader`] runs JQL searches against the Jira REST API and
//! maps the returned issues to [`Project`](board_server_db::Project)s. It
//! implements [`SourceReader`](board_server_jobs::SourceReader) so the
//! project sync job can drive it.

pub mod client;
pub mod error;
pub mod issue;
pub mod jql;

pub use client::{JiraProjectReader, JiraReaderConfig, ServerInfo};
pub use error::JiraError;
pub use jql::{JqlComparator, JqlQueryBuilder};
