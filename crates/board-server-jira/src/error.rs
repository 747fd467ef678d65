// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the Jira client.

use thiserror::Error;

/// Errors that can occur when talking to Jira.
#[derive(Debug, Error)]
pub enum JiraError {
	/// Network-level error during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	/// Request timed out.
	#[error("Request timed out")]
	Timeout,

	/// Credentials were rejected.
	#[error("Jira rejected the configured credentials")]
	Unauthorized,

	/// Invalid or unparseable response from Jira.
	#[error("Invalid response from Jira: {0}")]
	InvalidResponse(String),

	/// Jira returned an error status.
	#[error("Jira API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	/// The configured URL cannot be used.
	#[error("Invalid Jira URL: {0}")]
	InvalidUrl(String),
}
