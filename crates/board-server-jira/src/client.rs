// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Jira REST client implementing the project source.

use std::time::Duration;

use async_trait::async_trait;
use board_server_db::Project;
use board_server_jobs::SourceReader;
use board_server_secret::SecretString;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, error, instrument, trace};

use crate::error::JiraError;
use crate::issue::parse_search_response;
use crate::jql::{format_date, JqlComparator, JqlQueryBuilder};

const JQL_PLACEHOLDER: &str = "{jql}";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ISSUE_TYPE: &str = "Staffinganfrage";
const PROJECT: &str = "Staffing";

/// Connection settings for [`JiraProjectReader`].
#[derive(Debug, Clone)]
pub struct JiraReaderConfig {
	/// Search URL with a `{jql}` placeholder for the encoded query.
	pub request_url: String,
	pub server_info_url: Option<String>,
	pub username: String,
	pub password: SecretString,
	pub timeout: Duration,
}

impl JiraReaderConfig {
	pub fn new(request_url: impl Into<String>) -> Self {
		Self {
			request_url: request_url.into(),
			server_info_url: None,
			username: String::new(),
			password: SecretString::default(),
			timeout: DEFAULT_TIMEOUT,
		}
	}
}

/// Result of the server-info check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
	pub server_title: String,
	pub version: String,
}

/// Reads staffing projects from Jira.
#[derive(Debug, Clone)]
pub struct JiraProjectReader {
	http_client: Client,
	config: JiraReaderConfig,
	offset: FixedOffset,
}

impl JiraProjectReader {
	pub fn new(config: JiraReaderConfig) -> Result<Self, JiraError> {
		if !config.request_url.contains(JQL_PLACEHOLDER) {
			return Err(JiraError::InvalidUrl(format!(
				"request URL must contain {JQL_PLACEHOLDER}: {}",
				config.request_url
			)));
		}

		let http_client = Client::builder().timeout(config.timeout).build()?;

		Ok(Self {
			http_client,
			config,
			offset: Utc.fix(),
		})
	}

	/// Offset used to render `since` in incremental queries. Jira reads JQL
	/// dates in the account's time zone.
	pub fn with_offset(mut self, offset: FixedOffset) -> Self {
		self.offset = offset;
		self
	}

	/// Query for the first sync: every open or escalated staffing request.
	pub fn bootstrap_jql(&self) -> String {
		let statuses = JqlQueryBuilder::new("status", JqlComparator::Equal, "eskaliert").or(
			"status",
			JqlComparator::Equal,
			"open",
		);

		staffing_requests().and_group(statuses).build()
	}

	/// Query for staffing requests created or updated since `since`.
	pub fn incremental_jql(&self, since: DateTime<Utc>) -> String {
		let since = format_date(since.with_timezone(&self.offset).naive_local());
		let changed = JqlQueryBuilder::new("updated", JqlComparator::GreaterOrEqual, &since).or(
			"created",
			JqlComparator::GreaterOrEqual,
			&since,
		);

		staffing_requests().and_group(changed).build()
	}

	#[instrument(skip(self))]
	pub async fn fetch_by_jql(&self, jql: &str) -> Result<Vec<Project>, JiraError> {
		let url = self
			.config
			.request_url
			.replace(JQL_PLACEHOLDER, &urlencoding::encode(jql));

		debug!(url = %url, "Sending search request to Jira");
		let response = self
			.http_client
			.get(&url)
			.basic_auth(&self.config.username, Some(self.config.password.expose()))
			.send()
			.await
			.map_err(map_send_error)?;

		let body = read_success_body(response).await?;
		trace!(body = %body, "Response body");

		let projects = parse_search_response(&body).inspect_err(|e| {
			error!(error = %e, "Failed to parse Jira response");
		})?;

		debug!(count = projects.len(), "Jira search completed");
		Ok(projects)
	}

	/// Calls the configured server-info endpoint.
	#[instrument(skip(self))]
	pub async fn server_info(&self) -> Result<ServerInfo, JiraError> {
		let url = self
			.config
			.server_info_url
			.as_deref()
			.ok_or_else(|| JiraError::InvalidUrl("no server info URL configured".to_string()))?;

		let response = self
			.http_client
			.get(url)
			.basic_auth(&self.config.username, Some(self.config.password.expose()))
			.send()
			.await
			.map_err(map_send_error)?;

		let body = read_success_body(response).await?;
		serde_json::from_str(&body)
			.map_err(|e| JiraError::InvalidResponse(format!("JSON parse error: {e}")))
	}
}

fn staffing_requests() -> JqlQueryBuilder {
	JqlQueryBuilder::new("issuetype", JqlComparator::Equal, ISSUE_TYPE).and(
		"project",
		JqlComparator::Equal,
		PROJECT,
	)
}

fn map_send_error(e: reqwest::Error) -> JiraError {
	if e.is_timeout() {
		error!("Request timed out");
		return JiraError::Timeout;
	}
	error!(error = %e, "Network error during Jira request");
	JiraError::Network(e)
}

async fn read_success_body(response: Response) -> Result<String, JiraError> {
	let status = response.status();
	debug!(status = %status, "Received response from Jira");

	if !status.is_success() {
		let status_code = status.as_u16();
		let body = response.text().await.unwrap_or_default();

		if status_code == 401 || status_code == 403 {
			error!(status = status_code, "Unauthorized request");
			return Err(JiraError::Unauthorized);
		}

		error!(status = status_code, body = %body, "Jira API error");
		return Err(JiraError::ApiError {
			status: status_code,
			message: body,
		});
	}

	response.text().await.map_err(|e| {
		error!(error = %e, "Failed to read response body");
		JiraError::Network(e)
	})
}

#[async_trait]
impl SourceReader for JiraProjectReader {
	type Record = Project;
	type Error = JiraError;

	async fn fetch_all(&self) -> Result<Vec<Project>, JiraError> {
		self.fetch_by_jql(&self.bootstrap_jql()).await
	}

	async fn fetch_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Project>, JiraError> {
		self.fetch_by_jql(&self.incremental_jql(since)).await
	}
}
