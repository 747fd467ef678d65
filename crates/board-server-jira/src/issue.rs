// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping of Jira search results to projects.

use board_server_db::Project;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::JiraError;

const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

#[derive(Debug, Deserialize)]
struct SearchResponse {
	issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
pub struct JiraIssue {
	key: String,
	#[serde(default)]
	fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
	#[serde(default, deserialize_with = "object_name")]
	status: Option<String>,
	#[serde(default, deserialize_with = "object_name")]
	issuetype: Option<String>,
	#[serde(default, deserialize_with = "text")]
	summary: Option<String>,
	#[serde(default)]
	labels: Option<Vec<String>>,
	#[serde(default, rename = "customfield_10288", deserialize_with = "text")]
	job: Option<String>,
	#[serde(default, rename = "customfield_10296", deserialize_with = "text")]
	skills: Option<String>,
	#[serde(default, deserialize_with = "text")]
	description: Option<String>,
	#[serde(default, rename = "customfield_10292", deserialize_with = "object_value")]
	lob: Option<String>,
	#[serde(default, rename = "customfield_10279", deserialize_with = "text")]
	customer: Option<String>,
	#[serde(default, rename = "customfield_10297", deserialize_with = "text")]
	location: Option<String>,
	#[serde(default, rename = "customfield_10293", deserialize_with = "text")]
	operation_start: Option<String>,
	#[serde(default, rename = "customfield_10294", deserialize_with = "text")]
	operation_end: Option<String>,
	#[serde(default, rename = "customfield_10284", deserialize_with = "text")]
	effort: Option<String>,
	#[serde(default, rename = "customfield_10298", deserialize_with = "text")]
	daily_rate: Option<String>,
	#[serde(default, deserialize_with = "jira_timestamp")]
	created: Option<DateTime<Utc>>,
	#[serde(default, deserialize_with = "jira_timestamp")]
	updated: Option<DateTime<Utc>>,
}

impl From<JiraIssue> for Project {
	fn from(issue: JiraIssue) -> Self {
		let f = issue.fields;
		Project {
			id: issue.key,
			status: f.status,
			issue_type: f.issuetype,
			title: f.summary,
			labels: f.labels.unwrap_or_default(),
			job: f.job,
			skills: f.skills,
			description: f.description,
			lob: f.lob,
			customer: f.customer,
			location: f.location,
			operation_start: f.operation_start,
			operation_end: f.operation_end,
			effort: f.effort,
			daily_rate: f.daily_rate,
			created: f.created,
			updated: f.updated,
		}
	}
}

/// Parses a search response body into projects.
pub fn parse_search_response(body: &str) -> Result<Vec<Project>, JiraError> {
	let response: SearchResponse = serde_json::from_str(body)
		.map_err(|e| JiraError::InvalidResponse(format!("JSON parse error: {e}")))?;

	Ok(response.issues.into_iter().map(Project::from).collect())
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<Value>::deserialize(deserializer)? {
		Some(Value::String(s)) => Some(s),
		Some(Value::Number(n)) => Some(n.to_string()),
		Some(Value::Bool(b)) => Some(b.to_string()),
		_ => None,
	})
}

// `{"name": ...}` objects, used by status and issue type.
fn object_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	object_field(deserializer, "name")
}

// `{"value": ...}` objects, used by select-list custom fields.
fn object_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	object_field(deserializer, "value")
}

fn object_field<'de, D>(deserializer: D, field: &str) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<Value>::deserialize(deserializer)? {
		Some(Value::Object(map)) => map.get(field).and_then(Value::as_str).map(str::to_string),
		Some(Value::String(s)) => Some(s),
		_ => None,
	})
}

fn jira_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<String>::deserialize(deserializer)? {
		None => Ok(None),
		Some(s) => DateTime::parse_from_str(&s, JIRA_TIMESTAMP_FORMAT)
			.map(|t| Some(t.with_timezone(&Utc)))
			.map_err(|e| D::Error::custom(format!("invalid Jira timestamp '{s}': {e}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use serde_json::json;

	fn issue_json() -> Value {
		json!({
			"expand": "names,schema",
			"total": 1,
			"issues": [{
				"id": "10001",
				"key": "STF-42",
				"fields": {
					"status": { "name": "open", "id": "1" },
					"issuetype": { "name": "Staffinganfrage" },
					"summary": "Java developer",
					"labels": ["java", "remote"],
					"customfield_10288": "Backend work",
					"customfield_10296": "Rust, SQL",
					"description": "Long text",
					"customfield_10292": { "value": "LoB Banking", "id": "3" },
					"customfield_10279": "ACME",
					"customfield_10297": "Dortmund",
					"customfield_10293": "01.04.2025",
					"customfield_10294": "30.09.2025",
					"customfield_10284": 40,
					"customfield_10298": null,
					"created": "2025-03-01T09:15:30.000+0100",
					"updated": "2025-03-14T12:00:00.250+0000"
				}
			}]
		})
	}

	#[test]
	fn test_parse_maps_all_fields() {
		let projects = parse_search_response(&issue_json().to_string()).unwrap();
		assert_eq!(projects.len(), 1);

		let p = &projects[0];
		assert_eq!(p.id, "STF-42");
		assert_eq!(p.status.as_deref(), Some("open"));
		assert_eq!(p.issue_type.as_deref(), Some("Staffinganfrage"));
		assert_eq!(p.title.as_deref(), Some("Java developer"));
		assert_eq!(p.labels, vec!["java", "remote"]);
		assert_eq!(p.job.as_deref(), Some("Backend work"));
		assert_eq!(p.skills.as_deref(), Some("Rust, SQL"));
		assert_eq!(p.lob.as_deref(), Some("LoB Banking"));
		assert_eq!(p.customer.as_deref(), Some("ACME"));
		assert_eq!(p.location.as_deref(), Some("Dortmund"));
		assert_eq!(p.operation_start.as_deref(), Some("01.04.2025"));
		assert_eq!(p.operation_end.as_deref(), Some("30.09.2025"));
		assert_eq!(p.effort.as_deref(), Some("40"));
		assert_eq!(p.daily_rate, None);
		assert_eq!(
			p.created,
			Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 30).unwrap())
		);
		assert_eq!(
			p.updated,
			Some(Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(250))
		);
	}

	#[test]
	fn test_parse_tolerates_missing_fields() {
		let body = json!({ "issues": [{ "key": "STF-1", "fields": {} }, { "key": "STF-2" }] });
		let projects = parse_search_response(&body.to_string()).unwrap();

		assert_eq!(projects.len(), 2);
		assert_eq!(projects[0], Project {
			id: "STF-1".to_string(),
			..Default::default()
		});
	}

	#[test]
	fn test_parse_empty_issue_list() {
		let projects = parse_search_response(r#"{"issues": []}"#).unwrap();
		assert!(projects.is_empty());
	}

	#[test]
	fn test_parse_rejects_missing_issues() {
		let err = parse_search_response(r#"{"errorMessages": ["nope"]}"#).unwrap_err();
		assert!(matches!(err, JiraError::InvalidResponse(_)));
	}

	#[test]
	fn test_parse_rejects_bad_timestamp() {
		let body = json!({ "issues": [{ "key": "STF-1", "fields": { "created": "yesterday" } }] });
		let err = parse_search_response(&body.to_string()).unwrap_err();
		assert!(matches!(err, JiraError::InvalidResponse(ref m) if m.contains("yesterday")));
	}
}
