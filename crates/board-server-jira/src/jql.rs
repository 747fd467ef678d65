// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal JQL query builder.

use chrono::NaiveDateTime;
use std::fmt;

const JQL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JqlComparator {
	Equal,
	NotEqual,
	Greater,
	GreaterOrEqual,
	Less,
	LessOrEqual,
}

impl JqlComparator {
	pub fn as_str(&self) -> &'static str {
		match self {
			JqlComparator::Equal => "=",
			JqlComparator::NotEqual => "!=",
			JqlComparator::Greater => ">",
			JqlComparator::GreaterOrEqual => ">=",
			JqlComparator::Less => "<",
			JqlComparator::LessOrEqual => "<=",
		}
	}
}

impl fmt::Display for JqlComparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Formats a wall-clock time the way JQL date clauses expect.
pub fn format_date(date: NaiveDateTime) -> String {
	date.format(JQL_DATE_FORMAT).to_string()
}

/// Builds `key op "value"` clauses joined by `AND`/`OR`, with bracketed
/// sub-queries.
///
/// ```rust,ignore
/// let statuses = JqlQueryBuilder::new("status", JqlComparator::Equal, "open")
///     .or("status", JqlComparator::Equal, "eskaliert");
/// let jql = JqlQueryBuilder::new("project", JqlComparator::Equal, "Staffing")
///     .and_group(statuses)
///     .build();
/// assert_eq!(jql, r#"project = "Staffing" AND ( status = "open" OR status = "eskaliert" )"#);
/// ```
#[derive(Debug, Clone)]
pub struct JqlQueryBuilder {
	query: String,
}

impl JqlQueryBuilder {
	pub fn new(key: &str, comparator: JqlComparator, value: &str) -> Self {
		let mut builder = Self {
			query: String::new(),
		};
		builder.push_clause(key, comparator, value);
		builder
	}

	pub fn and(self, key: &str, comparator: JqlComparator, value: &str) -> Self {
		self.join("AND", key, comparator, value)
	}

	pub fn or(self, key: &str, comparator: JqlComparator, value: &str) -> Self {
		self.join("OR", key, comparator, value)
	}

	pub fn and_group(self, group: JqlQueryBuilder) -> Self {
		self.join_group("AND", group)
	}

	pub fn or_group(self, group: JqlQueryBuilder) -> Self {
		self.join_group("OR", group)
	}

	pub fn build(self) -> String {
		self.query
	}

	fn join(mut self, operator: &str, key: &str, comparator: JqlComparator, value: &str) -> Self {
		self.query.push(' ');
		self.query.push_str(operator);
		self.query.push(' ');
		self.push_clause(key, comparator, value);
		self
	}

	fn join_group(mut self, operator: &str, group: JqlQueryBuilder) -> Self {
		self.query.push(' ');
		self.query.push_str(operator);
		self.query.push_str(" ( ");
		self.query.push_str(&group.query);
		self.query.push_str(" )");
		self
	}

	fn push_clause(&mut self, key: &str, comparator: JqlComparator, value: &str) {
		self.query.push_str(key);
		self.query.push(' ');
		self.query.push_str(comparator.as_str());
		self.query.push_str(" \"");
		self.query.push_str(&value.replace('\\', "\\\\").replace('"', "\\\""));
		self.query.push('"');
	}
}
