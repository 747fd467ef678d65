// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, JiraConfigLayer, JobsConfigLayer, LoggingConfigLayer};

/// One source's partial view of the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub jobs: Option<JobsConfigLayer>,
	#[serde(default)]
	pub jira: Option<JiraConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl BoardConfigLayer {
	/// Values present in `other` win.
	pub fn merge(&mut self, other: BoardConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.jobs, other.jobs, JobsConfigLayer::merge);
		merge_section(&mut self.jira, other.jira, JiraConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(base), Some(other)) => merge(base, other),
		(None, Some(other)) => *base = Some(other),
		(_, None) => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = BoardConfigLayer::default();
		base.merge(BoardConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite:/tmp/a.db".to_string()),
			}),
			..Default::default()
		});
		assert_eq!(
			base.database.unwrap().url.as_deref(),
			Some("sqlite:/tmp/a.db")
		);
	}

	#[test]
	fn test_merge_keeps_base_when_overlay_section_empty() {
		let mut base = BoardConfigLayer {
			jobs: Some(JobsConfigLayer {
				tick_interval_secs: Some(10),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(BoardConfigLayer {
			jobs: Some(JobsConfigLayer::default()),
			..Default::default()
		});
		assert_eq!(base.jobs.unwrap().tick_interval_secs, Some(10));
	}

	#[test]
	fn test_deserialize_from_toml() {
		let layer: BoardConfigLayer = toml::from_str(
			r#"
[database]
url = "sqlite:/var/lib/board/board.db"

[jira]
enabled = false
"#,
		)
		.unwrap();
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/var/lib/board/board.db")
		);
		assert_eq!(layer.jira.unwrap().enabled, Some(false));
		assert!(layer.jobs.is_none());
	}
}
