// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Due-ness rules deciding whether a job runs on a given tick.

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use std::time::Duration;

use crate::error::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuePolicy {
	/// Due once `interval` has elapsed since the last success.
	Interval(Duration),
	/// Due at most once per calendar day, from a fixed hour onwards.
	FixedHour(FixedHourPolicy),
}

impl DuePolicy {
	pub fn every(interval: Duration) -> Self {
		DuePolicy::Interval(interval)
	}

	pub fn fixed_hour(hour: u32) -> Result<Self, PolicyError> {
		FixedHourPolicy::new(hour).map(DuePolicy::FixedHour)
	}

	/// A job that has never succeeded is always due.
	pub fn is_due(&self, last_success: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
		match self {
			DuePolicy::Interval(interval) => match last_success {
				None => true,
				Some(last) => interval_elapsed(*interval, last, now),
			},
			DuePolicy::FixedHour(policy) => policy.is_due(last_success, now),
		}
	}
}

// A `last` ahead of `now` has a negative elapsed time and is never due.
fn interval_elapsed(interval: Duration, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
	match (now - last).to_std() {
		Ok(elapsed) => elapsed >= interval,
		Err(_) => false,
	}
}

/// Runs once per calendar day, no earlier than `hour` in the configured offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHourPolicy {
	hour: u32,
	offset: FixedOffset,
}

impl FixedHourPolicy {
	pub fn new(hour: u32) -> Result<Self, PolicyError> {
		if hour > 23 {
			return Err(PolicyError::InvalidHour(hour));
		}

		Ok(Self {
			hour,
			offset: Utc.fix(),
		})
	}

	/// Evaluate calendar days and hours in `offset` instead of UTC.
	pub fn with_offset(mut self, offset: FixedOffset) -> Self {
		self.offset = offset;
		self
	}

	pub fn hour(&self) -> u32 {
		self.hour
	}

	pub fn offset(&self) -> FixedOffset {
		self.offset
	}

	pub fn is_due(&self, last_success: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
		let Some(last) = last_success else {
			return true;
		};

		let now = now.with_timezone(&self.offset);
		let last = last.with_timezone(&self.offset);

		if now.date_naive() == last.date_naive() {
			return false;
		}

		now.hour() >= self.hour
	}
}
