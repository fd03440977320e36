// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedules with seconds precision and missed-occurrence detection.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone};

use crate::error::JobsError;

/// How far in the past an occurrence may be and still fire immediately.
pub const MISSED_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Upper bound on missed occurrences counted when catching up.
const MAX_MISSED_SCAN: usize = 100_000;

/// A parsed six-field cron expression (`sec min hour day month weekday`).
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    cron: cron::Schedule,
}

/// Result of [`Schedule::next_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextInterval {
    /// Time until the job should fire; zero means fire now
    pub interval: Duration,
    /// Occurrences between the last run and now that did not fire
    pub missed: usize,
}

impl Schedule {
    pub fn parse(expression: &str) -> Result<Self, JobsError> {
        let expression = expression.trim();
        let cron = cron::Schedule::from_str(expression).map_err(|e| JobsError::ScheduleParse {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { expression: expression.to_string(), cron })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Time until the next fire, measured in `now`'s timezone.
    ///
    /// The occurrence after `last` fires now if it is due, or overdue by no
    /// more than [`MISSED_WINDOW`] (any amount when `ignore_missed` is set).
    /// Older occurrences are skipped and the next occurrence after `now` is
    /// used instead. Without a previous run, `now` stands in for it.
    pub fn next_interval<Tz: TimeZone>(
        &self,
        last: Option<DateTime<Tz>>,
        now: &DateTime<Tz>,
        ignore_missed: bool,
    ) -> NextInterval {
        let last = last.unwrap_or_else(|| now.clone());
        let Some(next) = self.cron.after(&last).next() else {
            return NextInterval { interval: Duration::ZERO, missed: 0 };
        };
        if next >= *now {
            return NextInterval { interval: until(now, &next), missed: 0 };
        }

        let missed = self.cron.after(&last).take(MAX_MISSED_SCAN).take_while(|at| at <= now).count();
        if ignore_missed || until(&next, now) <= MISSED_WINDOW {
            return NextInterval { interval: Duration::ZERO, missed };
        }

        let interval = self.cron.after(now).next().map(|at| until(now, &at)).unwrap_or_default();
        NextInterval { interval, missed }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn until<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> Duration {
    (to.clone() - from.clone()).to_std().unwrap_or_default()
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
