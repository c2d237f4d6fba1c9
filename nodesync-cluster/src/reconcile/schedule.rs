//! Tick schedule expressions
//!
//! Accepted forms:
//! - `@every 30s`, `@every 1m30s` (humantime durations)
//! - a bare duration such as `45s`
//! - 5-field crontab (`*/5 * * * *`, minute resolution, UTC, 0 or 7 = Sunday)
//! - 6/7-field cron with seconds (and year), or `@hourly`, `@daily`, ...

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nodesync_core::{Error, Result};

const EVERY_PREFIX: &str = "@every";

#[derive(Debug, Clone)]
pub enum Schedule {
    /// Fixed delay between the end of one tick and the start of the next
    Every(Duration),
    /// Wall-clock cron schedule
    Cron(Box<cron::Schedule>),
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(Error::Config("schedule must not be empty".to_string()));
        }

        if let Some(rest) = expr.strip_prefix(EVERY_PREFIX) {
            let interval = humantime::parse_duration(rest.trim()).map_err(|e| {
                Error::Config(format!("invalid @every interval '{}': {e}", rest.trim()))
            })?;
            return Self::every(interval);
        }

        if let Ok(interval) = humantime::parse_duration(expr) {
            return Self::every(interval);
        }

        // Crontab has no seconds column and counts weekdays from Sunday = 0
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let normalized = if !expr.starts_with('@') && fields.len() == 5 {
            format!("0 {} {}", fields[..4].join(" "), crontab_day_of_week(fields[4])?)
        } else {
            expr.to_string()
        };

        cron::Schedule::from_str(&normalized)
            .map(|schedule| Self::Cron(Box::new(schedule)))
            .map_err(|e| Error::Config(format!("invalid schedule '{expr}': {e}")))
    }

    fn every(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config("schedule interval must be greater than zero".to_string()));
        }
        Ok(Self::Every(interval))
    }

    /// Time to wait from `now` until the next tick, `None` if the schedule
    /// never fires again
    #[must_use]
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Self::Every(interval) => Some(*interval),
            Self::Cron(schedule) => schedule
                .after(&now)
                .next()
                .map(|at| (at - now).to_std().unwrap_or(Duration::ZERO)),
        }
    }
}

/// Rewrite a crontab day-of-week field (0 or 7 = Sunday, 1 = Monday) into
/// the `cron` crate's numbering (1 = Sunday). Day names pass through.
fn crontab_day_of_week(field: &str) -> Result<String> {
    let mut days = BTreeSet::new();
    let mut passthrough = Vec::new();

    for item in field.split(',') {
        if item == "*" || item == "?" || item.chars().any(|c| c.is_ascii_alphabetic()) {
            passthrough.push(item.to_string());
        } else {
            days.extend(crontab_days(item)?);
        }
    }

    Ok(days
        .iter()
        .map(u8::to_string)
        .chain(passthrough)
        .collect::<Vec<_>>()
        .join(","))
}

/// Days selected by one numeric list item, in `cron` crate numbering
fn crontab_days(item: &str) -> Result<Vec<u8>> {
    let invalid = || Error::Config(format!("invalid day of week '{item}'"));
    let day = |value: &str| value.parse::<u8>().ok().filter(|d| *d <= 7).ok_or_else(invalid);

    let (range, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step = step.parse::<usize>().ok().filter(|s| *s > 0).ok_or_else(invalid)?;
            (range, step)
        }
        None => (item, 1),
    };

    let (first, last) = if range == "*" {
        (0, 6)
    } else if let Some((first, last)) = range.split_once('-') {
        (day(first)?, day(last)?)
    } else if step > 1 {
        (day(range)?, 6)
    } else {
        let single = day(range)?;
        (single, single)
    };
    if first > last {
        return Err(invalid());
    }

    Ok((first..=last).step_by(step).map(|d| d % 7 + 1).collect())
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Every(interval) => write!(f, "@every {}", humantime::format_duration(*interval)),
            Self::Cron(schedule) => write!(f, "{schedule}"),
        }
    }
}
