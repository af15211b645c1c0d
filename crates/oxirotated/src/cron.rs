//! 5-field cron schedule for forced rotations

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Timelike};
use oxirotate_core::{Error, Result};
use std::fmt;

/// Upper bound of the forward search
const MAX_SEARCH_DAYS: i64 = 366;

/// One cron field as a bitmask of allowed values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    mask: u64,
    /// The field starts with `*` (relevant for the day-of-month/day-of-week rule)
    wildcard: bool,
}

impl Field {
    fn parse(raw: &str, min: u32, max: u32, name: &str) -> Result<Self> {
        let mut mask = 0u64;

        for part in raw.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step.parse().map_err(|_| {
                        Error::cron(format!("invalid step '{}' in {} field", step, name))
                    })?;
                    if step == 0 {
                        return Err(Error::cron(format!("zero step in {} field", name)));
                    }
                    (range, step)
                }
                None => (part, 1),
            };

            let (start, end) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (parse_value(a, min, max, name)?, parse_value(b, min, max, name)?)
            } else {
                let value = parse_value(range, min, max, name)?;
                // `5/10` means 5, 15, 25, ...
                let end = if step > 1 { max } else { value };
                (value, end)
            };

            if start > end {
                return Err(Error::cron(format!(
                    "descending range '{}' in {} field",
                    range, name
                )));
            }

            for value in (start..=end).step_by(step as usize) {
                mask |= 1u64 << value;
            }
        }

        Ok(Self {
            mask,
            wildcard: raw.starts_with('*'),
        })
    }

    fn contains(&self, value: u32) -> bool {
        self.mask & (1u64 << value) != 0
    }
}

fn parse_value(raw: &str, min: u32, max: u32, name: &str) -> Result<u32> {
    let value: u32 = raw
        .parse()
        .map_err(|_| Error::cron(format!("invalid value '{}' in {} field", raw, name)))?;
    if value < min || value > max {
        return Err(Error::cron(format!(
            "{} field value {} out of range ({}-{})",
            name, value, min, max
        )));
    }
    Ok(value)
}

/// Parsed cron expression (`minute hour day-of-month month day-of-week`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    raw: String,
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(Error::cron(format!(
                "expected 5 fields, got {} in '{}'",
                parts.len(),
                expr
            )));
        }

        let mut day_of_week = Field::parse(parts[4], 0, 7, "day-of-week")?;
        // 7 is Sunday too
        if day_of_week.contains(7) {
            day_of_week.mask |= 1;
        }

        Ok(Self {
            raw: parts.join(" "),
            minute: Field::parse(parts[0], 0, 59, "minute")?,
            hour: Field::parse(parts[1], 0, 23, "hour")?,
            day_of_month: Field::parse(parts[2], 1, 31, "day-of-month")?,
            month: Field::parse(parts[3], 1, 12, "month")?,
            day_of_week,
        })
    }

    /// Whether the schedule fires during the minute of `at`
    pub fn matches<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        if !self.minute.contains(at.minute())
            || !self.hour.contains(at.hour())
            || !self.month.contains(at.month())
        {
            return false;
        }

        let dom = self.day_of_month.contains(at.day());
        let dow = self
            .day_of_week
            .contains(at.weekday().num_days_from_sunday());

        match (self.day_of_month.wildcard, self.day_of_week.wildcard) {
            (false, false) => dom || dow,
            _ => dom && dow,
        }
    }

    /// First firing time strictly after `now`, at minute resolution
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>> {
        let start = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(|| now.clone());

        let max_minutes = MAX_SEARCH_DAYS * 24 * 60;
        for offset in 1..=max_minutes {
            let candidate = start.clone() + ChronoDuration::minutes(offset);
            if self.matches(&candidate) {
                return Ok(candidate);
            }
        }

        Err(Error::cron(format!(
            "'{}' does not fire within {} days",
            self.raw, MAX_SEARCH_DAYS
        )))
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
