use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Deserialize;

/// Query parameters for attendance requests
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    /// Keep logs from the last N hours
    pub hours: Option<i64>,

    /// First day to include, `YYYY-MM-DD`
    #[serde(rename = "from")]
    pub from_date: Option<String>,

    /// Last day to include, `YYYY-MM-DD`
    #[serde(rename = "to")]
    pub to_date: Option<String>,
}

/// Which attendance logs a request wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceFilter {
    All,
    /// `start <= ts < end`
    DateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// `ts >= cutoff`
    Since(NaiveDateTime),
}

impl AttendanceFilter {
    pub fn matches(&self, timestamp: &NaiveDateTime) -> bool {
        match self {
            Self::All => true,
            Self::DateRange { start, end } => start <= timestamp && timestamp < end,
            Self::Since(cutoff) => timestamp >= cutoff,
        }
    }
}

impl AttendanceQuery {
    /// Resolve the query against `now`.
    ///
    /// A complete `from`/`to` pair wins over `hours`. A lone `from` or `to`
    /// is ignored, and so is one sent blank (`?from=&to=`).
    pub fn validate_at(&self, now: NaiveDateTime) -> Result<AttendanceFilter> {
        if let (Some(from), Some(to)) = (given(&self.from_date), given(&self.to_date)) {
            let start = parse_day(from).context("Invalid 'from' date")?;
            let last = parse_day(to).context("Invalid 'to' date")?;

            let end = last
                .checked_add_signed(TimeDelta::days(1))
                .ok_or_else(|| anyhow!("'to' date is out of range"))?;

            return Ok(AttendanceFilter::DateRange {
                start: start.and_time(NaiveTime::MIN),
                end: end.and_time(NaiveTime::MIN),
            });
        }

        if let Some(hours) = self.hours {
            let window = TimeDelta::try_hours(hours)
                .ok_or_else(|| anyhow!("hours value {} is out of range", hours))?;
            let cutoff = now
                .checked_sub_signed(window)
                .ok_or_else(|| anyhow!("hours value {} is out of range", hours))?;

            return Ok(AttendanceFilter::Since(cutoff));
        }

        Ok(AttendanceFilter::All)
    }
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("time data '{}' does not match format '%Y-%m-%d'", value))
}
