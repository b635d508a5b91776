use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// The only date format accepted from forms and CSV files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| AppError::InvalidDateFormat(trimmed.to_string()))
}

/// Bucket size for the time-series chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    #[default]
    Month,
    Year,
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(()),
        }
    }
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Month => "Month",
            Self::Year => "Year",
        }
    }

    pub fn chart_title(&self) -> &'static str {
        match self {
            Self::Day => "Daily Spending",
            Self::Month => "Monthly Spending",
            Self::Year => "Yearly Spending",
        }
    }

    pub fn all() -> &'static [Granularity] {
        &[Self::Day, Self::Month, Self::Year]
    }

    /// First day of the bucket containing `date`.
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Month => month_start(date),
            Self::Year => year_start(date),
        }
    }

    /// Label of a bucket given its first day: `2024-01-05`, `2024-01` or `2024`.
    pub fn period_label(&self, period_start: NaiveDate) -> String {
        match self {
            Self::Day => period_start.format(DATE_FORMAT).to_string(),
            Self::Month => period_start.format("%Y-%m").to_string(),
            Self::Year => format!("{:04}", period_start.year()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}
