//! Calendar date utilities
//!
//! Chant dates are plain calendar days in the client's local timezone,
//! carried on the wire as zero-padded `YYYY-MM-DD`.

use chrono::{Local, NaiveDate};

use crate::ValidationError;

/// Wire format for chant dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current calendar day in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate)
}

/// True when `date` falls after `today`
pub fn is_future(date: NaiveDate, today: NaiveDate) -> bool {
    date > today
}
