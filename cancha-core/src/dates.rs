use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Formats accepted for day-first or slash-separated input, tried in order.
const FALLBACK_FORMATS: [&str; 3] = ["%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// A booking date as received from a caller.
///
/// Callers hand over whatever they have: an already-typed calendar date, a
/// plain `YYYY-MM-DD` string, or a timestamp string. Only the calendar date is
/// ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Date(NaiveDate),
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        DateInput::Text(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        DateInput::Text(text)
    }
}

/// A date object is reduced to its calendar date in its own timezone, so a
/// local-time value for the 20th stays the 20th regardless of the server zone.
impl<Tz: TimeZone> From<DateTime<Tz>> for DateInput {
    fn from(value: DateTime<Tz>) -> Self {
        DateInput::Date(value.date_naive())
    }
}

/// Normalize a booking date to a plain calendar date.
///
/// Timestamp strings keep the date exactly as written: `2025-09-20T23:30:00-03:00`
/// is the 20th, never shifted to the 21st by a UTC conversion.
pub fn normalize_date(input: &DateInput) -> CoreResult<NaiveDate> {
    match input {
        DateInput::Date(date) => Ok(*date),
        DateInput::Text(text) => parse_date_text(text),
    }
}

fn parse_date_text(raw: &str) -> CoreResult<NaiveDate> {
    let text = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Some((date_part, _)) = text.split_once(['T', ' ']) {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Ok(date);
        }
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc2822(text) {
        return Ok(timestamp.date_naive());
    }

    FALLBACK_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| CoreError::InvalidDate(raw.to_string()))
}
