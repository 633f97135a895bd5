use chrono::{Duration, Months, NaiveDate, Utc};
use chrono_tz::America::Chicago;

use crate::domain::TrackerError;

pub const DATE_FORMAT: &str = "%m/%d/%Y";
const DATE_FORMAT_SHORT: &str = "%m/%d/%y";

#[derive(Debug, Clone, Copy)]
enum RevisitOffset {
    Days(i64),
    Months(u32),
}

// Index i holds the offset for revisit #(i+1). The first three make up the
// standard schedule, the full table the extended one.
const REVISIT_OFFSETS: [RevisitOffset; 6] = [
    RevisitOffset::Days(3),
    RevisitOffset::Days(14),
    RevisitOffset::Days(30),
    RevisitOffset::Months(3),
    RevisitOffset::Months(6),
    RevisitOffset::Months(12),
];
const STANDARD_SCHEDULE_LEN: usize = 3;

/// Current date in the fixed reference timezone, so the day boundary does not
/// depend on where the program runs.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&Chicago).date_naive()
}

pub fn parse_date(text: &str) -> Result<NaiveDate, TrackerError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, DATE_FORMAT_SHORT))
        .map_err(|_| TrackerError::InvalidDate(text.to_string()))
}

/// Canonical rendering; also the store key format. Two dates are equal iff
/// their formatted strings are equal.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn revisit_dates(initial: NaiveDate, extended: bool) -> Vec<NaiveDate> {
    let count = if extended {
        REVISIT_OFFSETS.len()
    } else {
        STANDARD_SCHEDULE_LEN
    };

    REVISIT_OFFSETS[..count]
        .iter()
        .map(|offset| apply_offset(initial, *offset))
        .collect()
}

/// Inverse of `revisit_dates` for a single entry. Indices outside the known
/// table have no offset to undo and the date is returned unchanged.
pub fn original_date(revisit_date: NaiveDate, revisit_index: u8) -> NaiveDate {
    let offset = usize::from(revisit_index)
        .checked_sub(1)
        .and_then(|index| REVISIT_OFFSETS.get(index));

    match offset {
        Some(offset) => undo_offset(revisit_date, *offset),
        None => revisit_date,
    }
}

fn apply_offset(date: NaiveDate, offset: RevisitOffset) -> NaiveDate {
    match offset {
        RevisitOffset::Days(days) => date + Duration::days(days),
        RevisitOffset::Months(months) => date + Months::new(months),
    }
}

fn undo_offset(date: NaiveDate, offset: RevisitOffset) -> NaiveDate {
    match offset {
        RevisitOffset::Days(days) => date - Duration::days(days),
        RevisitOffset::Months(months) => date - Months::new(months),
    }
}

pub mod mmddyyyy_opt {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_date, parse_date};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_date(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
