use crate::error::{ReconciliationError, Result};
use crate::schema::CellValue;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const LENIENT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Best-effort date parsing for descriptive columns. Anything that does not
/// look like a date yields `None` instead of an error.
pub fn parse_lenient_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Text(s) => {
            let s = s.trim();
            LENIENT_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    LENIENT_DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}

/// Parses a timestamp with a fixed format. Native date cells are accepted
/// as-is; text that does not match `format` yields `None`.
pub fn parse_fixed_datetime(cell: &CellValue, format: &str) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        CellValue::Text(s) => {
            let s = s.trim();
            NaiveDateTime::parse_from_str(s, format).ok().or_else(|| {
                NaiveDate::parse_from_str(s, format)
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
        }
        _ => None,
    }
}

/// The `MM/YYYY` bucket a timestamp falls into.
pub fn month_bucket(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%m/%Y").to_string()
}

/// Checks a month selector is `MM/YYYY` with a real month and returns it
/// trimmed.
pub fn validate_month_selector(month: &str) -> Result<String> {
    let trimmed = month.trim();
    let invalid = || ReconciliationError::InvalidMonth(month.to_string());

    let (mm, yyyy) = trimmed.split_once('/').ok_or_else(invalid)?;

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if mm.len() != 2 || yyyy.len() != 4 || !all_digits(mm) || !all_digits(yyyy) {
        return Err(invalid());
    }

    let month_number: u32 = mm.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_number) {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}
