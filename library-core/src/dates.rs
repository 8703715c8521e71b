//! Date literal normalization
//!
//! The store hands dates out in two shapes: canonical `YYYY-MM-DD` and the
//! legacy `DD-MMM-YY` export form (`05-JAN-24`). Both normalize to ISO.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{DomainError, Result};

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("invalid iso date regex"));

static LEGACY_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})-([A-Za-z]{3})-(\d{2})$").expect("invalid legacy date regex")
});

/// Quoted ISO literal, optionally already wrapped in TO_DATE(
static SQL_DATE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(TO_DATE\(\s*)?'\d{4}-\d{2}-\d{2}'").expect("invalid sql date literal regex")
});

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Parse a date token in ISO or `DD-MMM-YY` form.
///
/// Legacy years are two digits and always land in the 2000s.
pub fn parse_date_literal(token: &str) -> Result<NaiveDate> {
    let token = token.trim();

    if ISO_DATE_RE.is_match(token) {
        return NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .map_err(|_| DomainError::validation(format!("invalid calendar date '{}'", token)));
    }

    let caps = LEGACY_DATE_RE
        .captures(token)
        .ok_or_else(|| DomainError::validation(format!("unrecognized date literal '{}'", token)))?;

    let month_token = caps[2].to_ascii_uppercase();
    let month = MONTHS
        .iter()
        .position(|m| *m == month_token)
        .ok_or_else(|| {
            DomainError::validation(format!(
                "unrecognized month '{}' in date '{}'",
                &caps[2], token
            ))
        })?;

    // Both captures are bounded to two ASCII digits.
    let day: u32 = caps[1].parse().unwrap_or_default();
    let year: i32 = 2000 + caps[3].parse::<i32>().unwrap_or_default();

    NaiveDate::from_ymd_opt(year, month as u32 + 1, day)
        .ok_or_else(|| DomainError::validation(format!("invalid calendar date '{}'", token)))
}

/// Normalize a date token to its `YYYY-MM-DD` form.
pub fn normalize_date_literal(token: &str) -> Result<String> {
    parse_date_literal(token).map(|date| date.format("%Y-%m-%d").to_string())
}

/// Wrap every quoted `'YYYY-MM-DD'` literal in a SQL fragment in `TO_DATE(.., 'YYYY-MM-DD')`.
///
/// Literals that are already wrapped are left alone, so the function is idempotent.
pub fn wrap_date_literals_in_sql(sql: &str) -> String {
    SQL_DATE_LITERAL_RE
        .replace_all(sql, |caps: &Captures| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                format!("TO_DATE({}, 'YYYY-MM-DD')", &caps[0])
            }
        })
        .into_owned()
}
