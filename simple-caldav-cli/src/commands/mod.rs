pub mod create;
pub mod delete;
pub mod etags;
pub mod get;
pub mod list;
pub mod sync;
pub mod token;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Write `value` to stdout as pretty JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Parse YYYY-MM-DD as start of day in UTC
fn parse_date_start(s: &str) -> Result<DateTime<Utc>> {
    Ok(parse_date(s)?.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Parse YYYY-MM-DD as the start of the following day in UTC
fn parse_date_end(s: &str) -> Result<DateTime<Utc>> {
    let next = parse_date(s)?
        .succ_opt()
        .with_context(|| format!("Date '{}' is out of range", s))?;
    Ok(next.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}

/// Parse RFC 3339, or "YYYY-MM-DDTHH:MM[:SS]" read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Could not parse date/time: \"{}\"", s))
}
