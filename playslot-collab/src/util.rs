use chrono::{NaiveDate, NaiveTime};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use thiserror::Error;

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Raised when a date or time from the outside doesn't parse
#[derive(Debug, Error)]
#[error("{value} is not a valid {kind}")]
pub struct ParseError {
    pub value: String,
    pub kind: &'static str,
}

/// Parses a calendar date in `YYYY-MM-DD` form
pub fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ParseError {
        value: value.to_string(),
        kind: "date",
    })
}

/// Parses a time of day in `HH:MM` form
pub fn parse_time(value: &str) -> Result<NaiveTime, ParseError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ParseError {
        value: value.to_string(),
        kind: "time",
    })
}
