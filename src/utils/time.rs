use chrono::{Duration, Months, NaiveDate, NaiveDateTime};

use crate::error::{CompareError, Result};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parse a timestamp as found in time-series files.
///
/// Accepts ISO-like date-times (space or `T` separated, optional fractional
/// seconds, optional trailing `Z`) and plain dates, which map to midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    parse_with_precision(value).map(|(dt, _)| dt)
}

/// How much of a period a parsed value pins down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precision {
    Year,
    Month,
    Day,
    Exact,
}

fn parse_with_precision(value: &str) -> Result<(NaiveDateTime, Precision)> {
    let value = value.trim();
    let value = value.strip_suffix('Z').unwrap_or(value);

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok((dt, Precision::Exact));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok((dt, Precision::Day));
            }
        }
    }

    Err(CompareError::InvalidFormat(format!(
        "Invalid timestamp: '{}'",
        value
    )))
}

fn parse_period(value: &str) -> Result<(NaiveDateTime, Precision)> {
    let trimmed = value.trim();

    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let year = trimmed.parse::<i32>().map_err(|_| {
            CompareError::InvalidFormat(format!("Invalid year: '{}'", trimmed))
        })?;
        return Ok((start_of_month(year, 1, trimmed)?, Precision::Year));
    }

    if let Some((year, month)) = trimmed.split_once('-') {
        if year.len() == 4 && (1..=2).contains(&month.len()) {
            if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
                return Ok((start_of_month(year, month, trimmed)?, Precision::Month));
            }
        }
    }

    parse_with_precision(trimmed)
}

/// Parse a user-supplied start bound.
///
/// Besides full timestamps, a bare year (`2017`) or year-month (`2017-10`)
/// selects the start of that period.
pub fn parse_period_bound(value: &str) -> Result<NaiveDateTime> {
    parse_period(value).map(|(dt, _)| dt)
}

/// Parse a user-supplied end bound.
///
/// A year, year-month or plain date includes the whole period, so
/// `2017-10-27` ends at the last nanosecond of that day. Full timestamps
/// are taken as given.
pub fn parse_period_end(value: &str) -> Result<NaiveDateTime> {
    let (start, precision) = parse_period(value)?;

    let next = match precision {
        Precision::Exact => return Ok(start),
        Precision::Day => start.checked_add_signed(Duration::days(1)),
        Precision::Month => start.checked_add_months(Months::new(1)),
        Precision::Year => start.checked_add_months(Months::new(12)),
    };

    next.map(|t| t - Duration::nanoseconds(1)).ok_or_else(|| {
        CompareError::InvalidFormat(format!("Invalid period: '{}'", value.trim()))
    })
}

fn start_of_month(year: i32, month: u32, original: &str) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CompareError::InvalidFormat(format!("Invalid period: '{}'", original)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = dt(2017, 10, 27, 6, 30, 0);
        assert_eq!(parse_timestamp("2017-10-27 06:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-10-27T06:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-10-27T06:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-10-27 06:30").unwrap(), expected);
        assert_eq!(parse_timestamp(" 20171027063000 ").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2017-10-27").unwrap(),
            dt(2017, 10, 27, 0, 0, 0)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2017-13-01").is_err());
    }

    #[test]
    fn test_parse_period_bound() {
        assert_eq!(parse_period_bound("2017").unwrap(), dt(2017, 1, 1, 0, 0, 0));
        assert_eq!(
            parse_period_bound("2017-10").unwrap(),
            dt(2017, 10, 1, 0, 0, 0)
        );
        assert_eq!(
            parse_period_bound("2017-10-28 00:00:01").unwrap(),
            dt(2017, 10, 28, 0, 0, 1)
        );
        assert!(parse_period_bound("2017-13").is_err());
    }

    #[test]
    fn test_parse_period_end_covers_whole_period() {
        let last = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_nano_opt(23, 59, 59, 999_999_999)
                .unwrap()
        };

        assert_eq!(parse_period_end("2017").unwrap(), last(2017, 12, 31));
        assert_eq!(parse_period_end("2017-10").unwrap(), last(2017, 10, 31));
        assert_eq!(parse_period_end("2016-02").unwrap(), last(2016, 2, 29));
        assert_eq!(parse_period_end("2017-10-27").unwrap(), last(2017, 10, 27));
        assert_eq!(
            parse_period_end("2017-10-27 06:00:00").unwrap(),
            dt(2017, 10, 27, 6, 0, 0)
        );
        assert!(parse_period_end("2017-13").is_err());
    }
}
