//! Date rule mini-language
//!
//! Supported patterns:
//!
//! | Pattern | Matches when the entry date is |
//! |---------|--------------------------------|
//! | `future` | after now |
//! | `before:YYYY-MM-DD` | before the given day |
//! | `after:YYYY-MM-DD` | after the given day |
//! | `between:YYYY-MM-DD,YYYY-MM-DD` | strictly between both days |
//! | `max-age:<duration>` | older than now minus the duration |
//!
//! Durations accept `d` (days) plus `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`,
//! with fractional and compound values such as `1.5h` or `2d12h`.
//!
//! Only the shape of a pattern is checked when a rule is built. A value that
//! does not parse makes the rule never match.

use chrono::{DateTime, Duration, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Structural check applied at rule construction
pub fn is_well_formed(pattern: &str) -> bool {
    pattern.eq_ignore_ascii_case("future") || pattern.contains(':')
}

/// Evaluate a date pattern against an entry date
pub fn matches(pattern: &str, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    if pattern.eq_ignore_ascii_case("future") {
        return date > now;
    }

    let Some((op, value)) = pattern.split_once(':') else {
        return false;
    };

    match op.trim().to_ascii_lowercase().as_str() {
        "before" => parse_day(value).is_some_and(|day| date < day),
        "after" => parse_day(value).is_some_and(|day| date > day),
        "between" => {
            let Some((start, end)) = value.split_once(',') else {
                return false;
            };
            match (parse_day(start), parse_day(end)) {
                (Some(start), Some(end)) => date > start && date < end,
                _ => false,
            }
        }
        "max-age" => parse_duration(value)
            .and_then(|age| now.checked_sub_signed(age))
            .is_some_and(|cutoff| date < cutoff),
        _ => false,
    }
}

/// Parse `YYYY-MM-DD` as midnight UTC
fn parse_day(value: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Parse a duration string such as `30d`, `12h` or `1h30m`
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return None;
        }
        let value: f64 = rest[..number_end].parse().ok()?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        total_nanos += value * unit_nanos(&rest[..unit_end])?;
        rest = &rest[unit_end..];
    }

    if !total_nanos.is_finite() || total_nanos >= i64::MAX as f64 {
        return None;
    }

    let duration = Duration::nanoseconds(total_nanos.round() as i64);
    Some(if negative { -duration } else { duration })
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3_600.0 * 1e9,
        "d" => 86_400.0 * 1e9,
        _ => return None,
    };
    Some(nanos)
}
