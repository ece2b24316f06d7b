use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::engine::ValidationError;
use crate::model::{Interval, Period, TimeOfDay};

// ── 12-hour clock codec ──────────────────────────────────────────

impl FromStr for Period {
    type Err = ValidationError;

    /// Case-insensitive; `a.m.` / `p.m.` are accepted and normalized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "am" | "a.m." => Ok(Period::Am),
            "pm" | "p.m." => Ok(Period::Pm),
            _ => Err(ValidationError::InvalidTimeFormat(s.to_string())),
        }
    }
}

/// Split `H:MM` / `HH:MM` into numbers. Minutes must be two digits.
fn split_hour_minute(text: &str) -> Option<(u8, u8)> {
    let (hour, minute) = text.trim().split_once(':')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
        return None;
    }
    Some((hour.parse().ok()?, minute.parse().ok()?))
}

pub fn from_12h(hour: u8, minute: u8, period: Period) -> Result<TimeOfDay, ValidationError> {
    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(ValidationError::InvalidTimeFormat(format!(
            "{hour}:{minute:02} {period}"
        )));
    }
    let hour24 = match (period, hour) {
        (Period::Am, 12) => 0,
        (Period::Am, h) => h,
        (Period::Pm, 12) => 12,
        (Period::Pm, h) => h + 12,
    };
    let minutes = u16::from(hour24) * 60 + u16::from(minute);
    TimeOfDay::new(minutes).ok_or_else(|| ValidationError::InvalidTimeFormat(minutes.to_string()))
}

pub fn to_12h(time: TimeOfDay) -> (u8, u8, Period) {
    let hour24 = time.hour();
    let period = if hour24 >= 12 { Period::Pm } else { Period::Am };
    let hour = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    (hour, time.minute(), period)
}

/// `("02:30", pm)` → 870.
pub fn to_minutes(hour_minute: &str, period: Period) -> Result<TimeOfDay, ValidationError> {
    let (hour, minute) = split_hour_minute(hour_minute)
        .ok_or_else(|| ValidationError::InvalidTimeFormat(hour_minute.to_string()))?;
    from_12h(hour, minute, period).map_err(|_| ValidationError::InvalidTimeFormat(hour_minute.to_string()))
}

/// 870 → `("02:30", pm)`. The period is always re-derived from the 24-hour value.
pub fn from_minutes(time: TimeOfDay) -> (String, Period) {
    let (hour, minute, period) = to_12h(time);
    (format!("{hour:02}:{minute:02}"), period)
}

// ── 24-hour boundary parsers ─────────────────────────────────────

pub fn parse_24h(text: &str) -> Result<TimeOfDay, ValidationError> {
    let invalid = || ValidationError::InvalidTimeFormat(text.to_string());
    let (hour, minute) = split_hour_minute(text).ok_or_else(invalid)?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    TimeOfDay::new(u16::from(hour) * 60 + u16::from(minute)).ok_or_else(invalid)
}

pub fn format_24h(time: TimeOfDay) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

static RANGE_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])\s*-\s*([01]?[0-9]|2[0-3]):([0-5][0-9])$")
        .expect("range pattern compiles")
});

/// Parse a custom search range `HH:MM - HH:MM`. Anything else, including a
/// range that does not move forward within the day, is `InvalidRangeFormat`.
pub fn parse_range(text: &str) -> Result<Interval, ValidationError> {
    let invalid = || ValidationError::InvalidRangeFormat(text.to_string());
    let caps = RANGE_24H.captures(text.trim()).ok_or_else(invalid)?;
    let field = |i: usize| -> Result<u16, ValidationError> {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)
    };
    let start = TimeOfDay::new(field(1)? * 60 + field(2)?).ok_or_else(invalid)?;
    let end = TimeOfDay::new(field(3)? * 60 + field(4)?).ok_or_else(invalid)?;
    Interval::new(start, end).map_err(|_| invalid())
}
