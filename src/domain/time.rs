use chrono::{NaiveTime, Timelike};
use std::fmt;

/// Parses an `HH:MM` wall-clock string into minutes since midnight.
/// Empty or unparseable input yields no value.
pub fn time_to_minutes(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (hours_raw, minutes_raw) = value.split_once(':')?;
    let hours = hours_raw.parse::<u32>().ok()?;
    let minutes = minutes_raw.parse::<u32>().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Same-day inclusive containment. Overnight windows are resolved by the
/// active-slot logic, which also needs yesterday's weekday.
pub fn is_within_range(start: &str, end: &str, now_minutes: u32) -> bool {
    let (Some(start), Some(end)) = (time_to_minutes(start), time_to_minutes(end)) else {
        return false;
    };
    now_minutes >= start && now_minutes <= end
}

pub fn has_passed(time: &str, now_minutes: u32) -> bool {
    let Some(target) = time_to_minutes(time) else {
        return false;
    };
    now_minutes > target
}

/// `HH:MM` to a 12-hour display string, e.g. `13:05` -> `1:05 PM`.
pub fn format_display(value: &str) -> String {
    let Some(target) = time_to_minutes(value) else {
        return String::new();
    };
    let hour = target / 60;
    let minute = target % 60;
    let meridiem = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{display_hour}:{minute:02} {meridiem}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUntil {
    Started,
    Now,
    In { hours: u32, minutes: u32 },
}

impl fmt::Display for TimeUntil {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(formatter, "Started"),
            Self::Now => write!(formatter, "Now"),
            Self::In { hours, minutes } if *hours > 0 => {
                write!(formatter, "in {hours}h {minutes}m")
            }
            Self::In { minutes, .. } => write!(formatter, "in {minutes}m"),
        }
    }
}

/// Countdown tag for a target time today, computed purely from the minute
/// difference. Date crossings are not this helper's concern: once the clock
/// is past the time component the target counts as started.
pub fn time_until(value: &str, now_minutes: u32) -> Option<TimeUntil> {
    let target = time_to_minutes(value)?;
    if target < now_minutes {
        return Some(TimeUntil::Started);
    }
    let diff = target - now_minutes;
    if diff == 0 {
        return Some(TimeUntil::Now);
    }
    Some(TimeUntil::In {
        hours: diff / 60,
        minutes: diff % 60,
    })
}
