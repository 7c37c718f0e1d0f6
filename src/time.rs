use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Minutes since midnight.
pub type Minutes = u16;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

static HH_MM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").expect("HH:MM pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    InvalidFormat(String),
    OutOfRange(u32),
    EmptySlot { start: TimeOfDay, end: TimeOfDay },
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::InvalidFormat(input) => {
                write!(f, "invalid time '{input}' (expected HH:MM, 00:00-23:59)")
            }
            TimeError::OutOfRange(minutes) => {
                write!(f, "{minutes} minutes is past the end of the day")
            }
            TimeError::EmptySlot { start, end } => {
                write!(f, "time slot {start} - {end} must end after it starts")
            }
        }
    }
}

impl std::error::Error for TimeError {}

/// Parse a strict `HH:MM` string into minutes since midnight.
pub fn parse_time(input: &str) -> Result<Minutes, TimeError> {
    let caps = HH_MM
        .captures(input)
        .ok_or_else(|| TimeError::InvalidFormat(input.to_string()))?;
    let hours: Minutes = caps[1]
        .parse()
        .map_err(|_| TimeError::InvalidFormat(input.to_string()))?;
    let minutes: Minutes = caps[2]
        .parse()
        .map_err(|_| TimeError::InvalidFormat(input.to_string()))?;
    Ok(hours * 60 + minutes)
}

pub fn format_time(minutes: Minutes) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Length of `[start, end)`. Callers guarantee `end > start`.
pub fn duration(start: Minutes, end: Minutes) -> Minutes {
    end - start
}

/// Half-open overlap test: `[s1, e1)` and `[s2, e2)` share at least one minute.
/// Intervals that only touch at a boundary do not overlap.
pub fn overlaps(s1: Minutes, e1: Minutes, s2: Minutes, e2: Minutes) -> bool {
    s1 < e2 && s2 < e1
}

/// A wall-clock time with minute resolution. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(Minutes);

impl TimeOfDay {
    pub fn from_minutes(minutes: u32) -> Result<Self, TimeError> {
        if minutes >= u32::from(MINUTES_PER_DAY) {
            return Err(TimeError::OutOfRange(minutes));
        }
        Ok(Self(minutes as Minutes))
    }

    pub fn from_hm(hours: u32, minutes: u32) -> Result<Self, TimeError> {
        if minutes >= 60 {
            return Err(TimeError::InvalidFormat(format!("{hours}:{minutes}")));
        }
        let total = hours
            .checked_mul(60)
            .and_then(|m| m.checked_add(minutes))
            .ok_or(TimeError::OutOfRange(u32::MAX))?;
        Self::from_minutes(total)
    }

    /// Clock literal known to be in range, e.g. `TimeOfDay::clock(9, 0)`.
    pub(crate) const fn clock(hour: Minutes, minute: Minutes) -> Self {
        Self(hour * 60 + minute)
    }

    pub fn minutes(self) -> Minutes {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time(s).map(TimeOfDay)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-open interval `[start, end)` within one day. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeSlotRecord")]
pub struct TimeSlot {
    start: TimeOfDay,
    end: TimeOfDay,
}

#[derive(Deserialize)]
struct TimeSlotRecord {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TryFrom<TimeSlotRecord> for TimeSlot {
    type Error = TimeError;

    fn try_from(record: TimeSlotRecord) -> Result<Self, Self::Error> {
        TimeSlot::new(record.start, record.end)
    }
}

impl TimeSlot {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, TimeError> {
        if start >= end {
            return Err(TimeError::EmptySlot { start, end });
        }
        Ok(Self { start, end })
    }

    /// Caller guarantees `start < end`.
    pub(crate) const fn ordered(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Build a slot from two `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeError> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn duration_minutes(&self) -> Minutes {
        duration(self.start.minutes(), self.end.minutes())
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlaps(
            self.start.minutes(),
            self.end.minutes(),
            other.start.minutes(),
            other.end.minutes(),
        )
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}
