use crate::time::{Minutes, TimeOfDay, TimeSlot};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed Monday-Saturday teaching week. Sunday never holds classes.
pub const TEACHING_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn is_teaching_day(day: Weekday) -> bool {
    day != Weekday::Sun
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    NoWorkingDays,
    NonTeachingDay(Weekday),
    EmptyWindow { start: TimeOfDay, end: TimeOfDay },
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarError::NoWorkingDays => write!(f, "work week requires at least one working day"),
            CalendarError::NonTeachingDay(day) => {
                write!(f, "{day} is outside the Monday-Saturday teaching week")
            }
            CalendarError::EmptyWindow { start, end } => {
                write!(f, "daily window {start} - {end} must end after it starts")
            }
        }
    }
}

impl std::error::Error for CalendarError {}

/// A `(day, time)` cursor used when walking the week slot by slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPosition {
    pub day: Weekday,
    pub time: TimeOfDay,
}

impl SlotPosition {
    pub fn new(day: Weekday, time: TimeOfDay) -> Self {
        Self { day, time }
    }
}

impl fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.time)
    }
}

/// Working days plus the daily teaching window `[day_start, day_end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkWeek {
    working_days: Vec<Weekday>,
    window: TimeSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWeekConfig {
    working_days: Vec<Weekday>,
    day_start: TimeOfDay,
    day_end: TimeOfDay,
}

impl Default for WorkWeek {
    fn default() -> Self {
        Self {
            working_days: TEACHING_DAYS.to_vec(),
            window: TimeSlot::ordered(TimeOfDay::clock(9, 0), TimeOfDay::clock(17, 0)),
        }
    }
}

impl WorkWeek {
    pub fn custom<I>(
        working_days: I,
        day_start: TimeOfDay,
        day_end: TimeOfDay,
    ) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        let config = WorkWeekConfig::new(working_days, day_start, day_end);
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkWeekConfig) -> Result<Self, CalendarError> {
        if config.working_days.is_empty() {
            return Err(CalendarError::NoWorkingDays);
        }
        if let Some(day) = config.working_days.iter().find(|d| !is_teaching_day(**d)) {
            return Err(CalendarError::NonTeachingDay(*day));
        }
        let window = TimeSlot::new(config.day_start, config.day_end).map_err(|_| {
            CalendarError::EmptyWindow {
                start: config.day_start,
                end: config.day_end,
            }
        })?;
        Ok(Self {
            working_days: config.working_days.clone(),
            window,
        })
    }

    pub fn to_config(&self) -> WorkWeekConfig {
        WorkWeekConfig::from(self)
    }

    /// Replace the working days, e.g. Mon-Thu for a four-day programme.
    pub fn set_working_days(&mut self, days: Vec<Weekday>) -> Result<(), CalendarError> {
        let config = WorkWeekConfig::new(days, self.day_start(), self.day_end());
        *self = Self::from_config(&config)?;
        Ok(())
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn day_start(&self) -> TimeOfDay {
        self.window.start()
    }

    pub fn day_end(&self) -> TimeOfDay {
        self.window.end()
    }

    pub fn window(&self) -> TimeSlot {
        self.window
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_days.contains(&day)
    }

    /// Advance `position` by `duration`. Reaching or passing the end of the
    /// daily window rolls over to the window start of the next working day;
    /// `None` once the last working day is exhausted.
    pub fn next_slot(&self, position: SlotPosition, duration: Minutes) -> Option<SlotPosition> {
        let advanced = u32::from(position.time.minutes()) + u32::from(duration);
        if advanced < u32::from(self.day_end().minutes()) {
            let time = TimeOfDay::from_minutes(advanced).ok()?;
            return Some(SlotPosition::new(position.day, time));
        }
        let from = position.day.num_days_from_monday();
        self.working_days
            .iter()
            .copied()
            .find(|day| day.num_days_from_monday() > from)
            .map(|day| SlotPosition::new(day, self.day_start()))
    }

    /// Back-to-back slots of `duration` minutes that fit inside the daily window.
    pub fn slots_for_day(&self, duration: Minutes) -> Vec<TimeSlot> {
        let mut slots = Vec::new();
        if duration == 0 {
            return slots;
        }
        let end = u32::from(self.day_end().minutes());
        let mut start = u32::from(self.day_start().minutes());
        while start + u32::from(duration) <= end {
            let slot = TimeOfDay::from_minutes(start)
                .and_then(|s| TimeOfDay::from_minutes(start + u32::from(duration)).map(|e| (s, e)))
                .and_then(|(s, e)| TimeSlot::new(s, e));
            match slot {
                Ok(slot) => slots.push(slot),
                Err(_) => break,
            }
            start += u32::from(duration);
        }
        slots
    }
}

impl WorkWeekConfig {
    pub fn new<I>(working_days: I, day_start: TimeOfDay, day_end: TimeOfDay) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup_by(|a, b| a.num_days_from_monday() == b.num_days_from_monday());
        Self {
            working_days: working,
            day_start,
            day_end,
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn day_start(&self) -> TimeOfDay {
        self.day_start
    }

    pub fn day_end(&self) -> TimeOfDay {
        self.day_end
    }
}

impl Default for WorkWeekConfig {
    fn default() -> Self {
        WorkWeekConfig::from(&WorkWeek::default())
    }
}

impl From<&WorkWeek> for WorkWeekConfig {
    fn from(week: &WorkWeek) -> Self {
        Self {
            working_days: week.working_days.clone(),
            day_start: week.day_start(),
            day_end: week.day_end(),
        }
    }
}
