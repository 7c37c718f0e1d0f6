use crate::conflict::ConflictReason;
use crate::time::{Minutes, TimeSlot};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Windows during which a resource is busy, per weekday. A missing map or a
/// missing day means the resource is free for that whole day.
pub type AvailabilityMap = HashMap<Weekday, Vec<TimeSlot>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseType {
    #[serde(rename = "3_credit_theory")]
    Theory3Credit,
    #[serde(rename = "2_credit_theory")]
    Theory2Credit,
    Lab,
}

impl CourseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseType::Theory3Credit => "3_credit_theory",
            CourseType::Theory2Credit => "2_credit_theory",
            CourseType::Lab => "lab",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "3_credit_theory" | "theory" | "theory_3" | "theory_3cr" => Some(CourseType::Theory3Credit),
            "2_credit_theory" | "theory_2" | "theory_2cr" => Some(CourseType::Theory2Credit),
            "lab" => Some(CourseType::Lab),
            _ => None,
        }
    }

    /// Length of a single session in minutes.
    pub fn default_duration_minutes(&self) -> Minutes {
        match self {
            CourseType::Theory3Credit => 90,
            CourseType::Theory2Credit => 120,
            CourseType::Lab => 180,
        }
    }

    /// Sessions placed per week when a request does not say otherwise.
    pub fn default_sessions_per_week(&self) -> u8 {
        match self {
            CourseType::Theory3Credit => 2,
            CourseType::Theory2Credit | CourseType::Lab => 1,
        }
    }

    pub fn is_lab(&self) -> bool {
        matches!(self, CourseType::Lab)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    Classroom,
    Lab,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
    pub course_type: CourseType,
    pub duration_minutes: Minutes,
}

impl Course {
    pub fn new(code: impl Into<String>, name: impl Into<String>, course_type: CourseType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            course_type,
            duration_minutes: course_type.default_duration_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared weekly unavailability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailability: Option<AvailabilityMap>,
}

impl Instructor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            unavailability: None,
        }
    }

    pub fn add_unavailability(&mut self, day: Weekday, slot: TimeSlot) {
        self.unavailability
            .get_or_insert_with(HashMap::new)
            .entry(day)
            .or_default()
            .push(slot);
    }

    pub fn is_available(&self, day: Weekday, slot: &TimeSlot) -> bool {
        is_free(self.unavailability.as_ref(), day, slot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub capacity: u32,
    #[serde(default)]
    pub room_type: RoomType,
    /// Bookings tracked outside this timetable (other departments, events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy: Option<AvailabilityMap>,
}

impl Room {
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            room_type: RoomType::Classroom,
            busy: None,
        }
    }

    pub fn lab(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            room_type: RoomType::Lab,
            ..Self::new(id, capacity)
        }
    }

    pub fn add_busy(&mut self, day: Weekday, slot: TimeSlot) {
        self.busy
            .get_or_insert_with(HashMap::new)
            .entry(day)
            .or_default()
            .push(slot);
    }

    pub fn is_available(&self, day: Weekday, slot: &TimeSlot) -> bool {
        is_free(self.busy.as_ref(), day, slot)
    }

    pub fn fits(&self, group: &Group) -> bool {
        self.capacity >= group.size
    }

    /// Labs run in lab rooms and lectures in classrooms.
    pub fn suits(&self, course: &Course) -> bool {
        course.course_type.is_lab() == (self.room_type == RoomType::Lab)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub size: u32,
}

impl Group {
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self { id: id.into(), size }
    }
}

fn is_free(map: Option<&AvailabilityMap>, day: Weekday, slot: &TimeSlot) -> bool {
    let Some(windows) = map.and_then(|m| m.get(&day)) else {
        return true;
    };
    !windows.iter().any(|window| window.overlaps(slot))
}

/// One placed class occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub day: Weekday,
    pub slot: TimeSlot,
    pub course: Course,
    pub instructor: Instructor,
    pub room: Room,
    pub group: Group,
}

impl ScheduleEntry {
    pub fn new(
        id: impl Into<String>,
        day: Weekday,
        slot: TimeSlot,
        course: Course,
        instructor: Instructor,
        room: Room,
        group: Group,
    ) -> Self {
        Self {
            id: id.into(),
            day,
            slot,
            course,
            instructor,
            room,
            group,
        }
    }

    /// Whether this entry and `other` share a day and at least one minute.
    pub fn clashes_with(&self, other: &ScheduleEntry) -> bool {
        self.day == other.day && self.slot.overlaps(&other.slot)
    }

    pub fn matches_course_duration(&self) -> bool {
        self.course.duration_minutes == self.slot.duration_minutes()
    }
}

pub fn generate_entry_id() -> String {
    format!("entry_{}", uuid::Uuid::new_v4().simple())
}

/// Candidate as submitted by a form: day and times are still raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntryDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub day: String,
    pub start: String,
    pub end: String,
    pub course: Course,
    pub instructor: Instructor,
    pub room: Room,
    pub group: Group,
}

impl ScheduleEntryDraft {
    pub fn into_entry(self) -> Result<ScheduleEntry, ConflictReason> {
        let day = self
            .day
            .trim()
            .parse::<Weekday>()
            .map_err(|_| ConflictReason::MalformedEntry)?;
        let slot = TimeSlot::parse(&self.start, &self.end)
            .map_err(|_| ConflictReason::InvalidTimeFormat)?;
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_entry_id);
        Ok(ScheduleEntry::new(
            id,
            day,
            slot,
            self.course,
            self.instructor,
            self.room,
            self.group,
        ))
    }
}
