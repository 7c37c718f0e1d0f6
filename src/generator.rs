use crate::calendar::{SlotPosition, WorkWeek};
use crate::conflict::{ResourceKind, TimetableView};
use crate::entry::{Course, Group, Instructor, Room, ScheduleEntry, generate_entry_id};
use crate::time::{Minutes, TimeOfDay, TimeSlot};
use crate::timetable::Timetable;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

/// Seven teaching hours a day over a five-day week.
pub const DEFAULT_WEEKLY_MINUTES_CAP: u32 = 35 * 60;

fn default_weekly_minutes_cap() -> u32 {
    DEFAULT_WEEKLY_MINUTES_CAP
}

/// One course that needs sessions placed for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRequest {
    pub course: Course,
    pub instructor: Instructor,
    pub group: Group,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_per_week: Option<u8>,
}

impl CourseRequest {
    pub fn new(course: Course, instructor: Instructor, group: Group) -> Self {
        Self {
            course,
            instructor,
            group,
            sessions_per_week: None,
        }
    }

    pub fn sessions(&self) -> u8 {
        self.sessions_per_week
            .unwrap_or_else(|| self.course.course_type.default_sessions_per_week())
    }

    /// A zero duration falls back to the course type's session length.
    pub fn session_minutes(&self) -> Minutes {
        if self.course.duration_minutes == 0 {
            self.course.course_type.default_duration_minutes()
        } else {
            self.course.duration_minutes
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub rooms: Vec<Room>,
    pub courses: Vec<CourseRequest>,
    #[serde(default = "default_weekly_minutes_cap")]
    pub weekly_minutes_cap: u32,
    /// Drop existing entries before placing.
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    NoSuitableRoom,
    WeeklyCapReached,
    NoFreeSlot,
}

impl UnplacedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnplacedReason::NoSuitableRoom => "no_suitable_room",
            UnplacedReason::WeeklyCapReached => "weekly_cap_reached",
            UnplacedReason::NoFreeSlot => "no_free_slot",
        }
    }
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedSession {
    pub course: String,
    pub group: String,
    /// 1-based session number within the course's week.
    pub session: u8,
    pub reason: UnplacedReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub placed: Vec<ScheduleEntry>,
    pub unplaced: Vec<UnplacedSession>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn to_cli_summary(&self) -> String {
        format!("placed={}, unplaced={}", self.placed.len(), self.unplaced.len())
    }
}

/// Greedy batch placement. Requests are handled group by group, labs
/// first and longer sessions before shorter ones. Every placement goes
/// through `Timetable::insert`, so the normal checks apply to generated
/// entries as well as to anything already committed.
pub struct Generator<'a> {
    week: &'a WorkWeek,
    rooms: &'a [Room],
    weekly_minutes_cap: u32,
}

impl<'a> Generator<'a> {
    pub fn new(week: &'a WorkWeek, rooms: &'a [Room]) -> Self {
        Self {
            week,
            rooms,
            weekly_minutes_cap: DEFAULT_WEEKLY_MINUTES_CAP,
        }
    }

    pub fn with_weekly_cap(mut self, minutes: u32) -> Self {
        self.weekly_minutes_cap = minutes;
        self
    }

    /// Rooms of the right type that also seat the whole group, in pool order.
    pub fn suitable_rooms(&self, request: &CourseRequest) -> Vec<&'a Room> {
        self.rooms
            .iter()
            .filter(|room| room.suits(&request.course) && room.fits(&request.group))
            .collect()
    }

    pub fn execute(&self, timetable: &mut Timetable, requests: &[CourseRequest]) -> GenerationReport {
        let mut report = GenerationReport::default();
        let mut booked: HashMap<String, u32> = HashMap::new();

        for request in placement_order(requests) {
            let group_id = request.group.id.as_str();
            let duration = request.session_minutes();
            let sessions = request.sessions();
            let rooms = self.suitable_rooms(request);
            let minutes = booked
                .entry(group_id.to_string())
                .or_insert_with(|| group_minutes(timetable, group_id));

            let mut days_used: Vec<Weekday> = Vec::new();
            for session in 1..=sessions {
                let outcome = if rooms.is_empty() {
                    Err(UnplacedReason::NoSuitableRoom)
                } else if *minutes + u32::from(duration) > self.weekly_minutes_cap {
                    Err(UnplacedReason::WeeklyCapReached)
                } else {
                    self.week
                        .working_days()
                        .iter()
                        .copied()
                        .filter(|day| sessions == 1 || !days_used.contains(day))
                        .find_map(|day| self.place_on(timetable, request, day, duration, &rooms))
                        .ok_or(UnplacedReason::NoFreeSlot)
                };
                match outcome {
                    Ok(entry) => {
                        *minutes += u32::from(duration);
                        days_used.push(entry.day);
                        report.placed.push(entry);
                    }
                    Err(reason) => report.unplaced.push(UnplacedSession {
                        course: request.course.code.clone(),
                        group: request.group.id.clone(),
                        session,
                        reason,
                    }),
                }
            }
        }
        report
    }

    fn place_on(
        &self,
        timetable: &mut Timetable,
        request: &CourseRequest,
        day: Weekday,
        duration: Minutes,
        rooms: &[&Room],
    ) -> Option<ScheduleEntry> {
        let mut course = request.course.clone();
        course.duration_minutes = duration;
        for slot in self.candidate_slots(timetable, &request.group.id, day, duration) {
            for room in rooms {
                let entry = ScheduleEntry::new(
                    generate_entry_id(),
                    day,
                    slot,
                    course.clone(),
                    request.instructor.clone(),
                    (*room).clone(),
                    request.group.clone(),
                );
                if timetable.check(&entry).is_err() {
                    continue;
                }
                if timetable.insert(entry.clone()).is_ok() {
                    return Some(entry);
                }
            }
        }
        None
    }

    /// The slot straight after the group's last class that day comes first,
    /// then the back-to-back grid from the start of the window.
    fn candidate_slots(
        &self,
        timetable: &Timetable,
        group_id: &str,
        day: Weekday,
        duration: Minutes,
    ) -> Vec<TimeSlot> {
        let mut candidates = Vec::new();
        let last = timetable
            .bookings(ResourceKind::Group, group_id, day)
            .into_iter()
            .max_by_key(|entry| entry.slot.end());
        if let Some(last) = last {
            let after_last = self
                .week
                .next_slot(
                    SlotPosition::new(day, last.slot.start()),
                    last.slot.duration_minutes(),
                )
                .filter(|next| next.day == day && next.time >= self.week.day_start())
                .and_then(|next| self.slot_from(next.time, duration));
            candidates.extend(after_last);
        }
        candidates.extend(self.week.slots_for_day(duration));
        candidates
    }

    fn slot_from(&self, start: TimeOfDay, duration: Minutes) -> Option<TimeSlot> {
        let end = TimeOfDay::from_minutes(u32::from(start.minutes()) + u32::from(duration)).ok()?;
        if end > self.week.day_end() {
            return None;
        }
        TimeSlot::new(start, end).ok()
    }
}

/// Groups keep the order they first appear in; within a group labs go
/// first, then longer sessions. The sort is stable, so ties keep input order.
fn placement_order(requests: &[CourseRequest]) -> Vec<&CourseRequest> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for request in requests {
        let next = first_seen.len();
        first_seen.entry(request.group.id.as_str()).or_insert(next);
    }
    let mut ordered: Vec<&CourseRequest> = requests.iter().collect();
    ordered.sort_by_key(|request| {
        (
            first_seen
                .get(request.group.id.as_str())
                .copied()
                .unwrap_or(usize::MAX),
            !request.course.course_type.is_lab(),
            Reverse(request.session_minutes()),
        )
    });
    ordered
}

fn group_minutes(timetable: &Timetable, group_id: &str) -> u32 {
    timetable
        .entries()
        .into_iter()
        .filter(|entry| entry.group.id == group_id)
        .map(|entry| u32::from(entry.slot.duration_minutes()))
        .sum()
}

/// Run a whole request against `timetable` using its work week.
pub fn generate(timetable: &mut Timetable, request: &GenerationRequest) -> GenerationReport {
    if request.fresh {
        timetable.clear();
    }
    let week = timetable.week().clone();
    Generator::new(&week, &request.rooms)
        .with_weekly_cap(request.weekly_minutes_cap)
        .execute(timetable, &request.courses)
}
