//! Placement rules for timetable entries.
//!
//! A candidate is checked against its own resources first (declared
//! unavailability, room capacity) and then against every other booking of
//! its instructor, room and group on the same day. Checks run in a fixed
//! order and the first failure is reported.

use crate::entry::{ScheduleEntry, ScheduleEntryDraft};
use crate::entry_validation;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    InvalidTimeFormat,
    MalformedEntry,
    InstructorUnavailable,
    RoomUnavailable,
    CapacityExceeded,
    InstructorConflict,
    RoomConflict,
    GroupConflict,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::InvalidTimeFormat => "invalid_time_format",
            ConflictReason::MalformedEntry => "malformed_entry",
            ConflictReason::InstructorUnavailable => "instructor_unavailable",
            ConflictReason::RoomUnavailable => "room_unavailable",
            ConflictReason::CapacityExceeded => "capacity_exceeded",
            ConflictReason::InstructorConflict => "instructor_conflict",
            ConflictReason::RoomConflict => "room_conflict",
            ConflictReason::GroupConflict => "group_conflict",
        }
    }

    /// Message suitable for showing to the person editing the timetable.
    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::InvalidTimeFormat => "Time must be given as HH:MM and end after it starts",
            ConflictReason::MalformedEntry => "Entry is incomplete or scheduled outside the teaching week",
            ConflictReason::InstructorUnavailable => {
                "Instructor is not available during this time slot"
            }
            ConflictReason::RoomUnavailable => "Room is not available during this time slot",
            ConflictReason::CapacityExceeded => "Room capacity is insufficient for the group size",
            ConflictReason::InstructorConflict => {
                "Instructor has another class during this time slot"
            }
            ConflictReason::RoomConflict => {
                "Room is already scheduled for another class during this time slot"
            }
            ConflictReason::GroupConflict => "Group has another class during this time slot",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ConflictReason {}

/// Wire form of a validation result: `{"valid": true}` or
/// `{"valid": false, "reason": "room_conflict"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConflictReason>,
}

impl From<Result<(), ConflictReason>> for ValidationOutcome {
    fn from(result: Result<(), ConflictReason>) -> Self {
        match result {
            Ok(()) => Self {
                valid: true,
                reason: None,
            },
            Err(reason) => Self {
                valid: false,
                reason: Some(reason),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instructor,
    Room,
    Group,
}

impl ResourceKind {
    /// Double-booking checks run in this order.
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Instructor, ResourceKind::Room, ResourceKind::Group];

    pub fn id_of(self, entry: &ScheduleEntry) -> &str {
        match self {
            ResourceKind::Instructor => &entry.instructor.id,
            ResourceKind::Room => &entry.room.id,
            ResourceKind::Group => &entry.group.id,
        }
    }

    pub fn conflict_reason(self) -> ConflictReason {
        match self {
            ResourceKind::Instructor => ConflictReason::InstructorConflict,
            ResourceKind::Room => ConflictReason::RoomConflict,
            ResourceKind::Group => ConflictReason::GroupConflict,
        }
    }
}

/// Read access to the committed entries a candidate is checked against.
pub trait TimetableView {
    /// Entries on `day` whose `kind` resource has identifier `id`.
    fn bookings(&self, kind: ResourceKind, id: &str, day: Weekday) -> Vec<&ScheduleEntry>;
}

impl TimetableView for [ScheduleEntry] {
    fn bookings(&self, kind: ResourceKind, id: &str, day: Weekday) -> Vec<&ScheduleEntry> {
        self.iter()
            .filter(|entry| entry.day == day && kind.id_of(entry) == id)
            .collect()
    }
}

impl TimetableView for Vec<ScheduleEntry> {
    fn bookings(&self, kind: ResourceKind, id: &str, day: Weekday) -> Vec<&ScheduleEntry> {
        self.as_slice().bookings(kind, id, day)
    }
}

/// Declared unavailability of the instructor, then the room.
pub fn check_availability(candidate: &ScheduleEntry) -> Result<(), ConflictReason> {
    if !candidate.instructor.is_available(candidate.day, &candidate.slot) {
        return Err(ConflictReason::InstructorUnavailable);
    }
    if !candidate.room.is_available(candidate.day, &candidate.slot) {
        return Err(ConflictReason::RoomUnavailable);
    }
    Ok(())
}

pub fn check_capacity(candidate: &ScheduleEntry) -> Result<(), ConflictReason> {
    if !candidate.room.fits(&candidate.group) {
        return Err(ConflictReason::CapacityExceeded);
    }
    Ok(())
}

/// First other entry that books the same `kind` resource in an overlapping
/// slot on the candidate's day. Entries sharing the candidate's id are its
/// previous version and never count.
pub fn find_double_booking<'a, V>(
    candidate: &ScheduleEntry,
    timetable: &'a V,
    kind: ResourceKind,
) -> Option<&'a ScheduleEntry>
where
    V: TimetableView + ?Sized,
{
    timetable
        .bookings(kind, kind.id_of(candidate), candidate.day)
        .into_iter()
        .find(|existing| existing.id != candidate.id && existing.slot.overlaps(&candidate.slot))
}

pub fn validate<V>(candidate: &ScheduleEntry, timetable: &V) -> Result<(), ConflictReason>
where
    V: TimetableView + ?Sized,
{
    entry_validation::validate_entry(candidate).map_err(|_| ConflictReason::MalformedEntry)?;
    check_availability(candidate)?;
    check_capacity(candidate)?;
    for kind in ResourceKind::ALL {
        if find_double_booking(candidate, timetable, kind).is_some() {
            return Err(kind.conflict_reason());
        }
    }
    Ok(())
}

/// Parse a raw draft and validate it. Returns the parsed entry on success so
/// the caller can commit exactly what was checked.
pub fn validate_draft<V>(
    draft: ScheduleEntryDraft,
    timetable: &V,
) -> Result<ScheduleEntry, ConflictReason>
where
    V: TimetableView + ?Sized,
{
    let entry = draft.into_entry()?;
    validate(&entry, timetable)?;
    Ok(entry)
}
