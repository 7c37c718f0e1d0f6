use super::{PersistenceError, PersistenceResult};
use crate::{
    calendar::{WorkWeek, WorkWeekConfig},
    entry::{AvailabilityMap, Course, CourseType, Group, Instructor, Room, RoomType, ScheduleEntry},
    metadata::TimetableMetadata,
    time::TimeSlot,
    timetable::Timetable,
};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct TimetableSnapshot {
    metadata: TimetableMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    week: Option<WorkWeekConfig>,
    entries: Vec<ScheduleEntry>,
}

impl TimetableSnapshot {
    fn from_timetable(timetable: &Timetable) -> PersistenceResult<Self> {
        let entries: Vec<ScheduleEntry> = timetable.entries().into_iter().cloned().collect();
        super::validate_entries(&entries)?;
        Ok(Self {
            metadata: timetable.metadata().clone(),
            week: Some(timetable.week_config()),
            entries,
        })
    }

    fn into_timetable(self) -> PersistenceResult<Timetable> {
        let week = week_from_config(self.week)?;
        super::rebuild_timetable(self.metadata, week, self.entries)
    }
}

fn week_from_config(config: Option<WorkWeekConfig>) -> PersistenceResult<WorkWeek> {
    match config {
        Some(config) => WorkWeek::from_config(&config)
            .map_err(|err| PersistenceError::InvalidData(format!("invalid work week: {err}"))),
        None => Ok(WorkWeek::default()),
    }
}

pub fn save_timetable_to_json<P: AsRef<Path>>(
    timetable: &Timetable,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = TimetableSnapshot::from_timetable(timetable)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_timetable_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Timetable> {
    let file = File::open(path)?;
    let snapshot: TimetableSnapshot = serde_json::from_reader(file)?;
    snapshot.into_timetable()
}

#[derive(Default, Serialize, Deserialize)]
struct EntryCsvRecord {
    id: String,
    day: String,
    start: String,
    end: String,
    course_code: String,
    course_name: String,
    course_type: String,
    course_duration_minutes: String,
    instructor_id: String,
    instructor_name: String,
    instructor_unavailability: String,
    room_id: String,
    room_capacity: String,
    room_type: String,
    room_busy: String,
    group_id: String,
    group_size: String,
    #[serde(default)]
    metadata_json: String,
    #[serde(default)]
    week_json: String,
}

impl From<&ScheduleEntry> for EntryCsvRecord {
    fn from(entry: &ScheduleEntry) -> Self {
        let mut record = EntryCsvRecord::default();
        record.id = entry.id.clone();
        record.day = entry.day.to_string();
        record.start = entry.slot.start().to_string();
        record.end = entry.slot.end().to_string();
        record.course_code = entry.course.code.clone();
        record.course_name = entry.course.name.clone();
        record.course_type = entry.course.course_type.as_str().to_string();
        record.course_duration_minutes = entry.course.duration_minutes.to_string();
        record.instructor_id = entry.instructor.id.clone();
        record.instructor_name = entry.instructor.name.clone().unwrap_or_default();
        record.instructor_unavailability = format_availability(entry.instructor.unavailability.as_ref());
        record.room_id = entry.room.id.clone();
        record.room_capacity = entry.room.capacity.to_string();
        record.room_type = match entry.room.room_type {
            RoomType::Classroom => "classroom".to_string(),
            RoomType::Lab => "lab".to_string(),
        };
        record.room_busy = format_availability(entry.room.busy.as_ref());
        record.group_id = entry.group.id.clone();
        record.group_size = entry.group.size.to_string();
        record
    }
}

impl EntryCsvRecord {
    fn metadata_row(timetable: &Timetable) -> PersistenceResult<Self> {
        let mut record = EntryCsvRecord::default();
        record.id = "__metadata__".to_string();
        record.metadata_json = serde_json::to_string(timetable.metadata())?;
        record.week_json = serde_json::to_string(&timetable.week_config())?;
        Ok(record)
    }

    fn is_metadata_row(&self) -> bool {
        !self.metadata_json.trim().is_empty()
    }

    fn into_entry(self) -> PersistenceResult<ScheduleEntry> {
        if self.is_metadata_row() {
            return Err(PersistenceError::InvalidData(
                "metadata row cannot be converted to an entry".into(),
            ));
        }
        let day = self.day.trim().parse::<Weekday>().map_err(|_| {
            PersistenceError::InvalidData(format!("entry {} has invalid day '{}'", self.id, self.day))
        })?;
        let slot = TimeSlot::parse(self.start.trim(), self.end.trim()).map_err(|err| {
            PersistenceError::InvalidData(format!("entry {} has invalid slot: {err}", self.id))
        })?;
        let course_type = CourseType::from_str(&self.course_type).ok_or_else(|| {
            PersistenceError::InvalidData(format!("invalid course_type '{}'", self.course_type))
        })?;
        let room_type = match self.room_type.trim().to_ascii_lowercase().as_str() {
            "" | "classroom" => RoomType::Classroom,
            "lab" => RoomType::Lab,
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "invalid room_type '{other}'"
                )));
            }
        };

        let course = Course {
            code: self.course_code,
            name: self.course_name,
            course_type,
            duration_minutes: parse_number(&self.course_duration_minutes, "course_duration_minutes")?,
        };
        let instructor = Instructor {
            id: self.instructor_id,
            name: parse_string_option(self.instructor_name),
            unavailability: parse_availability(&self.instructor_unavailability)?,
        };
        let room = Room {
            id: self.room_id,
            capacity: parse_number(&self.room_capacity, "room_capacity")?,
            room_type,
            busy: parse_availability(&self.room_busy)?,
        };
        let group = Group {
            id: self.group_id,
            size: parse_number(&self.group_size, "group_size")?,
        };
        Ok(ScheduleEntry::new(self.id, day, slot, course, instructor, room, group))
    }
}

pub fn save_timetable_to_csv<P: AsRef<Path>>(timetable: &Timetable, path: P) -> PersistenceResult<()> {
    super::validate_timetable(timetable)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(EntryCsvRecord::metadata_row(timetable)?)?;
    for entry in timetable.entries() {
        writer.serialize(EntryCsvRecord::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_timetable_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Timetable> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut entries = Vec::new();
    let mut metadata: Option<TimetableMetadata> = None;
    let mut week_config: Option<WorkWeekConfig> = None;
    for record in reader.deserialize::<EntryCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if metadata.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            metadata = Some(serde_json::from_str(&record.metadata_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid metadata json: {err}"))
            })?);
            if !record.week_json.trim().is_empty() {
                week_config = Some(serde_json::from_str(&record.week_json).map_err(|err| {
                    PersistenceError::InvalidData(format!("invalid work week json: {err}"))
                })?);
            }
            continue;
        }
        entries.push(record.into_entry()?);
    }

    let week = week_from_config(week_config)?;
    super::rebuild_timetable(metadata.unwrap_or_default(), week, entries)
}

fn format_availability(map: Option<&AvailabilityMap>) -> String {
    map.and_then(|m| serde_json::to_string(m).ok())
        .unwrap_or_default()
}

fn parse_availability(input: &str) -> PersistenceResult<Option<AvailabilityMap>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<AvailabilityMap>(input)
        .map(Some)
        .map_err(|err| PersistenceError::InvalidData(format!("invalid availability map: {err}")))
}

fn parse_number<T: std::str::FromStr>(input: &str, field: &str) -> PersistenceResult<T>
where
    T::Err: std::fmt::Display,
{
    input
        .trim()
        .parse::<T>()
        .map_err(|e| PersistenceError::InvalidData(format!("invalid {field} '{input}': {e}")))
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
