use crate::calendar::is_teaching_day;
use crate::entry::ScheduleEntry;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone)]
pub struct EntryValidationError {
    message: String,
}

impl EntryValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EntryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EntryValidationError {}

fn require_identifier(entry_id: &str, field: &str, value: &str) -> Result<(), EntryValidationError> {
    if value.trim().is_empty() {
        return Err(EntryValidationError::new(format!(
            "entry {entry_id} requires a non-empty {field}"
        )));
    }
    Ok(())
}

pub fn validate_entry(entry: &ScheduleEntry) -> Result<(), EntryValidationError> {
    if entry.id.trim().is_empty() {
        return Err(EntryValidationError::new("entry requires a non-empty id"));
    }
    let id = entry.id.as_str();
    if !is_teaching_day(entry.day) {
        return Err(EntryValidationError::new(format!(
            "entry {id} is scheduled on {}, outside the Monday-Saturday week",
            entry.day
        )));
    }
    require_identifier(id, "course code", &entry.course.code)?;
    require_identifier(id, "instructor id", &entry.instructor.id)?;
    require_identifier(id, "room id", &entry.room.id)?;
    require_identifier(id, "group id", &entry.group.id)?;
    if entry.group.size == 0 {
        return Err(EntryValidationError::new(format!(
            "entry {id} group '{}' has size 0",
            entry.group.id
        )));
    }
    Ok(())
}

pub fn validate_entry_collection(entries: &[ScheduleEntry]) -> Result<(), EntryValidationError> {
    let mut seen_ids = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen_ids.insert(entry.id.as_str()) {
            return Err(EntryValidationError::new(format!(
                "duplicate entry id {}",
                entry.id
            )));
        }
        validate_entry(entry)?;
    }
    Ok(())
}
