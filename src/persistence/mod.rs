use crate::entry::ScheduleEntry;
use crate::entry_validation;
use crate::metadata::TimetableMetadata;
use crate::timetable::{Timetable, TimetableError};
use crate::calendar::WorkWeek;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<TimetableError> for PersistenceError {
    fn from(value: TimetableError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait TimetableStore {
    fn save_timetable(&self, timetable: &Timetable) -> PersistenceResult<()>;
    fn load_timetable(&self) -> PersistenceResult<Option<Timetable>>;
}

pub fn validate_entries(entries: &[ScheduleEntry]) -> PersistenceResult<()> {
    entry_validation::validate_entry_collection(entries)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub fn validate_timetable(timetable: &Timetable) -> PersistenceResult<()> {
    let entries: Vec<ScheduleEntry> = timetable.entries().into_iter().cloned().collect();
    validate_entries(&entries)
}

/// Rebuild an aggregate from stored parts. Entries skip the placement rules
/// so conflicts already in storage stay visible to `Timetable::audit`.
pub(crate) fn rebuild_timetable(
    metadata: TimetableMetadata,
    week: WorkWeek,
    entries: Vec<ScheduleEntry>,
) -> PersistenceResult<Timetable> {
    validate_entries(&entries)?;
    metadata
        .validate()
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
    let mut timetable = Timetable::from_parts(metadata, week);
    for entry in entries {
        timetable.insert_unchecked(entry)?;
    }
    Ok(timetable)
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_timetable_from_csv, load_timetable_from_json, save_timetable_to_csv,
    save_timetable_to_json,
};
