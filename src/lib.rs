pub mod calendar;
pub mod conflict;
pub mod entry;
pub(crate) mod entry_validation;
pub mod generator;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod persistence;
pub mod time;
pub mod timetable;

pub use calendar::{CalendarError, SlotPosition, WorkWeek, WorkWeekConfig};
pub use conflict::{ConflictReason, ResourceKind, TimetableView, ValidationOutcome, validate, validate_draft};
pub use entry::{
    AvailabilityMap, Course, CourseType, Group, Instructor, Room, RoomType, ScheduleEntry,
    ScheduleEntryDraft,
};
pub use generator::{
    CourseRequest, GenerationReport, GenerationRequest, Generator, UnplacedReason, UnplacedSession,
    generate,
};
pub use metadata::{TimetableMetadata, TimetableMetadataError};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteTimetableStore;
pub use persistence::{
    PersistenceError, TimetableStore, load_timetable_from_csv, load_timetable_from_json,
    save_timetable_to_csv, save_timetable_to_json, validate_entries, validate_timetable,
};
pub use time::{TimeError, TimeOfDay, TimeSlot};
pub use timetable::{ConflictFinding, ResourceLoad, Timetable, TimetableError, TimetableSummary};
