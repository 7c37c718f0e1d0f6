use crate::calendar::{CalendarError, WorkWeek, WorkWeekConfig};
use crate::conflict::{self, ConflictReason, ResourceKind, TimetableView};
use crate::entry::ScheduleEntry;
use crate::graph::ConflictGraph;
use crate::metadata::{TimetableMetadata, TimetableMetadataError};
use chrono::Weekday;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug)]
pub enum TimetableError {
    Rejected(ConflictReason),
    DuplicateId(String),
    NotFound(String),
    StaleRevision { expected: u64, actual: u64 },
    Frame(PolarsError),
}

impl fmt::Display for TimetableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimetableError::Rejected(reason) => write!(f, "entry rejected: {reason}"),
            TimetableError::DuplicateId(id) => write!(f, "entry {id} already exists"),
            TimetableError::NotFound(id) => write!(f, "entry {id} not found"),
            TimetableError::StaleRevision { expected, actual } => write!(
                f,
                "timetable changed since revision {expected} (now at {actual}); reload and retry"
            ),
            TimetableError::Frame(err) => write!(f, "dataframe error: {err}"),
        }
    }
}

impl std::error::Error for TimetableError {}

impl From<ConflictReason> for TimetableError {
    fn from(value: ConflictReason) -> Self {
        Self::Rejected(value)
    }
}

impl From<PolarsError> for TimetableError {
    fn from(value: PolarsError) -> Self {
        Self::Frame(value)
    }
}

/// A rule violation found among committed entries. `second` is set for
/// double-bookings and names the other entry of the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictFinding {
    pub reason: ConflictReason,
    pub first: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLoad {
    pub id: String,
    pub sessions: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableSummary {
    pub entry_count: usize,
    pub rooms: Vec<ResourceLoad>,
    pub instructors: Vec<ResourceLoad>,
    pub days: Vec<ResourceLoad>,
}

impl TimetableSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = vec![format!("entries={}", self.entry_count)];
        for day in &self.days {
            parts.push(format!("{}={}", day.id, day.sessions));
        }
        if let Some(busiest) = self.rooms.iter().max_by_key(|load| load.minutes) {
            parts.push(format!("busiest_room={} ({} min)", busiest.id, busiest.minutes));
        }
        parts.join(", ")
    }
}

/// Entry ids per `(resource kind, day)`, then per resource id.
#[derive(Debug, Clone, Default)]
struct BookingIndex {
    buckets: HashMap<(ResourceKind, Weekday), HashMap<String, Vec<String>>>,
}

impl BookingIndex {
    fn add(&mut self, entry: &ScheduleEntry) {
        for kind in ResourceKind::ALL {
            self.buckets
                .entry((kind, entry.day))
                .or_default()
                .entry(kind.id_of(entry).to_string())
                .or_default()
                .push(entry.id.clone());
        }
    }

    fn remove(&mut self, entry: &ScheduleEntry) {
        for kind in ResourceKind::ALL {
            let Some(by_resource) = self.buckets.get_mut(&(kind, entry.day)) else {
                continue;
            };
            let resource_id = kind.id_of(entry);
            if let Some(ids) = by_resource.get_mut(resource_id) {
                ids.retain(|id| id != &entry.id);
                if ids.is_empty() {
                    by_resource.remove(resource_id);
                }
            }
        }
    }

    fn ids(&self, kind: ResourceKind, id: &str, day: Weekday) -> &[String] {
        self.buckets
            .get(&(kind, day))
            .and_then(|by_resource| by_resource.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// In-memory snapshot of one timetable: committed entries plus the indexes
/// used to check new candidates against them.
#[derive(Debug, Clone)]
pub struct Timetable {
    metadata: TimetableMetadata,
    week: WorkWeek,
    entries: HashMap<String, ScheduleEntry>,
    index: BookingIndex,
    revision: u64,
}

impl Default for Timetable {
    fn default() -> Self {
        Self::new()
    }
}

impl TimetableView for Timetable {
    fn bookings(&self, kind: ResourceKind, id: &str, day: Weekday) -> Vec<&ScheduleEntry> {
        self.index
            .ids(kind, id, day)
            .iter()
            .filter_map(|entry_id| self.entries.get(entry_id))
            .collect()
    }
}

impl Timetable {
    pub(crate) fn from_parts(metadata: TimetableMetadata, week: WorkWeek) -> Self {
        Self {
            metadata,
            week,
            entries: HashMap::new(),
            index: BookingIndex::default(),
            revision: 0,
        }
    }

    pub fn new() -> Self {
        Self::from_parts(TimetableMetadata::default(), WorkWeek::default())
    }

    pub fn new_with_metadata(metadata: TimetableMetadata) -> Self {
        Self::from_parts(metadata, WorkWeek::default())
    }

    pub fn metadata(&self) -> &TimetableMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: TimetableMetadata) -> Result<(), TimetableMetadataError> {
        metadata.validate()?;
        self.metadata = metadata;
        Ok(())
    }

    fn update_metadata_with<F>(&mut self, mutator: F) -> Result<(), TimetableMetadataError>
    where
        F: FnOnce(&mut TimetableMetadata),
    {
        let mut metadata = self.metadata.clone();
        mutator(&mut metadata);
        self.set_metadata(metadata)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), TimetableMetadataError> {
        let name = name.into();
        self.update_metadata_with(|metadata| metadata.name = name)
    }

    pub fn set_department(&mut self, department: impl Into<String>) {
        self.metadata.department = department.into();
    }

    pub fn set_semester(&mut self, semester: u8) -> Result<(), TimetableMetadataError> {
        self.update_metadata_with(|metadata| metadata.semester = semester)
    }

    pub fn set_section(&mut self, section: impl Into<String>) {
        self.metadata.section = section.into();
    }

    pub fn week(&self) -> &WorkWeek {
        &self.week
    }

    pub fn week_config(&self) -> WorkWeekConfig {
        self.week.to_config()
    }

    pub fn set_week(&mut self, week: WorkWeek) {
        self.week = week;
    }

    pub fn set_week_from_config(&mut self, config: &WorkWeekConfig) -> Result<(), CalendarError> {
        self.week = WorkWeek::from_config(config)?;
        Ok(())
    }

    /// Bumped whenever the entry set changes (insert, replace, remove, clear).
    /// Metadata and work-week edits leave it alone. Callers compare it to
    /// detect a stale snapshot before committing.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ScheduleEntry> {
        self.entries.get(id)
    }

    /// Entries ordered by day, start time, then id.
    pub fn entries(&self) -> Vec<&ScheduleEntry> {
        let mut entries: Vec<&ScheduleEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.day
                .num_days_from_monday()
                .cmp(&b.day.num_days_from_monday())
                .then(a.slot.start().cmp(&b.slot.start()))
                .then(a.id.cmp(&b.id))
        });
        entries
    }

    /// Dry run: would `candidate` be accepted right now?
    pub fn check(&self, candidate: &ScheduleEntry) -> Result<(), ConflictReason> {
        conflict::validate(candidate, self)
    }

    pub fn insert(&mut self, entry: ScheduleEntry) -> Result<(), TimetableError> {
        if self.contains(&entry.id) {
            return Err(TimetableError::DuplicateId(entry.id));
        }
        self.check(&entry)?;
        self.commit(entry);
        Ok(())
    }

    /// Insert only if nothing was committed since `expected_revision` was read.
    pub fn insert_if_unchanged(
        &mut self,
        entry: ScheduleEntry,
        expected_revision: u64,
    ) -> Result<(), TimetableError> {
        self.ensure_revision(expected_revision)?;
        self.insert(entry)
    }

    /// Swap in a new version of an existing entry. The old version is ignored
    /// while checking, so moving an entry within its own slot is allowed.
    pub fn replace(&mut self, entry: ScheduleEntry) -> Result<ScheduleEntry, TimetableError> {
        if !self.contains(&entry.id) {
            return Err(TimetableError::NotFound(entry.id));
        }
        self.check(&entry)?;
        let previous = self.detach(&entry.id).ok_or_else(|| TimetableError::NotFound(entry.id.clone()))?;
        self.commit(entry);
        Ok(previous)
    }

    pub fn replace_if_unchanged(
        &mut self,
        entry: ScheduleEntry,
        expected_revision: u64,
    ) -> Result<ScheduleEntry, TimetableError> {
        self.ensure_revision(expected_revision)?;
        self.replace(entry)
    }

    pub fn remove(&mut self, id: &str) -> Option<ScheduleEntry> {
        let removed = self.detach(id)?;
        self.revision += 1;
        Some(removed)
    }

    /// Drop every entry, keeping metadata and the work week.
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.index = BookingIndex::default();
        self.revision += 1;
    }

    /// Add an entry without the placement rules. Used when rebuilding a
    /// stored snapshot so that stored conflicts survive and can be audited.
    pub(crate) fn insert_unchecked(&mut self, entry: ScheduleEntry) -> Result<(), TimetableError> {
        if self.contains(&entry.id) {
            return Err(TimetableError::DuplicateId(entry.id));
        }
        self.commit(entry);
        Ok(())
    }

    fn ensure_revision(&self, expected: u64) -> Result<(), TimetableError> {
        if self.revision != expected {
            return Err(TimetableError::StaleRevision {
                expected,
                actual: self.revision,
            });
        }
        Ok(())
    }

    fn commit(&mut self, entry: ScheduleEntry) {
        self.index.add(&entry);
        self.entries.insert(entry.id.clone(), entry);
        self.revision += 1;
    }

    fn detach(&mut self, id: &str) -> Option<ScheduleEntry> {
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry);
        Some(entry)
    }

    /// Every rule violation among committed entries, not just the first.
    /// Per-entry problems (availability, capacity) come with `second: None`;
    /// each double-booked pair is reported once per resource kind.
    pub fn audit(&self) -> Vec<ConflictFinding> {
        let mut findings = Vec::new();
        for entry in self.entries() {
            let own = conflict::check_availability(entry).and_then(|_| conflict::check_capacity(entry));
            if let Err(reason) = own {
                findings.push(ConflictFinding {
                    reason,
                    first: entry.id.clone(),
                    second: None,
                });
            }
        }

        for kind in ResourceKind::ALL {
            for ((bucket_kind, _), by_resource) in &self.index.buckets {
                if *bucket_kind != kind {
                    continue;
                }
                for ids in by_resource.values() {
                    let booked: Vec<&ScheduleEntry> =
                        ids.iter().filter_map(|id| self.entries.get(id)).collect();
                    for (i, a) in booked.iter().enumerate() {
                        for b in &booked[i + 1..] {
                            if a.clashes_with(b) {
                                let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
                                findings.push(ConflictFinding {
                                    reason: kind.conflict_reason(),
                                    first: first.id.clone(),
                                    second: Some(second.id.clone()),
                                });
                            }
                        }
                    }
                }
            }
        }

        findings.sort_by(|a, b| {
            a.first
                .cmp(&b.first)
                .then(a.second.cmp(&b.second))
                .then(a.reason.as_str().cmp(b.reason.as_str()))
        });
        findings
    }

    /// Entries tangled together through double-bookings.
    pub fn conflict_clusters(&self) -> Vec<Vec<String>> {
        ConflictGraph::build(&self.audit()).clusters()
    }

    /// One row per entry, in `entries()` order.
    pub fn dataframe(&self) -> PolarsResult<DataFrame> {
        let entries = self.entries();
        let mut ids = Vec::with_capacity(entries.len());
        let mut days = Vec::with_capacity(entries.len());
        let mut starts = Vec::with_capacity(entries.len());
        let mut ends = Vec::with_capacity(entries.len());
        let mut durations = Vec::with_capacity(entries.len());
        let mut courses = Vec::with_capacity(entries.len());
        let mut instructors = Vec::with_capacity(entries.len());
        let mut rooms = Vec::with_capacity(entries.len());
        let mut capacities = Vec::with_capacity(entries.len());
        let mut groups = Vec::with_capacity(entries.len());
        let mut group_sizes = Vec::with_capacity(entries.len());

        for entry in entries {
            ids.push(entry.id.clone());
            days.push(entry.day.to_string());
            starts.push(entry.slot.start().to_string());
            ends.push(entry.slot.end().to_string());
            durations.push(i64::from(entry.slot.duration_minutes()));
            courses.push(entry.course.code.clone());
            instructors.push(entry.instructor.id.clone());
            rooms.push(entry.room.id.clone());
            capacities.push(i64::from(entry.room.capacity));
            groups.push(entry.group.id.clone());
            group_sizes.push(i64::from(entry.group.size));
        }

        df!(
            "id" => ids,
            "day" => days,
            "start" => starts,
            "end" => ends,
            "duration_minutes" => durations,
            "course_code" => courses,
            "instructor_id" => instructors,
            "room_id" => rooms,
            "room_capacity" => capacities,
            "group_id" => groups,
            "group_size" => group_sizes
        )
    }

    pub fn summary(&self) -> Result<TimetableSummary, TimetableError> {
        if self.is_empty() {
            return Ok(TimetableSummary::default());
        }
        let df = self.dataframe()?;
        let mut days = Self::load_by(&df, "day")?;
        days.sort_by_key(|load| {
            load.id
                .parse::<Weekday>()
                .map(|day| day.num_days_from_monday())
                .unwrap_or(u32::MAX)
        });
        Ok(TimetableSummary {
            entry_count: df.height(),
            rooms: Self::load_by(&df, "room_id")?,
            instructors: Self::load_by(&df, "instructor_id")?,
            days,
        })
    }

    fn load_by(df: &DataFrame, key: &str) -> PolarsResult<Vec<ResourceLoad>> {
        let grouped = df
            .clone()
            .lazy()
            .group_by([col(key)])
            .agg([
                col("duration_minutes").sum().alias("minutes"),
                col("id").count().cast(DataType::Int64).alias("sessions"),
            ])
            .collect()?;

        let keys = grouped.column(key)?.str()?;
        let minutes = grouped.column("minutes")?.i64()?;
        let sessions = grouped.column("sessions")?.i64()?;

        let mut loads = Vec::with_capacity(grouped.height());
        for idx in 0..grouped.height() {
            if let Some(id) = keys.get(idx) {
                loads.push(ResourceLoad {
                    id: id.to_string(),
                    sessions: sessions.get(idx).unwrap_or(0),
                    minutes: minutes.get(idx).unwrap_or(0),
                });
            }
        }
        loads.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(loads)
    }
}
