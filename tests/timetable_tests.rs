use chrono::Weekday;
use timetable_tool::{
    ConflictFinding, ConflictReason, Course, CourseType, Group, Instructor, Room, ScheduleEntry,
    TimeSlot, Timetable, TimetableError, TimetableMetadataError, WorkWeek,
};

fn entry(
    id: &str,
    day: Weekday,
    start: &str,
    end: &str,
    instructor: &str,
    room: &str,
    group: &str,
) -> ScheduleEntry {
    ScheduleEntry::new(
        id,
        day,
        TimeSlot::parse(start, end).unwrap(),
        Course::new("MATH201", "Linear Algebra", CourseType::Theory3Credit),
        Instructor::new(instructor),
        Room::new(room, 40),
        Group::new(group, 35),
    )
}

#[test]
fn insert_rejects_conflicts_and_keeps_state() {
    let mut timetable = Timetable::new();
    timetable
        .insert(entry("e1", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"))
        .expect("insert e1");
    let revision = timetable.revision();

    let err = timetable
        .insert(entry("e2", Weekday::Mon, "10:00", "11:30", "I2", "R1", "G2"))
        .unwrap_err();
    assert!(matches!(
        err,
        TimetableError::Rejected(ConflictReason::RoomConflict)
    ));
    assert_eq!(timetable.len(), 1);
    assert_eq!(timetable.revision(), revision);
    assert!(!timetable.contains("e2"));
}

#[test]
fn duplicate_id_is_refused() {
    let mut timetable = Timetable::new();
    timetable
        .insert(entry("e1", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();
    let err = timetable
        .insert(entry("e1", Weekday::Tue, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap_err();
    assert!(matches!(err, TimetableError::DuplicateId(id) if id == "e1"));
}

#[test]
fn replace_ignores_previous_version_and_reindexes() {
    let mut timetable = Timetable::new();
    timetable
        .insert(entry("e1", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();

    let previous = timetable
        .replace(entry("e1", Weekday::Mon, "10:00", "11:30", "I1", "R1", "G1"))
        .expect("shift within own slot");
    assert_eq!(previous.slot.start().to_string(), "09:00");
    assert_eq!(timetable.get("e1").unwrap().slot.start().to_string(), "10:00");

    // The old 09:00 window is free again.
    timetable
        .insert(entry("e2", Weekday::Mon, "08:30", "10:00", "I1", "R1", "G1"))
        .expect("old window released");

    let err = timetable
        .replace(entry("missing", Weekday::Mon, "13:00", "14:00", "I1", "R1", "G1"))
        .unwrap_err();
    assert!(matches!(err, TimetableError::NotFound(_)));
}

#[test]
fn remove_releases_resources() {
    let mut timetable = Timetable::new();
    timetable
        .insert(entry("e1", Weekday::Wed, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();
    assert!(timetable.remove("e1").is_some());
    assert!(timetable.remove("e1").is_none());
    assert!(timetable.is_empty());
    timetable
        .insert(entry("e2", Weekday::Wed, "09:00", "10:30", "I1", "R1", "G1"))
        .expect("slot free after removal");
}

#[test]
fn stale_revision_is_detected() {
    let mut timetable = Timetable::new();
    let seen = timetable.revision();
    timetable
        .insert(entry("e1", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();

    let err = timetable
        .insert_if_unchanged(
            entry("e2", Weekday::Tue, "09:00", "10:30", "I1", "R1", "G1"),
            seen,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TimetableError::StaleRevision { expected, actual } if expected == seen && actual == seen + 1
    ));

    let current = timetable.revision();
    timetable
        .insert_if_unchanged(
            entry("e2", Weekday::Tue, "09:00", "10:30", "I1", "R1", "G1"),
            current,
        )
        .expect("fresh revision accepted");
    assert!(matches!(
        timetable.replace_if_unchanged(
            entry("e2", Weekday::Tue, "11:00", "12:30", "I1", "R1", "G1"),
            current,
        ),
        Err(TimetableError::StaleRevision { .. })
    ));
}

#[test]
fn entries_are_ordered_by_day_then_start() {
    let mut timetable = Timetable::new();
    timetable
        .insert(entry("late", Weekday::Tue, "14:00", "15:30", "I1", "R1", "G1"))
        .unwrap();
    timetable
        .insert(entry("early", Weekday::Tue, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();
    timetable
        .insert(entry("monday", Weekday::Mon, "16:00", "17:00", "I1", "R1", "G1"))
        .unwrap();
    let ids: Vec<&str> = timetable.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["monday", "early", "late"]);
}

#[test]
fn audit_reports_pairs_and_clusters() {
    let mut clean = Timetable::new();
    assert!(clean.audit().is_empty());
    assert!(clean.conflict_clusters().is_empty());
    clean
        .insert(entry("solo", Weekday::Mon, "09:00", "10:30", "I9", "R9", "G9"))
        .unwrap();
    assert!(clean.audit().is_empty());

    // Rebuild from a list that already contains double-bookings.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conflicted.json");
    let snapshot = serde_json::json!({
        "metadata": serde_json::to_value(clean.metadata()).unwrap(),
        "entries": [
            entry("a", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"),
            entry("b", Weekday::Mon, "10:00", "11:30", "I2", "R1", "G2"),
            entry("c", Weekday::Mon, "11:00", "12:30", "I2", "R3", "G3"),
            entry("d", Weekday::Tue, "09:00", "10:30", "I4", "R4", "G4"),
        ],
    });
    std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();
    let timetable = timetable_tool::load_timetable_from_json(&path).expect("load conflicted");

    assert_eq!(
        timetable.audit(),
        vec![
            ConflictFinding {
                reason: ConflictReason::RoomConflict,
                first: "a".into(),
                second: Some("b".into()),
            },
            ConflictFinding {
                reason: ConflictReason::InstructorConflict,
                first: "b".into(),
                second: Some("c".into()),
            },
        ]
    );
    assert_eq!(
        timetable.conflict_clusters(),
        vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]
    );
}

#[test]
fn summary_groups_minutes_by_room_instructor_and_day() {
    let mut timetable = Timetable::new();
    timetable
        .insert(entry("e1", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();
    timetable
        .insert(entry("e2", Weekday::Mon, "11:00", "13:00", "I2", "R1", "G2"))
        .unwrap();
    timetable
        .insert(entry("e3", Weekday::Sat, "09:00", "12:00", "I1", "R2", "G1"))
        .unwrap();

    let summary = timetable.summary().expect("summary");
    assert_eq!(summary.entry_count, 3);

    let r1 = summary.rooms.iter().find(|l| l.id == "R1").unwrap();
    assert_eq!((r1.sessions, r1.minutes), (2, 210));
    let i1 = summary.instructors.iter().find(|l| l.id == "I1").unwrap();
    assert_eq!((i1.sessions, i1.minutes), (2, 270));

    let days: Vec<&str> = summary.days.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(days, vec!["Mon", "Sat"]);
    assert!(summary.to_cli_summary().starts_with("entries=3"));

    let df = timetable.dataframe().unwrap();
    assert_eq!(df.height(), 3);
    assert_eq!(df.width(), 11);
}

#[test]
fn metadata_updates_are_validated() {
    let mut timetable = Timetable::new();
    timetable.set_name("CS Fall Timetable").unwrap();
    timetable.set_semester(3).unwrap();
    assert_eq!(timetable.metadata().semester_label(), "3rd Semester");

    assert_eq!(
        timetable.set_semester(13),
        Err(TimetableMetadataError::SemesterOutOfRange(13))
    );
    assert_eq!(timetable.set_name("   "), Err(TimetableMetadataError::BlankName));
    assert_eq!(timetable.metadata().name, "CS Fall Timetable");
    assert_eq!(timetable.metadata().semester, 3);
}

#[test]
fn revision_tracks_entry_changes_only() {
    let mut timetable = Timetable::new();
    let start = timetable.revision();
    timetable.set_name("CS Fall").unwrap();
    timetable.set_semester(4).unwrap();
    timetable.set_week(WorkWeek::default());
    assert_eq!(timetable.revision(), start);

    timetable
        .insert(entry("e1", Weekday::Mon, "09:00", "10:30", "I1", "R1", "G1"))
        .unwrap();
    timetable
        .replace(entry("e1", Weekday::Mon, "11:00", "12:30", "I1", "R1", "G1"))
        .unwrap();
    timetable.remove("e1").unwrap();
    assert_eq!(timetable.revision(), start + 3);
}
