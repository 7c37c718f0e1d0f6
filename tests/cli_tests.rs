#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

#[test]
fn cli_add_and_show_entry() {
    run_cli("add e1 Mon 09:00 10:30 CS101 I1 R101 50 G1 30\nshow\nquit\n")
        .success()
        .stdout(str_contains("Entry e1 added."))
        .stdout(str_contains("| e1 "));
}

#[test]
fn cli_reports_room_conflict() {
    run_cli(
        "add e1 Mon 09:00 10:30 CS101 I1 R101 50 G1 30\nadd e2 Mon 10:00 11:00 CS102 I2 R101 50 G2 30\nquit\n",
    )
    .success()
    .stdout(str_contains(
        "Rejected (room_conflict): Room is already scheduled for another class during this time slot",
    ));
}

#[test]
fn cli_accepts_touching_slots_and_checks_without_committing() {
    run_cli(
        "add e1 Mon 09:00 10:30 CS101 I1 R101 50 G1 30\ncheck e2 Mon 10:30 12:00 CS101 I1 R101 50 G1 30\ndelete e2\nquit\n",
    )
    .success()
    .stdout(str_contains("Entry e2 is valid."))
    .stdout(str_contains("Entry e2 not found."));
}

#[test]
fn cli_applies_declared_unavailability() {
    run_cli(
        "unavail instructor I1 Tue 13:00 14:00\nadd e1 Tue 13:30 14:30 CS101 I1 R101 50 G1 30\nquit\n",
    )
    .success()
    .stdout(str_contains("Rejected (instructor_unavailable)"));
}

#[test]
fn cli_rejects_capacity_and_bad_times() {
    run_cli(
        "add e1 Mon 09:00 10:30 CS101 I1 R101 20 G1 25\nadd e2 Mon 9:00 10:30 CS101 I1 R101 50 G1 25\nquit\n",
    )
    .success()
    .stdout(str_contains("Rejected (capacity_exceeded)"))
    .stdout(str_contains("Rejected (invalid_time_format)"));
}

#[test]
fn cli_delete_command_removes_entry() {
    run_cli("add e1 Wed 09:00 10:30 CS101 I1 R101 50 G1 30\ndelete e1\nquit\n")
        .success()
        .stdout(str_contains("Deleted entry e1."));
}

#[test]
fn cli_next_slot_rolls_over() {
    run_cli("next Mon 15:30 90\nnext Sat 16:00 90\nquit\n")
        .success()
        .stdout(str_contains("Next slot: Tue 09:00"))
        .stdout(str_contains("No more slots this week."));
}

#[test]
fn cli_reports_metadata_validation_errors() {
    run_cli("meta semester 14\nmeta semester 3\nquit\n")
        .success()
        .stdout(str_contains("Metadata update error: semester 14"))
        .stdout(str_contains("3rd Semester"));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "add keep Thu 09:00 10:30 CS101 I1 R101 50 G1 30\nsave json {}\nadd temp Thu 11:00 12:30 CS101 I1 R101 50 G1 30\nload json {}\nsummary\nquit\n",
        path, path
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(
        output.contains("Timetable loaded from"),
        "expected load confirmation in output, got: {output}"
    );
    assert!(
        output.contains("Summary (entries=1"),
        "expected single entry after reload, got: {output}"
    );
}

#[test]
fn cli_save_and_load_csv_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "meta name CS Spring\nadd keep Fri 09:00 10:30 CS101 I1 R101 50 G1 30\nsave csv {}\nload csv {}\nmeta show\naudit\nquit\n",
        path, path
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Timetable loaded from"))
        .stdout(str_contains("Timetable name : CS Spring"))
        .stdout(str_contains("No conflicts found."));
}

#[test]
fn cli_week_save_and_set() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    std::fs::write(
        tmp.path(),
        r#"{"working_days":["Mon","Tue","Wed"],"day_start":"08:00","day_end":"13:00"}"#,
    )
    .unwrap();
    let script = format!("week set {}\nnext Wed 12:00 60\nweek default\nweek show\nquit\n", path);
    run_cli(&script)
        .success()
        .stdout(str_contains("Working days   : Mon, Tue, Wed"))
        .stdout(str_contains("No more slots this week."))
        .stdout(str_contains("Daily window   : 09:00 - 17:00"));
}

#[test]
fn cli_show_prints_plain_cell_text() {
    let assert = run_cli("add e1 Mon 09:00 10:30 CS101 I1 R101 50 G1 30\nshow\nquit\n").success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("| e1 "), "got: {output}");
    assert!(output.contains("| Mon "), "got: {output}");
    assert!(!output.contains("\"e1\""), "string cells should not be quoted: {output}");
}

#[test]
fn cli_generate_reports_placed_and_unplaced_sessions() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    std::fs::write(
        tmp.path(),
        r#"{
            "rooms": [{ "id": "R101", "capacity": 40 }],
            "courses": [
                {
                    "course": { "code": "MA102", "name": "Calculus", "course_type": "2_credit_theory", "duration_minutes": 120 },
                    "instructor": { "id": "I1" },
                    "group": { "id": "G1", "size": 30 }
                },
                {
                    "course": { "code": "PH102L", "name": "Physics Lab", "course_type": "lab", "duration_minutes": 180 },
                    "instructor": { "id": "I2" },
                    "group": { "id": "G1", "size": 30 }
                }
            ]
        }"#,
    )
    .unwrap();
    let script = format!("generate {}\naudit\nquit\n", path);
    run_cli(&script)
        .success()
        .stdout(str_contains("Generated (placed=1, unplaced=1)."))
        .stdout(str_contains("Unplaced: PH102L (G1) session 1: no_suitable_room"))
        .stdout(str_contains("| MA102 "))
        .stdout(str_contains("No conflicts found."));
}
