use chrono::Weekday;
use polars::prelude::{AnyValue, DataFrame};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use timetable_tool::{
    ConflictReason, Course, CourseType, GenerationRequest, Group, Instructor, Room,
    ScheduleEntryDraft, SlotPosition, TimeOfDay, TimeSlot, Timetable, TimetableMetadataError,
    WorkWeek, WorkWeekConfig, conflict, generate, load_timetable_from_csv,
    load_timetable_from_json, save_timetable_to_csv,
    save_timetable_to_json,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        rows.push(
            columns
                .iter()
                .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
                .collect(),
        );
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn show(timetable: &Timetable) {
    match timetable.dataframe() {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error rendering timetable: {}", e),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show current timetable\n  add <id> <day> <start> <end> <course> <instructor> <room> <capacity> <group> <size>\n                                     Validate and commit an entry (times as HH:MM)\n  check <same args as add>           Validate without committing\n  delete <id>                        Remove an entry\n  unavail instructor|room <id> <day> <start> <end>\n                                     Declare a busy window for later entries\n  audit                              List every conflict in the timetable\n  summary                            Show room/instructor/day load\n  next <day> <HH:MM> <minutes>       Next slot position after a class\n  generate <json_path>               Place course sessions from a request file\n  meta show                          Show timetable metadata\n  meta name <text...>                Update timetable name\n  meta dept <text...>                Update department\n  meta semester <n>                  Update semester (1-12)\n  meta section <text>                Update section\n  week show                          Display the work week\n  week default                       Reset to Mon-Sat, 09:00-17:00\n  week set <json_path>               Load work week config from JSON file\n  week save <json_path>              Save work week config to JSON file\n  save <json|csv> <path>             Persist timetable to disk\n  load <json|csv> <path>             Load timetable from disk\n  quit|exit                          Exit"
    );
}

fn print_metadata(timetable: &Timetable) {
    let metadata = timetable.metadata();
    println!("Timetable name : {}", metadata.name);
    println!("Department     : {}", metadata.department);
    println!("Program        : {}", metadata.program);
    println!("Semester       : {}", metadata.semester_label());
    println!("Section        : {}", metadata.section);
}

fn print_week(timetable: &Timetable) {
    let week = timetable.week();
    let days = week
        .working_days()
        .iter()
        .map(|wd| wd.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Working days   : {}", days);
    println!("Daily window   : {}", week.window());
}

fn report_metadata_result(result: Result<(), TimetableMetadataError>, timetable: &Timetable) {
    match result {
        Ok(_) => {
            println!("Metadata updated.");
            print_metadata(timetable);
        }
        Err(e) => println!("Metadata update error: {}", e),
    }
}

/// Resource registries so declared busy windows follow an instructor or
/// room into every entry added afterwards.
#[derive(Default)]
struct Registry {
    instructors: HashMap<String, Instructor>,
    rooms: HashMap<String, Room>,
}

impl Registry {
    fn draft_from_args(&self, args: &[&str]) -> Option<ScheduleEntryDraft> {
        let [id, day, start, end, course, instructor, room, capacity, group, size] = args else {
            return None;
        };
        let capacity: u32 = capacity.parse().ok()?;
        let size: u32 = size.parse().ok()?;

        let mut course = Course::new(*course, *course, CourseType::Theory3Credit);
        if let Ok(slot) = TimeSlot::parse(start, end) {
            course.duration_minutes = slot.duration_minutes();
        }
        let instructor = self
            .instructors
            .get(*instructor)
            .cloned()
            .unwrap_or_else(|| Instructor::new(*instructor));
        let mut room = self
            .rooms
            .get(*room)
            .cloned()
            .unwrap_or_else(|| Room::new(*room, capacity));
        room.capacity = capacity;

        Some(ScheduleEntryDraft {
            id: Some(id.to_string()),
            day: day.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            course,
            instructor,
            room,
            group: Group::new(*group, size),
        })
    }

    fn declare_busy(&mut self, kind: &str, id: &str, day: Weekday, slot: TimeSlot) -> bool {
        match kind {
            "instructor" => {
                self.instructors
                    .entry(id.to_string())
                    .or_insert_with(|| Instructor::new(id))
                    .add_unavailability(day, slot);
                true
            }
            "room" => {
                self.rooms
                    .entry(id.to_string())
                    .or_insert_with(|| Room::new(id, 0))
                    .add_busy(day, slot);
                true
            }
            _ => false,
        }
    }
}

const ADD_USAGE: &str =
    "Usage: add <id> <day> <start> <end> <course> <instructor> <room> <capacity> <group> <size>";

fn rejection_message(reason: ConflictReason) -> String {
    format!("Rejected ({}): {}", reason.as_str(), reason)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut timetable = Timetable::new();
    let mut registry = Registry::default();

    println!("Timetable Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => show(&timetable),
            "add" | "check" => {
                let args: Vec<&str> = parts.collect();
                let Some(draft) = registry.draft_from_args(&args) else {
                    println!("{}", ADD_USAGE.replacen("add", cmd, 1));
                    continue;
                };
                let entry = match conflict::validate_draft(draft, &timetable) {
                    Ok(entry) => entry,
                    Err(reason) => {
                        warn!(command = cmd, reason = reason.as_str(), "candidate rejected");
                        println!("{}", rejection_message(reason));
                        continue;
                    }
                };
                if cmd == "check" {
                    println!("Entry {} is valid.", entry.id);
                    continue;
                }
                let id = entry.id.clone();
                match timetable.insert(entry) {
                    Ok(_) => {
                        info!(entry_id = %id, "entry committed");
                        println!("Entry {} added.", id);
                        show(&timetable);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "delete" => match parts.next() {
                Some(id) => match timetable.remove(id) {
                    Some(_) => {
                        println!("Deleted entry {id}.");
                        show(&timetable);
                    }
                    None => println!("Entry {id} not found."),
                },
                None => println!("Usage: delete <id>"),
            },
            "unavail" => {
                let args: Vec<&str> = parts.collect();
                let [kind, id, day, start, end] = args.as_slice() else {
                    println!("Usage: unavail instructor|room <id> <day> <start> <end>");
                    continue;
                };
                let day = match day.parse::<Weekday>() {
                    Ok(d) => d,
                    Err(_) => {
                        println!("Invalid day (Mon..Sat)");
                        continue;
                    }
                };
                let slot = match TimeSlot::parse(start, end) {
                    Ok(s) => s,
                    Err(e) => {
                        println!("Invalid slot: {}", e);
                        continue;
                    }
                };
                if registry.declare_busy(kind, id, day, slot) {
                    println!("{} {} unavailable {} {}.", kind, id, day, slot);
                } else {
                    println!("Usage: unavail instructor|room <id> <day> <start> <end>");
                }
            }
            "audit" => {
                let findings = timetable.audit();
                if findings.is_empty() {
                    println!("No conflicts found.");
                    continue;
                }
                for finding in &findings {
                    match &finding.second {
                        Some(other) => println!(
                            "{}: {} <-> {}",
                            finding.reason.as_str(),
                            finding.first,
                            other
                        ),
                        None => println!("{}: {}", finding.reason.as_str(), finding.first),
                    }
                }
                for cluster in timetable.conflict_clusters() {
                    println!("cluster: {}", cluster.join(", "));
                }
            }
            "summary" => match timetable.summary() {
                Ok(summary) => println!("Summary ({})", summary.to_cli_summary()),
                Err(e) => println!("Summary error: {}", e),
            },
            "next" => {
                let day_s = parts.next();
                let time_s = parts.next();
                let dur_s = parts.next();
                match (day_s, time_s, dur_s) {
                    (Some(day_s), Some(time_s), Some(dur_s)) => {
                        let day = match day_s.parse::<Weekday>() {
                            Ok(d) => d,
                            Err(_) => {
                                println!("Invalid day (Mon..Sat)");
                                continue;
                            }
                        };
                        let time = match time_s.parse::<TimeOfDay>() {
                            Ok(t) => t,
                            Err(e) => {
                                println!("{}", e);
                                continue;
                            }
                        };
                        let minutes: u16 = match dur_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid duration (minutes)");
                                continue;
                            }
                        };
                        match timetable.week().next_slot(SlotPosition::new(day, time), minutes) {
                            Some(next) => println!("Next slot: {}", next),
                            None => println!("No more slots this week."),
                        }
                    }
                    _ => println!("Usage: next <day> <HH:MM> <minutes>"),
                }
            }
            "generate" => {
                let Some(path) = parts.next() else {
                    println!("Usage: generate <json_path>");
                    continue;
                };
                let request = match fs::read_to_string(path) {
                    Ok(contents) => match serde_json::from_str::<GenerationRequest>(&contents) {
                        Ok(request) => request,
                        Err(e) => {
                            println!("Invalid generation request: {}", e);
                            continue;
                        }
                    },
                    Err(e) => {
                        println!("Error reading {}: {}", path, e);
                        continue;
                    }
                };
                let report = generate(&mut timetable, &request);
                info!(
                    placed = report.placed.len(),
                    unplaced = report.unplaced.len(),
                    "timetable generated"
                );
                println!("Generated ({}).", report.to_cli_summary());
                for session in &report.unplaced {
                    println!(
                        "Unplaced: {} ({}) session {}: {}",
                        session.course, session.group, session.session, session.reason
                    );
                }
                show(&timetable);
            }
            "meta" => match parts.next() {
                Some("show") | None => print_metadata(&timetable),
                Some("name") => {
                    let rest: Vec<&str> = parts.collect();
                    if rest.is_empty() {
                        println!("Usage: meta name <text...>");
                        continue;
                    }
                    let result = timetable.set_name(rest.join(" "));
                    report_metadata_result(result, &timetable);
                }
                Some("dept") => {
                    let rest: Vec<&str> = parts.collect();
                    if rest.is_empty() {
                        println!("Usage: meta dept <text...>");
                        continue;
                    }
                    timetable.set_department(rest.join(" "));
                    report_metadata_result(Ok(()), &timetable);
                }
                Some("semester") => match parts.next().map(str::parse::<u8>) {
                    Some(Ok(semester)) => {
                        let result = timetable.set_semester(semester);
                        report_metadata_result(result, &timetable);
                    }
                    _ => println!("Usage: meta semester <1-12>"),
                },
                Some("section") => match parts.next() {
                    Some(section) => {
                        timetable.set_section(section);
                        report_metadata_result(Ok(()), &timetable);
                    }
                    None => println!("Usage: meta section <text>"),
                },
                Some(other) => {
                    println!("Unknown meta command '{}'.", other);
                    println!("Usage: meta show|name|dept|semester|section ...");
                }
            },
            "week" => match parts.next() {
                Some("show") | None => print_week(&timetable),
                Some("default") => {
                    timetable.set_week(WorkWeek::default());
                    println!("Work week reset to default.");
                    print_week(&timetable);
                }
                Some("set") => match parts.next() {
                    Some(path) => match fs::read_to_string(path) {
                        Ok(contents) => match serde_json::from_str::<WorkWeekConfig>(&contents) {
                            Ok(config) => match timetable.set_week_from_config(&config) {
                                Ok(_) => {
                                    println!("Work week updated from {}.", path);
                                    print_week(&timetable);
                                }
                                Err(e) => println!("Error applying work week: {}", e),
                            },
                            Err(e) => println!("Invalid work week JSON: {}", e),
                        },
                        Err(e) => println!("Error reading {}: {}", path, e),
                    },
                    None => println!("Usage: week set <json_path>"),
                },
                Some("save") => match parts.next() {
                    Some(path) => match serde_json::to_string_pretty(&timetable.week_config()) {
                        Ok(json) => match fs::write(path, json) {
                            Ok(_) => println!("Work week saved to {}.", path),
                            Err(e) => println!("Error writing {}: {}", path, e),
                        },
                        Err(e) => println!("Error serializing work week: {}", e),
                    },
                    None => println!("Usage: week save <json_path>"),
                },
                Some(other) => {
                    println!("Unknown week command '{}'.", other);
                    println!("Usage: week show|default|set <json_path>|save <json_path>");
                }
            },
            "save" => {
                let fmt = parts.next();
                let path = parts.next();
                let result = match (fmt, path) {
                    (Some("json"), Some(path)) => save_timetable_to_json(&timetable, path),
                    (Some("csv"), Some(path)) => save_timetable_to_csv(&timetable, path),
                    _ => {
                        println!("Usage: save <json|csv> <path>");
                        continue;
                    }
                };
                match result {
                    Ok(_) => println!("Timetable saved to {}.", path.unwrap_or_default()),
                    Err(e) => println!("Error saving timetable: {}", e),
                }
            }
            "load" => {
                let fmt = parts.next();
                let path = parts.next();
                let result = match (fmt, path) {
                    (Some("json"), Some(path)) => load_timetable_from_json(path),
                    (Some("csv"), Some(path)) => load_timetable_from_csv(path),
                    _ => {
                        println!("Usage: load <json|csv> <path>");
                        continue;
                    }
                };
                match result {
                    Ok(loaded) => {
                        timetable = loaded;
                        println!("Timetable loaded from {}.", path.unwrap_or_default());
                        show(&timetable);
                    }
                    Err(e) => println!("Error loading timetable: {}", e),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
