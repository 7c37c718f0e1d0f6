use super::{PersistenceError, PersistenceResult, TimetableStore};
use crate::calendar::{WorkWeek, WorkWeekConfig};
use crate::entry::ScheduleEntry;
use crate::metadata::TimetableMetadata;
use crate::timetable::Timetable;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Mutex;

pub struct SqliteTimetableStore {
    connection: Mutex<Connection>,
}

impl SqliteTimetableStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS timetable_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                metadata_json TEXT NOT NULL,
                week_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                entry_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn save_metadata(
        &self,
        tx: &rusqlite::Transaction,
        timetable: &Timetable,
    ) -> PersistenceResult<()> {
        let metadata_json = serde_json::to_string(timetable.metadata())?;
        let week_json = serde_json::to_string(&timetable.week_config())?;
        tx.execute("DELETE FROM timetable_metadata", [])?;
        tx.execute(
            "INSERT INTO timetable_metadata (id, metadata_json, week_json) VALUES (1, ?1, ?2)",
            params![metadata_json, week_json],
        )?;
        Ok(())
    }

    fn save_entries(&self, tx: &rusqlite::Transaction, timetable: &Timetable) -> PersistenceResult<()> {
        tx.execute("DELETE FROM entries", [])?;
        let mut stmt = tx.prepare("INSERT INTO entries (id, entry_json) VALUES (?1, ?2)")?;
        for entry in timetable.entries() {
            let json = serde_json::to_string(entry)?;
            stmt.execute(params![entry.id, json])?;
        }
        Ok(())
    }
}

impl TimetableStore for SqliteTimetableStore {
    fn save_timetable(&self, timetable: &Timetable) -> PersistenceResult<()> {
        super::validate_timetable(timetable)?;
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;
        self.save_metadata(&tx, timetable)?;
        self.save_entries(&tx, timetable)?;
        tx.commit()?;
        Ok(())
    }

    fn load_timetable(&self) -> PersistenceResult<Option<Timetable>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");

        let mut stmt =
            conn.prepare("SELECT metadata_json, week_json FROM timetable_metadata WHERE id = 1")?;
        let row: Option<(String, String)> = stmt
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((metadata_json, week_json)) = row else {
            return Ok(None);
        };

        let metadata: TimetableMetadata = serde_json::from_str(&metadata_json)?;
        let week_config: WorkWeekConfig = serde_json::from_str(&week_json)?;
        let week = WorkWeek::from_config(&week_config)
            .map_err(|err| PersistenceError::InvalidData(format!("invalid work week: {err}")))?;

        let mut stmt = conn.prepare("SELECT entry_json FROM entries ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for json in rows {
            let json = json?;
            let entry: ScheduleEntry = serde_json::from_str(&json)?;
            entries.push(entry);
        }

        super::rebuild_timetable(metadata, week, entries).map(Some)
    }
}
