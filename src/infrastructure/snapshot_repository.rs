use crate::domain::models::{parse_date_key, TimezoneList, ZoomLevel};
use crate::domain::schedule::ScheduleMap;
use crate::infrastructure::error::InfraError;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The subset of application state that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSnapshot {
    pub selected_date: NaiveDate,
    pub zoom_level: ZoomLevel,
    pub timezones: TimezoneList,
    pub schedules: ScheduleMap,
    pub work_duration: u32,
    pub break_duration: u32,
}

pub trait SnapshotRepository: Send + Sync {
    fn load(&self) -> Result<Option<LocalSnapshot>, InfraError>;
    fn save(&self, snapshot: &LocalSnapshot) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshotRepository {
    db_path: PathBuf,
}

impl SqliteSnapshotRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

struct SnapshotRow {
    selected_date: String,
    zoom_level: u32,
    timezones: String,
    schedules: String,
    work_duration: u32,
    break_duration: u32,
}

impl SnapshotRow {
    fn decode(self) -> Result<LocalSnapshot, InfraError> {
        let selected_date = parse_date_key(&self.selected_date).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid local_snapshot.selected_date: {error}"))
        })?;
        let zoom_level = ZoomLevel::try_from(self.zoom_level).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid local_snapshot.zoom_level: {error}"))
        })?;
        Ok(LocalSnapshot {
            selected_date,
            zoom_level,
            timezones: serde_json::from_str(&self.timezones)?,
            schedules: serde_json::from_str(&self.schedules)?,
            work_duration: self.work_duration,
            break_duration: self.break_duration,
        })
    }
}

impl SnapshotRepository for SqliteSnapshotRepository {
    fn load(&self) -> Result<Option<LocalSnapshot>, InfraError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                "SELECT selected_date, zoom_level, timezones, schedules, work_duration, break_duration
                 FROM local_snapshot WHERE id = 1",
                [],
                |row| {
                    Ok(SnapshotRow {
                        selected_date: row.get(0)?,
                        zoom_level: row.get(1)?,
                        timezones: row.get(2)?,
                        schedules: row.get(3)?,
                        work_duration: row.get(4)?,
                        break_duration: row.get(5)?,
                    })
                },
            )
            .optional()?;

        row.map(SnapshotRow::decode).transpose()
    }

    fn save(&self, snapshot: &LocalSnapshot) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO local_snapshot
               (id, selected_date, zoom_level, timezones, schedules, work_duration, break_duration, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
               selected_date = excluded.selected_date,
               zoom_level = excluded.zoom_level,
               timezones = excluded.timezones,
               schedules = excluded.schedules,
               work_duration = excluded.work_duration,
               break_duration = excluded.break_duration,
               updated_at = excluded.updated_at",
            params![
                snapshot.selected_date.format("%Y-%m-%d").to_string(),
                snapshot.zoom_level.minutes(),
                serde_json::to_string(&snapshot.timezones)?,
                serde_json::to_string(&snapshot.schedules)?,
                snapshot.work_duration,
                snapshot.break_duration,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    snapshot: Mutex<Option<LocalSnapshot>>,
}

impl SnapshotRepository for InMemorySnapshotRepository {
    fn load(&self) -> Result<Option<LocalSnapshot>, InfraError> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("snapshot lock poisoned: {error}")))?;
        Ok(snapshot.clone())
    }

    fn save(&self, snapshot: &LocalSnapshot) -> Result<(), InfraError> {
        let mut stored = self
            .snapshot
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("snapshot lock poisoned: {error}")))?;
        *stored = Some(snapshot.clone());
        Ok(())
    }
}
