use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEZONES: [&str; 3] = ["America/New_York", "Europe/London", "Asia/Tokyo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ZoomLevel {
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
}

impl ZoomLevel {
    /// Finest to coarsest.
    pub const ALL: [ZoomLevel; 6] = [
        ZoomLevel::FiveMinutes,
        ZoomLevel::FifteenMinutes,
        ZoomLevel::ThirtyMinutes,
        ZoomLevel::OneHour,
        ZoomLevel::TwoHours,
        ZoomLevel::FourHours,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::ThirtyMinutes => 30,
            Self::OneHour => 60,
            Self::TwoHours => 120,
            Self::FourHours => 240,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.minutes() == minutes)
    }

    fn index(self) -> usize {
        match self {
            Self::FiveMinutes => 0,
            Self::FifteenMinutes => 1,
            Self::ThirtyMinutes => 2,
            Self::OneHour => 3,
            Self::TwoHours => 4,
            Self::FourHours => 5,
        }
    }

    /// One step finer, or `None` at the finest level.
    pub fn finer(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// One step coarser, or `None` at the coarsest level.
    pub fn coarser(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn label(self) -> String {
        let minutes = self.minutes();
        if minutes >= 60 {
            format!("{}hr", minutes / 60)
        } else {
            format!("{minutes}min")
        }
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::OneHour
    }
}

impl TryFrom<u32> for ZoomLevel {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
            .ok_or_else(|| format!("zoom level must be one of 5, 15, 30, 60, 120, 240 (got {value})"))
    }
}

impl From<ZoomLevel> for u32 {
    fn from(value: ZoomLevel) -> Self {
        value.minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TaskColor {
    Emerald,
    Blue,
    Violet,
    Amber,
    Red,
    Pink,
    Cyan,
    Lime,
}

impl TaskColor {
    pub const ALL: [TaskColor; 8] = [
        TaskColor::Emerald,
        TaskColor::Blue,
        TaskColor::Violet,
        TaskColor::Amber,
        TaskColor::Red,
        TaskColor::Pink,
        TaskColor::Cyan,
        TaskColor::Lime,
    ];

    pub fn hex(self) -> &'static str {
        match self {
            Self::Emerald => "#10b981",
            Self::Blue => "#3b82f6",
            Self::Violet => "#8b5cf6",
            Self::Amber => "#f59e0b",
            Self::Red => "#ef4444",
            Self::Pink => "#ec4899",
            Self::Cyan => "#06b6d4",
            Self::Lime => "#84cc16",
        }
    }

    pub fn from_hex(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.hex().eq_ignore_ascii_case(value))
    }

    /// Palette entry for the n-th task of a day, cycling through the palette.
    pub fn rotating(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

impl Default for TaskColor {
    fn default() -> Self {
        Self::Emerald
    }
}

impl TryFrom<String> for TaskColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("task.color must be a palette color (got {value})"))
    }
}

impl From<TaskColor> for String {
    fn from(value: TaskColor) -> Self {
        value.hex().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub duration: u32,
    pub color: TaskColor,
    pub completed: bool,
}

impl Task {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration))
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if self.duration == 0 {
            return Err("task.duration must be > 0".to_string());
        }
        Ok(())
    }
}

/// A task as submitted for creation, before it has an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub duration: u32,
    pub color: TaskColor,
    #[serde(default)]
    pub completed: bool,
}

impl TaskDraft {
    pub fn into_task(self, id: String) -> Task {
        Task {
            id,
            title: self.title,
            start_time: self.start_time,
            duration: self.duration,
            color: self.color,
            completed: self.completed,
        }
    }
}

/// Partial task update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration: Option<u32>,
    pub color: Option<TaskColor>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start_time.is_none()
            && self.duration.is_none()
            && self.color.is_none()
            && self.completed.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(start_time) = self.start_time {
            task.start_time = start_time;
        }
        if let Some(duration) = self.duration {
            task.duration = duration;
        }
        if let Some(color) = self.color {
            task.color = color;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySchedule {
    pub date: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl DaySchedule {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            tasks: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_date(&self.date, "schedule.date")?;
        for task in &self.tasks {
            task.validate()?;
        }
        Ok(())
    }
}

/// Ordered, non-empty, duplicate-free list of IANA zone names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TimezoneList(Vec<String>);

impl TimezoneList {
    pub fn new(names: Vec<String>) -> Result<Self, String> {
        let mut deduped: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() || deduped.iter().any(|existing| existing == name) {
                continue;
            }
            deduped.push(name.to_string());
        }
        if deduped.is_empty() {
            return Err("timezones must contain at least one entry".to_string());
        }
        Ok(Self(deduped))
    }

    /// Appends a zone. `Ok(false)` when it is already present.
    pub fn add(&mut self, name: &str) -> Result<bool, String> {
        let name = name.trim();
        if name.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!("unknown timezone: {name}"));
        }
        if self.contains(name) {
            return Ok(false);
        }
        self.0.push(name.to_string());
        Ok(true)
    }

    /// Removes a zone unless it is absent or the last remaining entry.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.trim();
        if self.0.len() <= 1 || !self.contains(name) {
            return false;
        }
        self.0.retain(|existing| existing != name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|existing| existing == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TimezoneList {
    fn default() -> Self {
        Self(DEFAULT_TIMEZONES.iter().map(|name| name.to_string()).collect())
    }
}

impl TryFrom<Vec<String>> for TimezoneList {
    type Error = String;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimezoneList> for Vec<String> {
    fn from(value: TimezoneList) -> Self {
        value.0
    }
}

/// Settings blob mirrored to the remote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub zoom_level: ZoomLevel,
    pub timezones: TimezoneList,
}

/// Settings as read back from the remote store; only present keys apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    #[serde(default)]
    pub zoom_level: Option<ZoomLevel>,
    #[serde(default)]
    pub timezones: Option<TimezoneList>,
}

impl From<Settings> for RemoteSettings {
    fn from(value: Settings) -> Self {
        Self {
            zoom_level: Some(value.zoom_level),
            timezones: Some(value.timezones),
        }
    }
}

pub fn parse_date_key(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("date must be YYYY-MM-DD (got {value})"))
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))?;
    Ok(())
}
