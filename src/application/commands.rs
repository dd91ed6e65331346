use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::persistence::{DataSource, LoadResponse, PersistenceService, SaveOutcome};
use crate::domain::models::{
    parse_date_key, Settings, Task, TaskColor, TaskDraft, TaskPatch, TimezoneList, ZoomLevel,
};
use crate::domain::schedule::ScheduleMap;
use crate::domain::time_utils::{
    blocks_for_day, block_height, calendar_key, current_block_offset, days_around,
    format_countdown, format_time_in_zone, grid_columns, tasks_overlapping_block,
    timezone_display_name, UrgencyTier, COMMON_TIMEZONES, SIDEBAR_FUTURE_DAYS, SIDEBAR_PAST_DAYS,
};
use crate::domain::timer::{PomodoroTimer, TimerPhase};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::snapshot_repository::{
    LocalSnapshot, SnapshotRepository, SqliteSnapshotRepository,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_TASK_MINUTES: u32 = 25;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct AppState {
    logs_dir: PathBuf,
    config: AppConfig,
    snapshots: Arc<dyn SnapshotRepository>,
    persistence: Arc<PersistenceService>,
    now_provider: NowProvider,
    runtime: Mutex<RuntimeState>,
    commit_guard: Mutex<()>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf, persistence: Arc<PersistenceService>) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Self::from_bootstrap(bootstrap, persistence)
    }

    pub fn from_bootstrap(
        bootstrap: BootstrapResult,
        persistence: Arc<PersistenceService>,
    ) -> Result<Self, InfraError> {
        let snapshots = Arc::new(SqliteSnapshotRepository::new(&bootstrap.database_path));
        Self::with_components(
            bootstrap.logs_dir,
            bootstrap.config,
            snapshots,
            persistence,
            Arc::new(Utc::now),
        )
    }

    pub fn with_components(
        logs_dir: PathBuf,
        config: AppConfig,
        snapshots: Arc<dyn SnapshotRepository>,
        persistence: Arc<PersistenceService>,
        now_provider: NowProvider,
    ) -> Result<Self, InfraError> {
        let runtime = match snapshots.load() {
            Ok(Some(snapshot)) => RuntimeState::from_snapshot(snapshot),
            Ok(None) => RuntimeState::fresh(&config, now_provider()),
            Err(error) => {
                tracing::warn!(%error, "ignoring unreadable local snapshot");
                RuntimeState::fresh(&config, now_provider())
            }
        };

        Ok(Self {
            logs_dir,
            config,
            snapshots,
            persistence,
            now_provider,
            runtime: Mutex::new(runtime),
            commit_guard: Mutex::new(()),
            log_guard: Mutex::new(()),
        })
    }

    fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.config.timezone).date_naive()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        tracing::error!(command, "{message}");
        self.append_log("error", command, message);
    }

    /// Records a failed command and hands the error back to the caller.
    pub fn command_error(&self, command: &str, error: InfraError) -> InfraError {
        self.log_error(command, &error.to_string());
        error
    }

    /// Leaves the runtime lock poisoned so every command fails.
    #[cfg(test)]
    pub(crate) fn poison_runtime(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _runtime = self.runtime.lock();
            panic!("poisoning runtime lock");
        }));
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone)]
struct RuntimeState {
    selected_date: NaiveDate,
    zoom_level: ZoomLevel,
    timezones: TimezoneList,
    schedules: ScheduleMap,
    timer: PomodoroTimer,
    focus_mode_active: bool,
}

impl RuntimeState {
    fn fresh(config: &AppConfig, now: DateTime<Utc>) -> Self {
        Self {
            selected_date: now.with_timezone(&config.timezone).date_naive(),
            zoom_level: ZoomLevel::default(),
            timezones: config.default_timezones.clone(),
            schedules: ScheduleMap::new(),
            timer: PomodoroTimer::default(),
            focus_mode_active: false,
        }
    }

    fn from_snapshot(snapshot: LocalSnapshot) -> Self {
        Self {
            selected_date: snapshot.selected_date,
            zoom_level: snapshot.zoom_level,
            timezones: snapshot.timezones,
            schedules: snapshot.schedules,
            timer: PomodoroTimer::with_durations(snapshot.work_duration, snapshot.break_duration),
            focus_mode_active: false,
        }
    }

    fn to_snapshot(&self) -> LocalSnapshot {
        LocalSnapshot {
            selected_date: self.selected_date,
            zoom_level: self.zoom_level,
            timezones: self.timezones.clone(),
            schedules: self.schedules.clone(),
            work_duration: self.timer.work_duration(),
            break_duration: self.timer.break_duration(),
        }
    }

    fn settings(&self) -> Settings {
        Settings {
            zoom_level: self.zoom_level,
            timezones: self.timezones.clone(),
        }
    }

    fn selected_date_key(&self) -> String {
        self.selected_date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncScope {
    LocalOnly,
    Remote,
}

/// Writes the local snapshot and, for synced fields, queues the remote save.
/// The runtime lock is released before any I/O; the commit lock is taken
/// first so writes land in the same order as the mutations.
fn commit(state: &AppState, runtime: MutexGuard<'_, RuntimeState>, command: &str, scope: SyncScope) {
    let snapshot = runtime.to_snapshot();
    let sync = (scope == SyncScope::Remote).then(|| (runtime.schedules.clone(), runtime.settings()));
    let _order = state
        .commit_guard
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    drop(runtime);

    if let Err(error) = state.snapshots.save(&snapshot) {
        state.log_error(command, &format!("failed to write local snapshot: {error}"));
    }
    if let Some((schedules, settings)) = sync {
        state.persistence.request_sync(schedules, settings);
    }
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn parse_date_input(value: &str) -> Result<NaiveDate, InfraError> {
    parse_date_key(value).map_err(InfraError::InvalidInput)
}

fn normalize_date_key(value: &str) -> Result<String, InfraError> {
    Ok(parse_date_input(value)?.format("%Y-%m-%d").to_string())
}

fn normalize_title(title: &str) -> Result<String, InfraError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(InfraError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn ensure_positive_duration(duration: u32) -> Result<(), InfraError> {
    if duration == 0 {
        return Err(InfraError::InvalidInput("duration must be > 0 minutes".to_string()));
    }
    Ok(())
}

/// Task creation request. Duration and color fall back to the modal defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub color: Option<TaskColor>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub active: bool,
    pub is_break: bool,
    pub phase: TimerPhase,
    pub remaining_seconds: u32,
    pub display: String,
    pub work_duration: u32,
    pub break_duration: u32,
    pub progress_percent: f64,
    pub urgency: UrgencyTier,
    pub current_task_id: Option<String>,
    pub current_task: Option<Task>,
    pub focus_mode_active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub app_name: String,
    pub today: String,
    pub home_timezone: String,
    pub selected_date: String,
    pub zoom_level: ZoomLevel,
    pub timezones: TimezoneList,
    pub schedules: ScheduleMap,
    pub timer: TimerView,
    pub focus_mode_active: bool,
    pub cloud_sync_enabled: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridBlockView {
    pub offset_minutes: u32,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_current: bool,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayGridView {
    pub date: String,
    pub zoom_level: ZoomLevel,
    pub zoom_label: String,
    pub columns: u32,
    pub block_height: u32,
    pub current_block_offset: Option<u32>,
    pub blocks: Vec<GridBlockView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneClock {
    pub name: String,
    pub display_name: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SidebarDay {
    pub date: String,
    pub weekday: String,
    pub label: String,
    pub is_selected: bool,
    pub is_today: bool,
    pub task_count: usize,
}

fn to_timer_view(runtime: &RuntimeState) -> TimerView {
    let timer = &runtime.timer;
    let current_task = timer.current_task_id().and_then(|task_id| {
        runtime
            .schedules
            .find_task(&runtime.selected_date_key(), task_id)
            .cloned()
    });
    TimerView {
        active: timer.is_active(),
        is_break: timer.is_break(),
        phase: timer.phase(),
        remaining_seconds: timer.remaining_seconds(),
        display: format_countdown(timer.remaining_seconds()),
        work_duration: timer.work_duration(),
        break_duration: timer.break_duration(),
        progress_percent: timer.progress_percent(),
        urgency: timer.urgency(),
        current_task_id: timer.current_task_id().map(ToOwned::to_owned),
        current_task,
        focus_mode_active: runtime.focus_mode_active,
    }
}

pub fn snapshot(state: &AppState) -> Result<StateResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(StateResponse {
        app_name: state.config.app_name.clone(),
        today: state.today().format("%Y-%m-%d").to_string(),
        home_timezone: state.config.timezone.name().to_string(),
        selected_date: runtime.selected_date_key(),
        zoom_level: runtime.zoom_level,
        timezones: runtime.timezones.clone(),
        schedules: runtime.schedules.clone(),
        timer: to_timer_view(&runtime),
        focus_mode_active: runtime.focus_mode_active,
        cloud_sync_enabled: state.persistence.is_authenticated(),
    })
}

pub fn set_selected_date(state: &AppState, date: &str) -> Result<NaiveDate, InfraError> {
    let date = parse_date_input(date)?;
    let mut runtime = lock_runtime(state)?;
    runtime.selected_date = date;
    commit(state, runtime, "set_selected_date", SyncScope::LocalOnly);
    Ok(date)
}

/// Moves the selection by whole days (negative steps go back).
pub fn step_selected_date(state: &AppState, days: i64) -> Result<NaiveDate, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let date = Duration::try_days(days)
        .and_then(|delta| runtime.selected_date.checked_add_signed(delta))
        .ok_or_else(|| InfraError::InvalidInput(format!("cannot move selected date by {days} days")))?;
    runtime.selected_date = date;
    commit(state, runtime, "step_selected_date", SyncScope::LocalOnly);
    Ok(date)
}

pub fn select_today(state: &AppState) -> Result<NaiveDate, InfraError> {
    let today = state.today();
    let mut runtime = lock_runtime(state)?;
    runtime.selected_date = today;
    commit(state, runtime, "select_today", SyncScope::LocalOnly);
    Ok(today)
}

pub fn set_zoom_level(state: &AppState, level: ZoomLevel) -> Result<ZoomLevel, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.zoom_level = level;
    commit(state, runtime, "set_zoom_level", SyncScope::Remote);
    state.log_info("set_zoom_level", &format!("zoom_level={}", level.minutes()));
    Ok(level)
}

pub fn zoom_in(state: &AppState) -> Result<ZoomLevel, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(level) = runtime.zoom_level.finer() else {
        return Ok(runtime.zoom_level);
    };
    runtime.zoom_level = level;
    commit(state, runtime, "zoom_in", SyncScope::Remote);
    Ok(level)
}

pub fn zoom_out(state: &AppState) -> Result<ZoomLevel, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(level) = runtime.zoom_level.coarser() else {
        return Ok(runtime.zoom_level);
    };
    runtime.zoom_level = level;
    commit(state, runtime, "zoom_out", SyncScope::Remote);
    Ok(level)
}

pub fn add_timezone(state: &AppState, name: &str) -> Result<TimezoneList, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let added = runtime.timezones.add(name).map_err(InfraError::InvalidInput)?;
    let zones = runtime.timezones.clone();
    if added {
        commit(state, runtime, "add_timezone", SyncScope::Remote);
        state.log_info("add_timezone", &format!("added timezone={}", name.trim()));
    }
    Ok(zones)
}

pub fn remove_timezone(state: &AppState, name: &str) -> Result<TimezoneList, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let removed = runtime.timezones.remove(name);
    let zones = runtime.timezones.clone();
    if removed {
        commit(state, runtime, "remove_timezone", SyncScope::Remote);
        state.log_info("remove_timezone", &format!("removed timezone={}", name.trim()));
    }
    Ok(zones)
}

pub fn add_task(state: &AppState, date: &str, new_task: NewTask) -> Result<Task, InfraError> {
    let date = normalize_date_key(date)?;
    let title = normalize_title(&new_task.title)?;
    let duration = new_task.duration.unwrap_or(DEFAULT_TASK_MINUTES);
    ensure_positive_duration(duration)?;

    let mut runtime = lock_runtime(state)?;
    let color = new_task
        .color
        .unwrap_or_else(|| TaskColor::rotating(runtime.schedules.tasks_for(&date).len()));
    let task = runtime.schedules.add_task(
        &date,
        TaskDraft {
            title,
            start_time: new_task.start_time,
            duration,
            color,
            completed: false,
        },
    );
    commit(state, runtime, "add_task", SyncScope::Remote);

    state.log_info("add_task", &format!("created task_id={} date={date}", task.id));
    Ok(task)
}

/// `Ok(None)` when the date or task is unknown.
pub fn update_task(
    state: &AppState,
    date: &str,
    task_id: &str,
    mut patch: TaskPatch,
) -> Result<Option<Task>, InfraError> {
    let date = normalize_date_key(date)?;
    if let Some(title) = patch.title.as_deref() {
        patch.title = Some(normalize_title(title)?);
    }
    if let Some(duration) = patch.duration {
        ensure_positive_duration(duration)?;
    }

    let mut runtime = lock_runtime(state)?;
    let tz = state.config.timezone;
    let Some(task) = runtime.schedules.update_task(&date, task_id, &patch, tz) else {
        return Ok(None);
    };
    commit(state, runtime, "update_task", SyncScope::Remote);

    state.log_info("update_task", &format!("updated task_id={task_id} date={date}"));
    Ok(Some(task))
}

pub fn delete_task(state: &AppState, date: &str, task_id: &str) -> Result<bool, InfraError> {
    let date = normalize_date_key(date)?;
    let mut runtime = lock_runtime(state)?;
    let deleted = runtime.schedules.delete_task(&date, task_id);
    if deleted {
        commit(state, runtime, "delete_task", SyncScope::Remote);
        state.log_info("delete_task", &format!("deleted task_id={task_id} date={date}"));
    }
    Ok(deleted)
}

pub fn toggle_task_complete(state: &AppState, date: &str, task_id: &str) -> Result<Option<bool>, InfraError> {
    let date = normalize_date_key(date)?;
    let mut runtime = lock_runtime(state)?;
    let completed = runtime.schedules.toggle_complete(&date, task_id);
    if completed.is_some() {
        commit(state, runtime, "toggle_task_complete", SyncScope::Remote);
    }
    Ok(completed)
}

pub fn start_timer(state: &AppState, task_id: Option<String>) -> Result<TimerView, InfraError> {
    let task_id = task_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let mut runtime = lock_runtime(state)?;
    runtime.timer.start(task_id);
    Ok(to_timer_view(&runtime))
}

pub fn pause_timer(state: &AppState) -> Result<TimerView, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.pause();
    Ok(to_timer_view(&runtime))
}

pub fn reset_timer(state: &AppState) -> Result<TimerView, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.reset();
    Ok(to_timer_view(&runtime))
}

/// Advances the timer by one second. Returns true on a phase change.
pub fn tick_timer(state: &AppState) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let crossed = runtime.timer.tick();
    let phase = runtime.timer.phase();
    drop(runtime);

    if crossed {
        let message = match phase {
            TimerPhase::Break => "work phase finished; break ready",
            TimerPhase::Work => "break finished; work phase ready",
        };
        state.log_info("tick_timer", message);
    }
    Ok(crossed)
}

pub fn set_timer_durations(
    state: &AppState,
    work_seconds: u32,
    break_seconds: u32,
) -> Result<TimerView, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.timer.set_durations(work_seconds, break_seconds);
    let view = to_timer_view(&runtime);
    commit(state, runtime, "set_timer_durations", SyncScope::LocalOnly);
    Ok(view)
}

pub fn set_current_task(state: &AppState, task_id: Option<String>) -> Result<TimerView, InfraError> {
    let task_id = task_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let mut runtime = lock_runtime(state)?;
    runtime.timer.set_current_task(task_id);
    Ok(to_timer_view(&runtime))
}

pub fn toggle_focus_mode(state: &AppState) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.focus_mode_active = !runtime.focus_mode_active;
    Ok(runtime.focus_mode_active)
}

pub fn timer_view(state: &AppState) -> Result<TimerView, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(to_timer_view(&runtime))
}

/// The grid for `date` (default: the selected date) at the current zoom.
pub fn day_grid(state: &AppState, date: Option<&str>) -> Result<DayGridView, InfraError> {
    let runtime = lock_runtime(state)?;
    let date = match date {
        Some(value) => parse_date_input(value)?,
        None => runtime.selected_date,
    };
    let date_key = date.format("%Y-%m-%d").to_string();
    let tz = state.config.timezone;
    let zoom = runtime.zoom_level;
    let now = state.now();
    let current_offset =
        (calendar_key(now, tz) == date_key).then(|| current_block_offset(now, zoom, tz));

    let tasks = runtime.schedules.tasks_for(&date_key);
    let blocks = blocks_for_day(zoom)
        .into_iter()
        .map(|block| {
            let start_time = block.start_at(date, tz);
            let end_time = block.end_at(date, zoom, tz);
            GridBlockView {
                tasks: tasks_overlapping_block(tasks, start_time, end_time, &date_key, tz)
                    .into_iter()
                    .cloned()
                    .collect(),
                is_current: current_offset == Some(block.offset_minutes),
                offset_minutes: block.offset_minutes,
                label: block.label,
                start_time,
                end_time,
            }
        })
        .collect();

    Ok(DayGridView {
        date: date_key,
        zoom_level: zoom,
        zoom_label: zoom.label(),
        columns: grid_columns(zoom),
        block_height: block_height(zoom),
        current_block_offset: current_offset,
        blocks,
    })
}

pub fn timezone_clocks(state: &AppState) -> Result<Vec<TimezoneClock>, InfraError> {
    let runtime = lock_runtime(state)?;
    let now = state.now();
    Ok(runtime
        .timezones
        .as_slice()
        .iter()
        .filter_map(|name| {
            let tz = name.parse::<Tz>().ok()?;
            Some(TimezoneClock {
                name: name.clone(),
                display_name: timezone_display_name(name),
                time: format_time_in_zone(now, tz),
            })
        })
        .collect())
}

/// Common zones the user has not added yet.
pub fn available_timezones(state: &AppState) -> Result<Vec<String>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(COMMON_TIMEZONES
        .iter()
        .filter(|name| !runtime.timezones.contains(name))
        .map(|name| name.to_string())
        .collect())
}

pub fn sidebar_days(state: &AppState) -> Result<Vec<SidebarDay>, InfraError> {
    let today = state.today();
    let runtime = lock_runtime(state)?;
    Ok(days_around(today, SIDEBAR_PAST_DAYS, SIDEBAR_FUTURE_DAYS)
        .into_iter()
        .map(|day| {
            let date = day.format("%Y-%m-%d").to_string();
            SidebarDay {
                task_count: runtime.schedules.tasks_for(&date).len(),
                weekday: day.format("%a").to_string(),
                label: day.format("%b %-d").to_string(),
                is_selected: day == runtime.selected_date,
                is_today: day == today,
                date,
            }
        })
        .collect())
}

/// Startup load-merge. Remote schedules win per date; remote settings only
/// overwrite the keys they carry. The merged state is written to the local
/// snapshot but not echoed back to the remote store.
pub async fn load_remote_state(state: &AppState) -> Result<DataSource, InfraError> {
    let response = state.persistence.load().await?;
    if response.source != DataSource::Remote {
        state.log_info("load_remote_state", "no remote store configured; keeping local state");
        return Ok(response.source);
    }

    let date_count = response.schedules.len();
    {
        let mut runtime = lock_runtime(state)?;
        runtime.schedules.merge_remote(response.schedules);
        if let Some(settings) = response.settings {
            if let Some(zoom_level) = settings.zoom_level {
                runtime.zoom_level = zoom_level;
            }
            if let Some(timezones) = settings.timezones {
                runtime.timezones = timezones;
            }
        }
        commit(state, runtime, "load_remote_state", SyncScope::LocalOnly);
    }

    state.log_info(
        "load_remote_state",
        &format!("merged {date_count} remote day schedules"),
    );
    Ok(DataSource::Remote)
}

pub async fn load_data(state: &AppState) -> Result<LoadResponse, InfraError> {
    state.persistence.load().await
}

pub async fn save_data(
    state: &AppState,
    schedules: Option<ScheduleMap>,
    settings: Option<Settings>,
) -> Result<SaveOutcome, InfraError> {
    if let Some(schedules) = schedules.as_ref() {
        for date in schedules.dates() {
            if let Some(schedule) = schedules.get(date) {
                schedule.validate().map_err(InfraError::InvalidInput)?;
                if schedule.date != date {
                    return Err(InfraError::InvalidInput(format!(
                        "schedule key {date} does not match schedule.date {}",
                        schedule.date
                    )));
                }
            }
        }
    }
    let outcome = state
        .persistence
        .save(schedules.as_ref(), settings.as_ref())
        .await?;
    state.log_info("save_data", &format!("saved data source={:?}", outcome.source));
    Ok(outcome)
}
