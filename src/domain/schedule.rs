use crate::domain::models::{DaySchedule, Task, TaskDraft, TaskPatch};
use crate::domain::time_utils::calendar_key;
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> String {
    let sequence = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    format!("tsk-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Date key to the tasks planned on that date.
///
/// Day schedules are created on first insertion and never pre-created.
/// Lookups with an unknown date or task id are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleMap(BTreeMap<String, DaySchedule>);

impl ScheduleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: &str) -> Option<&DaySchedule> {
        self.0.get(date)
    }

    pub fn tasks_for(&self, date: &str) -> &[Task] {
        self.0
            .get(date)
            .map(|schedule| schedule.tasks.as_slice())
            .unwrap_or_default()
    }

    pub fn find_task(&self, date: &str, task_id: &str) -> Option<&Task> {
        self.tasks_for(date).iter().find(|task| task.id == task_id)
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add_task(&mut self, date: &str, draft: TaskDraft) -> Task {
        let task = draft.into_task(next_task_id());
        self.0
            .entry(date.to_string())
            .or_insert_with(|| DaySchedule::new(date))
            .tasks
            .push(task.clone());
        task
    }

    /// Merges `patch` into the matching task and returns the updated task.
    ///
    /// When the patch moves the start time onto another local date the task
    /// leaves this date's schedule and is appended to the new date's.
    pub fn update_task(&mut self, date: &str, task_id: &str, patch: &TaskPatch, tz: Tz) -> Option<Task> {
        let schedule = self.0.get_mut(date)?;
        let index = schedule.tasks.iter().position(|task| task.id == task_id)?;

        let mut updated = schedule.tasks[index].clone();
        patch.apply(&mut updated);

        let target_date = calendar_key(updated.start_time, tz);
        if patch.start_time.is_none() || target_date == date {
            schedule.tasks[index] = updated.clone();
            return Some(updated);
        }

        schedule.tasks.remove(index);
        self.0
            .entry(target_date.clone())
            .or_insert_with(|| DaySchedule::new(target_date))
            .tasks
            .push(updated.clone());
        Some(updated)
    }

    pub fn delete_task(&mut self, date: &str, task_id: &str) -> bool {
        let Some(schedule) = self.0.get_mut(date) else {
            return false;
        };
        let before = schedule.tasks.len();
        schedule.tasks.retain(|task| task.id != task_id);
        schedule.tasks.len() != before
    }

    /// Flips the completed flag and returns its new value.
    pub fn toggle_complete(&mut self, date: &str, task_id: &str) -> Option<bool> {
        let task = self
            .0
            .get_mut(date)?
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)?;
        task.completed = !task.completed;
        Some(task.completed)
    }

    /// Shallow merge: each remote date replaces the local one wholesale.
    pub fn merge_remote(&mut self, remote: ScheduleMap) {
        for (date, schedule) in remote.0 {
            self.0.insert(date, schedule);
        }
    }
}

impl FromIterator<DaySchedule> for ScheduleMap {
    fn from_iter<I: IntoIterator<Item = DaySchedule>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|schedule| (schedule.date.clone(), schedule))
                .collect(),
        )
    }
}
