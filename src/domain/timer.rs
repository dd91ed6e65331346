use crate::domain::time_utils::{UrgencyTier, urgency_tier};
use serde::Serialize;

pub const DEFAULT_WORK_SECONDS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECONDS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Work,
    Break,
}

/// Work/break countdown.
///
/// The machine is passive: something outside calls `tick` once per elapsed
/// second. A phase boundary always pauses, so the next phase needs `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroTimer {
    active: bool,
    remaining_seconds: u32,
    is_break: bool,
    work_duration: u32,
    break_duration: u32,
    current_task_id: Option<String>,
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self::with_durations(DEFAULT_WORK_SECONDS, DEFAULT_BREAK_SECONDS)
    }
}

impl PomodoroTimer {
    pub fn with_durations(work_duration: u32, break_duration: u32) -> Self {
        Self {
            active: false,
            remaining_seconds: work_duration,
            is_break: false,
            work_duration,
            break_duration,
            current_task_id: None,
        }
    }

    pub fn start(&mut self, task_id: Option<String>) {
        if self.remaining_seconds == 0 {
            self.remaining_seconds = self.phase_total();
        }
        self.active = true;
        self.current_task_id = task_id;
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    /// Back to a paused work phase. The task association survives.
    pub fn reset(&mut self) {
        self.active = false;
        self.is_break = false;
        self.remaining_seconds = self.work_duration;
    }

    /// Returns true when this tick crossed a phase boundary.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        if self.remaining_seconds <= 1 {
            self.is_break = !self.is_break;
            self.remaining_seconds = self.phase_total();
            self.active = false;
            return true;
        }
        self.remaining_seconds -= 1;
        false
    }

    /// New durations take effect the next time a phase is loaded.
    pub fn set_durations(&mut self, work_duration: u32, break_duration: u32) {
        self.work_duration = work_duration;
        self.break_duration = break_duration;
    }

    pub fn set_current_task(&mut self, task_id: Option<String>) {
        self.current_task_id = task_id;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_break(&self) -> bool {
        self.is_break
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn work_duration(&self) -> u32 {
        self.work_duration
    }

    pub fn break_duration(&self) -> u32 {
        self.break_duration
    }

    pub fn current_task_id(&self) -> Option<&str> {
        self.current_task_id.as_deref()
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_break {
            TimerPhase::Break
        } else {
            TimerPhase::Work
        }
    }

    pub fn phase_total(&self) -> u32 {
        if self.is_break {
            self.break_duration
        } else {
            self.work_duration
        }
    }

    pub fn percent_remaining(&self) -> f64 {
        let total = self.phase_total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.remaining_seconds) / f64::from(total) * 100.0
    }

    pub fn progress_percent(&self) -> f64 {
        100.0 - self.percent_remaining()
    }

    pub fn urgency(&self) -> UrgencyTier {
        urgency_tier(self.percent_remaining())
    }
}
