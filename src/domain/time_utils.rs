//! Calendar and clock helpers for the time-block grid.
//!
//! "Local" always means the zone passed in by the caller; nothing here reads
//! the host clock or the host timezone.

use crate::domain::models::{Task, ZoomLevel};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const SIDEBAR_PAST_DAYS: u32 = 7;
pub const SIDEBAR_FUTURE_DAYS: u32 = 14;

/// Longest run of skipped local minutes searched past a DST gap.
const MAX_GAP_MINUTES: u32 = MINUTES_PER_DAY;

/// Zones offered in the header picker.
pub const COMMON_TIMEZONES: [&str; 12] = [
    "America/New_York",
    "America/Los_Angeles",
    "America/Chicago",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Asia/Singapore",
    "Asia/Dubai",
    "Australia/Sydney",
    "Pacific/Auckland",
];

/// A wall-clock slot of the local day. `offset_minutes` is minutes after
/// local midnight as read on the clock, so the label always names the local
/// time the block starts at.
///
/// On DST days the real length of a block differs from the zoom step: a
/// block inside a spring-forward gap is empty, and the block holding a
/// repeated fall-back hour spans both occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBlock {
    pub offset_minutes: u32,
    pub label: String,
}

impl DayBlock {
    pub fn start_at(&self, date: NaiveDate, tz: Tz) -> DateTime<Utc> {
        wall_clock_instant(date, self.offset_minutes, tz)
    }

    /// Start of the following block; for the last block, the next local midnight.
    pub fn end_at(&self, date: NaiveDate, zoom: ZoomLevel, tz: Tz) -> DateTime<Utc> {
        wall_clock_instant(date, self.offset_minutes + zoom.minutes(), tz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Safe,
    Warning,
    Danger,
    Critical,
}

pub fn calendar_key(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// First instant of `date` in `tz`. Zones that skip midnight resolve to the
/// first instant after the gap.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    wall_clock_instant(date, 0, tz)
}

fn wall_clock_instant(date: NaiveDate, offset_minutes: u32, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let naive = midnight
        .checked_add_signed(Duration::minutes(i64::from(offset_minutes)))
        .unwrap_or(midnight);
    resolve_local(naive, tz)
}

/// Ambiguous times take the earlier occurrence; skipped times move forward
/// to the first minute that exists.
fn resolve_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(resolved) | LocalResult::Ambiguous(resolved, _) => {
                return resolved.with_timezone(&Utc);
            }
            LocalResult::None => match candidate.checked_add_signed(Duration::minutes(1)) {
                Some(next) => candidate = next,
                None => break,
            },
        }
    }
    Utc.from_utc_datetime(&naive)
}

pub fn blocks_for_day(zoom: ZoomLevel) -> Vec<DayBlock> {
    let step = zoom.minutes();
    (0..MINUTES_PER_DAY)
        .step_by(step as usize)
        .map(|offset_minutes| DayBlock {
            offset_minutes,
            label: format!("{:02}:{:02}", offset_minutes / 60, offset_minutes % 60),
        })
        .collect()
}

/// Tasks on `date_key` whose span intersects the half-open block
/// `[block_start, block_end)`. An empty block holds nothing.
pub fn tasks_overlapping_block<'a>(
    tasks: &'a [Task],
    block_start: DateTime<Utc>,
    block_end: DateTime<Utc>,
    date_key: &str,
    tz: Tz,
) -> Vec<&'a Task> {
    if block_end <= block_start {
        return Vec::new();
    }
    tasks
        .iter()
        .filter(|task| calendar_key(task.start_time, tz) == date_key)
        .filter(|task| task.start_time < block_end && task.end_time() > block_start)
        .collect()
}

/// Offset of the block containing `instant` on its local day, read from the
/// local wall clock.
pub fn current_block_offset(instant: DateTime<Utc>, zoom: ZoomLevel, tz: Tz) -> u32 {
    let local = instant.with_timezone(&tz);
    let minutes = (local.time() - NaiveTime::MIN).num_minutes().max(0) as u32;
    let step = zoom.minutes();
    (minutes.min(MINUTES_PER_DAY - 1) / step) * step
}

pub fn urgency_tier(percent_remaining: f64) -> UrgencyTier {
    if percent_remaining > 50.0 {
        UrgencyTier::Safe
    } else if percent_remaining > 25.0 {
        UrgencyTier::Warning
    } else if percent_remaining > 10.0 {
        UrgencyTier::Danger
    } else {
        UrgencyTier::Critical
    }
}

pub fn grid_columns(zoom: ZoomLevel) -> u32 {
    match zoom {
        ZoomLevel::FourHours => 3,
        ZoomLevel::TwoHours => 4,
        ZoomLevel::OneHour => 6,
        ZoomLevel::ThirtyMinutes => 6,
        ZoomLevel::FifteenMinutes => 4,
        ZoomLevel::FiveMinutes => 4,
    }
}

pub fn block_height(zoom: ZoomLevel) -> u32 {
    match zoom {
        ZoomLevel::FourHours => 200,
        ZoomLevel::TwoHours => 150,
        ZoomLevel::OneHour => 120,
        ZoomLevel::ThirtyMinutes => 100,
        ZoomLevel::FifteenMinutes => 90,
        ZoomLevel::FiveMinutes => 80,
    }
}

pub fn format_time_in_zone(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// `"America/New_York"` becomes `"New York"`.
pub fn timezone_display_name(name: &str) -> String {
    name.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(name)
        .replace('_', " ")
}

pub fn format_countdown(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Consecutive dates from `past` days before `center` to `future` days after.
pub fn days_around(center: NaiveDate, past: u32, future: u32) -> Vec<NaiveDate> {
    let start = center - Duration::days(i64::from(past));
    (0..=i64::from(past + future))
        .map(|offset| start + Duration::days(offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskColor;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn task_at(id: &str, start: &str, duration: u32) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            start_time: fixed_time(start),
            duration,
            color: TaskColor::Emerald,
            completed: false,
        }
    }

    proptest! {
        #[test]
        fn blocks_cover_the_day_without_gaps(index in 0usize..6) {
            let zoom = ZoomLevel::ALL[index];
            prop_assert_eq!(MINUTES_PER_DAY % zoom.minutes(), 0);

            let blocks = blocks_for_day(zoom);
            prop_assert_eq!(blocks.len() as u32, MINUTES_PER_DAY / zoom.minutes());
            prop_assert_eq!(blocks[0].offset_minutes, 0);
            for pair in blocks.windows(2) {
                prop_assert_eq!(pair[1].offset_minutes - pair[0].offset_minutes, zoom.minutes());
            }
            let last = blocks.last().expect("at least one block");
            prop_assert_eq!(last.offset_minutes + zoom.minutes(), MINUTES_PER_DAY);
        }
    }

    proptest! {
        #[test]
        fn overlap_matches_minute_arithmetic(
            index in 0usize..6,
            start_minute in 0u32..MINUTES_PER_DAY,
            duration in 1u32..=600,
        ) {
            let zoom = ZoomLevel::ALL[index];
            let day = date("2026-02-16");
            let task = Task {
                start_time: local_midnight(day, Tz::UTC) + Duration::minutes(i64::from(start_minute)),
                ..task_at("random", "2026-02-16T00:00:00Z", duration)
            };
            let tasks = vec![task];
            for block in blocks_for_day(zoom) {
                let expected = start_minute < block.offset_minutes + zoom.minutes()
                    && start_minute + duration > block.offset_minutes;
                let found = tasks_overlapping_block(
                    &tasks,
                    block.start_at(day, Tz::UTC),
                    block.end_at(day, zoom, Tz::UTC),
                    "2026-02-16",
                    Tz::UTC,
                );
                prop_assert_eq!(found.len() == 1, expected, "block {}", block.label);
            }
        }

        #[test]
        fn blocks_chain_from_midnight_to_midnight(
            index in 0usize..6,
            zone in 0usize..6,
            ordinal in 1u32..=365,
        ) {
            let zoom = ZoomLevel::ALL[index];
            let tz = [
                Tz::UTC,
                Tz::America__New_York,
                Tz::Europe__London,
                Tz::Asia__Tokyo,
                Tz::Australia__Sydney,
                Tz::Pacific__Auckland,
            ][zone];
            let day = NaiveDate::from_yo_opt(2026, ordinal).expect("valid ordinal");
            let next_day = day.succ_opt().expect("next day");

            let blocks = blocks_for_day(zoom);
            prop_assert_eq!(blocks[0].start_at(day, tz), local_midnight(day, tz));
            for pair in blocks.windows(2) {
                prop_assert!(pair[0].start_at(day, tz) <= pair[0].end_at(day, zoom, tz));
                prop_assert_eq!(pair[0].end_at(day, zoom, tz), pair[1].start_at(day, tz));
            }
            let last = blocks.last().expect("at least one block");
            prop_assert_eq!(last.end_at(day, zoom, tz), local_midnight(next_day, tz));
        }
    }

    #[test]
    fn spring_forward_blocks_keep_wall_clock_labels() {
        let new_york = Tz::America__New_York;
        let day = date("2026-03-08");
        let blocks = blocks_for_day(ZoomLevel::OneHour);

        for block in &blocks {
            let start = block.start_at(day, new_york);
            let end = block.end_at(day, ZoomLevel::OneHour, new_york);
            if block.offset_minutes == 2 * 60 {
                assert_eq!(start, end, "02:00 does not exist on this day");
            } else {
                assert_eq!(format_time_in_zone(start, new_york), block.label);
            }
        }
        assert_eq!(blocks[3].start_at(day, new_york), fixed_time("2026-03-08T07:00:00Z"));
        assert_eq!(
            blocks[23].end_at(day, ZoomLevel::OneHour, new_york),
            fixed_time("2026-03-09T04:00:00Z")
        );

        // 23:30 EDT on the 8th.
        let tasks = vec![task_at("late", "2026-03-09T03:30:00Z", 30)];
        let hits = blocks
            .iter()
            .filter(|block| {
                !tasks_overlapping_block(
                    &tasks,
                    block.start_at(day, new_york),
                    block.end_at(day, ZoomLevel::OneHour, new_york),
                    "2026-03-08",
                    new_york,
                )
                .is_empty()
            })
            .map(|block| block.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(hits, vec!["23:00"]);
        assert_eq!(
            current_block_offset(fixed_time("2026-03-08T07:30:00Z"), ZoomLevel::OneHour, new_york),
            3 * 60
        );
    }

    #[test]
    fn fall_back_blocks_cover_the_repeated_hour_and_the_last_hour() {
        let new_york = Tz::America__New_York;
        let day = date("2026-11-01");
        let blocks = blocks_for_day(ZoomLevel::OneHour);

        for block in &blocks {
            assert_eq!(format_time_in_zone(block.start_at(day, new_york), new_york), block.label);
        }
        assert_eq!(blocks[1].start_at(day, new_york), fixed_time("2026-11-01T05:00:00Z"));
        assert_eq!(
            blocks[1].end_at(day, ZoomLevel::OneHour, new_york),
            fixed_time("2026-11-01T07:00:00Z")
        );

        // 01:30 EST (second pass through 01:00) and 23:30 EST.
        let tasks = vec![
            task_at("repeat", "2026-11-01T06:30:00Z", 30),
            task_at("late", "2026-11-02T04:30:00Z", 30),
        ];
        let placed = |id: &str| {
            blocks
                .iter()
                .filter(|block| {
                    tasks_overlapping_block(
                        &tasks,
                        block.start_at(day, new_york),
                        block.end_at(day, ZoomLevel::OneHour, new_york),
                        "2026-11-01",
                        new_york,
                    )
                    .iter()
                    .any(|task| task.id == id)
                })
                .map(|block| block.label.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(placed("repeat"), vec!["01:00"]);
        assert_eq!(placed("late"), vec!["23:00"]);
        assert_eq!(
            current_block_offset(fixed_time("2026-11-01T06:30:00Z"), ZoomLevel::OneHour, new_york),
            60
        );
    }

    #[test]
    fn block_labels_are_clock_times() {
        let blocks = blocks_for_day(ZoomLevel::FourHours);
        let labels = blocks.iter().map(|block| block.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["00:00", "04:00", "08:00", "12:00", "16:00", "20:00"]);
        assert_eq!(blocks_for_day(ZoomLevel::FiveMinutes)[13].label, "01:05");
    }

    #[test]
    fn ninety_minute_task_spans_two_hour_blocks() {
        let tasks = vec![task_at("focus", "2026-02-16T09:00:00Z", 90)];
        let day = date("2026-02-16");
        let blocks = blocks_for_day(ZoomLevel::OneHour);
        let hits = |hour: usize| {
            let start = blocks[hour].start_at(day, Tz::UTC);
            let end = blocks[hour].end_at(day, ZoomLevel::OneHour, Tz::UTC);
            tasks_overlapping_block(&tasks, start, end, "2026-02-16", Tz::UTC).len()
        };
        assert_eq!(hits(8), 0);
        assert_eq!(hits(9), 1);
        assert_eq!(hits(10), 1);
        assert_eq!(hits(11), 0);
    }

    #[test]
    fn overlap_is_half_open_at_both_ends() {
        let tasks = vec![task_at("edge", "2026-02-16T10:00:00Z", 60)];
        let nine = fixed_time("2026-02-16T09:00:00Z");
        let ten = fixed_time("2026-02-16T10:00:00Z");
        let eleven = fixed_time("2026-02-16T11:00:00Z");
        let noon = fixed_time("2026-02-16T12:00:00Z");
        assert!(tasks_overlapping_block(&tasks, nine, ten, "2026-02-16", Tz::UTC).is_empty());
        assert!(tasks_overlapping_block(&tasks, eleven, noon, "2026-02-16", Tz::UTC).is_empty());
        assert!(tasks_overlapping_block(&tasks, ten, ten, "2026-02-16", Tz::UTC).is_empty());
    }

    #[test]
    fn overlap_ignores_tasks_on_other_local_dates() {
        // 23:30 UTC on the 15th is 08:30 on the 16th in Tokyo.
        let tasks = vec![task_at("late", "2026-02-15T23:30:00Z", 30)];
        let tokyo = Tz::Asia__Tokyo;
        let day = date("2026-02-16");
        let block = DayBlock {
            offset_minutes: 8 * 60,
            label: "08:00".to_string(),
        };
        let start = block.start_at(day, tokyo);
        let end = block.end_at(day, ZoomLevel::OneHour, tokyo);
        assert_eq!(tasks_overlapping_block(&tasks, start, end, "2026-02-16", tokyo).len(), 1);
        assert!(tasks_overlapping_block(&tasks, start, end, "2026-02-15", tokyo).is_empty());
    }

    #[test]
    fn calendar_key_uses_the_given_zone() {
        let instant = fixed_time("2026-02-15T23:30:00Z");
        assert_eq!(calendar_key(instant, Tz::UTC), "2026-02-15");
        assert_eq!(calendar_key(instant, Tz::Asia__Tokyo), "2026-02-16");
        assert_eq!(calendar_key(instant, Tz::America__New_York), "2026-02-15");
    }

    #[test]
    fn local_midnight_respects_offsets() {
        let day = date("2026-07-01");
        assert_eq!(local_midnight(day, Tz::UTC), fixed_time("2026-07-01T00:00:00Z"));
        assert_eq!(
            local_midnight(day, Tz::Europe__London),
            fixed_time("2026-06-30T23:00:00Z")
        );
    }

    #[test]
    fn current_block_offset_rounds_down_to_block_start() {
        let instant = fixed_time("2026-02-16T10:47:00Z");
        assert_eq!(current_block_offset(instant, ZoomLevel::OneHour, Tz::UTC), 600);
        assert_eq!(current_block_offset(instant, ZoomLevel::FifteenMinutes, Tz::UTC), 645);
        assert_eq!(current_block_offset(instant, ZoomLevel::FourHours, Tz::UTC), 480);
    }

    #[test]
    fn urgency_tier_thresholds() {
        assert_eq!(urgency_tier(100.0), UrgencyTier::Safe);
        assert_eq!(urgency_tier(50.1), UrgencyTier::Safe);
        assert_eq!(urgency_tier(50.0), UrgencyTier::Warning);
        assert_eq!(urgency_tier(25.0), UrgencyTier::Danger);
        assert_eq!(urgency_tier(10.0), UrgencyTier::Critical);
        assert_eq!(urgency_tier(0.0), UrgencyTier::Critical);
    }

    #[test]
    fn layout_tables_match_fixed_values() {
        let columns = ZoomLevel::ALL.map(grid_columns);
        let heights = ZoomLevel::ALL.map(block_height);
        assert_eq!(columns, [4, 4, 6, 6, 4, 3]);
        assert_eq!(heights, [80, 90, 100, 120, 150, 200]);
    }

    #[test]
    fn formatting_helpers() {
        let instant = fixed_time("2026-02-16T09:05:00Z");
        assert_eq!(format_time_in_zone(instant, Tz::Asia__Tokyo), "18:05");
        assert_eq!(timezone_display_name("America/New_York"), "New York");
        assert_eq!(timezone_display_name("America/Argentina/Buenos_Aires"), "Buenos Aires");
        assert_eq!(timezone_display_name("UTC"), "UTC");
        assert_eq!(format_countdown(1500), "25:00");
        assert_eq!(format_countdown(59), "00:59");
    }

    #[test]
    fn days_around_spans_past_and_future() {
        let days = days_around(date("2026-03-01"), SIDEBAR_PAST_DAYS, SIDEBAR_FUTURE_DAYS);
        assert_eq!(days.len(), 22);
        assert_eq!(days[0], date("2026-02-22"));
        assert_eq!(days[7], date("2026-03-01"));
        assert_eq!(days[21], date("2026-03-15"));
    }
}
