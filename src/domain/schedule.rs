use crate::domain::models::{Preferences, Recurrence, Task, TaskStatus, TaskType};
use crate::domain::time::{has_passed, is_within_range, minutes_of, time_to_minutes};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// A time-bound task counts as running within this many minutes of its start
/// time, and the window wins over "has passed". Fixed policy, not a setting.
pub const RUNNING_WINDOW_MINUTES: i64 = 15;
/// Assumed duration of a time-bound task when computing overlap intervals.
pub const ASSUMED_DURATION_MINUTES: i64 = 60;

const OFFICE_SLOT_ID: &str = "office-session";
const OFFICE_SLOT_TITLE: &str = "Office Hours";
const STUDY_SLOT_TITLE: &str = "Study Time";

pub fn classify_task(task: &Task, now: NaiveDateTime) -> TaskStatus {
    if task.completed {
        return TaskStatus::Completed;
    }

    let today = now.date();
    let task_date = task.date.unwrap_or(today);
    if task_date > today {
        return TaskStatus::Upcoming;
    }
    if task_date < today {
        return TaskStatus::Old;
    }

    let now_minutes = minutes_of(now.time());
    match task.task_type {
        TaskType::Floating | TaskType::Unknown => TaskStatus::Upcoming,
        TaskType::TimeBound => {
            let Some(target) = task.time.as_deref().and_then(time_to_minutes) else {
                return TaskStatus::Upcoming;
            };
            let diff = i64::from(target) - i64::from(now_minutes);
            if diff.abs() <= RUNNING_WINDOW_MINUTES {
                TaskStatus::Running
            } else if now_minutes > target {
                TaskStatus::Old
            } else {
                TaskStatus::Upcoming
            }
        }
        TaskType::TimeRange => {
            let (Some(start), Some(end)) = (task.start_time.as_deref(), task.end_time.as_deref())
            else {
                return TaskStatus::Upcoming;
            };
            if is_within_range(start, end, now_minutes) {
                TaskStatus::Running
            } else if has_passed(end, now_minutes) {
                TaskStatus::Old
            } else {
                TaskStatus::Upcoming
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Categorized {
    pub running: Vec<Task>,
    pub upcoming: Vec<Task>,
    pub old: Vec<Task>,
    pub completed: Vec<Task>,
}

pub fn categorize(tasks: &[Task], now: NaiveDateTime) -> Categorized {
    let mut categorized = Categorized::default();
    for task in tasks {
        match classify_task(task, now) {
            TaskStatus::Running => categorized.running.push(task.clone()),
            TaskStatus::Upcoming => categorized.upcoming.push(task.clone()),
            TaskStatus::Old => categorized.old.push(task.clone()),
            TaskStatus::Completed => categorized.completed.push(task.clone()),
        }
    }

    categorized.running.sort_by(|left, right| {
        if left.task_type == TaskType::TimeBound && right.task_type == TaskType::TimeBound {
            minutes_or_max(left.time.as_deref()).cmp(&minutes_or_max(right.time.as_deref()))
        } else {
            Ordering::Equal
        }
    });

    categorized.upcoming.sort_by(|left, right| {
        if let (Some(left_date), Some(right_date)) = (left.date, right.date) {
            let by_date = left_date.cmp(&right_date);
            if by_date != Ordering::Equal {
                return by_date;
            }
        }
        match (left.task_type, right.task_type) {
            (TaskType::TimeBound, TaskType::TimeBound) => {
                minutes_or_max(left.time.as_deref()).cmp(&minutes_or_max(right.time.as_deref()))
            }
            (TaskType::TimeRange, TaskType::TimeRange) => {
                minutes_or_max(left.start_time.as_deref())
                    .cmp(&minutes_or_max(right.start_time.as_deref()))
            }
            _ => Ordering::Equal,
        }
    });

    categorized
        .old
        .sort_by(|left, right| lapse_key(right).cmp(&lapse_key(left)));

    categorized
        .completed
        .sort_by(|left, right| right.completed_at.cmp(&left.completed_at));

    categorized
}

fn minutes_or_max(time: Option<&str>) -> u32 {
    time.and_then(time_to_minutes).unwrap_or(u32::MAX)
}

fn lapse_key(task: &Task) -> NaiveDateTime {
    task.date
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_else(|| task.created_at.naive_utc())
}

/// Whether a recurring parent is due for a fresh instance today. Instances
/// themselves never spawn, and one instance per parent per calendar day is
/// enforced through the parent's last-instance stamp.
pub fn should_create_instance(parent: &Task, today: NaiveDate) -> bool {
    if parent.parent_task_id.is_some() {
        return false;
    }
    if !parent.recurrence.applies_on(weekday_index(today)) {
        return false;
    }
    match parent.last_daily_instance {
        Some(stamp) => local_date_of(stamp) != today,
        None => true,
    }
}

/// Clones the parent into a concrete dated instance. The id and timestamp are
/// supplied by the caller, as is persisting the instance and stamping the
/// parent's last-instance marker.
pub fn materialize_instance(
    parent: &Task,
    today: NaiveDate,
    id: String,
    created_at: DateTime<Utc>,
) -> Task {
    let mut instance = parent.clone();
    instance.id = id;
    instance.date = Some(today);
    instance.end_date = None;
    instance.completed = false;
    instance.completed_at = None;
    instance.recurrence = Recurrence::None;
    instance.parent_task_id = Some(parent.id.clone());
    instance.last_daily_instance = None;
    instance.moved_count = 0;
    instance.created_at = created_at;
    instance
}

/// Relocates a stale task to tomorrow. Locked tasks come back unchanged.
pub fn auto_move(task: &Task, today: NaiveDate) -> Task {
    if task.locked {
        return task.clone();
    }
    let mut moved = task.clone();
    moved.date = Some(today + Duration::days(1));
    moved.moved_count += 1;
    moved
}

pub fn find_conflicts(
    candidate: &Task,
    existing_tasks: &[Task],
    exclude_id: Option<&str>,
) -> Vec<Task> {
    let Some((candidate_start, candidate_end)) = task_interval(candidate) else {
        return Vec::new();
    };

    existing_tasks
        .iter()
        .filter(|task| exclude_id != Some(task.id.as_str()))
        .filter(|task| !task.completed)
        .filter_map(|task| task_interval(task).map(|interval| (task, interval)))
        .filter(|(_, (start, end))| candidate_start < *end && candidate_end > *start)
        .map(|(task, _)| task.clone())
        .collect()
}

/// Occupied interval of a task, if it has one. Floating tasks and tasks with
/// missing or malformed temporal fields yield none and drop out of conflict
/// checks instead of aborting them.
fn task_interval(task: &Task) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let date = task.date?;
    match task.task_type {
        TaskType::TimeBound => {
            let start = date.and_time(wall_clock(task.time.as_deref()?)?);
            Some((start, start + Duration::minutes(ASSUMED_DURATION_MINUTES)))
        }
        TaskType::TimeRange => {
            let start = date.and_time(wall_clock(task.start_time.as_deref()?)?);
            let end_date = task.end_date.unwrap_or(date);
            let end = end_date.and_time(wall_clock(task.end_time.as_deref()?)?);
            Some((start, end))
        }
        TaskType::Floating | TaskType::Unknown => None,
    }
}

fn wall_clock(value: &str) -> Option<NaiveTime> {
    let minutes = time_to_minutes(value)?;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Office,
    Study,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSlot {
    pub id: String,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: SlotKind,
}

/// Recurring availability windows (office hours and study slots) in effect at
/// the given instant. An overnight window that began yesterday still counts
/// until its end time this morning.
pub fn resolve_active_slots(preferences: &Preferences, now: NaiveDateTime) -> Vec<ActiveSlot> {
    let today = weekday_index(now.date());
    let yesterday = (today + 6) % 7;
    let now_minutes = minutes_of(now.time());
    let mut slots = Vec::new();

    if let (Some(start), Some(end)) = (
        preferences.office_start_time.as_deref(),
        preferences.office_end_time.as_deref(),
    ) {
        if window_active(start, end, &preferences.office_days, today, yesterday, now_minutes) {
            slots.push(ActiveSlot {
                id: OFFICE_SLOT_ID.to_string(),
                title: OFFICE_SLOT_TITLE.to_string(),
                start_time: start.to_string(),
                end_time: end.to_string(),
                icon: "briefcase".to_string(),
                kind: SlotKind::Office,
            });
        }
    }

    for (index, slot) in preferences.study_slots.iter().enumerate() {
        if window_active(&slot.start, &slot.end, &slot.days, today, yesterday, now_minutes) {
            slots.push(ActiveSlot {
                id: format!("study-session-{index}"),
                title: STUDY_SLOT_TITLE.to_string(),
                start_time: slot.start.clone(),
                end_time: slot.end.clone(),
                icon: "book".to_string(),
                kind: SlotKind::Study,
            });
        }
    }

    slots
}

fn window_active(
    start: &str,
    end: &str,
    days: &[u8],
    today: u8,
    yesterday: u8,
    now_minutes: u32,
) -> bool {
    let (Some(start), Some(end)) = (time_to_minutes(start), time_to_minutes(end)) else {
        return false;
    };
    let overnight = end < start;
    if overnight {
        (days.contains(&today) && now_minutes >= start)
            || (days.contains(&yesterday) && now_minutes <= end)
    } else {
        days.contains(&today) && now_minutes >= start && now_minutes <= end
    }
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn local_date_of(stamp: DateTime<Utc>) -> NaiveDate {
    stamp.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::StudySlot;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    // Wednesday.
    const TODAY: (i32, u32, u32) = (2026, 8, 5);

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    fn at(hours: u32, minutes: u32) -> NaiveDateTime {
        today()
            .and_hms_opt(hours, minutes, 0)
            .expect("valid wall clock")
    }

    fn fixed_stamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn floating(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            task_type: TaskType::Floating,
            date: Some(today()),
            end_date: None,
            time: None,
            start_time: None,
            end_time: None,
            locked: false,
            completed: false,
            completed_at: None,
            recurrence: Recurrence::None,
            parent_task_id: None,
            last_daily_instance: None,
            moved_count: 0,
            created_at: fixed_stamp("2026-08-01T08:00:00Z"),
        }
    }

    fn time_bound(id: &str, time: &str) -> Task {
        let mut task = floating(id);
        task.task_type = TaskType::TimeBound;
        task.time = Some(time.to_string());
        task
    }

    fn time_range(id: &str, start: &str, end: &str) -> Task {
        let mut task = floating(id);
        task.task_type = TaskType::TimeRange;
        task.start_time = Some(start.to_string());
        task.end_time = Some(end.to_string());
        task
    }

    #[test]
    fn completed_wins_over_every_temporal_field() {
        let mut task = time_bound("t", "not-a-time");
        task.completed = true;
        task.date = Some(date(1999, 1, 1));
        assert_eq!(classify_task(&task, at(12, 0)), TaskStatus::Completed);

        task.date = None;
        assert_eq!(classify_task(&task, at(12, 0)), TaskStatus::Completed);
    }

    #[test]
    fn dates_outside_today_decide_before_times() {
        let mut task = time_bound("t", "12:00");
        task.date = Some(date(2026, 8, 6));
        assert_eq!(classify_task(&task, at(12, 0)), TaskStatus::Upcoming);

        task.date = Some(date(2026, 8, 4));
        assert_eq!(classify_task(&task, at(12, 0)), TaskStatus::Old);
    }

    #[test]
    fn floating_today_is_always_upcoming() {
        assert_eq!(classify_task(&floating("t"), at(23, 59)), TaskStatus::Upcoming);
    }

    #[test]
    fn running_window_wins_over_has_passed() {
        // 10 minutes past the start time is still running, 20 minutes is old.
        assert_eq!(
            classify_task(&time_bound("t", "11:50"), at(12, 0)),
            TaskStatus::Running
        );
        assert_eq!(
            classify_task(&time_bound("t", "11:40"), at(12, 0)),
            TaskStatus::Old
        );
        assert_eq!(
            classify_task(&time_bound("t", "12:15"), at(12, 0)),
            TaskStatus::Running
        );
        assert_eq!(
            classify_task(&time_bound("t", "12:16"), at(12, 0)),
            TaskStatus::Upcoming
        );
    }

    #[test]
    fn time_bound_without_time_is_upcoming() {
        let mut task = time_bound("t", "");
        assert_eq!(classify_task(&task, at(12, 0)), TaskStatus::Upcoming);
        task.time = None;
        assert_eq!(classify_task(&task, at(12, 0)), TaskStatus::Upcoming);
    }

    #[test]
    fn time_range_classification_is_inclusive_and_same_day() {
        let task = time_range("t", "10:00", "14:00");
        assert_eq!(classify_task(&task, at(10, 0)), TaskStatus::Running);
        assert_eq!(classify_task(&task, at(14, 0)), TaskStatus::Running);
        assert_eq!(classify_task(&task, at(9, 59)), TaskStatus::Upcoming);
        assert_eq!(classify_task(&task, at(14, 1)), TaskStatus::Old);

        let mut missing_end = task.clone();
        missing_end.end_time = None;
        assert_eq!(classify_task(&missing_end, at(12, 0)), TaskStatus::Upcoming);
    }

    #[test]
    fn running_bucket_orders_time_bound_by_start() {
        let tasks = vec![
            time_range("range", "11:50", "12:30"),
            time_bound("later", "12:10"),
            time_bound("sooner", "11:55"),
        ];
        let categorized = categorize(&tasks, at(12, 0));
        let ids: Vec<&str> = categorized
            .running
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        // Mixed types keep their relative input position; time-bound pairs
        // order by start time.
        assert_eq!(ids, vec!["range", "sooner", "later"]);
    }

    #[test]
    fn upcoming_bucket_orders_by_date_then_same_type_time() {
        let mut next_week = time_bound("next-week", "08:00");
        next_week.date = Some(date(2026, 8, 12));
        let mut tomorrow_late = time_bound("tomorrow-late", "18:00");
        tomorrow_late.date = Some(date(2026, 8, 6));
        let mut tomorrow_early = time_bound("tomorrow-early", "07:00");
        tomorrow_early.date = Some(date(2026, 8, 6));

        let categorized = categorize(
            &[next_week, tomorrow_late, tomorrow_early],
            at(12, 0),
        );
        let ids: Vec<&str> = categorized
            .upcoming
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(ids, vec!["tomorrow-early", "tomorrow-late", "next-week"]);
    }

    #[test]
    fn old_bucket_orders_most_recently_lapsed_first() {
        let mut last_week = floating("last-week");
        last_week.date = Some(date(2026, 7, 29));
        let mut yesterday = floating("yesterday");
        yesterday.date = Some(date(2026, 8, 4));

        let categorized = categorize(&[last_week, yesterday], at(12, 0));
        let ids: Vec<&str> = categorized
            .old
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(ids, vec!["yesterday", "last-week"]);
    }

    #[test]
    fn completed_bucket_orders_most_recently_finished_first() {
        let mut first = floating("first");
        first.completed = true;
        first.completed_at = Some(fixed_stamp("2026-08-05T09:00:00Z"));
        let mut second = floating("second");
        second.completed = true;
        second.completed_at = Some(fixed_stamp("2026-08-05T11:00:00Z"));

        let categorized = categorize(&[first, second], at(12, 0));
        let ids: Vec<&str> = categorized
            .completed
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[test]
    fn categorize_is_idempotent_for_a_fixed_clock() {
        let mut done = floating("done");
        done.completed = true;
        done.completed_at = Some(fixed_stamp("2026-08-04T20:00:00Z"));
        let mut stale = time_bound("stale", "08:00");
        stale.date = Some(date(2026, 8, 1));
        let tasks = vec![
            time_bound("morning", "09:00"),
            time_range("midday", "11:00", "13:00"),
            floating("loose"),
            stale,
            done,
        ];

        let now = at(12, 0);
        let first = categorize(&tasks, now);
        let mut replay = Vec::new();
        replay.extend(first.running.iter().cloned());
        replay.extend(first.upcoming.iter().cloned());
        replay.extend(first.old.iter().cloned());
        replay.extend(first.completed.iter().cloned());

        assert_eq!(categorize(&replay, now), first);
    }

    #[test]
    fn weekly_parent_spawns_only_on_scheduled_weekday() {
        let mut parent = floating("parent");
        parent.recurrence = Recurrence::Weekly(BTreeSet::from([3]));
        assert!(should_create_instance(&parent, today()));
        // Thursday is not in the weekday set.
        assert!(!should_create_instance(&parent, date(2026, 8, 6)));
    }

    #[test]
    fn daily_parent_spawns_until_stamped_for_today() {
        let mut parent = floating("parent");
        parent.recurrence = Recurrence::Daily;
        assert!(should_create_instance(&parent, today()));

        let noon_today = Local
            .with_ymd_and_hms(TODAY.0, TODAY.1, TODAY.2, 12, 0, 0)
            .single()
            .expect("valid local time")
            .with_timezone(&Utc);
        parent.last_daily_instance = Some(noon_today);
        assert!(!should_create_instance(&parent, today()));
        // A stamp from an earlier day no longer blocks.
        assert!(should_create_instance(&parent, date(2026, 8, 6)));
    }

    #[test]
    fn instances_and_non_recurring_tasks_never_spawn() {
        let mut instance = floating("instance");
        instance.parent_task_id = Some("parent".to_string());
        assert!(!should_create_instance(&instance, today()));
        assert!(!should_create_instance(&floating("plain"), today()));
    }

    // Known gap: the instance write and the parent stamp are two separate
    // persistence calls. If the stamp write is lost, the next evaluation
    // spawns a duplicate instance for the same day.
    #[test]
    fn unstamped_parent_spawns_again_on_reevaluation() {
        let mut parent = floating("parent");
        parent.recurrence = Recurrence::Daily;
        assert!(should_create_instance(&parent, today()));
        assert!(should_create_instance(&parent, today()));
    }

    #[test]
    fn materialized_instance_is_a_plain_dated_task() {
        let mut parent = time_bound("parent", "09:30");
        parent.recurrence = Recurrence::Weekly(BTreeSet::from([3]));
        parent.last_daily_instance = Some(fixed_stamp("2026-07-29T09:00:00Z"));
        parent.moved_count = 4;

        let created_at = fixed_stamp("2026-08-05T06:00:00Z");
        let instance =
            materialize_instance(&parent, today(), "task-instance".to_string(), created_at);
        assert_eq!(instance.id, "task-instance");
        assert_eq!(instance.date, Some(today()));
        assert_eq!(instance.parent_task_id, Some("parent".to_string()));
        assert_eq!(instance.recurrence, Recurrence::None);
        assert_eq!(instance.last_daily_instance, None);
        assert_eq!(instance.moved_count, 0);
        assert_eq!(instance.time, parent.time);
        assert!(!instance.completed);
    }

    #[test]
    fn auto_move_leaves_locked_tasks_untouched() {
        let mut task = floating("locked");
        task.locked = true;
        task.date = Some(date(2026, 8, 1));
        task.moved_count = 2;
        assert_eq!(auto_move(&task, today()), task);
    }

    #[test]
    fn auto_move_advances_one_day_and_counts() {
        let mut task = floating("stale");
        task.date = Some(date(2026, 8, 1));
        task.moved_count = 2;

        let moved = auto_move(&task, today());
        assert_eq!(moved.date, Some(date(2026, 8, 6)));
        assert_eq!(moved.moved_count, 3);
        assert_eq!(moved.id, task.id);
    }

    #[test]
    fn adjacent_hour_slots_with_assumed_duration_conflict_both_ways() {
        let first = time_bound("first", "09:30");
        let second = time_bound("second", "10:00");

        let conflicts = find_conflicts(&first, std::slice::from_ref(&second), None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "second");

        let conflicts = find_conflicts(&second, std::slice::from_ref(&first), None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "first");
    }

    #[test]
    fn back_to_back_hours_do_not_conflict() {
        let first = time_bound("first", "09:00");
        let second = time_bound("second", "10:00");
        assert!(find_conflicts(&first, &[second], None).is_empty());
    }

    #[test]
    fn floating_tasks_never_conflict_in_either_direction() {
        let candidate = floating("candidate");
        let busy = time_bound("busy", "10:00");
        assert!(find_conflicts(&candidate, &[busy], None).is_empty());

        let candidate = time_bound("candidate", "10:00");
        let loose = floating("loose");
        assert!(find_conflicts(&candidate, &[loose], None).is_empty());
    }

    #[test]
    fn conflicts_skip_excluded_completed_and_malformed_tasks() {
        let candidate = time_bound("candidate", "10:00");
        let same = time_bound("candidate", "10:15");
        let mut finished = time_bound("finished", "10:15");
        finished.completed = true;
        let mut broken = time_bound("broken", "10:15");
        broken.time = Some("junk".to_string());
        let live = time_bound("live", "10:15");

        let conflicts = find_conflicts(
            &candidate,
            &[same, finished, broken, live],
            Some("candidate"),
        );
        let ids: Vec<&str> = conflicts.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["live"]);
    }

    #[test]
    fn overnight_range_conflicts_with_next_morning_task() {
        let mut overnight = time_range("overnight", "22:00", "02:00");
        overnight.end_date = Some(date(2026, 8, 6));
        let mut early = time_bound("early", "01:30");
        early.date = Some(date(2026, 8, 6));

        let conflicts = find_conflicts(&overnight, std::slice::from_ref(&early), None);
        assert_eq!(conflicts.len(), 1);

        let mut after = time_bound("after", "02:00");
        after.date = Some(date(2026, 8, 6));
        assert!(find_conflicts(&overnight, &[after], None).is_empty());
    }

    #[test]
    fn same_day_office_window_requires_today_in_days() {
        let preferences = Preferences {
            office_start_time: Some("09:00".to_string()),
            office_end_time: Some("17:00".to_string()),
            // Wednesday only.
            office_days: vec![3],
            ..Preferences::default()
        };
        let slots = resolve_active_slots(&preferences, at(12, 0));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, OFFICE_SLOT_ID);
        assert_eq!(slots[0].kind, SlotKind::Office);

        // Thursday noon: same window, wrong day.
        let thursday_noon = date(2026, 8, 6).and_hms_opt(12, 0, 0).expect("valid time");
        assert!(resolve_active_slots(&preferences, thursday_noon).is_empty());
    }

    #[test]
    fn overnight_slot_begun_yesterday_is_active_after_midnight() {
        let preferences = Preferences {
            study_slots: vec![StudySlot {
                start: "22:00".to_string(),
                end: "01:00".to_string(),
                // Monday.
                days: vec![1],
            }],
            ..Preferences::default()
        };

        // Monday 2026-08-03 23:00, started today.
        let monday_night = date(2026, 8, 3).and_hms_opt(23, 0, 0).expect("valid time");
        assert_eq!(resolve_active_slots(&preferences, monday_night).len(), 1);

        // Tuesday 01:00, carried over from Monday.
        let tuesday_early = date(2026, 8, 4).and_hms_opt(1, 0, 0).expect("valid time");
        let slots = resolve_active_slots(&preferences, tuesday_early);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "study-session-0");

        // Tuesday 01:30 is past the end of the carried-over window.
        let tuesday_later = date(2026, 8, 4).and_hms_opt(1, 30, 0).expect("valid time");
        assert!(resolve_active_slots(&preferences, tuesday_later).is_empty());

        // Tuesday 23:00: Tuesday is not a scheduled day.
        let tuesday_night = date(2026, 8, 4).and_hms_opt(23, 0, 0).expect("valid time");
        assert!(resolve_active_slots(&preferences, tuesday_night).is_empty());
    }

    #[test]
    fn concurrent_office_and_study_slots_are_all_reported() {
        let preferences = Preferences {
            office_start_time: Some("09:00".to_string()),
            office_end_time: Some("17:00".to_string()),
            office_days: vec![3],
            study_slots: vec![
                StudySlot {
                    start: "11:00".to_string(),
                    end: "13:00".to_string(),
                    days: vec![3],
                },
                StudySlot {
                    start: "18:00".to_string(),
                    end: "20:00".to_string(),
                    days: vec![3],
                },
            ],
            ..Preferences::default()
        };
        let slots = resolve_active_slots(&preferences, at(12, 0));
        let ids: Vec<&str> = slots.iter().map(|slot| slot.id.as_str()).collect();
        assert_eq!(ids, vec![OFFICE_SLOT_ID, "study-session-0"]);
    }

    #[test]
    fn weekday_index_is_sunday_based() {
        // 2026-08-02 is a Sunday.
        assert_eq!(weekday_index(date(2026, 8, 2)), 0);
        assert_eq!(weekday_index(today()), 3);
        assert_eq!(weekday_index(date(2026, 8, 8)), 6);
    }
}
