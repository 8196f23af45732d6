use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::DailyTask;

/// Earliest task date kept: `today` and the six days before it.
pub fn retention_floor(today: NaiveDate) -> NaiveDate {
    today - Duration::days(6)
}

/// True iff `task_date` is inside the trailing 7-day window ending at
/// `today`. Future dates are always retained.
pub fn is_within_retention(task_date: NaiveDate, today: NaiveDate) -> bool {
    task_date >= retention_floor(today)
}

/// Splits into `(keep, purge)`. Only the task date decides; completion state
/// is irrelevant. Re-running on `keep` purges nothing.
pub fn partition_for_purge(
    daily_tasks: &[DailyTask],
    today: NaiveDate,
) -> (Vec<DailyTask>, Vec<DailyTask>) {
    daily_tasks
        .iter()
        .cloned()
        .partition(|t| is_within_retention(t.task_date, today))
}

/// Tasks dated exactly `date`, in input order.
pub fn tasks_for_date(daily_tasks: &[DailyTask], date: NaiveDate) -> Vec<DailyTask> {
    daily_tasks
        .iter()
        .filter(|t| t.task_date == date)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub tasks: Vec<DailyTask>,
}

/// One group per calendar date of the trailing window ending at `today`,
/// newest date first. Tasks inside a group are in creation order; dates
/// without tasks are omitted.
pub fn group_by_recent_date(
    daily_tasks: &[DailyTask],
    today: NaiveDate,
    window_days: u32,
) -> Vec<DateGroup> {
    (0..i64::from(window_days))
        .filter_map(|offset| {
            let date = today - Duration::days(offset);
            let mut tasks = tasks_for_date(daily_tasks, date);
            if tasks.is_empty() {
                return None;
            }
            tasks.sort_by_key(|t| t.created_at);
            Some(DateGroup { date, tasks })
        })
        .collect()
}
