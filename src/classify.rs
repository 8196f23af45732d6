use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Priority, Task};

/// Subtask projected with its parent task's title and priority.
/// Recomputed per query for the dashboard/calendar/timeline views; never stored.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedSubtask {
    pub id: String,
    pub task_id: String,
    pub task_title: String,
    pub priority: Priority,
    pub title: String,
    pub deadline: NaiveDate,
    pub is_completed: bool,
}

/// Flattens every subtask of every task into classified form, preserving
/// task order and subtask order within each task.
pub fn flatten(tasks: &[Task]) -> Vec<ClassifiedSubtask> {
    tasks
        .iter()
        .flat_map(|task| {
            task.subtasks.iter().map(|st| ClassifiedSubtask {
                id: st.id.clone(),
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                priority: task.priority,
                title: st.title.clone(),
                deadline: st.deadline,
                is_completed: st.is_completed,
            })
        })
        .collect()
}

/// Not-completed subtasks due on `now`'s calendar day. A deadline at any
/// time of that day counts as today, never as overdue.
pub fn due_today(subtasks: &[ClassifiedSubtask], now: DateTime<Utc>) -> Vec<ClassifiedSubtask> {
    let today = now.date_naive();
    subtasks
        .iter()
        .filter(|st| !st.is_completed && st.deadline == today)
        .cloned()
        .collect()
}

/// Not-completed subtasks with deadlines after `now`'s calendar day,
/// earliest first. Equal deadlines keep input order; at most `limit` items.
pub fn upcoming(
    subtasks: &[ClassifiedSubtask],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ClassifiedSubtask> {
    let today = now.date_naive();
    let mut eligible: Vec<ClassifiedSubtask> = subtasks
        .iter()
        .filter(|st| !st.is_completed && st.deadline > today)
        .cloned()
        .collect();
    eligible.sort_by_key(|st| st.deadline);
    eligible.truncate(limit);
    eligible
}

/// Not-completed subtasks whose deadline fell before `now`'s calendar day.
pub fn overdue(subtasks: &[ClassifiedSubtask], now: DateTime<Utc>) -> Vec<ClassifiedSubtask> {
    let today = now.date_naive();
    subtasks
        .iter()
        .filter(|st| !st.is_completed && st.deadline < today)
        .cloned()
        .collect()
}

/// Not-completed subtasks of High-priority tasks, in input order.
pub fn high_priority(subtasks: &[ClassifiedSubtask]) -> Vec<ClassifiedSubtask> {
    subtasks
        .iter()
        .filter(|st| !st.is_completed && st.priority == Priority::High)
        .cloned()
        .collect()
}

pub fn completed_count(subtasks: &[ClassifiedSubtask]) -> usize {
    subtasks.iter().filter(|st| st.is_completed).count()
}

/// Full collection in deadline order for the timeline. Stable: equal
/// deadlines keep their input order.
pub fn sorted_by_deadline(subtasks: &[ClassifiedSubtask]) -> Vec<ClassifiedSubtask> {
    let mut sorted = subtasks.to_vec();
    sorted.sort_by_key(|st| st.deadline);
    sorted
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekBucket {
    pub iso_year: i32,
    pub week: u32,
    pub subtasks: Vec<ClassifiedSubtask>,
}

/// Partitions subtasks into Monday-start ISO week buckets keyed by
/// (week-based year, week number). Buckets come out in chronological order
/// with deadlines ascending inside each.
pub fn group_by_iso_week(subtasks: &[ClassifiedSubtask]) -> Vec<WeekBucket> {
    let mut buckets: BTreeMap<(i32, u32), Vec<ClassifiedSubtask>> = BTreeMap::new();
    for st in sorted_by_deadline(subtasks) {
        let week = st.deadline.iso_week();
        buckets
            .entry((week.year(), week.week()))
            .or_default()
            .push(st);
    }
    buckets
        .into_iter()
        .map(|((iso_year, week), subtasks)| WeekBucket {
            iso_year,
            week,
            subtasks,
        })
        .collect()
}
