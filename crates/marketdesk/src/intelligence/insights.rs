//! Aggregates tasks and recent comments into a [`TaskInsights`] snapshot.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::storage::*;
use marketdesk_models::*;

const MAX_SIGNALS: usize = 10;
const EXCERPT_CHARS: usize = 200;
const DUE_SOON_DAYS: i64 = 7;
const UNASSIGNED: &str = "unassigned";

/// Words in comments that usually mean something is slipping.
const FLAG_WORDS: [&str; 7] = [
    "blocked", "waiting", "delay", "stuck", "risk", "urgent", "escalate",
];

/// Loads what the builder needs from storage and builds the snapshot.
pub fn collect_insights(
    storage: &dyn StorageBackend,
    today: NaiveDate,
    window_days: i64,
) -> Result<TaskInsights, StorageError> {
    let cutoff = recent_cutoff(today, window_days);
    let tasks = storage.list_tasks(&TaskFilters::default())?;
    let comments = storage.list_comments_since(&cutoff.format("%Y-%m-%d").to_string())?;
    Ok(build_insights(&tasks, &comments, today, window_days))
}

pub fn build_insights(
    tasks: &[Task],
    comments: &[TaskComment],
    today: NaiveDate,
    window_days: i64,
) -> TaskInsights {
    let cutoff = recent_cutoff(today, window_days);
    let cutoff_str = cutoff.format("%Y-%m-%d").to_string();

    TaskInsights {
        window: InsightWindow {
            recent_cutoff: cutoff_str.clone(),
            today: today.format("%Y-%m-%d").to_string(),
        },
        totals: totals(tasks, today, cutoff),
        blockers: blockers(tasks, today),
        assignee_pressure: assignee_pressure(tasks, today),
        comment_signals: comment_signals(tasks, comments, &cutoff_str),
    }
}

/// First day of the recent window. Saturates at the earliest
/// representable date instead of overflowing.
pub fn recent_cutoff(today: NaiveDate, window_days: i64) -> NaiveDate {
    Duration::try_days(window_days)
        .and_then(|span| today.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

/// Leading `YYYY-MM-DD` of a date or RFC 3339 timestamp.
fn date_of(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()
}

fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    task.status.is_open()
        && task
            .due_date
            .as_deref()
            .and_then(date_of)
            .is_some_and(|due| due < today)
}

fn is_due_soon(task: &Task, today: NaiveDate) -> bool {
    task.status.is_open()
        && task
            .due_date
            .as_deref()
            .and_then(date_of)
            .is_some_and(|due| due >= today && due <= today + Duration::days(DUE_SOON_DAYS))
}

fn totals(tasks: &[Task], today: NaiveDate, cutoff: NaiveDate) -> InsightTotals {
    let mut totals = InsightTotals::default();
    for task in tasks {
        if task.status.is_open() {
            totals.open += 1;
        }
        if task.status == TaskStatus::Blocked {
            totals.blocked += 1;
        }
        if is_overdue(task, today) {
            totals.overdue += 1;
        }
        if task.status == TaskStatus::Done
            && date_of(&task.updated_at).is_some_and(|d| d >= cutoff)
        {
            totals.completed_recently += 1;
        }
    }
    totals
}

fn blockers(tasks: &[Task], today: NaiveDate) -> Vec<BlockerSignal> {
    let mut blocked: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Blocked)
        .collect();
    // Highest priority first, then whatever has been stuck longest.
    blocked.sort_by(|a, b| {
        a.priority
            .sort_order()
            .cmp(&b.priority.sort_order())
            .then_with(|| a.updated_at.cmp(&b.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    blocked
        .into_iter()
        .take(MAX_SIGNALS)
        .map(|t| BlockerSignal {
            task_id: t.id.clone(),
            task: t.title.clone(),
            reason: t.blocked_reason.clone(),
            dependency: t.dependency.clone(),
            assignee_id: t.assignee_id.clone(),
            priority: t.priority,
            days_blocked: date_of(&t.updated_at)
                .map(|d| (today - d).num_days().max(0))
                .unwrap_or(0),
        })
        .collect()
}

fn assignee_pressure(tasks: &[Task], today: NaiveDate) -> Vec<AssigneePressure> {
    let mut by_assignee: BTreeMap<&str, AssigneePressure> = BTreeMap::new();
    for task in tasks.iter().filter(|t| t.status.is_open()) {
        let key = task.assignee_id.as_deref().unwrap_or(UNASSIGNED);
        let entry = by_assignee.entry(key).or_insert_with(|| AssigneePressure {
            assignee_id: key.to_string(),
            open: 0,
            overdue: 0,
            blocked: 0,
            due_soon: 0,
            pressure: 0,
        });
        entry.open += 1;
        if is_overdue(task, today) {
            entry.overdue += 1;
        }
        if task.status == TaskStatus::Blocked {
            entry.blocked += 1;
        }
        if is_due_soon(task, today) {
            entry.due_soon += 1;
        }
    }

    let mut pressure: Vec<AssigneePressure> = by_assignee
        .into_values()
        .map(|mut p| {
            p.pressure = p.open + 2 * p.overdue + 2 * p.blocked;
            p
        })
        .collect();
    pressure.sort_by(|a, b| {
        b.pressure
            .cmp(&a.pressure)
            .then_with(|| a.assignee_id.cmp(&b.assignee_id))
    });
    pressure.truncate(MAX_SIGNALS);
    pressure
}

fn comment_signals(tasks: &[Task], comments: &[TaskComment], cutoff: &str) -> Vec<CommentSignal> {
    let titles: HashMap<&str, &str> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.title.as_str()))
        .collect();

    let mut grouped: BTreeMap<&str, Vec<&TaskComment>> = BTreeMap::new();
    for comment in comments.iter().filter(|c| c.created_at.as_str() >= cutoff) {
        grouped.entry(comment.task_id.as_str()).or_default().push(comment);
    }

    let mut signals: Vec<CommentSignal> = grouped
        .into_iter()
        .map(|(task_id, mut items)| {
            items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            let latest = items.last().map(|c| excerpt(&c.body)).unwrap_or_default();
            let lowered: Vec<String> = items.iter().map(|c| c.body.to_lowercase()).collect();
            let flags = FLAG_WORDS
                .iter()
                .filter(|word| lowered.iter().any(|body| body.contains(*word)))
                .map(|word| word.to_string())
                .collect();
            CommentSignal {
                task_id: task_id.to_string(),
                task: titles.get(task_id).copied().unwrap_or(task_id).to_string(),
                comments: items.len() as i64,
                latest_excerpt: latest,
                flags,
            }
        })
        .collect();

    signals.sort_by(|a, b| {
        b.comments
            .cmp(&a.comments)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    signals.truncate(MAX_SIGNALS);
    signals
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(EXCERPT_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, status: TaskStatus, priority: Priority) -> Task {
        Task {
            id: id.into(),
            title: format!("Task {id}"),
            description: None,
            status,
            priority,
            assignee_id: None,
            due_date: None,
            blocked_reason: None,
            dependency: None,
            created_by: "u1".into(),
            created_at: "2026-10-01T09:00:00.000000Z".into(),
            updated_at: "2026-10-10T09:00:00.000000Z".into(),
        }
    }

    fn comment(id: &str, task_id: &str, body: &str, at: &str) -> TaskComment {
        TaskComment {
            id: id.into(),
            task_id: task_id.into(),
            author_id: "u1".into(),
            body: body.into(),
            created_at: at.into(),
        }
    }

    #[test]
    fn window_spans_configured_days() {
        let insights = build_insights(&[], &[], day("2026-10-16"), 7);
        assert_eq!(insights.window.today, "2026-10-16");
        assert_eq!(insights.window.recent_cutoff, "2026-10-09");
        assert_eq!(insights.totals, InsightTotals::default());
    }

    #[test]
    fn oversized_window_saturates_instead_of_overflowing() {
        let today = day("2026-10-16");
        assert_eq!(recent_cutoff(today, 1_000_000_000), NaiveDate::MIN);
        assert_eq!(recent_cutoff(today, i64::MAX), NaiveDate::MIN);

        let tasks = vec![task("t1", TaskStatus::Done, Priority::Low)];
        let insights = build_insights(&tasks, &[], today, 1_000_000_000);
        assert_eq!(insights.window.today, "2026-10-16");
        assert_eq!(insights.totals.completed_recently, 1);
    }

    #[test]
    fn blockers_rank_priority_then_age() {
        let mut old_medium = task("a", TaskStatus::Blocked, Priority::Medium);
        old_medium.updated_at = "2026-10-01T00:00:00.000000Z".into();
        let mut new_critical = task("b", TaskStatus::Blocked, Priority::Critical);
        new_critical.updated_at = "2026-10-15T00:00:00.000000Z".into();
        let mut older_critical = task("c", TaskStatus::Blocked, Priority::Critical);
        older_critical.updated_at = "2026-10-12T00:00:00.000000Z".into();
        older_critical.blocked_reason = Some("Creative not approved".into());
        let open = task("d", TaskStatus::Todo, Priority::Critical);

        let insights = build_insights(
            &[old_medium, new_critical, older_critical, open],
            &[],
            day("2026-10-16"),
            7,
        );
        let order: Vec<&str> = insights.blockers.iter().map(|b| b.task_id.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
        assert_eq!(insights.blockers[0].days_blocked, 4);
        assert_eq!(
            insights.blockers[0].reason.as_deref(),
            Some("Creative not approved")
        );
        assert_eq!(insights.totals.blocked, 3);
        assert_eq!(insights.totals.open, 4);
    }

    #[test]
    fn assignee_pressure_weights_overdue_and_blocked() {
        let mut t1 = task("1", TaskStatus::Todo, Priority::Low);
        t1.assignee_id = Some("ana".into());
        t1.due_date = Some("2026-10-10".into()); // overdue
        let mut t2 = task("2", TaskStatus::Blocked, Priority::Low);
        t2.assignee_id = Some("ana".into());
        let mut t3 = task("3", TaskStatus::InProgress, Priority::Low);
        t3.assignee_id = Some("ben".into());
        t3.due_date = Some("2026-10-20".into()); // due soon
        let mut done = task("4", TaskStatus::Done, Priority::Low);
        done.assignee_id = Some("ben".into());
        let unassigned = task("5", TaskStatus::Todo, Priority::Low);

        let insights = build_insights(&[t1, t2, t3, done, unassigned], &[], day("2026-10-16"), 7);
        let ana = &insights.assignee_pressure[0];
        assert_eq!(ana.assignee_id, "ana");
        assert_eq!((ana.open, ana.overdue, ana.blocked), (2, 1, 1));
        assert_eq!(ana.pressure, 6);

        let rest: Vec<(&str, i64, i64)> = insights.assignee_pressure[1..]
            .iter()
            .map(|p| (p.assignee_id.as_str(), p.pressure, p.due_soon))
            .collect();
        assert_eq!(rest, vec![("ben", 1, 1), ("unassigned", 1, 0)]);
        assert_eq!(insights.totals.overdue, 1);
        assert_eq!(insights.totals.completed_recently, 1);
    }

    #[test]
    fn comment_signals_group_and_flag() {
        let tasks = vec![task("t1", TaskStatus::Todo, Priority::High)];
        let comments = vec![
            comment("c1", "t1", "Still WAITING on the agency", "2026-10-12T10:00:00.000000Z"),
            comment("c2", "t1", "Risk: launch may slip", "2026-10-14T10:00:00.000000Z"),
            comment("c3", "t2", "fyi", "2026-10-13T10:00:00.000000Z"),
            comment("c0", "t2", "old news, blocked", "2026-09-01T10:00:00.000000Z"),
        ];
        let insights = build_insights(&tasks, &comments, day("2026-10-16"), 7);
        assert_eq!(insights.comment_signals.len(), 2);

        let first = &insights.comment_signals[0];
        assert_eq!(first.task_id, "t1");
        assert_eq!(first.task, "Task t1");
        assert_eq!(first.comments, 2);
        assert_eq!(first.latest_excerpt, "Risk: launch may slip");
        assert_eq!(first.flags, vec!["waiting".to_string(), "risk".to_string()]);

        // unknown task falls back to its id; comments before the cutoff are ignored
        let second = &insights.comment_signals[1];
        assert_eq!(second.task, "t2");
        assert_eq!(second.comments, 1);
        assert!(second.flags.is_empty());
    }

    #[test]
    fn long_comments_are_excerpted() {
        let body = "x".repeat(250);
        let out = excerpt(&body);
        assert_eq!(out.chars().count(), EXCERPT_CHARS);
        assert!(out.ends_with('…'));
    }
}
