use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::storage::StorageError;
use marketdesk_models::*;

type Result<T> = std::result::Result<T, StorageError>;

// --- Helpers ---

/// Fixed-width UTC timestamp so string order matches time order.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn enum_column<T>(
    idx: usize,
    raw: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value '{raw}'").into(),
        )
    })
}

fn json_column(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<serde_json::Value>> {
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
        })
    })
    .transpose()
}

// --- Profiles & sessions ---

const PROFILE_COLS: &str = "id, email, display_name, role, created_at";

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role: enum_column(3, row.get(3)?, Role::from_str)?,
        created_at: row.get(4)?,
    })
}

pub fn create_profile(conn: &Connection, input: &CreateProfile) -> Result<Profile> {
    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(StorageError::Invalid(format!(
            "Invalid email '{}'",
            input.email
        )));
    }
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO profiles (id, email, display_name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, email, input.display_name, input.role.as_str(), now()],
    )?;
    get_profile(conn, &id)?.ok_or_else(|| StorageError::Other("profile vanished after insert".into()))
}

pub fn get_profile(conn: &Connection, id: &str) -> Result<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLS} FROM profiles WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_profile).optional()?)
}

pub fn list_profiles_by_role(conn: &Connection, role: Role) -> Result<Vec<Profile>> {
    let sql = format!("SELECT {PROFILE_COLS} FROM profiles WHERE role = ?1 ORDER BY created_at");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![role.as_str()], row_to_profile)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Issues a new session for `user_id`. The plain token is returned once;
/// only its hash is stored.
pub fn create_session(conn: &Connection, user_id: &str) -> Result<String> {
    let token = format!("mds_{}", Uuid::new_v4().simple());
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![hash_token(&token), user_id, now()],
    )?;
    Ok(token)
}

/// Resolves a token hash to the session's user id and email.
pub fn session_user(conn: &Connection, token_hash: &str) -> Result<Option<(String, String)>> {
    Ok(conn
        .query_row(
            "SELECT p.id, p.email FROM sessions s JOIN profiles p ON p.id = s.user_id WHERE s.token_hash = ?1",
            params![token_hash],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

// --- Tasks ---

const TASK_COLS: &str = "id, title, description, status, priority, assignee_id, due_date, blocked_reason, dependency, created_by, created_at, updated_at";

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: enum_column(3, row.get(3)?, TaskStatus::from_str)?,
        priority: enum_column(4, row.get(4)?, Priority::from_str)?,
        assignee_id: row.get(5)?,
        due_date: row.get(6)?,
        blocked_reason: row.get(7)?,
        dependency: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn parse_priority(raw: &str) -> Result<Priority> {
    Priority::from_str(raw).ok_or_else(|| StorageError::Invalid(format!("Invalid priority '{raw}'")))
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    TaskStatus::from_str(raw).ok_or_else(|| StorageError::Invalid(format!("Invalid status '{raw}'")))
}

fn validate_due_date(raw: Option<&str>) -> Result<()> {
    if let Some(date) = raw {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            StorageError::Invalid(format!("Invalid due_date '{date}', expected YYYY-MM-DD"))
        })?;
    }
    Ok(())
}

pub fn create_task(conn: &Connection, input: &CreateTask, created_by: &str) -> Result<Task> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(StorageError::Invalid("Task title is required".into()));
    }
    let priority = match input.priority.as_deref() {
        Some(p) => parse_priority(p)?,
        None => Priority::Medium,
    };
    validate_due_date(input.due_date.as_deref())?;

    let id = Uuid::new_v4().to_string();
    let now = now();
    conn.execute(
        "INSERT INTO tasks (id, title, description, status, priority, assignee_id, due_date, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'todo', ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            title,
            input.description,
            priority.as_str(),
            input.assignee_id,
            input.due_date,
            created_by,
            now,
        ],
    )?;
    get_task(conn, &id)?.ok_or_else(|| StorageError::Other("task vanished after insert".into()))
}

pub fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_task).optional()?)
}

pub fn list_tasks(conn: &Connection, filters: &TaskFilters) -> Result<Vec<Task>> {
    let mut conditions = vec!["1=1".to_string()];
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];
    let mut idx = 1;

    if let Some(ref status) = filters.status {
        conditions.push(format!("status = ?{idx}"));
        param_values.push(Box::new(parse_status(status)?.as_str()));
        idx += 1;
    }
    if let Some(ref priority) = filters.priority {
        conditions.push(format!("priority = ?{idx}"));
        param_values.push(Box::new(parse_priority(priority)?.as_str()));
        idx += 1;
    }
    if let Some(ref assignee) = filters.assignee_id {
        conditions.push(format!("assignee_id = ?{idx}"));
        param_values.push(Box::new(assignee.clone()));
    }

    let sql = format!(
        "SELECT {TASK_COLS} FROM tasks WHERE {} ORDER BY
            CASE priority WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
            created_at, id",
        conditions.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params.as_slice(), row_to_task)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn update_task(conn: &Connection, id: &str, input: &UpdateTask) -> Result<Option<Task>> {
    let Some(existing) = get_task(conn, id)? else {
        return Ok(None);
    };

    let status = match input.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => existing.status,
    };
    let priority = match input.priority.as_deref() {
        Some(p) => parse_priority(p)?,
        None => existing.priority,
    };
    validate_due_date(input.due_date.as_deref())?;

    let title = input.title.as_deref().unwrap_or(&existing.title);
    if title.trim().is_empty() {
        return Err(StorageError::Invalid("Task title is required".into()));
    }
    let description = input.description.as_ref().or(existing.description.as_ref());
    let assignee_id = input.assignee_id.as_ref().or(existing.assignee_id.as_ref());
    let due_date = input.due_date.as_ref().or(existing.due_date.as_ref());
    let dependency = input.dependency.as_ref().or(existing.dependency.as_ref());
    // Leaving the blocked state clears the reason unless a new one is given.
    let blocked_reason = if status == TaskStatus::Blocked {
        input.blocked_reason.as_ref().or(existing.blocked_reason.as_ref())
    } else {
        input.blocked_reason.as_ref()
    };

    conn.execute(
        "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4, assignee_id = ?5,
            due_date = ?6, blocked_reason = ?7, dependency = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            title,
            description,
            status.as_str(),
            priority.as_str(),
            assignee_id,
            due_date,
            blocked_reason,
            dependency,
            now(),
            id,
        ],
    )?;
    get_task(conn, id)
}

// --- Comments ---

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<TaskComment> {
    Ok(TaskComment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        author_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn add_comment(
    conn: &Connection,
    task_id: &str,
    author_id: &str,
    input: &CreateComment,
) -> Result<TaskComment> {
    let body = input.body.trim();
    if body.is_empty() {
        return Err(StorageError::Invalid("Comment body is required".into()));
    }
    let comment = TaskComment {
        id: Uuid::new_v4().to_string(),
        task_id: task_id.to_string(),
        author_id: author_id.to_string(),
        body: body.to_string(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO task_comments (id, task_id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![comment.id, comment.task_id, comment.author_id, comment.body, comment.created_at],
    )?;
    Ok(comment)
}

pub fn list_comments(conn: &Connection, task_id: &str) -> Result<Vec<TaskComment>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, author_id, body, created_at FROM task_comments WHERE task_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![task_id], row_to_comment)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Comments created at or after `cutoff` (a date or timestamp prefix).
pub fn list_comments_since(conn: &Connection, cutoff: &str) -> Result<Vec<TaskComment>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, author_id, body, created_at FROM task_comments WHERE created_at >= ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![cutoff], row_to_comment)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// --- Intelligence reports (append-only) ---

const REPORT_COLS: &str = "id, report_type, summary, range_start, range_end, model, token_usage, insights_json, data_pack, created_at";

fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<IntelligenceReport> {
    Ok(IntelligenceReport {
        id: row.get(0)?,
        report_type: enum_column(1, row.get(1)?, ReportType::from_str)?,
        summary: row.get(2)?,
        range_start: row.get(3)?,
        range_end: row.get(4)?,
        model: row.get(5)?,
        token_usage: json_column(6, row.get(6)?)?,
        insights_json: json_column(7, row.get(7)?)?.unwrap_or(serde_json::Value::Null),
        data_pack: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn insert_report(conn: &Connection, report: &NewReport) -> Result<IntelligenceReport> {
    let id = Uuid::new_v4().to_string();
    let token_usage = report
        .token_usage
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let insights = serde_json::to_string(&report.insights_json)?;
    conn.execute(
        "INSERT INTO intelligence_reports (id, report_type, summary, range_start, range_end, model, token_usage, insights_json, data_pack, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            report.report_type.as_str(),
            report.summary,
            report.range_start,
            report.range_end,
            report.model,
            token_usage,
            insights,
            report.data_pack,
            now(),
        ],
    )?;
    get_report(conn, &id)?.ok_or_else(|| StorageError::Other("report vanished after insert".into()))
}

pub fn get_report(conn: &Connection, id: &str) -> Result<Option<IntelligenceReport>> {
    let sql = format!("SELECT {REPORT_COLS} FROM intelligence_reports WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_report).optional()?)
}

pub fn latest_report(conn: &Connection) -> Result<Option<IntelligenceReport>> {
    let sql = format!(
        "SELECT {REPORT_COLS} FROM intelligence_reports ORDER BY created_at DESC, seq DESC LIMIT 1"
    );
    Ok(conn.query_row(&sql, [], row_to_report).optional()?)
}

pub fn list_reports(conn: &Connection, limit: i64) -> Result<Vec<IntelligenceReport>> {
    let sql = format!(
        "SELECT {REPORT_COLS} FROM intelligence_reports ORDER BY created_at DESC, seq DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], row_to_report)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// --- Sync settings ---

pub fn get_sync_settings(conn: &Connection) -> Result<SyncSettings> {
    Ok(conn.query_row(
        "SELECT sync_time, updated_by, updated_at, last_synced_at FROM intelligence_sync_settings WHERE id = 1",
        [],
        |row| {
            Ok(SyncSettings {
                sync_time: row.get(0)?,
                updated_by: row.get(1)?,
                updated_at: row.get(2)?,
                last_synced_at: row.get(3)?,
            })
        },
    )?)
}

/// Stores the daily sync time. `sync_time` must be `HH:MM` on a 24h clock.
pub fn set_sync_time(conn: &Connection, sync_time: &str, updated_by: &str) -> Result<SyncSettings> {
    let parsed = chrono::NaiveTime::parse_from_str(sync_time.trim(), "%H:%M").map_err(|_| {
        StorageError::Invalid(format!("Invalid sync_time '{sync_time}', expected HH:MM"))
    })?;
    conn.execute(
        "INSERT INTO intelligence_sync_settings (id, sync_time, updated_by, updated_at) VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET sync_time = excluded.sync_time, updated_by = excluded.updated_by, updated_at = excluded.updated_at",
        params![parsed.format("%H:%M").to_string(), updated_by, now()],
    )?;
    get_sync_settings(conn)
}

pub fn mark_synced(conn: &Connection, at: &str) -> Result<()> {
    conn.execute(
        "UPDATE intelligence_sync_settings SET last_synced_at = ?1 WHERE id = 1",
        params![at],
    )?;
    Ok(())
}

// --- Notifications ---

pub fn notify(
    conn: &Connection,
    user_id: &str,
    kind: &str,
    title: &str,
    body: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, kind, title, body, read, created_at) VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![user_id, kind, title, body, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn inbox(conn: &Connection, user_id: &str, unread_only: bool) -> Result<Vec<InboxItem>> {
    let mut sql =
        "SELECT id, user_id, kind, title, body, read, created_at FROM notifications WHERE user_id = ?1"
            .to_string();
    if unread_only {
        sql.push_str(" AND read = 0");
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(InboxItem {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            read: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn ack_notification(conn: &Connection, user_id: &str, id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(changed > 0)
}

pub fn ack_all_notifications(conn: &Connection, user_id: &str) -> Result<i64> {
    let changed = conn.execute(
        "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
        params![user_id],
    )?;
    Ok(changed as i64)
}
