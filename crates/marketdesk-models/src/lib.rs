use serde::{Deserialize, Serialize};

// --- Enums ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cmo,
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cmo => "cmo",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cmo" => Some(Role::Cmo),
            "manager" => Some(Role::Manager),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "done" => Some(TaskStatus::Done),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Open tasks still count toward workload and overdue tallies.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TaskStatus::Todo | TaskStatus::InProgress | TaskStatus::Blocked
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn sort_order(&self) -> i32 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Scheduled,
    Manual,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Scheduled => "scheduled",
            ReportType::Manual => "manual",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(ReportType::Scheduled),
            "manual" => Some(ReportType::Manual),
            _ => None,
        }
    }
}

// --- Domain models ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee_id: Option<String>,
    /// YYYY-MM-DD
    pub due_date: Option<String>,
    /// Why the task is blocked; only meaningful while status = blocked
    pub blocked_reason: Option<String>,
    /// What the task is waiting on (another team, vendor, task title)
    pub dependency: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: String,
    pub task_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
}

// --- Intelligence ---

/// Date bounds of one insights snapshot, both `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightWindow {
    pub recent_cutoff: String,
    pub today: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InsightTotals {
    pub open: i64,
    pub blocked: i64,
    pub overdue: i64,
    pub completed_recently: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockerSignal {
    pub task_id: String,
    pub task: String,
    pub reason: Option<String>,
    pub dependency: Option<String>,
    pub assignee_id: Option<String>,
    pub priority: Priority,
    pub days_blocked: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssigneePressure {
    pub assignee_id: String,
    pub open: i64,
    pub overdue: i64,
    pub blocked: i64,
    pub due_soon: i64,
    pub pressure: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentSignal {
    pub task_id: String,
    pub task: String,
    pub comments: i64,
    pub latest_excerpt: String,
    pub flags: Vec<String>,
}

/// Point-in-time aggregate of task activity fed to the summary generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInsights {
    pub window: InsightWindow,
    pub totals: InsightTotals,
    pub blockers: Vec<BlockerSignal>,
    pub assignee_pressure: Vec<AssigneePressure>,
    pub comment_signals: Vec<CommentSignal>,
}

/// One stored intelligence report. Rows are never updated once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelligenceReport {
    pub id: String,
    pub report_type: ReportType,
    /// Normalized JSON, or the raw model text when it could not be repaired
    pub summary: String,
    pub range_start: String,
    pub range_end: String,
    pub model: String,
    pub token_usage: Option<serde_json::Value>,
    pub insights_json: serde_json::Value,
    pub data_pack: String,
    pub created_at: String,
}

impl IntelligenceReport {
    pub fn meta(&self) -> ReportMeta {
        ReportMeta {
            id: self.id.clone(),
            report_type: self.report_type,
            range_start: self.range_start.clone(),
            range_end: self.range_end.clone(),
            model: self.model.clone(),
            token_usage: self.token_usage.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Insert payload; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: ReportType,
    pub summary: String,
    pub range_start: String,
    pub range_end: String,
    pub model: String,
    pub token_usage: Option<serde_json::Value>,
    pub insights_json: serde_json::Value,
    pub data_pack: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub id: String,
    pub report_type: ReportType,
    pub range_start: String,
    pub range_end: String,
    pub model: String,
    pub token_usage: Option<serde_json::Value>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub cached: bool,
    pub summary: String,
    pub generated_at: String,
    pub report: ReportMeta,
    pub insights: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CronResponse {
    pub ok: bool,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// HH:MM, 24h UTC. None until a CMO picks a time.
    pub sync_time: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
    pub last_synced_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSyncSettings {
    pub sync_time: String,
}

// --- Notifications ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxItem {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub unread: Option<bool>,
}

// --- DTOs ---

#[derive(Debug, Deserialize)]
pub struct CreateProfile {
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<String>,
    pub due_date: Option<String>,
    pub blocked_reason: Option<String>,
    pub dependency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskFilters {
    pub status: Option<String>,
    pub assignee_id: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub body: String,
}

// --- Identity (from auth) ---

#[derive(Debug, Clone)]
pub enum Identity {
    User { id: String, email: String },
    Anonymous,
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::User { id, .. } => Some(id),
            Identity::Anonymous => None,
        }
    }
}
