pub mod sqlite;

use marketdesk_models::*;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    /// Input rejected by the store (bad enum value, malformed date, ...).
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Other(String),
}

// --- Storage Traits ---
// Each trait covers a domain.

pub trait ProfileStore: Send + Sync {
    fn create_profile(&self, input: &CreateProfile) -> Result<Profile, StorageError>;
    fn get_profile(&self, id: &str) -> Result<Option<Profile>, StorageError>;
    fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>, StorageError>;
    /// Returns the plain session token; it cannot be recovered later.
    fn create_session(&self, user_id: &str) -> Result<String, StorageError>;
    /// Resolves a hashed token to `(user_id, email)`.
    fn session_user(&self, token_hash: &str) -> Result<Option<(String, String)>, StorageError>;
}

pub trait TaskStore: Send + Sync {
    fn create_task(&self, input: &CreateTask, created_by: &str) -> Result<Task, StorageError>;
    fn get_task(&self, id: &str) -> Result<Option<Task>, StorageError>;
    fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, StorageError>;
    fn update_task(&self, id: &str, input: &UpdateTask) -> Result<Option<Task>, StorageError>;
    fn add_comment(
        &self,
        task_id: &str,
        author_id: &str,
        input: &CreateComment,
    ) -> Result<TaskComment, StorageError>;
    fn list_comments(&self, task_id: &str) -> Result<Vec<TaskComment>, StorageError>;
    fn list_comments_since(&self, cutoff: &str) -> Result<Vec<TaskComment>, StorageError>;
}

/// Append-only; there is no update or delete.
pub trait ReportStore: Send + Sync {
    fn insert_report(&self, report: &NewReport) -> Result<IntelligenceReport, StorageError>;
    fn latest_report(&self) -> Result<Option<IntelligenceReport>, StorageError>;
    fn get_report(&self, id: &str) -> Result<Option<IntelligenceReport>, StorageError>;
    fn list_reports(&self, limit: i64) -> Result<Vec<IntelligenceReport>, StorageError>;
}

pub trait SettingsStore: Send + Sync {
    fn get_sync_settings(&self) -> Result<SyncSettings, StorageError>;
    fn set_sync_time(&self, sync_time: &str, updated_by: &str)
        -> Result<SyncSettings, StorageError>;
    fn mark_synced(&self, at: &str) -> Result<(), StorageError>;
}

pub trait NotificationStore: Send + Sync {
    fn notify(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<i64, StorageError>;
    fn inbox(&self, user_id: &str, unread_only: bool) -> Result<Vec<InboxItem>, StorageError>;
    fn ack_notification(&self, user_id: &str, id: i64) -> Result<bool, StorageError>;
    fn ack_all_notifications(&self, user_id: &str) -> Result<i64, StorageError>;
}

/// Super-trait combining all domain stores.
pub trait StorageBackend:
    ProfileStore + TaskStore + ReportStore + SettingsStore + NotificationStore
{
    /// Hash a session token (utility, doesn't need &self but lives here for convenience).
    fn hash_token(&self, token: &str) -> String;
}
