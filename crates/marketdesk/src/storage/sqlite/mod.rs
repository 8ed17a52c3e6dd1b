use marketdesk_models::*;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::db_ops;
use crate::storage::*;

/// SQLite-backed storage implementation.
/// Wraps a `Mutex<Connection>` and delegates to `db_ops` functions.
pub struct SqliteBackend {
    pub conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = crate::db::init_db(path)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Flush the WAL into the main database file.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.lock()
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

impl ProfileStore for SqliteBackend {
    fn create_profile(&self, input: &CreateProfile) -> Result<Profile, StorageError> {
        db_ops::create_profile(&self.lock(), input)
    }
    fn get_profile(&self, id: &str) -> Result<Option<Profile>, StorageError> {
        db_ops::get_profile(&self.lock(), id)
    }
    fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>, StorageError> {
        db_ops::list_profiles_by_role(&self.lock(), role)
    }
    fn create_session(&self, user_id: &str) -> Result<String, StorageError> {
        db_ops::create_session(&self.lock(), user_id)
    }
    fn session_user(&self, token_hash: &str) -> Result<Option<(String, String)>, StorageError> {
        db_ops::session_user(&self.lock(), token_hash)
    }
}

impl TaskStore for SqliteBackend {
    fn create_task(&self, input: &CreateTask, created_by: &str) -> Result<Task, StorageError> {
        db_ops::create_task(&self.lock(), input, created_by)
    }
    fn get_task(&self, id: &str) -> Result<Option<Task>, StorageError> {
        db_ops::get_task(&self.lock(), id)
    }
    fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, StorageError> {
        db_ops::list_tasks(&self.lock(), filters)
    }
    fn update_task(&self, id: &str, input: &UpdateTask) -> Result<Option<Task>, StorageError> {
        db_ops::update_task(&self.lock(), id, input)
    }
    fn add_comment(
        &self,
        task_id: &str,
        author_id: &str,
        input: &CreateComment,
    ) -> Result<TaskComment, StorageError> {
        db_ops::add_comment(&self.lock(), task_id, author_id, input)
    }
    fn list_comments(&self, task_id: &str) -> Result<Vec<TaskComment>, StorageError> {
        db_ops::list_comments(&self.lock(), task_id)
    }
    fn list_comments_since(&self, cutoff: &str) -> Result<Vec<TaskComment>, StorageError> {
        db_ops::list_comments_since(&self.lock(), cutoff)
    }
}

impl ReportStore for SqliteBackend {
    fn insert_report(&self, report: &NewReport) -> Result<IntelligenceReport, StorageError> {
        db_ops::insert_report(&self.lock(), report)
    }
    fn latest_report(&self) -> Result<Option<IntelligenceReport>, StorageError> {
        db_ops::latest_report(&self.lock())
    }
    fn get_report(&self, id: &str) -> Result<Option<IntelligenceReport>, StorageError> {
        db_ops::get_report(&self.lock(), id)
    }
    fn list_reports(&self, limit: i64) -> Result<Vec<IntelligenceReport>, StorageError> {
        db_ops::list_reports(&self.lock(), limit)
    }
}

impl SettingsStore for SqliteBackend {
    fn get_sync_settings(&self) -> Result<SyncSettings, StorageError> {
        db_ops::get_sync_settings(&self.lock())
    }
    fn set_sync_time(
        &self,
        sync_time: &str,
        updated_by: &str,
    ) -> Result<SyncSettings, StorageError> {
        db_ops::set_sync_time(&self.lock(), sync_time, updated_by)
    }
    fn mark_synced(&self, at: &str) -> Result<(), StorageError> {
        db_ops::mark_synced(&self.lock(), at)
    }
}

impl NotificationStore for SqliteBackend {
    fn notify(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<i64, StorageError> {
        db_ops::notify(&self.lock(), user_id, kind, title, body)
    }
    fn inbox(&self, user_id: &str, unread_only: bool) -> Result<Vec<InboxItem>, StorageError> {
        db_ops::inbox(&self.lock(), user_id, unread_only)
    }
    fn ack_notification(&self, user_id: &str, id: i64) -> Result<bool, StorageError> {
        db_ops::ack_notification(&self.lock(), user_id, id)
    }
    fn ack_all_notifications(&self, user_id: &str) -> Result<i64, StorageError> {
        db_ops::ack_all_notifications(&self.lock(), user_id)
    }
}

impl StorageBackend for SqliteBackend {
    fn hash_token(&self, token: &str) -> String {
        db_ops::hash_token(token)
    }
}
