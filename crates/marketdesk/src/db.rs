use rusqlite::Connection;

pub fn init_db(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    // Enable WAL mode for concurrent reads
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    // Checkpoint any pending WAL data before running migrations.
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT,
            role TEXT NOT NULL DEFAULT 'member',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'todo',
            priority TEXT NOT NULL DEFAULT 'medium',
            assignee_id TEXT,
            due_date TEXT,
            blocked_reason TEXT,
            dependency TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS task_comments (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            author_id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_assignee_id ON tasks(assignee_id);
        CREATE INDEX IF NOT EXISTS idx_task_comments_task ON task_comments(task_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_task_comments_created ON task_comments(created_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS intelligence_reports (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            report_type TEXT NOT NULL CHECK (report_type IN ('scheduled', 'manual')),
            summary TEXT NOT NULL,
            range_start TEXT NOT NULL,
            range_end TEXT NOT NULL,
            model TEXT NOT NULL,
            token_usage TEXT,
            insights_json TEXT NOT NULL,
            data_pack TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reports_created ON intelligence_reports(created_at);

        CREATE TRIGGER IF NOT EXISTS intelligence_reports_no_update
        BEFORE UPDATE ON intelligence_reports
        BEGIN
            SELECT RAISE(ABORT, 'intelligence_reports is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS intelligence_reports_no_delete
        BEFORE DELETE ON intelligence_reports
        BEGIN
            SELECT RAISE(ABORT, 'intelligence_reports is append-only');
        END;

        CREATE TABLE IF NOT EXISTS intelligence_sync_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            sync_time TEXT,
            updated_by TEXT,
            updated_at TEXT,
            last_synced_at TEXT
        );
        INSERT OR IGNORE INTO intelligence_sync_settings (id) VALUES (1);

        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read, created_at);
        ",
    )?;

    Ok(conn)
}
