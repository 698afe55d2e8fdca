//! SQL DDL for initializing the CRM store.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema:
/// - client → proposals → projects → tasks, plus client → follow-ups / notes,
///   all `ON DELETE CASCADE` (requires `PRAGMA foreign_keys = ON` per connection)
/// - status columns hold snake_case enum text
/// - timestamps are RFC3339 text, dates are `YYYY-MM-DD`
/// - `projects.proposal_id` UNIQUE: a proposal converts into at most one project
/// - `activity_logs` has no foreign key so history survives deletes
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    company TEXT NULL,
    email TEXT NULL,
    phone TEXT NULL,
    address TEXT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    -- lowercased name, company and email (SQLite lower() only folds ASCII)
    search_text TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clients_name ON clients(name);

CREATE TABLE IF NOT EXISTS proposals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NULL,
    amount REAL NOT NULL DEFAULT 0,
    valid_until TEXT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    sent_at TEXT NULL,
    decided_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_proposals_client_id ON proposals(client_id);
CREATE INDEX IF NOT EXISTS idx_proposals_status ON proposals(status);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    proposal_id INTEGER NULL UNIQUE REFERENCES proposals(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NULL,
    budget REAL NULL,
    status TEXT NOT NULL DEFAULT 'not_started',
    start_date TEXT NULL,
    due_date TEXT NULL,
    completed_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_client_id ON projects(client_id);

CREATE TABLE IF NOT EXISTS project_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    due_date TEXT NULL,
    completed_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_project_tasks_project_id ON project_tasks(project_id);

CREATE TABLE IF NOT EXISTS follow_ups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    subject TEXT NOT NULL,
    details TEXT NULL,
    due_at TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT NULL,
    notified_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_follow_ups_due ON follow_ups(completed, due_at);
CREATE INDEX IF NOT EXISTS idx_follow_ups_client_id ON follow_ups(client_id);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_client_id ON notes(client_id);

CREATE TABLE IF NOT EXISTS activity_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    action TEXT NOT NULL,
    summary TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_logs_created_at ON activity_logs(created_at);
"#;
