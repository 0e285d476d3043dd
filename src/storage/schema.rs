//! Database schema definitions

pub const USERS: &str = "users";
pub const CYBER_INCIDENTS: &str = "cyber_incidents";
pub const DATASETS_METADATA: &str = "datasets_metadata";
pub const IT_TICKETS: &str = "it_tickets";
pub const USER_ACTIVITY: &str = "user_activity";

/// Tables reported by `counts_by_table`, in display order
pub const ALL_TABLES: &[&str] = &[USERS, CYBER_INCIDENTS, DATASETS_METADATA, IT_TICKETS, USER_ACTIVITY];

/// SQL to create the users table
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the cyber_incidents table
pub const CREATE_CYBER_INCIDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cyber_incidents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    severity TEXT CHECK (severity IN ('Low', 'Medium', 'High', 'Critical')),
    status TEXT CHECK (status IN ('Open', 'In Progress', 'Resolved', 'Closed')),
    category TEXT,
    assigned_to TEXT,
    date_reported TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    date_resolved TIMESTAMP,
    resolution_time_hours REAL
)
"#;

/// SQL to create the datasets_metadata table
pub const CREATE_DATASETS_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS datasets_metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    source_department TEXT,
    file_size_mb REAL,
    row_count INTEGER,
    column_count INTEGER,
    data_quality_score REAL,
    upload_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    last_accessed TIMESTAMP,
    is_archived BOOLEAN DEFAULT 0
)
"#;

/// SQL to create the it_tickets table
pub const CREATE_IT_TICKETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS it_tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    assignee TEXT,
    reporter TEXT,
    status TEXT CHECK (status IN ('New', 'Assigned', 'In Progress', 'Waiting for User', 'Resolved', 'Closed')),
    priority TEXT CHECK (priority IN ('Low', 'Medium', 'High', 'Urgent')),
    category TEXT,
    date_created TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    date_assigned TIMESTAMP,
    date_resolved TIMESTAMP,
    resolution_notes TEXT
)
"#;

/// SQL to create the user_activity table
/// Append-only audit of logins and mutations
pub const CREATE_USER_ACTIVITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_activity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    username TEXT,
    activity_type TEXT,
    description TEXT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_incidents_status ON cyber_incidents(status)",
    "CREATE INDEX IF NOT EXISTS idx_incidents_reported ON cyber_incidents(date_reported)",
    "CREATE INDEX IF NOT EXISTS idx_datasets_uploaded ON datasets_metadata(upload_date)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_status ON it_tickets(status)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_created ON it_tickets(date_created)",
    "CREATE INDEX IF NOT EXISTS idx_activity_user ON user_activity(user_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_USERS_TABLE,
        CREATE_CYBER_INCIDENTS_TABLE,
        CREATE_DATASETS_METADATA_TABLE,
        CREATE_IT_TICKETS_TABLE,
        CREATE_USER_ACTIVITY_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
