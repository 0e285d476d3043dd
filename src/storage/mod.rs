//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite file with tables:
//! - users(id, username, password_hash, role, created_at)
//! - cyber_incidents(id, title, severity, status, category, ...)
//! - datasets_metadata(id, name, source_department, data_quality_score, ...)
//! - it_tickets(id, title, status, priority, assignee, ...)
//! - user_activity(id, user_id, username, activity_type, description, timestamp)

pub mod schema;
pub mod sqlite;
pub mod views;
pub mod migrate;
pub mod bulk;

pub use sqlite::{FilterPolicy, Outcome, Page, RecordStore, TableCounts};
pub use views::{DatasetSummary, IncidentSummary, TicketSummary};
pub use migrate::MigrationReport;
