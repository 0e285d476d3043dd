//! # Intelhub - Multi-Domain Intelligence Platform
//!
//! Record store behind the operational dashboard for three business domains.
//!
//! Intelhub provides:
//! - A table-agnostic CRUD engine over a single-file SQLite database
//! - Identifier validation for every caller-supplied table/column name
//! - Filtered, paginated and substring reads
//! - Convenience views for cyber incidents, dataset metadata and IT tickets
//! - Legacy user-file migration, CSV bulk load, backup and restore
//! - Collaborator seams for authentication and LLM insights

pub mod ident;
pub mod value;
pub mod incident;
pub mod dataset;
pub mod ticket;
pub mod user;
pub mod storage;
pub mod auth;
pub mod insight;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use value::{Fields, IntoValue, Record};
pub use incident::{IncidentStatus, NewIncident, Severity};
pub use dataset::NewDataset;
pub use ticket::{NewTicket, Priority, TicketStatus};
pub use user::{NewUser, User};
pub use storage::{FilterPolicy, MigrationReport, Outcome, Page, RecordStore, TableCounts};

/// Result type alias for Intelhub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Intelhub operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("No fields to write for table {0}")]
    EmptyPayload(String),

    #[error("Column {0} cannot be updated")]
    ImmutableColumn(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Record store is closed")]
    Closed,
}
