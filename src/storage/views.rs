//! Domain convenience views
//!
//! Thin compositions of the generic engine: filtered selects ordered by each
//! table's recency column, typed intake, and the aggregate figures shown on
//! the dashboard tiles.

use std::collections::BTreeMap;

use rusqlite::types::Value;
use serde::Serialize;

use super::schema::{CYBER_INCIDENTS, DATASETS_METADATA, IT_TICKETS, USERS, USER_ACTIVITY};
use super::{Page, RecordStore};
use crate::incident::{IncidentStatus, NewIncident, Severity};
use crate::dataset::NewDataset;
use crate::ticket::{NewTicket, Priority, TicketStatus};
use crate::user::{NewUser, User};
use crate::value::{Fields, IntoValue, Record};
use crate::{fields, ident, Result};

impl RecordStore {
    // ========== Views ==========

    /// Incidents, newest `date_reported` first
    pub fn cyber_incidents(&self, filters: Option<&Fields>) -> Result<Vec<Record>> {
        self.newest_first(CYBER_INCIDENTS, filters.unwrap_or(&Fields::new()), None)
    }

    /// Dataset metadata, newest `upload_date` first
    pub fn datasets_metadata(&self, filters: Option<&Fields>) -> Result<Vec<Record>> {
        self.newest_first(DATASETS_METADATA, filters.unwrap_or(&Fields::new()), None)
    }

    /// Tickets, newest `date_created` first
    pub fn it_tickets(&self, filters: Option<&Fields>) -> Result<Vec<Record>> {
        self.newest_first(IT_TICKETS, filters.unwrap_or(&Fields::new()), None)
    }

    /// Filtered rows of any table in its view order, optionally one page of
    /// them. Tables without a recency column come back in id order.
    pub fn newest_first(&self, table: &str, filters: &Fields, page: Option<Page>) -> Result<Vec<Record>> {
        self.select_filtered(table, filters, recency_column(table), page)
    }

    // ========== Intake ==========

    pub fn add_incident(&self, incident: NewIncident) -> Result<i64> {
        self.insert(CYBER_INCIDENTS, &incident.into_fields())
    }

    pub fn add_dataset(&self, dataset: NewDataset) -> Result<i64> {
        self.insert(DATASETS_METADATA, &dataset.into_fields())
    }

    /// Open a ticket. A ticket opened with an assignee is stamped
    /// `date_assigned` in the same insert.
    pub fn add_ticket(&self, ticket: NewTicket) -> Result<i64> {
        let fields = self.ticket_fields(ticket)?;
        self.insert(IT_TICKETS, &fields)
    }

    /// Insert fields for a ticket, always carrying a `date_assigned` column
    pub(crate) fn ticket_fields(&self, ticket: NewTicket) -> Result<Fields> {
        let date_assigned = match ticket.assignee {
            Some(_) => Some(self.now()?),
            None => None,
        };
        let mut fields = ticket.into_fields();
        fields.insert("date_assigned".into(), date_assigned.into_value());
        Ok(fields)
    }

    /// Register a user with an already-hashed password
    pub fn add_user(&self, user: NewUser) -> Result<i64> {
        self.insert(USERS, &user.into_fields())
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let rows = self.find_by_filter(USERS, &fields! { "username" => username })?;
        Ok(rows.first().and_then(User::from_record))
    }

    // ========== Lifecycle mutations ==========

    /// Move an incident to a new status.
    ///
    /// Entering `Resolved` or `Closed` stamps `date_resolved` and the hours
    /// elapsed since `date_reported`, unless already stamped.
    pub fn set_incident_status(&self, id: i64, status: IncidentStatus) -> Result<bool> {
        let mut changes = fields! { "status" => status };
        if !status.is_active() {
            let already: Option<String> = self.query_scalar(
                "SELECT date_resolved FROM cyber_incidents WHERE id = ?1",
                &[Value::Integer(id)],
            )?;
            if already.is_none() {
                let hours: Option<f64> = self.query_scalar(
                    "SELECT (julianday('now') - julianday(date_reported)) * 24.0 FROM cyber_incidents WHERE id = ?1",
                    &[Value::Integer(id)],
                )?;
                changes.insert("date_resolved".into(), Value::Text(self.now()?));
                changes.insert("resolution_time_hours".into(), hours.map_or(Value::Null, Value::Real));
            }
        }
        self.update(CYBER_INCIDENTS, id, &changes)
    }

    pub fn assign_incident(&self, id: i64, assignee: &str) -> Result<bool> {
        self.update(CYBER_INCIDENTS, id, &fields! { "assigned_to" => assignee })
    }

    pub fn assign_ticket(&self, id: i64, assignee: &str) -> Result<bool> {
        let now = self.now()?;
        self.update(
            IT_TICKETS,
            id,
            &fields! {
                "assignee" => assignee,
                "status" => TicketStatus::Assigned,
                "date_assigned" => now,
            },
        )
    }

    pub fn resolve_ticket(&self, id: i64, notes: &str) -> Result<bool> {
        let now = self.now()?;
        self.update(
            IT_TICKETS,
            id,
            &fields! {
                "status" => TicketStatus::Resolved,
                "resolution_notes" => notes,
                "date_resolved" => now,
            },
        )
    }

    /// Flip only the archived flag of a dataset
    pub fn set_dataset_archived(&self, id: i64, archived: bool) -> Result<bool> {
        self.update(DATASETS_METADATA, id, &fields! { "is_archived" => archived })
    }

    /// Stamp `last_accessed` on a dataset
    pub fn touch_dataset(&self, id: i64) -> Result<bool> {
        let now = self.now()?;
        self.update(DATASETS_METADATA, id, &fields! { "last_accessed" => now })
    }

    // ========== Activity log ==========

    /// Append an activity entry. The log is never updated or pruned here.
    pub fn log_activity(
        &self,
        user_id: Option<i64>,
        username: &str,
        activity_type: &str,
        description: &str,
    ) -> Result<i64> {
        self.insert(
            USER_ACTIVITY,
            &fields! {
                "user_id" => user_id,
                "username" => username,
                "activity_type" => activity_type,
                "description" => description,
            },
        )
    }

    /// Newest activity first
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<Record>> {
        self.newest_first(USER_ACTIVITY, &Fields::new(), Some(Page::first(limit)))
    }

    // ========== Dashboard metrics ==========

    pub fn incident_summary(&self) -> Result<IncidentSummary> {
        let active: Vec<&str> = IncidentStatus::all()
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.as_str())
            .collect();
        Ok(IncidentSummary {
            total: self.count(CYBER_INCIDENTS)?,
            open: self.count_where_in(CYBER_INCIDENTS, "status", &active)?,
            critical: self.count_where_in(CYBER_INCIDENTS, "severity", &[Severity::Critical.as_str()])?,
            avg_resolution_hours: self
                .query_scalar("SELECT AVG(resolution_time_hours) FROM cyber_incidents", &[])?,
            by_severity: self.grouped_counts(CYBER_INCIDENTS, "severity")?,
            by_status: self.grouped_counts(CYBER_INCIDENTS, "status")?,
        })
    }

    pub fn dataset_summary(&self) -> Result<DatasetSummary> {
        Ok(DatasetSummary {
            total: self.count(DATASETS_METADATA)?,
            archived: self
                .query_scalar::<i64>("SELECT COUNT(*) FROM datasets_metadata WHERE is_archived = 1", &[])?
                .unwrap_or(0) as usize,
            avg_quality: self
                .query_scalar("SELECT AVG(data_quality_score) FROM datasets_metadata", &[])?,
            storage_mb: self
                .query_scalar("SELECT SUM(file_size_mb) FROM datasets_metadata", &[])?
                .unwrap_or(0.0),
            by_department: self.grouped_counts(DATASETS_METADATA, "source_department")?,
        })
    }

    pub fn ticket_summary(&self) -> Result<TicketSummary> {
        let open: Vec<&str> = TicketStatus::all()
            .iter()
            .filter(|s| s.is_open())
            .map(|s| s.as_str())
            .collect();
        Ok(TicketSummary {
            total: self.count(IT_TICKETS)?,
            open: self.count_where_in(IT_TICKETS, "status", &open)?,
            urgent: self.count_where_in(IT_TICKETS, "priority", &[Priority::Urgent.as_str()])?,
            by_priority: self.grouped_counts(IT_TICKETS, "priority")?,
            by_status: self.grouped_counts(IT_TICKETS, "status")?,
        })
    }

    fn count_where_in(&self, table: &str, column: &str, values: &[&str]) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }
        let table = ident::validate(table)?;
        let column = ident::validate(column)?;
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} IN ({})",
            table,
            column,
            placeholders.join(", ")
        );
        let params: Vec<Value> = values.iter().map(|v| Value::Text(v.to_string())).collect();
        let count: Option<i64> = self.query_scalar(&sql, &params)?;
        Ok(count.unwrap_or(0) as usize)
    }

    fn grouped_counts(&self, table: &str, column: &str) -> Result<BTreeMap<String, usize>> {
        let table = ident::validate(table)?;
        let column = ident::validate(column)?;
        let sql = format!(
            "SELECT COALESCE(CAST({col} AS TEXT), 'Unknown') AS label, COUNT(*) AS n FROM {table} GROUP BY label",
            col = column,
            table = table
        );
        let rows = self.execute(&sql, &[])?.rows();
        Ok(rows
            .iter()
            .filter_map(|r| Some((r.get_text("label")?.to_string(), r.get_i64("n")? as usize)))
            .collect())
    }

    fn now(&self) -> Result<String> {
        Ok(self
            .query_scalar("SELECT CURRENT_TIMESTAMP", &[])?
            .unwrap_or_default())
    }
}

/// Column a table's view sorts on, newest first
pub fn recency_column(table: &str) -> Option<&'static str> {
    match table {
        CYBER_INCIDENTS => Some("date_reported"),
        DATASETS_METADATA => Some("upload_date"),
        IT_TICKETS => Some("date_created"),
        USER_ACTIVITY => Some("timestamp"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentSummary {
    pub total: usize,
    /// Open or in progress
    pub open: usize,
    pub critical: usize,
    pub avg_resolution_hours: Option<f64>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub archived: usize,
    pub avg_quality: Option<f64>,
    pub storage_mb: f64,
    pub by_department: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketSummary {
    pub total: usize,
    /// Anything not resolved or closed
    pub open: usize,
    pub urgent: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_filter_excludes_closed_and_orders_newest_first() {
        let store = RecordStore::open_in_memory().unwrap();
        let older = store
            .add_incident(NewIncident::new("Older", Severity::Low).with_category("Malware"))
            .unwrap();
        store
            .add_incident(NewIncident::new("Done", Severity::High).with_status(IncidentStatus::Closed))
            .unwrap();
        let newer = store
            .add_incident(NewIncident::new("Newer", Severity::Medium).with_category("Phishing"))
            .unwrap();
        store
            .update(CYBER_INCIDENTS, older, &fields! { "date_reported" => "2024-01-01 08:00:00" })
            .unwrap();

        let open = store.cyber_incidents(Some(&fields! { "status" => "Open" })).unwrap();
        let ids: Vec<i64> = open.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert!(open.iter().all(|r| r.get_text("status") == Some("Open")));
    }

    #[test]
    fn test_phishing_scenario() {
        let store = RecordStore::open_in_memory().unwrap();
        let phishing = fields! {
            "title" => "Phishing",
            "severity" => "High",
            "status" => "Open",
            "category" => "Phishing",
        };
        store.insert(CYBER_INCIDENTS, &phishing).unwrap();

        let open = store.cyber_incidents(Some(&fields! { "status" => "Open" })).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].get_text("title"), Some("Phishing"));
    }

    #[test]
    fn test_views_without_filters_return_everything() {
        let store = RecordStore::open_in_memory().unwrap();
        store.add_dataset(NewDataset::new("sales_2024").from_department("Sales")).unwrap();
        store.add_dataset(NewDataset::new("hr_roster").from_department("HR")).unwrap();
        store.add_ticket(NewTicket::new("VPN down", Priority::Urgent)).unwrap();

        assert_eq!(store.datasets_metadata(None).unwrap().len(), 2);
        let hr = store
            .datasets_metadata(Some(&fields! { "source_department" => "HR" }))
            .unwrap();
        assert_eq!(hr.len(), 1);
        assert_eq!(store.it_tickets(None).unwrap().len(), 1);
    }

    #[test]
    fn test_user_lookup() {
        let store = RecordStore::open_in_memory().unwrap();
        let id = store.add_user(NewUser::new("sara", "$2b$12$hash", "data_scientist")).unwrap();

        let user = store.user_by_username("sara").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, "data_scientist");
        assert!(user.created_at.is_some());
        assert!(store.user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_resolving_incident_stamps_resolution() {
        let store = RecordStore::open_in_memory().unwrap();
        let id = store.add_incident(NewIncident::new("Breach", Severity::Critical)).unwrap();

        assert!(store.set_incident_status(id, IncidentStatus::InProgress).unwrap());
        let row = store.get_by_id(CYBER_INCIDENTS, id).unwrap().unwrap();
        assert!(row.is_null("date_resolved"));

        assert!(store.set_incident_status(id, IncidentStatus::Resolved).unwrap());
        let row = store.get_by_id(CYBER_INCIDENTS, id).unwrap().unwrap();
        assert_eq!(row.get_text("status"), Some("Resolved"));
        assert!(row.get_text("date_resolved").is_some());
        assert!(row.get_f64("resolution_time_hours").unwrap() >= 0.0);

        assert!(!store.set_incident_status(9999, IncidentStatus::Closed).unwrap());
    }

    #[test]
    fn test_ticket_assignment_and_resolution() {
        let store = RecordStore::open_in_memory().unwrap();
        let preassigned = store
            .add_ticket(NewTicket::new("Laptop", Priority::High).assigned_to("mike_admin"))
            .unwrap();
        let row = store.get_by_id(IT_TICKETS, preassigned).unwrap().unwrap();
        assert_eq!(row.get_text("status"), Some("Assigned"));
        assert!(row.get_text("date_assigned").is_some());

        let id = store.add_ticket(NewTicket::new("Printer", Priority::Low)).unwrap();
        assert!(store.assign_ticket(id, "mike_admin").unwrap());
        assert!(store.resolve_ticket(id, "Replaced toner").unwrap());

        let row = store.get_by_id(IT_TICKETS, id).unwrap().unwrap();
        assert_eq!(row.get_text("status"), Some("Resolved"));
        assert_eq!(row.get_text("assignee"), Some("mike_admin"));
        assert_eq!(row.get_text("resolution_notes"), Some("Replaced toner"));
    }

    #[test]
    fn test_preassigned_ticket_is_written_in_one_statement() {
        let store = RecordStore::open_in_memory().unwrap();
        store
            .execute(
                "CREATE TRIGGER no_ticket_updates BEFORE UPDATE ON it_tickets \
                 BEGIN SELECT RAISE(ABORT, 'tickets are read-only'); END",
                &[],
            )
            .unwrap();

        let id = store
            .add_ticket(NewTicket::new("Laptop", Priority::High).assigned_to("mike"))
            .unwrap();
        let rows = store.get_all(IT_TICKETS).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), Some(id));
        assert!(rows[0].get_text("date_assigned").is_some());

        let unassigned = store.add_ticket(NewTicket::new("Mouse", Priority::Low)).unwrap();
        let row = store.get_by_id(IT_TICKETS, unassigned).unwrap().unwrap();
        assert!(row.is_null("date_assigned"));
    }

    #[test]
    fn test_paged_view_keeps_newest_first_order() {
        let store = RecordStore::open_in_memory().unwrap();
        for title in ["one", "two", "three"] {
            store.add_incident(NewIncident::new(title, Severity::Low)).unwrap();
        }
        store
            .update(CYBER_INCIDENTS, 1, &fields! { "date_reported" => "2030-01-01 00:00:00" })
            .unwrap();

        let first = store
            .newest_first(CYBER_INCIDENTS, &Fields::new(), Some(Page::first(2)))
            .unwrap();
        let titles: Vec<_> = first.iter().filter_map(|r| r.get_text("title")).collect();
        assert_eq!(titles, vec!["one", "three"]);

        let rest = store
            .newest_first(CYBER_INCIDENTS, &Fields::new(), Some(Page::new(2, 2)))
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].get_text("title"), Some("two"));

        let users_page = store.newest_first(USERS, &Fields::new(), Some(Page::first(5))).unwrap();
        assert!(users_page.is_empty());
    }

    #[test]
    fn test_archive_flag_changes_alone() {
        let store = RecordStore::open_in_memory().unwrap();
        let id = store
            .add_dataset(NewDataset::new("logs").with_quality(0.9).with_size_mb(12.5))
            .unwrap();
        let before = store.get_by_id(DATASETS_METADATA, id).unwrap().unwrap();
        assert_eq!(before.get_i64("is_archived"), Some(0));

        assert!(store.set_dataset_archived(id, true).unwrap());
        let after = store.get_by_id(DATASETS_METADATA, id).unwrap().unwrap();
        assert_eq!(after.get_i64("is_archived"), Some(1));
        assert_eq!(after.get_text("name"), Some("logs"));
        assert_eq!(after.get_f64("data_quality_score"), Some(0.9));
        assert_eq!(after.get("upload_date"), before.get("upload_date"));
    }

    #[test]
    fn test_assign_incident_and_touch_dataset() {
        let store = RecordStore::open_in_memory().unwrap();
        let incident = store.add_incident(NewIncident::new("Scan", Severity::Low)).unwrap();
        assert!(store.assign_incident(incident, "john_analyst").unwrap());
        let row = store.get_by_id(CYBER_INCIDENTS, incident).unwrap().unwrap();
        assert_eq!(row.get_text("assigned_to"), Some("john_analyst"));

        let dataset = store.add_dataset(NewDataset::new("events")).unwrap();
        assert!(store
            .get_by_id(DATASETS_METADATA, dataset)
            .unwrap()
            .unwrap()
            .is_null("last_accessed"));
        assert!(store.touch_dataset(dataset).unwrap());
        let row = store.get_by_id(DATASETS_METADATA, dataset).unwrap().unwrap();
        assert!(row.get_text("last_accessed").is_some());
    }

    #[test]
    fn test_activity_log_newest_first() {
        let store = RecordStore::open_in_memory().unwrap();
        store.log_activity(None, "alice", "login", "first").unwrap();
        store.log_activity(None, "alice", "update", "second").unwrap();
        store.log_activity(None, "alice", "logout", "third").unwrap();

        let recent = store.recent_activity(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].get_text("description"), Some("third"));
        assert_eq!(recent[1].get_text("description"), Some("second"));
    }

    #[test]
    fn test_summaries() {
        let store = RecordStore::open_in_memory().unwrap();
        store.add_incident(NewIncident::new("a", Severity::Critical)).unwrap();
        store
            .add_incident(NewIncident::new("b", Severity::Low).with_status(IncidentStatus::InProgress))
            .unwrap();
        let closed = store.add_incident(NewIncident::new("c", Severity::Low)).unwrap();
        store.set_incident_status(closed, IncidentStatus::Closed).unwrap();

        let incidents = store.incident_summary().unwrap();
        assert_eq!(incidents.total, 3);
        assert_eq!(incidents.open, 2);
        assert_eq!(incidents.critical, 1);
        assert_eq!(incidents.by_severity.get("Low"), Some(&2));
        assert!(incidents.avg_resolution_hours.is_some());

        store
            .add_dataset(NewDataset::new("x").from_department("IT").with_size_mb(1.5).with_quality(0.8))
            .unwrap();
        let archived = store.add_dataset(NewDataset::new("y").with_size_mb(2.5)).unwrap();
        store.set_dataset_archived(archived, true).unwrap();

        let datasets = store.dataset_summary().unwrap();
        assert_eq!(datasets.total, 2);
        assert_eq!(datasets.archived, 1);
        assert!((datasets.storage_mb - 4.0).abs() < 1e-9);
        assert_eq!(datasets.by_department.get("Unknown"), Some(&1));

        store.add_ticket(NewTicket::new("t1", Priority::Urgent)).unwrap();
        store
            .add_ticket(NewTicket::new("t2", Priority::Low).with_status(TicketStatus::Closed))
            .unwrap();
        let tickets = store.ticket_summary().unwrap();
        assert_eq!(tickets.total, 2);
        assert_eq!(tickets.open, 1);
        assert_eq!(tickets.urgent, 1);
    }
}
