//! Bulk loading: CSV import and demo seeding

use std::io::Read;
use std::path::Path;

use rusqlite::types::Value;

use super::schema::{CYBER_INCIDENTS, DATASETS_METADATA, IT_TICKETS};
use super::RecordStore;
use crate::incident::{IncidentStatus, NewIncident, Severity};
use crate::dataset::NewDataset;
use crate::ticket::{NewTicket, Priority, TicketStatus};
use crate::{ident, Error, Result};

impl RecordStore {
    /// Append every row of a CSV file into `table`.
    ///
    /// The header row names the columns (lower-cased before use). Empty
    /// cells are stored as NULL. Rows go in as one batch: if any row fails,
    /// nothing is appended. Returns the number of rows loaded.
    pub fn load_csv(&self, table: &str, path: &Path) -> Result<usize> {
        let file = std::fs::File::open(path).map_err(|e| {
            tracing::error!("Cannot open CSV {}: {}", path.display(), e);
            e
        })?;
        let loaded = self.load_csv_from_reader(table, file)?;
        tracing::info!("Loaded {} rows from {} into {}", loaded, path.display(), table);
        Ok(loaded)
    }

    /// Same as [`RecordStore::load_csv`] over any reader
    pub fn load_csv_from_reader<R: Read>(&self, table: &str, reader: R) -> Result<usize> {
        let table = ident::validate(table)?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();
        if columns.is_empty() {
            return Err(Error::EmptyPayload(table.to_string()));
        }
        ident::validate_all(columns.iter().map(String::as_str))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            Value::Null
                        } else {
                            Value::Text(cell.to_string())
                        }
                    })
                    .collect::<Vec<_>>(),
            );
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        self.execute_batch(&sql, &rows)?;
        Ok(rows.len())
    }

    /// Insert a small sample set for each domain, only into empty tables.
    /// Each domain is written as one batch, so a table is either fully
    /// seeded or left empty. Returns the number of rows inserted.
    pub fn seed_demo_data(&self) -> Result<usize> {
        let mut inserted = 0;

        if self.count(CYBER_INCIDENTS)? == 0 {
            let incidents = [
                NewIncident::new("Phishing campaign targeting finance", Severity::High)
                    .with_category("Phishing")
                    .assigned_to("john_analyst"),
                NewIncident::new("Ransomware on file server", Severity::Critical)
                    .with_category("Malware")
                    .with_status(IncidentStatus::InProgress),
                NewIncident::new("Brute-force login attempts", Severity::Medium)
                    .with_category("Unauthorized Access"),
                NewIncident::new("Outdated TLS on intranet", Severity::Low)
                    .with_category("Vulnerability")
                    .with_status(IncidentStatus::Resolved),
            ];
            let rows: Vec<_> = incidents.into_iter().map(NewIncident::into_fields).collect();
            inserted += self.insert_many(CYBER_INCIDENTS, &rows)?;
        }

        if self.count(DATASETS_METADATA)? == 0 {
            let datasets = [
                NewDataset::new("sales_transactions_2024")
                    .from_department("Sales")
                    .with_shape(120_000, 14)
                    .with_size_mb(48.2)
                    .with_quality(0.85),
                NewDataset::new("campaign_results")
                    .from_department("Marketing")
                    .with_shape(8_500, 22)
                    .with_size_mb(6.1)
                    .with_quality(0.92),
                NewDataset::new("asset_inventory")
                    .from_department("IT")
                    .with_shape(3_200, 9)
                    .with_size_mb(1.4)
                    .with_quality(0.78),
            ];
            let rows: Vec<_> = datasets.into_iter().map(NewDataset::into_fields).collect();
            inserted += self.insert_many(DATASETS_METADATA, &rows)?;
        }

        if self.count(IT_TICKETS)? == 0 {
            let tickets = [
                NewTicket::new("VPN disconnects every hour", Priority::Urgent)
                    .reported_by("sara_scientist")
                    .with_category("Network"),
                NewTicket::new("Laptop replacement", Priority::Medium)
                    .reported_by("john_analyst")
                    .assigned_to("mike_admin")
                    .with_category("Hardware"),
                NewTicket::new("Shared drive permissions", Priority::Low)
                    .reported_by("john_analyst")
                    .with_status(TicketStatus::WaitingForUser)
                    .with_category("Access"),
            ];
            let rows = tickets
                .into_iter()
                .map(|ticket| self.ticket_fields(ticket))
                .collect::<Result<Vec<_>>>()?;
            inserted += self.insert_many(IT_TICKETS, &rows)?;
        }

        tracing::info!("Seeded {} demo rows", inserted);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCIDENTS_CSV: &str = "\
Title,Severity,Status,Category,Resolution_Time_Hours
Phishing,High,Open,Phishing,
Malware,Critical,Resolved,Malware,12.5
";

    #[test]
    fn test_load_csv_lowercases_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incidents.csv");
        std::fs::write(&path, INCIDENTS_CSV).unwrap();

        let store = RecordStore::open_in_memory().unwrap();
        assert_eq!(store.load_csv(CYBER_INCIDENTS, &path).unwrap(), 2);

        let rows = store.get_all(CYBER_INCIDENTS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_text("title"), Some("Phishing"));
        assert!(rows[0].is_null("resolution_time_hours"));
        assert_eq!(rows[1].get_f64("resolution_time_hours"), Some(12.5));
    }

    #[test]
    fn test_load_csv_is_all_or_nothing() {
        let store = RecordStore::open_in_memory().unwrap();
        let csv = "title,severity,status\nGood,Low,Open\nBad,Extreme,Open\n";
        assert!(store.load_csv_from_reader(CYBER_INCIDENTS, csv.as_bytes()).is_err());
        assert_eq!(store.count(CYBER_INCIDENTS).unwrap(), 0);
    }

    #[test]
    fn test_load_csv_rejects_bad_headers_and_tables() {
        let store = RecordStore::open_in_memory().unwrap();
        let csv = "title,\"status) VALUES ('x'); --\"\nA,Open\n";
        assert!(matches!(
            store.load_csv_from_reader(CYBER_INCIDENTS, csv.as_bytes()),
            Err(Error::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.load_csv_from_reader("it_tickets;", "title\nA\n".as_bytes()),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_load_csv_missing_file() {
        let store = RecordStore::open_in_memory().unwrap();
        let result = store.load_csv(IT_TICKETS, Path::new("/nonexistent/tickets.csv"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_seed_only_fills_empty_tables() {
        let store = RecordStore::open_in_memory().unwrap();
        assert_eq!(store.seed_demo_data().unwrap(), 10);
        assert_eq!(store.seed_demo_data().unwrap(), 0);
        assert_eq!(store.count(CYBER_INCIDENTS).unwrap(), 4);
        assert_eq!(store.ticket_summary().unwrap().urgent, 1);

        let assigned = store
            .it_tickets(Some(&crate::fields! { "assignee" => "mike_admin" }))
            .unwrap();
        assert_eq!(assigned.len(), 1);
        assert!(assigned[0].get_text("date_assigned").is_some());
    }

    #[test]
    fn test_failed_seed_leaves_domain_empty() {
        let store = RecordStore::open_in_memory().unwrap();
        store
            .execute(
                "CREATE TRIGGER reject_ransomware BEFORE INSERT ON cyber_incidents \
                 WHEN NEW.title LIKE 'Ransomware%' \
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END",
                &[],
            )
            .unwrap();

        assert!(store.seed_demo_data().is_err());
        assert_eq!(store.count(CYBER_INCIDENTS).unwrap(), 0);

        store.execute("DROP TRIGGER reject_ransomware", &[]).unwrap();
        assert_eq!(store.seed_demo_data().unwrap(), 10);
        assert_eq!(store.count(CYBER_INCIDENTS).unwrap(), 4);
    }
}
