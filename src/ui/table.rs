use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::value::{display_value, Record};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Two-column metric/value table
#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Render generic rows with their own column headers.
///
/// `columns` gives the header when `records` is empty (e.g. from `columns_of`).
pub fn records_table(columns: &[String], records: &[Record]) -> String {
    let header: Vec<String> = match records.first() {
        Some(first) => first.columns().to_vec(),
        None => columns.to_vec(),
    };
    if header.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(header);
    for record in records {
        builder.push_record(record.values().iter().map(display_value));
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    #[test]
    fn test_records_table_renders_headers_and_cells() {
        let record = Record::new(
            vec!["id".into(), "title".into()],
            vec![Value::Integer(1), Value::Text("Phishing".into())],
        );
        let out = records_table(&[], &[record]);
        assert!(out.contains("title"));
        assert!(out.contains("Phishing"));

        let empty = records_table(&["id".to_string()], &[]);
        assert!(empty.contains("id"));
        assert!(records_table(&[], &[]).is_empty());
    }

    #[test]
    fn test_stats_table() {
        let out = stats_table(&[("users", "3".to_string())]);
        assert!(out.contains("Metric"));
        assert!(out.contains("users"));
    }
}
