//! SQLite record store - the generic CRUD engine
//!
//! Every value reaches SQLite as a bound parameter. Table and column names
//! cannot be bound, so each one passes [`ident::validate`] before it is
//! written into statement text.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, DatabaseName, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::schema;
use crate::ident;
use crate::value::{without_nulls, Fields, Record};
use crate::{Error, Result};

/// What to do with a filter whose column name fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Drop the offending filter, log it, and run the query with the rest.
    #[default]
    Permissive,
    /// Fail the whole call.
    Strict,
}

/// Result of [`RecordStore::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rows returned by a `SELECT`
    Rows(Vec<Record>),
    /// A committed mutation and the number of rows it touched
    Done(usize),
}

impl Outcome {
    pub fn rows(self) -> Vec<Record> {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Done(_) => Vec::new(),
        }
    }

    pub fn affected(&self) -> usize {
        match self {
            Outcome::Rows(_) => 0,
            Outcome::Done(n) => *n,
        }
    }
}

/// `LIMIT`/`OFFSET` window for a read. `limit: None` means no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit: Some(limit), offset }
    }

    /// The first `limit` rows
    pub fn first(limit: usize) -> Self {
        Self::new(limit, 0)
    }

    fn sql(&self, next_param: usize) -> (String, [Value; 2]) {
        let limit = self.limit.map_or(-1, |n| n as i64);
        (
            format!(" LIMIT ?{} OFFSET ?{}", next_param, next_param + 1),
            [Value::Integer(limit), Value::Integer(self.offset as i64)],
        )
    }
}

/// SQLite-backed record store.
///
/// Owns exactly one connection. Each primitive commits or rolls back on its
/// own; nothing spans two calls. Dropping the store closes the connection.
pub struct RecordStore {
    conn: Option<Connection>,
    filter_policy: FilterPolicy,
}

impl RecordStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!("Opened record store at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Some(conn),
            filter_policy: FilterPolicy::default(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    pub fn with_filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.filter_policy = policy;
        self
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        self.filter_policy
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::Closed)
    }

    // ========== Statement Execution ==========

    /// Run one parameterized statement.
    ///
    /// Statements starting with `SELECT` (any case) return their rows. Anything
    /// else runs in its own transaction and returns the affected row count;
    /// on failure the transaction is rolled back and the error returned.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<Outcome> {
        if is_read(sql) {
            self.query(sql, params).map(Outcome::Rows)
        } else {
            self.mutate(sql, params).map(|(affected, _)| Outcome::Done(affected))
        }
    }

    /// Apply the same statement to every parameter set in a single transaction.
    ///
    /// All-or-nothing: one failing set rolls back the whole batch.
    pub fn execute_batch(&self, sql: &str, param_sets: &[Vec<Value>]) -> Result<usize> {
        let conn = self.conn()?;
        let run = || -> rusqlite::Result<usize> {
            let tx = conn.unchecked_transaction()?;
            let mut affected = 0;
            {
                let mut stmt = tx.prepare(sql)?;
                for params in param_sets {
                    affected += stmt.execute(params_from_iter(params.iter()))?;
                }
            }
            tx.commit()?;
            Ok(affected)
        };

        tracing::debug!("Batch ({} sets): {}", param_sets.len(), sql);
        run().map_err(|e| {
            tracing::error!("Rolled back batch {:?}: {}", sql, e);
            e.into()
        })
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        tracing::debug!("Query: {}", sql);

        let run = || -> rusqlite::Result<Vec<Record>> {
            let mut stmt = conn.prepare(sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| Record::from_row(&columns, row))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        };

        run().map_err(|e| {
            tracing::error!("Query failed {:?}: {}", sql, e);
            e.into()
        })
    }

    /// Single-statement transaction; returns (affected rows, last insert rowid).
    fn mutate(&self, sql: &str, params: &[Value]) -> Result<(usize, i64)> {
        let conn = self.conn()?;
        tracing::debug!("Mutation: {}", sql);

        let run = || -> rusqlite::Result<(usize, i64)> {
            let tx = conn.unchecked_transaction()?;
            let affected = tx.execute(sql, params_from_iter(params.iter()))?;
            let rowid = tx.last_insert_rowid();
            tx.commit()?;
            Ok((affected, rowid))
        };

        run().map_err(|e| {
            tracing::error!("Rolled back {:?}: {}", sql, e);
            e.into()
        })
    }

    // ========== CRUD ==========

    /// Insert a row and return its surrogate id.
    ///
    /// NULL-valued fields are dropped; an empty remainder is rejected before
    /// touching the database.
    pub fn insert(&self, table: &str, fields: &Fields) -> Result<i64> {
        let present = writable_fields(table, fields)?;
        let table = ident::validate(table)?;
        ident::validate_all(present.iter().map(|(c, _)| *c))?;

        let columns: Vec<&str> = present.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let params: Vec<Value> = present.into_iter().map(|(_, v)| v.clone()).collect();

        let (_, rowid) = self.mutate(&sql, &params)?;
        Ok(rowid)
    }

    /// Insert several rows in one transaction. Every row must carry the same
    /// columns; NULLs are written as given. Returns the number of rows added.
    pub fn insert_many(&self, table: &str, rows: &[Fields]) -> Result<usize> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        if first.is_empty() {
            tracing::warn!("Refusing to write empty payload to {:?}", table);
            return Err(Error::EmptyPayload(table.to_string()));
        }
        let table = ident::validate(table)?;
        ident::validate_all(first.keys().map(String::as_str))?;

        let mut param_sets = Vec::with_capacity(rows.len());
        for row in rows {
            if !row.keys().eq(first.keys()) {
                tracing::warn!("Rows for {} do not share the same columns", table);
                return Err(Error::InvalidValue(format!(
                    "rows for {} must all have the same columns",
                    table
                )));
            }
            param_sets.push(row.values().cloned().collect::<Vec<_>>());
        }

        let columns: Vec<&str> = first.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        self.execute_batch(&sql, &param_sets)
    }

    /// Update the row with the given id. Returns `false` when no row matched.
    ///
    /// The `id` column itself is never writable here.
    pub fn update(&self, table: &str, id: i64, fields: &Fields) -> Result<bool> {
        if let Some(column) = fields.keys().find(|c| c.eq_ignore_ascii_case("id")) {
            tracing::warn!("Refusing to rewrite {:?} of {:?} row {}", column, table, id);
            return Err(Error::ImmutableColumn(column.clone()));
        }
        let present = writable_fields(table, fields)?;
        let table = ident::validate(table)?;
        ident::validate_all(present.iter().map(|(c, _)| *c))?;

        let assignments: Vec<String> = present
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            assignments.join(", "),
            present.len() + 1
        );
        let mut params: Vec<Value> = present.into_iter().map(|(_, v)| v.clone()).collect();
        params.push(Value::Integer(id));

        let (affected, _) = self.mutate(&sql, &params)?;
        Ok(affected > 0)
    }

    /// Delete the row with the given id. Deleting a missing id is a no-op
    /// that returns `false`.
    pub fn delete(&self, table: &str, id: i64) -> Result<bool> {
        let table = ident::validate(table)?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let (affected, _) = self.mutate(&sql, &[Value::Integer(id)])?;
        Ok(affected > 0)
    }

    /// Get a row by id
    pub fn get_by_id(&self, table: &str, id: i64) -> Result<Option<Record>> {
        let table = ident::validate(table)?;
        let sql = format!("SELECT * FROM {} WHERE id = ?1", table);
        let rows = self.query(&sql, &[Value::Integer(id)])?;
        Ok(rows.into_iter().next())
    }

    /// Get every row of a table, in rowid order
    pub fn get_all(&self, table: &str) -> Result<Vec<Record>> {
        let table = ident::validate(table)?;
        self.query(&format!("SELECT * FROM {} ORDER BY id", table), &[])
    }

    /// One page of rows using `LIMIT`/`OFFSET`.
    ///
    /// Pages are not a snapshot: writes between two page reads can shift rows
    /// across page boundaries, so a row may be seen twice or not at all.
    pub fn get_page(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<Record>> {
        self.select_filtered(table, &Fields::new(), None, Some(Page::new(limit, offset)))
    }

    /// Rows matching every `column = value` pair.
    ///
    /// Under [`FilterPolicy::Permissive`] an invalid column name is dropped
    /// with a warning and the remaining filters still apply; under
    /// [`FilterPolicy::Strict`] the call fails.
    pub fn find_by_filter(&self, table: &str, filters: &Fields) -> Result<Vec<Record>> {
        self.select_filtered(table, filters, None, None)
    }

    /// Filtered select with an optional `ORDER BY <column> DESC, id DESC`
    /// and an optional page window.
    pub(crate) fn select_filtered(
        &self,
        table: &str,
        filters: &Fields,
        newest_first_by: Option<&str>,
        page: Option<Page>,
    ) -> Result<Vec<Record>> {
        let table = ident::validate(table)?;

        let mut predicates = Vec::new();
        let mut params = Vec::new();
        for (column, value) in filters {
            if let Err(e) = ident::validate(column) {
                match self.filter_policy {
                    FilterPolicy::Strict => return Err(e),
                    FilterPolicy::Permissive => {
                        tracing::warn!("Dropping filter on invalid column {:?}", column);
                        continue;
                    }
                }
            }
            if matches!(value, Value::Null) {
                predicates.push(format!("{} IS NULL", column));
            } else {
                params.push(value.clone());
                predicates.push(format!("{} = ?{}", column, params.len()));
            }
        }

        let mut sql = format!("SELECT * FROM {}", table);
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        match newest_first_by {
            Some(column) => {
                let column = ident::validate(column)?;
                sql.push_str(&format!(" ORDER BY {} DESC, id DESC", column));
            }
            None => sql.push_str(" ORDER BY id"),
        }
        if let Some(page) = page {
            let (clause, window) = page.sql(params.len() + 1);
            sql.push_str(&clause);
            params.extend(window);
        }

        self.query(&sql, &params)
    }

    /// Substring match on one column (`LIKE '%value%'`, ASCII case-insensitive).
    pub fn search(&self, table: &str, column: &str, substring: &str) -> Result<Vec<Record>> {
        let table = ident::validate(table)?;
        let column = ident::validate(column)?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} LIKE '%' || ?1 || '%' ORDER BY id",
            table, column
        );
        self.query(&sql, &[Value::Text(substring.to_string())])
    }

    /// Whether any row has `column = value`
    pub fn exists(&self, table: &str, column: &str, value: &Value) -> Result<bool> {
        let table = ident::validate(table)?;
        let column = ident::validate(column)?;
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)", table, column);
        let found: bool = self.conn()?.query_row(&sql, [value], |row| row.get(0))?;
        Ok(found)
    }

    /// Column names of a table in declaration order. Empty for unknown tables.
    pub fn columns_of(&self, table: &str) -> Result<Vec<String>> {
        let table = ident::validate(table)?;
        let mut stmt = self
            .conn()?
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    /// Count rows in a table
    pub fn count(&self, table: &str) -> Result<usize> {
        let table = ident::validate(table)?;
        let count: i64 = self
            .conn()?
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Row counts for every schema table
    pub fn counts_by_table(&self) -> Result<TableCounts> {
        let conn = self.conn()?;
        let mut counts = Vec::with_capacity(schema::ALL_TABLES.len());
        for table in schema::ALL_TABLES {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            counts.push((table.to_string(), count as usize));
        }
        Ok(TableCounts { counts })
    }

    /// Single scalar query helper for aggregate views
    pub(crate) fn query_scalar<T: rusqlite::types::FromSql>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>> {
        let value = self
            .conn()?
            .query_row(sql, params_from_iter(params.iter()), |row| row.get::<_, Option<T>>(0))
            .optional()?;
        Ok(value.flatten())
    }

    // ========== Backup ==========

    /// Write a consistent point-in-time copy of the database to `path`.
    pub fn backup_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.conn()?
            .backup(DatabaseName::Main, path, None)
            .map_err(|e| {
                tracing::error!("Backup to {} failed: {}", path.display(), e);
                Error::from(e)
            })?;
        tracing::info!("Backed up database to {}", path.display());
        Ok(())
    }

    /// Replace the open database's contents with a backup file.
    pub fn restore_from(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("backup file does not exist: {}", path.display()),
            )));
        }
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;
        conn.restore(DatabaseName::Main, path, None::<fn(rusqlite::backup::Progress)>)?;
        self.initialize_schema()?;
        tracing::info!("Restored database from {}", path.display());
        Ok(())
    }

    // ========== Lifecycle ==========

    /// Close the connection. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| e)?;
            tracing::debug!("Closed record store");
        }
        Ok(())
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close record store: {}", e);
        }
    }
}

fn is_read(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

/// Fields that will actually be written; empty payloads are rejected.
fn writable_fields<'a>(table: &str, fields: &'a Fields) -> Result<Vec<(&'a str, &'a Value)>> {
    let present = without_nulls(fields);
    if present.is_empty() {
        tracing::warn!("Refusing to write empty payload to {:?}", table);
        return Err(Error::EmptyPayload(table.to_string()));
    }
    Ok(present)
}

/// Row counts per table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCounts {
    counts: Vec<(String, usize)>,
}

impl TableCounts {
    pub fn get(&self, table: &str) -> Option<usize> {
        self.counts.iter().find(|(t, _)| t == table).map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(t, n)| (t.as_str(), *n))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

impl Serialize for TableCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (table, count) in &self.counts {
            map.serialize_entry(table, count)?;
        }
        map.end()
    }
}

impl std::fmt::Display for TableCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, count) in &self.counts {
            writeln!(f, "  {}: {}", table, count)?;
        }
        write!(f, "  total: {}", self.total())
    }
}
