//! Legacy user-file migration
//!
//! Imports `username,password_hash,role` lines from a flat credentials file
//! into the `users` table. Existing usernames are skipped, so running the
//! migration again is harmless.
//!
//! The existence check and the insert are two separate statements. Two
//! processes migrating into the same database at once can race between them;
//! the loser's insert then fails on the UNIQUE constraint and is counted as an
//! error. Single-operator use does not hit this.

use std::path::Path;

use rusqlite::types::Value;
use serde::Serialize;

use super::schema::USERS;
use super::RecordStore;
use crate::user::NewUser;
use crate::Result;

/// Outcome counts of one migration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Users inserted by this run
    pub migrated: usize,
    /// Lines whose username already existed
    pub skipped: usize,
    /// Malformed lines and failed inserts
    pub errors: usize,
    /// Record lines seen (blank and `#` comment lines excluded)
    pub total: usize,
}

impl MigrationReport {
    pub fn skipped_or_errored(&self) -> usize {
        self.skipped + self.errors
    }
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "User Migration:")?;
        writeln!(f, "  Migrated: {}", self.migrated)?;
        writeln!(f, "  Skipped (existing): {}", self.skipped)?;
        writeln!(f, "  Errors: {}", self.errors)?;
        write!(f, "  Lines: {}", self.total)
    }
}

/// Split a record line into its first three fields; extra fields are ignored.
fn parse_line(line: &str) -> Option<NewUser> {
    let mut parts = line.split(',').map(str::trim);
    let username = parts.next()?;
    let password_hash = parts.next()?;
    let role = parts.next()?;
    if username.is_empty() || password_hash.is_empty() || role.is_empty() {
        return None;
    }
    Some(NewUser::new(username, password_hash, role))
}

impl RecordStore {
    /// Migrate users from a flat file. A missing or unreadable file is an
    /// `Io` error and nothing is written.
    pub fn migrate_users_from_file(&self, path: &Path) -> Result<MigrationReport> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Cannot read user file {}: {}", path.display(), e);
            e
        })?;
        let report = self.migrate_users(&contents);
        tracing::info!(
            "Migrated {} users from {} ({} skipped, {} errors)",
            report.migrated,
            path.display(),
            report.skipped,
            report.errors
        );
        Ok(report)
    }

    /// Migrate users from file contents already in memory
    pub fn migrate_users(&self, contents: &str) -> MigrationReport {
        let mut report = MigrationReport::default();

        for (lineno, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            report.total += 1;

            let Some(user) = parse_line(line) else {
                tracing::warn!("Malformed user line {}: {:?}", lineno + 1, line);
                report.errors += 1;
                continue;
            };

            match self.exists(USERS, "username", &Value::Text(user.username.clone())) {
                Ok(true) => {
                    tracing::debug!("User {} already exists, skipping", user.username);
                    report.skipped += 1;
                }
                Ok(false) => match self.add_user(user) {
                    Ok(_) => report.migrated += 1,
                    Err(e) => {
                        tracing::warn!("Failed to migrate line {}: {}", lineno + 1, e);
                        report.errors += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!("Existence check failed on line {}: {}", lineno + 1, e);
                    report.errors += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const USERS_FILE: &str = "\
# legacy credentials
john_analyst,$2b$12$aaaa,cyber_analyst

sara_scientist,$2b$12$bbbb,data_scientist,extra,fields
mike_admin,$2b$12$cccc,it_administrator
";

    #[test]
    fn test_parse_line() {
        let user = parse_line("alice, h , admin ,ignored").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password_hash, "h");
        assert_eq!(user.role, "admin");
        assert!(parse_line("onlyonefield").is_none());
        assert!(parse_line("a,b").is_none());
        assert!(parse_line("a,,c").is_none());
    }

    #[test]
    fn test_migration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.txt");
        std::fs::write(&path, USERS_FILE).unwrap();

        let store = RecordStore::open_in_memory().unwrap();
        let first = store.migrate_users_from_file(&path).unwrap();
        assert_eq!(first, MigrationReport { migrated: 3, skipped: 0, errors: 0, total: 3 });

        let second = store.migrate_users_from_file(&path).unwrap();
        assert_eq!(second.migrated, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(second.skipped_or_errored(), 3);
        assert_eq!(store.count(USERS).unwrap(), 3);

        let sara = store.user_by_username("sara_scientist").unwrap().unwrap();
        assert_eq!(sara.role, "data_scientist");
    }

    #[test]
    fn test_malformed_line_does_not_stop_migration() {
        let store = RecordStore::open_in_memory().unwrap();
        let report = store.migrate_users("onlyonefield\nalice,h1,admin\nbob,h2\ncarol,h3,user\n");
        assert_eq!(report.migrated, 2);
        assert_eq!(report.errors, 2);
        assert_eq!(report.total, 4);
        assert!(store.user_by_username("carol").unwrap().is_some());
    }

    #[test]
    fn test_existing_user_keeps_original_hash() {
        let store = RecordStore::open_in_memory().unwrap();
        store.add_user(NewUser::new("alice", "original", "admin")).unwrap();

        let report = store.migrate_users("alice,replacement,user\n");
        assert_eq!(report.skipped, 1);
        let alice = store.user_by_username("alice").unwrap().unwrap();
        assert_eq!(alice.password_hash, "original");
        assert_eq!(alice.role, "admin");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let store = RecordStore::open_in_memory().unwrap();
        let result = store.migrate_users_from_file(Path::new("/nonexistent/users.txt"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
        assert_eq!(store.count(USERS).unwrap(), 0);
    }

    #[test]
    fn test_crlf_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "alice,h1,admin\r\nbob,h2,user\r\n").unwrap();

        let store = RecordStore::open_in_memory().unwrap();
        let report = store.migrate_users_from_file(file.path()).unwrap();
        assert_eq!(report.migrated, 2);
        assert_eq!(store.user_by_username("bob").unwrap().unwrap().role, "user");
    }
}
