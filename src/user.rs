//! Users of the platform
//!
//! Password hashes are opaque to this crate: they are produced and checked by
//! an [`crate::auth::PasswordVerifier`] and only stored here.

use crate::value::{Fields, Record};
use serde::{Deserialize, Serialize};

/// A row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: Option<String>,
}

impl User {
    /// Build from a generic record; `None` when a required column is missing.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: record.id()?,
            username: record.get_text("username")?.to_string(),
            password_hash: record.get_text("password_hash")?.to_string(),
            role: record.get_text("role")?.to_string(),
            created_at: record.get_text("created_at").map(str::to_string),
        })
    }
}

/// Registration payload with an already-hashed password
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            role: role.into(),
        }
    }

    pub fn into_fields(self) -> Fields {
        crate::fields! {
            "username" => self.username,
            "password_hash" => self.password_hash,
            "role" => self.role,
        }
    }
}
