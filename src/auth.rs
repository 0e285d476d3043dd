//! Authentication seam
//!
//! Hashing and verification belong to the caller. The store only hands back
//! the opaque `password_hash` it holds for a username; a [`PasswordVerifier`]
//! decides whether a plaintext matches it. There are no built-in credential
//! tables.

use serde::{Deserialize, Serialize};

use crate::storage::RecordStore;
use crate::Result;

/// Checks a username/password pair
pub trait Authenticator {
    fn verify(&self, username: &str, plaintext: &str) -> bool;
}

/// Compares a plaintext password against a stored opaque hash
pub trait PasswordVerifier {
    fn matches(&self, plaintext: &str, password_hash: &str) -> bool;
}

impl<F> PasswordVerifier for F
where
    F: Fn(&str, &str) -> bool,
{
    fn matches(&self, plaintext: &str, password_hash: &str) -> bool {
        self(plaintext, password_hash)
    }
}

/// Authenticator backed by the `users` table
pub struct StoreAuthenticator<'a, V> {
    store: &'a RecordStore,
    verifier: V,
}

impl<'a, V: PasswordVerifier> StoreAuthenticator<'a, V> {
    pub fn new(store: &'a RecordStore, verifier: V) -> Self {
        Self { store, verifier }
    }
}

impl<V: PasswordVerifier> Authenticator for StoreAuthenticator<'_, V> {
    fn verify(&self, username: &str, plaintext: &str) -> bool {
        match self.store.user_by_username(username) {
            Ok(Some(user)) => self.verifier.matches(plaintext, &user.password_hash),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("User lookup failed for {}: {}", username, e);
                false
            }
        }
    }
}

/// Logged-in user context, passed explicitly to whatever handles a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

/// Authenticate and open a session, recording a `login` activity entry.
///
/// Returns `Ok(None)` for unknown users or wrong passwords.
pub fn login(
    store: &RecordStore,
    auth: &dyn Authenticator,
    username: &str,
    password: &str,
) -> Result<Option<Session>> {
    if !auth.verify(username, password) {
        tracing::info!("Rejected login for {}", username);
        return Ok(None);
    }
    let Some(user) = store.user_by_username(username)? else {
        return Ok(None);
    };

    store.log_activity(Some(user.id), &user.username, "login", "User logged in")?;
    Ok(Some(Session {
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Record the end of a session
pub fn logout(store: &RecordStore, session: Session) -> Result<()> {
    store.log_activity(Some(session.user_id), &session.username, "logout", "User logged out")?;
    Ok(())
}
