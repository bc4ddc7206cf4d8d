//! Flat-file user store for early testing.
//!
//! Stands in for the auth backend's login verification when
//! `PROTOTYPE_DB_PATH` is set. The file is a JSON array of user records
//! with plaintext passwords; it is read once at startup and never written.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::backend::{LoginOutcome, UserProfile};

/// Errors that can occur when loading the prototype store.
#[derive(Debug, Error)]
pub enum PrototypeStoreError {
    /// The file could not be read.
    #[error("failed to read store file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid user list.
    #[error("failed to parse store file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct PrototypeUser {
    user_id: String,
    password: SecretString,
    user_name: String,
    employee_no: String,
    email: String,
    #[serde(default)]
    developer: bool,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    suspended: bool,
}

/// In-memory copy of the flat-file user list.
#[derive(Debug)]
pub struct PrototypeStore {
    users: Vec<PrototypeUser>,
}

impl PrototypeStore {
    /// Load the store from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PrototypeStoreError> {
        let raw = std::fs::read_to_string(path)?;
        let users = serde_json::from_str(&raw)?;
        Ok(Self { users })
    }

    /// Verify credentials against the loaded list.
    ///
    /// Mirrors the auth backend's login contract: a suspended account is
    /// reported as such only after the password matches.
    #[must_use]
    pub fn verify(&self, user_id: &str, password: &str) -> LoginOutcome {
        let Some(user) = self.users.iter().find(|u| u.user_id == user_id) else {
            return LoginOutcome::InvalidCredentials;
        };

        if user.password.expose_secret() != password {
            return LoginOutcome::InvalidCredentials;
        }

        if user.suspended {
            return LoginOutcome::Suspended;
        }

        LoginOutcome::Success(UserProfile {
            user_id: user.user_id.clone(),
            user_name: user.user_name.clone(),
            employee_no: user.employee_no.clone(),
            email: user.email.clone(),
            developer: user.developer,
            admin: user.admin,
        })
    }

    /// Number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with(content: &str) -> PrototypeStore {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        PrototypeStore::load(file.path()).unwrap()
    }

    const SAMPLE: &str = r#"[
        {
            "user_id": "alice01",
            "password": "correct-horse-battery",
            "user_name": "Alice",
            "employee_no": "E1001",
            "email": "alice@example.com",
            "admin": true
        },
        {
            "user_id": "bob-02",
            "password": "another-secret-pass",
            "user_name": "Bob",
            "employee_no": "E1002",
            "email": "bob@example.com",
            "suspended": true
        }
    ]"#;

    #[test]
    fn test_verify_success() {
        let store = store_with(SAMPLE);
        assert_eq!(store.len(), 2);

        let outcome = store.verify("alice01", "correct-horse-battery");
        let LoginOutcome::Success(profile) = outcome else {
            panic!("expected success");
        };
        assert_eq!(profile.user_name, "Alice");
        assert!(profile.admin);
        assert!(!profile.developer);
    }

    #[test]
    fn test_verify_wrong_password() {
        let store = store_with(SAMPLE);
        assert_eq!(
            store.verify("alice01", "wrong"),
            LoginOutcome::InvalidCredentials
        );
    }

    #[test]
    fn test_verify_unknown_user() {
        let store = store_with(SAMPLE);
        assert_eq!(
            store.verify("nobody", "correct-horse-battery"),
            LoginOutcome::InvalidCredentials
        );
    }

    #[test]
    fn test_verify_suspended_after_password_match() {
        let store = store_with(SAMPLE);
        assert_eq!(
            store.verify("bob-02", "another-secret-pass"),
            LoginOutcome::Suspended
        );
        // wrong password on a suspended account stays invalid_credentials
        assert_eq!(
            store.verify("bob-02", "wrong"),
            LoginOutcome::InvalidCredentials
        );
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(matches!(
            PrototypeStore::load(file.path()),
            Err(PrototypeStoreError::Parse(_))
        ));
    }

    #[test]
    fn test_passwords_are_redacted_in_debug() {
        let store = store_with(SAMPLE);
        let debug = format!("{store:?}");
        assert!(!debug.contains("correct-horse-battery"));
    }
}
