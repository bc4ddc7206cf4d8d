//! Validated login credential types.
//!
//! The auth backend enforces the same rules server-side; validating here
//! lets the UI fail fast with a field-level message before any HTTP call.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a credential field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The input string is empty.
    #[error("{field} cannot be empty")]
    Empty {
        /// Field name for the message.
        field: &'static str,
    },
    /// The input length is outside the allowed range.
    #[error("{field} must be {min}-{max} characters")]
    BadLength {
        field: &'static str,
        min: usize,
        max: usize,
    },
    /// The input contains a character the field does not allow.
    #[error("{field} contains an invalid character")]
    BadCharacter {
        /// Field name for the message.
        field: &'static str,
    },
}

/// A user-chosen login identifier.
///
/// 4-20 characters: ASCII letters, digits, `-`, `_`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub const MIN_LENGTH: usize = 4;
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `UserId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input, out-of-range length, or a character
    /// outside `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        const FIELD: &str = "user id";
        if s.is_empty() {
            return Err(CredentialError::Empty { field: FIELD });
        }
        if s.len() < Self::MIN_LENGTH || s.len() > Self::MAX_LENGTH {
            return Err(CredentialError::BadLength {
                field: FIELD,
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CredentialError::BadCharacter { field: FIELD });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `UserId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A raw password as submitted on the login or signup form.
///
/// 12-64 printable ASCII characters, no spaces. The front-end never stores
/// this; it is forwarded to the auth backend and dropped.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub const MIN_LENGTH: usize = 12;
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Password` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input, out-of-range length, or a
    /// non-printable-ASCII character (spaces included).
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        const FIELD: &str = "password";
        if s.is_empty() {
            return Err(CredentialError::Empty { field: FIELD });
        }
        if s.len() < Self::MIN_LENGTH || s.len() > Self::MAX_LENGTH {
            return Err(CredentialError::BadLength {
                field: FIELD,
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        if !s.chars().all(|c| c.is_ascii_graphic()) {
            return Err(CredentialError::BadCharacter { field: FIELD });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the password as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Passwords must never leak through Debug output.
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// A display name.
///
/// 2-20 characters, no control characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    pub const MIN_LENGTH: usize = 2;
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `UserName` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input, out-of-range character count, or a
    /// control character.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        const FIELD: &str = "user name";
        if s.is_empty() {
            return Err(CredentialError::Empty { field: FIELD });
        }
        let chars = s.chars().count();
        if chars < Self::MIN_LENGTH || chars > Self::MAX_LENGTH {
            return Err(CredentialError::BadLength {
                field: FIELD,
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_control) {
            return Err(CredentialError::BadCharacter { field: FIELD });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `UserName` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_valid() {
        assert!(UserId::parse("alice").is_ok());
        assert!(UserId::parse("user-01_a").is_ok());
        assert!(UserId::parse("abcd").is_ok());
        assert!(UserId::parse(&"a".repeat(20)).is_ok());
    }

    #[test]
    fn test_user_id_invalid() {
        assert!(matches!(
            UserId::parse(""),
            Err(CredentialError::Empty { .. })
        ));
        assert!(matches!(
            UserId::parse("abc"),
            Err(CredentialError::BadLength { .. })
        ));
        assert!(matches!(
            UserId::parse(&"a".repeat(21)),
            Err(CredentialError::BadLength { .. })
        ));
        assert!(matches!(
            UserId::parse("user name"),
            Err(CredentialError::BadCharacter { .. })
        ));
        assert!(matches!(
            UserId::parse("user@host"),
            Err(CredentialError::BadCharacter { .. })
        ));
    }

    #[test]
    fn test_password_valid() {
        assert!(Password::parse("correct-horse-battery").is_ok());
        assert!(Password::parse(&"x".repeat(12)).is_ok());
        assert!(Password::parse(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_password_invalid() {
        assert!(matches!(
            Password::parse(""),
            Err(CredentialError::Empty { .. })
        ));
        assert!(matches!(
            Password::parse("short"),
            Err(CredentialError::BadLength { .. })
        ));
        assert!(matches!(
            Password::parse(&"x".repeat(65)),
            Err(CredentialError::BadLength { .. })
        ));
        assert!(matches!(
            Password::parse("has a space pad pad"),
            Err(CredentialError::BadCharacter { .. })
        ));
    }

    #[test]
    fn test_password_debug_redacted() {
        let pwd = Password::parse("correct-horse-battery").unwrap();
        assert_eq!(format!("{pwd:?}"), "Password(***)");
    }

    #[test]
    fn test_user_name_valid() {
        assert!(UserName::parse("Jo").is_ok());
        assert!(UserName::parse("Kim Minjun").is_ok());
        assert!(UserName::parse(&"n".repeat(20)).is_ok());
    }

    #[test]
    fn test_user_name_invalid() {
        assert!(matches!(
            UserName::parse(""),
            Err(CredentialError::Empty { .. })
        ));
        assert!(matches!(
            UserName::parse("x"),
            Err(CredentialError::BadLength { .. })
        ));
        assert!(matches!(
            UserName::parse(&"n".repeat(21)),
            Err(CredentialError::BadLength { .. })
        ));
        assert!(matches!(
            UserName::parse("bad\nname"),
            Err(CredentialError::BadCharacter { .. })
        ));
    }
}
