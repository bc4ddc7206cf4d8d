//! Role enums.

use serde::{Deserialize, Serialize};

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// The effective role of an account, derived from its permission flags.
///
/// Flags are additive: an account can be both developer and admin, and the
/// heavier flag wins when a single label is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveRole {
    User,
    Developer,
    Admin,
}

impl EffectiveRole {
    /// Derive the label from the raw permission flags.
    #[must_use]
    pub const fn from_flags(developer: bool, admin: bool) -> Self {
        if admin {
            Self::Admin
        } else if developer {
            Self::Developer
        } else {
            Self::User
        }
    }
}

impl std::fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Developer => write!(f, "developer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}
