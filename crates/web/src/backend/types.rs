//! Wire types for the auth and chat backends.
//!
//! Every non-streaming endpoint answers an envelope with `ok` and `msg`
//! fields; payload fields ride alongside. `#[serde(deny_unknown_fields)]` is
//! deliberately absent (backends may add fields), but expected fields are
//! required so a missing column is a decode error, not a silent default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carebot_core::UserIdx;

/// Profile returned by the auth backend for a verified account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    pub employee_no: String,
    pub email: String,
    pub developer: bool,
    pub admin: bool,
}

/// Outcome of a credential verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials verified; the profile is attached.
    Success(UserProfile),
    /// Unknown account or wrong password.
    InvalidCredentials,
    /// The account exists but is suspended.
    Suspended,
}

/// Generic response envelope (endpoints with no payload).
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
}

/// Login endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    /// `"invalid_credentials"` or `"suspended"` when `ok` is false.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Which signup field a uniqueness pre-check targets.
///
/// Exactly one field is checked per call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UniqueField {
    UserId,
    EmployeeNo,
    Email,
}

impl UniqueField {
    /// Human-readable field name for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UserId => "user id",
            Self::EmployeeNo => "employee number",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UserId => "user_id",
            Self::EmployeeNo => "employee_no",
            Self::Email => "email",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for UniqueField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_id" => Ok(Self::UserId),
            "employee_no" => Ok(Self::EmployeeNo),
            "email" => Ok(Self::Email),
            _ => Err(format!("invalid unique field: {s}")),
        }
    }
}

/// Result of a uniqueness pre-check.
#[derive(Debug, Clone, Deserialize)]
pub struct UniqueCheck {
    /// True when another account already uses the value.
    pub exists: bool,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct UniqueCheckResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub exists: bool,
}

impl UniqueCheckResponse {
    pub(super) fn into_check(self) -> UniqueCheck {
        UniqueCheck {
            exists: self.exists,
            msg: self.msg,
        }
    }
}

/// Payload for account creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub user_id: String,
    pub employee_no: String,
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub developer: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct CreatedResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    pub idx: Option<UserIdx>,
}

impl CreatedResponse {
    pub(super) const fn ok(&self) -> bool {
        self.ok
    }
}

/// Changes a signed-in user may apply to their own account.
///
/// `current_password` authorizes the change; `None` fields are untouched.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SelfUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
    pub current_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct SelfUpdateResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    pub user: Option<UserProfile>,
}

/// One row of the admin user snapshot.
///
/// All expected columns are required; a snapshot missing one fails to decode
/// and surfaces as a backend error instead of defaulting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub idx: UserIdx,
    pub user_id: String,
    pub user_name: String,
    pub employee_no: String,
    pub email: String,
    pub developer: bool,
    pub admin: bool,
    /// Signup approval granted by an admin.
    pub approved: bool,
    pub registered_at: DateTime<Utc>,
    /// Set while the account is suspended.
    pub suspended_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Whether the account is currently suspended.
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ListUsersResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// Per-row outcome of an admin action, as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    /// The state change was applied.
    Done,
    /// The row was already in the target state.
    NoWork,
    /// The action is not allowed for this row.
    OverWork,
}

impl std::fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::NoWork => write!(f, "no_work"),
            Self::OverWork => write!(f, "over_work"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RowActionResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    pub outcome: Option<RowOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct RowActionRequest {
    pub idx: UserIdx,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub way: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

/// Request body for a streaming chat completion.
///
/// The backend consumes a role-to-content map of the latest exchange rather
/// than the full transcript.
#[derive(Debug, Clone, Serialize)]
pub(super) struct ChatStreamRequest {
    pub txt_dict: std::collections::BTreeMap<String, String>,
    pub model_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ModelListResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct DefaultModelResponse {
    pub ok: bool,
    #[serde(default)]
    pub msg: String,
    pub model: Option<String>,
}

/// One SSE fragment payload from the chat stream.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct StreamFragment {
    pub text: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_missing_column_is_an_error() {
        // `approved` omitted: the decode must fail rather than default
        let json = r#"{
            "idx": 1, "user_id": "alice01", "user_name": "Alice",
            "employee_no": "E1001", "email": "alice@example.com",
            "developer": false, "admin": false,
            "registered_at": "2025-01-01T00:00:00Z", "suspended_at": null
        }"#;
        assert!(serde_json::from_str::<UserRecord>(json).is_err());
    }

    #[test]
    fn test_user_record_decode() {
        let json = r#"{
            "idx": 1, "user_id": "alice01", "user_name": "Alice",
            "employee_no": "E1001", "email": "alice@example.com",
            "developer": false, "admin": false, "approved": true,
            "registered_at": "2025-01-01T00:00:00Z",
            "suspended_at": "2025-06-01T00:00:00Z"
        }"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_suspended());
        assert!(record.approved);
    }

    #[test]
    fn test_row_outcome_serde() {
        assert_eq!(
            serde_json::from_str::<RowOutcome>("\"no_work\"").unwrap(),
            RowOutcome::NoWork
        );
        assert_eq!(RowOutcome::OverWork.to_string(), "over_work");
    }

    #[test]
    fn test_self_update_skips_untouched_fields() {
        let update = SelfUpdate {
            email: Some("new@example.com".to_owned()),
            current_password: "correct-horse-battery".to_owned(),
            ..SelfUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("email"));
        assert!(!json.contains("user_name"));
        assert!(!json.contains("new_password"));
    }
}
