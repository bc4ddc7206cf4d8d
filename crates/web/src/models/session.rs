//! Session-scoped state: the signed-in user, the login view machine,
//! the chat transcript, and signup progress.

use serde::{Deserialize, Serialize};

use carebot_core::{ChatRole, EffectiveRole};

/// Session storage keys.
pub mod session_keys {
    /// Key for the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
    /// Key for the login view state machine position.
    pub const LOGIN_VIEW: &str = "login_view";
    /// Key for the chat transcript.
    pub const CHAT_HISTORY: &str = "chat_history";
    /// Key for the selected model name.
    pub const SELECTED_MODEL: &str = "selected_model";
    /// Key for the signup uniqueness-check locks.
    pub const SIGNUP_LOCKS: &str = "signup_locks";
    /// Key for the signup consent acknowledgment.
    pub const CONSENT_ACKNOWLEDGED: &str = "consent_acknowledged";
    /// Key for the one-shot flash notice shown on the next page render.
    pub const FLASH_NOTICE: &str = "flash_notice";
}

/// The currently signed-in user, as stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// Login identifier.
    pub user_id: String,
    /// Display name.
    pub user_name: String,
    /// Employee number.
    pub employee_no: String,
    /// Email address.
    pub email: String,
    /// Developer flag.
    pub developer: bool,
    /// Admin flag.
    pub admin: bool,
}

impl CurrentUser {
    /// Single role label derived from the permission flags.
    #[must_use]
    pub const fn role(&self) -> EffectiveRole {
        EffectiveRole::from_flags(self.developer, self.admin)
    }
}

/// Position in the login view state machine.
///
/// Only the transitions listed in [`LoginView::can_transition`] are legal;
/// handlers reject anything else without moving the view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginView {
    /// Anonymous landing: the login form.
    #[default]
    Login,
    /// Account creation form.
    Signup,
    /// Personal-data consent text, reached from signup.
    Consent,
    /// Password reset request form.
    ForgotPassword,
    /// Signed in; the main application is available.
    Authenticated,
    /// Profile editing, reached from the authenticated view.
    EditProfile,
    /// Voluntary account suspension confirmation.
    SelfSuspend,
    /// Shown after a login attempt against a suspended account.
    Suspended,
}

impl LoginView {
    /// Whether this view is part of the signed-in area.
    ///
    /// The session's `current_user` must be present exactly while the view
    /// is one of these.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::EditProfile | Self::SelfSuspend)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Login,
                Self::Signup | Self::ForgotPassword | Self::Authenticated | Self::Suspended
            ) | (Self::Signup, Self::Consent | Self::Login)
                | (Self::Consent, Self::Signup)
                | (Self::ForgotPassword, Self::Login)
                | (Self::Authenticated, Self::EditProfile | Self::Login)
                | (Self::EditProfile, Self::Authenticated | Self::SelfSuspend)
                | (Self::SelfSuspend, Self::EditProfile | Self::Login)
                | (Self::Suspended, Self::Login)
        )
    }
}

impl std::fmt::Display for LoginView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Consent => "consent",
            Self::ForgotPassword => "forgot_password",
            Self::Authenticated => "authenticated",
            Self::EditProfile => "edit_profile",
            Self::SelfSuspend => "self_suspend",
            Self::Suspended => "suspended",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for LoginView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Self::Login),
            "signup" => Ok(Self::Signup),
            "consent" => Ok(Self::Consent),
            "forgot_password" => Ok(Self::ForgotPassword),
            "authenticated" => Ok(Self::Authenticated),
            "edit_profile" => Ok(Self::EditProfile),
            "self_suspend" => Ok(Self::SelfSuspend),
            "suspended" => Ok(Self::Suspended),
            _ => Err(format!("invalid login view: {s}")),
        }
    }
}

/// One message in the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-field uniqueness-check confirmations collected during signup.
///
/// Each lock stores the exact value the backend confirmed, so a lock only
/// covers that value. All three must be confirmed before account creation
/// is submitted; editing a locked field resets its lock (see
/// [`SignupLocks::reconcile`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SignupLocks {
    pub user_id: Option<String>,
    pub employee_no: Option<String>,
    pub email: Option<String>,
}

impl SignupLocks {
    /// Whether every field passed its uniqueness pre-check.
    #[must_use]
    pub const fn all_confirmed(&self) -> bool {
        self.user_id.is_some() && self.employee_no.is_some() && self.email.is_some()
    }

    /// The display name of the first unconfirmed field, if any.
    #[must_use]
    pub const fn first_unconfirmed(&self) -> Option<&'static str> {
        if self.user_id.is_none() {
            Some("user id")
        } else if self.employee_no.is_none() {
            Some("employee number")
        } else if self.email.is_none() {
            Some("email")
        } else {
            None
        }
    }

    /// Drop every lock whose confirmed value differs from the submitted one.
    ///
    /// A lock vouches for one exact value; a field edited after its check
    /// must be checked again.
    #[must_use]
    pub fn reconcile(self, user_id: &str, employee_no: &str, email: &str) -> Self {
        fn keep(lock: Option<String>, submitted: &str) -> Option<String> {
            lock.filter(|confirmed| confirmed == submitted)
        }
        Self {
            user_id: keep(self.user_id, user_id),
            employee_no: keep(self.employee_no, employee_no),
            email: keep(self.email, email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_transitions() {
        assert!(LoginView::Login.can_transition(LoginView::Signup));
        assert!(LoginView::Login.can_transition(LoginView::ForgotPassword));
        assert!(LoginView::Login.can_transition(LoginView::Authenticated));
        assert!(LoginView::Login.can_transition(LoginView::Suspended));
        assert!(!LoginView::Login.can_transition(LoginView::EditProfile));
        assert!(!LoginView::Login.can_transition(LoginView::Consent));
    }

    #[test]
    fn test_signup_consent_loop() {
        assert!(LoginView::Signup.can_transition(LoginView::Consent));
        assert!(LoginView::Consent.can_transition(LoginView::Signup));
        assert!(!LoginView::Consent.can_transition(LoginView::Authenticated));
        assert!(!LoginView::Consent.can_transition(LoginView::Login));
    }

    #[test]
    fn test_authenticated_transitions() {
        assert!(LoginView::Authenticated.can_transition(LoginView::EditProfile));
        assert!(LoginView::Authenticated.can_transition(LoginView::Login));
        assert!(!LoginView::Authenticated.can_transition(LoginView::Signup));
        assert!(LoginView::EditProfile.can_transition(LoginView::SelfSuspend));
        assert!(LoginView::SelfSuspend.can_transition(LoginView::Login));
        assert!(LoginView::SelfSuspend.can_transition(LoginView::EditProfile));
    }

    #[test]
    fn test_suspended_only_returns_to_login() {
        assert!(LoginView::Suspended.can_transition(LoginView::Login));
        assert!(!LoginView::Suspended.can_transition(LoginView::Authenticated));
        assert!(!LoginView::Suspended.can_transition(LoginView::Signup));
    }

    #[test]
    fn test_is_authenticated() {
        assert!(LoginView::Authenticated.is_authenticated());
        assert!(LoginView::EditProfile.is_authenticated());
        assert!(LoginView::SelfSuspend.is_authenticated());
        assert!(!LoginView::Login.is_authenticated());
        assert!(!LoginView::Suspended.is_authenticated());
    }

    #[test]
    fn test_signup_locks() {
        let mut locks = SignupLocks::default();
        assert!(!locks.all_confirmed());
        assert_eq!(locks.first_unconfirmed(), Some("user id"));

        locks.user_id = Some("alice01".to_owned());
        assert_eq!(locks.first_unconfirmed(), Some("employee number"));

        locks.employee_no = Some("E1001".to_owned());
        locks.email = Some("alice@example.com".to_owned());
        assert!(locks.all_confirmed());
        assert_eq!(locks.first_unconfirmed(), None);
    }

    #[test]
    fn test_reconcile_resets_edited_locks() {
        let locks = SignupLocks {
            user_id: Some("alice01".to_owned()),
            employee_no: Some("E1001".to_owned()),
            email: Some("alice@example.com".to_owned()),
        };

        // unchanged values keep their locks
        let same = locks
            .clone()
            .reconcile("alice01", "E1001", "alice@example.com");
        assert!(same.all_confirmed());

        // an edited field loses its lock; the others keep theirs
        let edited = locks.reconcile("bob02", "E1001", "alice@example.com");
        assert_eq!(edited.user_id, None);
        assert!(edited.employee_no.is_some());
        assert!(edited.email.is_some());
        assert_eq!(edited.first_unconfirmed(), Some("user id"));
    }

    #[test]
    fn test_current_user_role() {
        let user = CurrentUser {
            user_id: "alice01".to_owned(),
            user_name: "Alice".to_owned(),
            employee_no: "E1001".to_owned(),
            email: "alice@example.com".to_owned(),
            developer: true,
            admin: false,
        };
        assert_eq!(user.role(), EffectiveRole::Developer);
    }

    #[test]
    fn test_login_view_serde_roundtrip() {
        let view = LoginView::ForgotPassword;
        let json = serde_json::to_string(&view).ok();
        assert_eq!(json.as_deref(), Some("\"forgot_password\""));
    }
}
