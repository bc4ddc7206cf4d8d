//! Login, signup, and account self-service operations.
//!
//! Form validation happens here, in a fixed order, before any backend
//! call. The login-view state machine itself lives in
//! [`crate::models::LoginView`]; handlers consult it before moving.

use tracing::instrument;

use carebot_core::{Email, Password, UserId, UserName};

use crate::backend::{
    BackendClient, LoginOutcome, NewUser, SelfUpdate, UniqueField, UserProfile,
};
use crate::error::{AppError, AuthError};
use crate::models::{CurrentUser, SignupLocks};
use crate::store::PrototypeStore;

/// The signup form as submitted.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub user_id: String,
    pub employee_no: String,
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub password_confirm: String,
    pub developer: bool,
}

/// Auth operations against the backend (or the prototype store).
pub struct AuthFlow<'a> {
    backend: &'a BackendClient,
    prototype: Option<&'a PrototypeStore>,
}

impl<'a> AuthFlow<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, prototype: Option<&'a PrototypeStore>) -> Self {
        Self { backend, prototype }
    }

    /// Verify credentials and return the signed-in user.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for empty fields (no backend call)
    /// - [`AuthError::InvalidCredentials`] / [`AuthError::AccountSuspended`]
    /// - [`AppError::Backend`] on transport failure
    #[instrument(skip(self, password), fields(user_id = %user_id))]
    pub async fn login(&self, user_id: &str, password: &str) -> Result<CurrentUser, AppError> {
        if user_id.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "user id and password are required".to_owned(),
            ));
        }

        let outcome = match self.prototype {
            Some(store) => store.verify(user_id, password),
            None => self.backend.login(user_id, password).await?,
        };

        match outcome {
            LoginOutcome::Success(profile) => Ok(profile_to_user(profile)),
            LoginOutcome::InvalidCredentials => Err(AuthError::InvalidCredentials.into()),
            LoginOutcome::Suspended => Err(AuthError::AccountSuspended.into()),
        }
    }

    /// Uniqueness pre-check for one signup field.
    ///
    /// Local format validation happens first; malformed input never reaches
    /// the backend. Returns the backend's message on a confirmed field.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for empty or malformed input
    /// - [`AppError::UniquenessConflict`] when the value is taken
    /// - [`AppError::Backend`] on transport failure
    #[instrument(skip(self, value))]
    pub async fn check_unique(
        &self,
        field: UniqueField,
        value: &str,
    ) -> Result<String, AppError> {
        validate_unique_input(field, value)?;

        let check = self.backend.check_unique(field, value).await?;
        if check.exists {
            Err(AppError::UniquenessConflict {
                field: field.label().to_owned(),
            })
        } else {
            Ok(check.msg)
        }
    }

    /// Validate and submit a signup.
    ///
    /// The validation order is fixed: uniqueness locks, empty fields,
    /// password and user-name format, consent, then the backend call.
    ///
    /// # Errors
    ///
    /// See [`validate_signup`]; backend failures map to
    /// [`AppError::Backend`].
    #[instrument(skip(self, form, locks), fields(user_id = %form.user_id))]
    pub async fn signup(
        &self,
        form: &SignupForm,
        locks: SignupLocks,
        consent_acknowledged: bool,
    ) -> Result<(), AppError> {
        let new_user = validate_signup(form, locks, consent_acknowledged)?;
        self.backend.create_user(&new_user).await?;
        Ok(())
    }

    /// Apply profile changes to the signed-in user's own account.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input, or a backend error
    /// (a wrong current password surfaces as an error envelope).
    #[instrument(skip(self, update), fields(user_id = %user.user_id))]
    pub async fn update_self(
        &self,
        user: &CurrentUser,
        update: SelfUpdate,
    ) -> Result<CurrentUser, AppError> {
        if update.current_password.is_empty() {
            return Err(AppError::Validation(
                "current password is required".to_owned(),
            ));
        }
        if let Some(email) = &update.email {
            Email::parse(email).map_err(|e| AppError::Validation(e.to_string()))?;
        }
        if let Some(name) = &update.user_name {
            UserName::parse(name).map_err(|e| AppError::Validation(e.to_string()))?;
        }
        if let Some(password) = &update.new_password {
            Password::parse(password).map_err(|e| AppError::Validation(e.to_string()))?;
        }

        let profile = self.backend.update_self(&user.user_id, &update).await?;
        Ok(profile_to_user(profile))
    }

    /// Voluntarily suspend the signed-in user's own account.
    ///
    /// The caller clears the session afterwards.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty password, or a backend error.
    #[instrument(skip(self, password), fields(user_id = %user.user_id))]
    pub async fn suspend_self(&self, user: &CurrentUser, password: &str) -> Result<(), AppError> {
        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_owned()));
        }
        self.backend.suspend_self(&user.user_id, password).await?;
        Ok(())
    }

    /// Ask the backend to start a password reset.
    ///
    /// Always reports the same neutral notice to the caller, regardless of
    /// whether the account exists.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty fields, or a backend error.
    #[instrument(skip(self, email), fields(user_id = %user_id))]
    pub async fn request_password_reset(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<(), AppError> {
        if user_id.is_empty() || email.is_empty() {
            return Err(AppError::Validation(
                "user id and email are required".to_owned(),
            ));
        }
        Email::parse(email).map_err(|e| AppError::Validation(e.to_string()))?;
        self.backend.request_password_reset(user_id, email).await?;
        Ok(())
    }
}

fn profile_to_user(profile: UserProfile) -> CurrentUser {
    CurrentUser {
        user_id: profile.user_id,
        user_name: profile.user_name,
        employee_no: profile.employee_no,
        email: profile.email,
        developer: profile.developer,
        admin: profile.admin,
    }
}

/// Validate a uniqueness-check input locally.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for empty or malformed input.
fn validate_unique_input(field: UniqueField, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!(
            "{} cannot be empty",
            field.label()
        )));
    }
    match field {
        UniqueField::UserId => {
            UserId::parse(value).map_err(|e| AppError::Validation(e.to_string()))?;
        }
        UniqueField::Email => {
            Email::parse(value).map_err(|e| AppError::Validation(e.to_string()))?;
        }
        // Employee number formats vary by site; only emptiness is checked
        UniqueField::EmployeeNo => {}
    }
    Ok(())
}

/// Validate the signup form in the fixed order and build the creation
/// payload.
///
/// # Errors
///
/// In order of precedence:
/// 1. [`AppError::Validation`] when a uniqueness lock is unconfirmed, or
///    was confirmed for a different value than the one submitted
/// 2. [`AppError::Validation`] for empty password / confirmation / name
/// 3. [`AppError::Validation`] for a password mismatch or format violation
/// 4. [`AppError::ConsentRequired`] when consent is unacknowledged
pub fn validate_signup(
    form: &SignupForm,
    locks: SignupLocks,
    consent_acknowledged: bool,
) -> Result<NewUser, AppError> {
    // 1. every uniqueness pre-check must have passed for the value actually
    //    being submitted; a lock only vouches for the value it was checked on
    let locks = locks.reconcile(&form.user_id, &form.employee_no, &form.email);
    if let Some(field) = locks.first_unconfirmed() {
        return Err(AppError::Validation(format!(
            "{field} has not passed the uniqueness check"
        )));
    }

    // 2. empty-field checks
    for (label, value) in [
        ("password", &form.password),
        ("password confirmation", &form.password_confirm),
        ("user name", &form.user_name),
    ] {
        if value.is_empty() {
            return Err(AppError::Validation(format!("{label} cannot be empty")));
        }
    }

    // 3. match and format checks
    if form.password != form.password_confirm {
        return Err(AppError::Validation(
            "password and confirmation do not match".to_owned(),
        ));
    }
    Password::parse(&form.password).map_err(|e| AppError::Validation(e.to_string()))?;
    UserName::parse(&form.user_name).map_err(|e| AppError::Validation(e.to_string()))?;

    // 4. consent gate
    if !consent_acknowledged {
        return Err(AppError::ConsentRequired);
    }

    Ok(NewUser {
        user_id: form.user_id.clone(),
        employee_no: form.employee_no.clone(),
        email: form.email.clone(),
        user_name: form.user_name.clone(),
        password: form.password.clone(),
        developer: form.developer,
    })
}
