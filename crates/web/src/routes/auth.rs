//! Login-area route handlers.
//!
//! The anonymous pages are all served from `/login`; which form renders is
//! decided by the session's [`LoginView`] position. Handlers never move the
//! view except through a legal transition.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::post,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::UniqueField;
use crate::error::{AppError, AuthError};
use crate::filters;
use crate::middleware::set_current_user;
use crate::models::{LoginView, SignupLocks, session_keys};
use crate::services::{AuthFlow, SignupForm};
use crate::state::AppState;

use super::home::render;
use super::{set_flash, take_flash};

/// Login form template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPageTemplate {
    notice: Option<String>,
}

/// Signup form template.
#[derive(Template)]
#[template(path = "auth/signup.html")]
struct SignupPageTemplate {
    notice: Option<String>,
    locks: SignupLocks,
    consent_acknowledged: bool,
}

/// Consent text template.
#[derive(Template)]
#[template(path = "auth/consent.html")]
struct ConsentPageTemplate {
    notice: Option<String>,
}

/// Forgot-password template.
#[derive(Template)]
#[template(path = "auth/forgot.html")]
struct ForgotPageTemplate {
    notice: Option<String>,
}

/// Suspended-account template.
#[derive(Template)]
#[template(path = "auth/suspended.html")]
struct SuspendedPageTemplate {
    notice: Option<String>,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", axum::routing::get(login_page).post(login))
        .route("/login/view", post(change_view))
        .route("/signup/check", post(check_unique))
        .route("/signup", post(signup))
        .route("/consent", post(consent))
        .route("/forgot", post(forgot_password))
        .route("/logout", post(logout))
}

/// The session's current login view, defaulting to the login form.
pub(crate) async fn current_view(session: &Session) -> LoginView {
    session
        .get(session_keys::LOGIN_VIEW)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Move the view if the transition is legal; otherwise leave it alone.
///
/// # Errors
///
/// Returns a validation error for an illegal transition, or a session
/// error when the new position cannot be stored.
pub(crate) async fn move_view(session: &Session, next: LoginView) -> Result<(), AppError> {
    let current = current_view(session).await;
    if current == next {
        return Ok(());
    }
    if !current.can_transition(next) {
        return Err(AppError::Validation(format!(
            "cannot move from {current} to {next}"
        )));
    }
    session.insert(session_keys::LOGIN_VIEW, next).await?;
    Ok(())
}

async fn signup_locks(session: &Session) -> SignupLocks {
    session
        .get(session_keys::SIGNUP_LOCKS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn consent_acknowledged(session: &Session) -> bool {
    session
        .get(session_keys::CONSENT_ACKNOWLEDGED)
        .await
        .ok()
        .flatten()
        .unwrap_or(false)
}

/// GET /login
///
/// Renders whichever form the state machine currently points at.
#[instrument(skip_all)]
async fn login_page(session: Session) -> Result<Response, AppError> {
    let view = current_view(&session).await;

    if view.is_authenticated() {
        return Ok(Redirect::to("/chat").into_response());
    }

    let notice = take_flash(&session).await;
    let page = match view {
        LoginView::Signup => render(SignupPageTemplate {
            notice,
            locks: signup_locks(&session).await,
            consent_acknowledged: consent_acknowledged(&session).await,
        }),
        LoginView::Consent => render(ConsentPageTemplate { notice }),
        LoginView::ForgotPassword => render(ForgotPageTemplate { notice }),
        LoginView::Suspended => render(SuspendedPageTemplate { notice }),
        _ => render(LoginPageTemplate { notice }),
    };
    Ok(page.into_response())
}

#[derive(Debug, Deserialize)]
struct ChangeViewForm {
    next: String,
}

/// POST /login/view
///
/// Explicit view changes from page links (signup, forgot password, back).
#[instrument(skip_all, fields(next = %form.next))]
async fn change_view(session: Session, Form(form): Form<ChangeViewForm>) -> Response {
    match form.next.parse::<LoginView>() {
        // authenticated positions are only reachable through login itself
        Ok(next) if !next.is_authenticated() => {
            if let Err(e) = move_view(&session, next).await {
                set_flash(&session, e.public_message()).await;
            }
        }
        _ => set_flash(&session, "Unknown page").await,
    }
    Redirect::to("/login").into_response()
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    user_id: String,
    password: String,
}

/// POST /login
#[instrument(skip_all, fields(user_id = %form.user_id))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    // the login form only exists on the login view
    if current_view(&session).await != LoginView::Login {
        return Ok(Redirect::to("/login").into_response());
    }

    let auth = AuthFlow::new(state.backend(), state.prototype());
    match auth.login(&form.user_id, &form.password).await {
        Ok(user) => {
            set_current_user(&session, &user).await?;
            move_view(&session, LoginView::Authenticated).await?;
            Ok(Redirect::to("/chat").into_response())
        }
        Err(AppError::Auth(AuthError::AccountSuspended)) => {
            // the one login failure that moves the view
            move_view(&session, LoginView::Suspended).await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => {
            set_flash(&session, e.public_message()).await;
            Ok(Redirect::to("/login").into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
struct UniqueCheckForm {
    field: String,
    value: String,
}

/// POST /signup/check
///
/// Uniqueness pre-check for one field; confirms or resets its lock.
#[instrument(skip_all, fields(field = %form.field))]
async fn check_unique(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UniqueCheckForm>,
) -> Result<Response, AppError> {
    if current_view(&session).await != LoginView::Signup {
        return Ok(Redirect::to("/login").into_response());
    }

    let Ok(field) = form.field.parse::<UniqueField>() else {
        set_flash(&session, "Unknown field").await;
        return Ok(Redirect::to("/login").into_response());
    };

    let mut locks = signup_locks(&session).await;
    let auth = AuthFlow::new(state.backend(), state.prototype());

    let confirmed = match auth.check_unique(field, &form.value).await {
        Ok(msg) => {
            let notice = if msg.is_empty() {
                format!("{} is available", field.label())
            } else {
                msg
            };
            set_flash(&session, notice).await;
            true
        }
        Err(e) => {
            set_flash(&session, e.public_message()).await;
            false
        }
    };

    // a lock records the exact value it was confirmed for
    let lock = confirmed.then_some(form.value);
    match field {
        UniqueField::UserId => locks.user_id = lock,
        UniqueField::EmployeeNo => locks.employee_no = lock,
        UniqueField::Email => locks.email = lock,
    }
    session.insert(session_keys::SIGNUP_LOCKS, &locks).await?;

    Ok(Redirect::to("/login").into_response())
}

#[derive(Debug, Deserialize)]
struct SignupFormData {
    user_id: String,
    employee_no: String,
    email: String,
    user_name: String,
    password: String,
    password_confirm: String,
    #[serde(default)]
    developer: Option<String>,
}

/// POST /signup
#[instrument(skip_all, fields(user_id = %form.user_id))]
async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupFormData>,
) -> Result<Response, AppError> {
    if current_view(&session).await != LoginView::Signup {
        return Ok(Redirect::to("/login").into_response());
    }

    // a field edited after its availability check loses its confirmation
    let locks = signup_locks(&session)
        .await
        .reconcile(&form.user_id, &form.employee_no, &form.email);
    session.insert(session_keys::SIGNUP_LOCKS, &locks).await?;

    let consent = consent_acknowledged(&session).await;

    let signup_form = SignupForm {
        user_id: form.user_id,
        employee_no: form.employee_no,
        email: form.email,
        user_name: form.user_name,
        password: form.password,
        password_confirm: form.password_confirm,
        developer: form.developer.is_some(),
    };

    let auth = AuthFlow::new(state.backend(), state.prototype());
    match auth.signup(&signup_form, locks, consent).await {
        Ok(()) => {
            // back to login; the account waits for admin approval
            move_view(&session, LoginView::Login).await?;
            session
                .remove::<SignupLocks>(session_keys::SIGNUP_LOCKS)
                .await?;
            session
                .remove::<bool>(session_keys::CONSENT_ACKNOWLEDGED)
                .await?;
            set_flash(
                &session,
                "Account created. An administrator must approve it before you can sign in.",
            )
            .await;
        }
        Err(AppError::ConsentRequired) => {
            move_view(&session, LoginView::Consent).await?;
        }
        Err(e) => {
            set_flash(&session, e.public_message()).await;
        }
    }

    Ok(Redirect::to("/login").into_response())
}

#[derive(Debug, Deserialize)]
struct ConsentFormData {
    #[serde(default)]
    agree: Option<String>,
}

/// POST /consent
#[instrument(skip_all)]
async fn consent(session: Session, Form(form): Form<ConsentFormData>) -> Result<Response, AppError> {
    if current_view(&session).await != LoginView::Consent {
        return Ok(Redirect::to("/login").into_response());
    }

    if form.agree.is_some() {
        session
            .insert(session_keys::CONSENT_ACKNOWLEDGED, true)
            .await?;
        set_flash(&session, "Consent recorded.").await;
    } else {
        set_flash(&session, "Consent is required before creating an account.").await;
    }

    move_view(&session, LoginView::Signup).await?;
    Ok(Redirect::to("/login").into_response())
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordForm {
    user_id: String,
    email: String,
}

/// POST /forgot
#[instrument(skip_all, fields(user_id = %form.user_id))]
async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response, AppError> {
    if current_view(&session).await != LoginView::ForgotPassword {
        return Ok(Redirect::to("/login").into_response());
    }

    let auth = AuthFlow::new(state.backend(), state.prototype());
    match auth.request_password_reset(&form.user_id, &form.email).await {
        Ok(()) => {
            move_view(&session, LoginView::Login).await?;
            // neutral notice: no account-existence oracle
            set_flash(
                &session,
                "If the account exists, reset instructions have been issued.",
            )
            .await;
        }
        Err(e) => {
            set_flash(&session, e.public_message()).await;
        }
    }

    Ok(Redirect::to("/login").into_response())
}

/// POST /logout
///
/// Flushes the whole session; the view machine starts over at login.
#[instrument(skip_all)]
async fn logout(session: Session) -> Result<Response, AppError> {
    session.flush().await?;
    Ok(Redirect::to("/login").into_response())
}
