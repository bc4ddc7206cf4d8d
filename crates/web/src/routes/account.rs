//! Self-service account routes: edit profile and voluntary suspension.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::SelfUpdate;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, LoginView};
use crate::services::AuthFlow;
use crate::state::AppState;

use super::auth::move_view;
use super::home::render;
use super::{set_flash, take_flash};

/// Profile edit template.
#[derive(Template)]
#[template(path = "account/edit.html")]
struct EditProfileTemplate {
    user: CurrentUser,
    notice: Option<String>,
}

/// Self-suspension confirmation template.
#[derive(Template)]
#[template(path = "account/suspend.html")]
struct SelfSuspendTemplate {
    user: CurrentUser,
    notice: Option<String>,
}

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(edit_page).post(update))
        .route("/account/suspend", get(suspend_page).post(suspend))
}

/// GET /account
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn edit_page(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response, AppError> {
    move_view(&session, LoginView::EditProfile).await?;
    let notice = take_flash(&session).await;
    Ok(render(EditProfileTemplate { user, notice }).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateForm {
    user_name: String,
    email: String,
    new_password: String,
    new_password_confirm: String,
    current_password: String,
}

/// POST /account
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateForm>,
) -> Result<Response, AppError> {
    if form.new_password != form.new_password_confirm {
        set_flash(&session, "New password and confirmation do not match").await;
        return Ok(Redirect::to("/account").into_response());
    }

    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
    let update = SelfUpdate {
        user_name: non_empty(form.user_name).filter(|n| *n != user.user_name),
        email: non_empty(form.email).filter(|e| *e != user.email),
        new_password: non_empty(form.new_password),
        current_password: form.current_password,
    };

    let auth = AuthFlow::new(state.backend(), state.prototype());
    match auth.update_self(&user, update).await {
        Ok(updated) => {
            set_current_user(&session, &updated).await?;
            set_flash(&session, "Profile updated.").await;
        }
        Err(e) => set_flash(&session, e.public_message()).await,
    }

    Ok(Redirect::to("/account").into_response())
}

/// GET /account/suspend
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn suspend_page(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response, AppError> {
    move_view(&session, LoginView::SelfSuspend).await?;
    let notice = take_flash(&session).await;
    Ok(render(SelfSuspendTemplate { user, notice }).into_response())
}

#[derive(Debug, Deserialize)]
struct SuspendForm {
    password: String,
}

/// POST /account/suspend
///
/// On success the whole session is flushed; the account can only be
/// reactivated by an administrator.
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn suspend(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SuspendForm>,
) -> Result<Response, AppError> {
    let auth = AuthFlow::new(state.backend(), state.prototype());
    match auth.suspend_self(&user, &form.password).await {
        Ok(()) => {
            session.flush().await?;
            set_flash(&session, "Your account has been suspended.").await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => {
            set_flash(&session, e.public_message()).await;
            Ok(Redirect::to("/account/suspend").into_response())
        }
    }
}
