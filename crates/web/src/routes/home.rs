//! Landing and no-access pages.

use askama::Template;
use axum::{
    Router,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::filters;
use crate::middleware::{OptionalUser, RequireAuth};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Landing page template.
#[derive(Template)]
#[template(path = "home/index.html")]
struct HomePageTemplate {
    user: Option<CurrentUser>,
}

/// No-access page template, shown to non-admins who open the admin screen.
#[derive(Template)]
#[template(path = "home/no_access.html")]
struct NoAccessTemplate {
    user: CurrentUser,
}

/// Build the home router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/no-access", get(no_access))
}

/// GET /
async fn index(OptionalUser(user): OptionalUser) -> impl IntoResponse {
    render(HomePageTemplate { user })
}

/// GET /no-access
async fn no_access(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    render(NoAccessTemplate { user })
}

pub(crate) fn render<T: Template>(template: T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {e}");
        "Internal Server Error".to_string()
    }))
}
