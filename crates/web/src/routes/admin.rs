//! Admin user-management routes.

use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use carebot_core::UserIdx;

use crate::components::{UserTableConfig, user_table::users_table_config};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::services::{AdminAction, AdminRow, AdminTable, UserFilter};
use crate::state::AppState;

use super::home::render;
use super::take_flash;

/// Admin grid template.
#[derive(Template)]
#[template(path = "admin/index.html")]
struct AdminPageTemplate {
    user: CurrentUser,
    rows: Vec<AdminRow>,
    config: UserTableConfig,
    active_filter: String,
    search_user_id: String,
    error: Option<String>,
    notice: Option<String>,
}

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(index))
        .route("/api/admin/action", post(apply_action))
}

#[derive(Debug, Deserialize, Default)]
struct GridQuery {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

fn parse_filter(query: &GridQuery) -> UserFilter {
    if let Some(user_id) = query.user_id.as_deref().filter(|s| !s.is_empty()) {
        return UserFilter::ByUserId(user_id.to_owned());
    }
    match query.filter.as_deref() {
        Some("pending") => UserFilter::PendingApproval,
        Some("suspended") => UserFilter::Suspended,
        Some("developer") => UserFilter::Developer,
        _ => UserFilter::All,
    }
}

fn filter_name(filter: &UserFilter) -> &'static str {
    match filter {
        UserFilter::All | UserFilter::ByUserId(_) => "all",
        UserFilter::PendingApproval => "pending",
        UserFilter::Suspended => "suspended",
        UserFilter::Developer => "developer",
    }
}

/// GET /admin
///
/// One snapshot fetch per page view; filters run over that snapshot.
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn index(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<GridQuery>,
) -> impl IntoResponse {
    let table = AdminTable::new(state.backend(), state.config().allow_hard_delete);
    let filter = parse_filter(&query);

    // a broken snapshot (unreachable backend, missing column) is surfaced
    // on the page, never shown as an empty grid
    let (rows, error) = match table.snapshot().await {
        Ok(rows) => (filter.apply(&rows).into_iter().cloned().collect(), None),
        Err(e) => {
            tracing::error!(error = %e, "User snapshot failed");
            (Vec::new(), Some(e.public_message()))
        }
    };

    let notice = take_flash(&session).await;
    render(AdminPageTemplate {
        user,
        rows,
        config: users_table_config(state.config().allow_hard_delete),
        active_filter: filter_name(&filter).to_owned(),
        search_user_id: query.user_id.unwrap_or_default(),
        error,
        notice,
    })
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: String,
    #[serde(default)]
    selected: Vec<i32>,
    #[serde(default)]
    new_password: Option<String>,
}

/// POST /api/admin/action
///
/// Applies one action to the selection, one backend call per row, and
/// returns every row's outcome.
#[instrument(skip_all, fields(user_id = %user.user_id, action = %request.action))]
async fn apply_action(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let action: AdminAction = request
        .action
        .parse()
        .map_err(AppError::Validation)?;

    let selection: Vec<UserIdx> = request.selected.iter().copied().map(UserIdx::new).collect();

    let table = AdminTable::new(state.backend(), state.config().allow_hard_delete);
    let rows = table.snapshot().await?;
    let report = table
        .apply(action, &selection, &rows, request.new_password.as_deref())
        .await?;

    let row_reports: Vec<serde_json::Value> = report
        .rows
        .iter()
        .map(|r| {
            serde_json::json!({
                "idx": r.idx,
                "user_id": r.user_id,
                "outcome": r.outcome.to_string(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "empty_selection": report.is_empty(),
        "done_count": report.done_count(),
        "rows": row_reports,
    })))
}
