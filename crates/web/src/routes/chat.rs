//! Chat page and streaming routes.
//!
//! The reply stream is forwarded to the browser as SSE while being
//! accumulated server-side; the assistant message is committed to the
//! session transcript at most once, on clean completion. An interrupted
//! stream commits nothing.

use askama::Template;
use async_stream::stream;
use axum::{
    Json, Router,
    extract::State,
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{ChatMessage, CurrentUser, LoginView, session_keys};
use crate::services::ChatService;
use crate::state::AppState;

use super::auth::{current_view, move_view};
use super::home::render;
use super::{set_flash, take_flash};

/// Chat page template.
#[derive(Template)]
#[template(path = "chat/index.html")]
struct ChatPageTemplate {
    user: CurrentUser,
    messages: Vec<ChatMessage>,
    models: Vec<String>,
    selected_model: String,
    notice: Option<String>,
    backend_error: Option<String>,
}

/// Build the chat router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", get(chat_page))
        .route("/chat/model", post(select_model))
        .route("/chat/clear", post(clear_history))
        .route("/api/chat/stream", post(stream_message))
}

async fn chat_history(session: &Session) -> Vec<ChatMessage> {
    session
        .get(session_keys::CHAT_HISTORY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// GET /chat
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn chat_page(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    // a pending self-suspension confirmation must be resolved first
    if current_view(&session).await == LoginView::SelfSuspend {
        return Ok(Redirect::to("/account/suspend").into_response());
    }
    move_view(&session, LoginView::Authenticated).await?;

    let messages = chat_history(&session).await;
    let notice = take_flash(&session).await;

    // a catalog failure degrades the page instead of breaking it
    let (models, default_model, backend_error) = match state.models().info().await {
        Ok(info) => (info.models.clone(), Some(info.default_model.clone()), None),
        Err(e) => {
            tracing::error!(error = %e, "Model catalog unavailable");
            (Vec::new(), None, Some("Model list is unavailable".to_owned()))
        }
    };

    let selected_model = match session
        .get::<String>(session_keys::SELECTED_MODEL)
        .await
        .ok()
        .flatten()
    {
        Some(model) => model,
        None => {
            let model = default_model.unwrap_or_default();
            if !model.is_empty() {
                session
                    .insert(session_keys::SELECTED_MODEL, &model)
                    .await?;
            }
            model
        }
    };

    Ok(render(ChatPageTemplate {
        user,
        messages,
        models,
        selected_model,
        notice,
        backend_error,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
struct SelectModelForm {
    model: String,
}

/// POST /chat/model
#[instrument(skip_all, fields(model = %form.model))]
async fn select_model(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    axum::Form(form): axum::Form<SelectModelForm>,
) -> Result<Response, AppError> {
    let models = state.models().models().await?;
    if models.contains(&form.model) {
        session
            .insert(session_keys::SELECTED_MODEL, &form.model)
            .await?;
    } else {
        set_flash(&session, "Unknown model").await;
    }
    Ok(Redirect::to("/chat").into_response())
}

/// POST /chat/clear
#[instrument(skip_all)]
async fn clear_history(
    RequireAuth(_user): RequireAuth,
    session: Session,
) -> Result<Response, AppError> {
    session
        .remove::<Vec<ChatMessage>>(session_keys::CHAT_HISTORY)
        .await?;
    Ok(Redirect::to("/chat").into_response())
}

#[derive(Debug, Deserialize)]
struct StreamRequest {
    message: String,
}

/// POST /api/chat/stream
///
/// Appends the user message to the transcript, opens the backend fragment
/// stream, and forwards it as SSE. The `done` event is only sent after the
/// assistant message has been committed.
#[instrument(skip_all, fields(user_id = %user.user_id))]
async fn stream_message(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<StreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, AppError> {
    let message = request.message.trim().to_owned();
    if message.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_owned()));
    }

    let model = match session
        .get::<String>(session_keys::SELECTED_MODEL)
        .await
        .ok()
        .flatten()
    {
        Some(model) => model,
        None => state.models().default_model().await?,
    };

    // commit the user message before streaming; the transcript now ends in
    // a user turn until the reply lands
    let mut history = chat_history(&session).await;
    history.push(ChatMessage::user(message));
    session
        .insert(session_keys::CHAT_HISTORY, &history)
        .await?;

    let service = ChatService::new(state.backend().clone());
    let fragments = service.reply_stream(&history, &model).await?;

    let sse_stream = stream! {
        let mut reply = String::new();
        let mut fragments = std::pin::pin!(fragments);

        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    reply.push_str(&fragment);
                    yield Ok(sse_event("fragment", &fragment));
                }
                Err(e) => {
                    // partial accumulation is discarded; nothing committed
                    tracing::error!(error = %e, "Chat stream interrupted");
                    yield Ok(sse_event("error", "The reply was interrupted"));
                    return;
                }
            }
        }

        // clean completion: commit the assistant message exactly once.
        // The session layer already saved when the handler returned, so the
        // record must be persisted explicitly from inside the body.
        history.push(ChatMessage::assistant(reply));
        let committed = match session.insert(session_keys::CHAT_HISTORY, &history).await {
            Ok(()) => session.save().await,
            Err(e) => Err(e),
        };
        if let Err(e) = committed {
            tracing::error!(error = %e, "Failed to commit assistant message");
            yield Ok(sse_event("error", "The reply could not be saved"));
            return;
        }

        yield Ok(sse_event("done", ""));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

fn sse_event(kind: &str, text: &str) -> Event {
    let payload = serde_json::json!({ "type": kind, "text": text });
    Event::default().data(payload.to_string())
}
