//! Typed client over the auth and chat backends.
//!
//! Control-plane calls use short timeouts (3 s connect / 5 s read); the
//! chat completion stream gets its own client with a 300 s overall budget.

use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::instrument;

use carebot_core::{ChatRole, UserIdx};

use crate::config::BackendConfig;
use crate::models::ChatMessage;

use super::error::BackendError;
use super::types::{
    ChatStreamRequest, CreatedResponse, DefaultModelResponse, Envelope, ListUsersResponse,
    LoginOutcome, LoginResponse, ModelListResponse, NewUser, RowActionRequest, RowActionResponse,
    RowOutcome, SelfUpdate, SelfUpdateResponse, StreamFragment, UniqueCheck, UniqueCheckResponse,
    UniqueField, UserProfile, UserRecord,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for both backends.
///
/// Cheap to clone; all clones share the underlying connection pools.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    /// Short-timeout client for control-plane calls.
    http: reqwest::Client,
    /// Long-timeout client for the chat completion stream.
    stream_http: reqwest::Client,
    /// Auth backend base, normalized without a trailing slash.
    auth_base: String,
    /// Chat backend base, normalized without a trailing slash.
    chat_base: String,
    api_version: String,
}

impl BackendClient {
    /// Create a new backend client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers.clone())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;

        let stream_http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(STREAM_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                http,
                stream_http,
                auth_base: config.auth_url.as_str().trim_end_matches('/').to_owned(),
                chat_base: config.chat_url.as_str().trim_end_matches('/').to_owned(),
                api_version: config.api_version.clone(),
            }),
        })
    }

    fn auth_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}",
            self.inner.auth_base, self.inner.api_version
        )
    }

    fn chat_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}",
            self.inner.chat_base, self.inner.api_version
        )
    }

    // ---- auth backend -----------------------------------------------------

    /// Verify credentials against the auth backend.
    ///
    /// Rejections (`invalid_credentials`, `suspended`) are domain outcomes,
    /// not errors.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed response.
    #[instrument(skip(self, password), fields(user_id = %user_id))]
    pub async fn login(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<LoginOutcome, BackendError> {
        let body = serde_json::json!({ "user_id": user_id, "password": password });
        let response: LoginResponse = self
            .post_json(&self.auth_endpoint("login/verify"), &body)
            .await?;

        if response.ok {
            return response.user.map(LoginOutcome::Success).ok_or_else(|| {
                BackendError::Parse("login response missing user profile".to_owned())
            });
        }

        match response.reason.as_deref() {
            Some("suspended") => Ok(LoginOutcome::Suspended),
            _ => Ok(LoginOutcome::InvalidCredentials),
        }
    }

    /// Uniqueness pre-check for exactly one signup field.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self, value))]
    pub async fn check_unique(
        &self,
        field: UniqueField,
        value: &str,
    ) -> Result<UniqueCheck, BackendError> {
        let body = serde_json::json!({ "field": field, "value": value });
        let response: UniqueCheckResponse = self
            .post_json(&self.auth_endpoint("login/verify_unique_key"), &body)
            .await?;

        if response.ok {
            Ok(response.into_check())
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    /// Submit account creation.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope (the
    /// backend re-checks uniqueness before inserting).
    #[instrument(skip(self, new_user), fields(user_id = %new_user.user_id))]
    pub async fn create_user(&self, new_user: &NewUser) -> Result<UserIdx, BackendError> {
        let response: CreatedResponse = self
            .post_json(&self.auth_endpoint("login/add_user"), new_user)
            .await?;

        if response.ok() {
            response
                .idx
                .ok_or_else(|| BackendError::Parse("create response missing idx".to_owned()))
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    /// Apply changes to the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope (e.g. a
    /// wrong current password).
    #[instrument(skip(self, update), fields(user_id = %user_id))]
    pub async fn update_self(
        &self,
        user_id: &str,
        update: &SelfUpdate,
    ) -> Result<UserProfile, BackendError> {
        let body = serde_json::json!({ "user_id": user_id, "update": update });
        let response: SelfUpdateResponse = self
            .post_json(&self.auth_endpoint("login/self_update"), &body)
            .await?;

        if response.ok {
            response
                .user
                .ok_or_else(|| BackendError::Parse("update response missing profile".to_owned()))
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    /// Voluntarily suspend the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self, password), fields(user_id = %user_id))]
    pub async fn suspend_self(&self, user_id: &str, password: &str) -> Result<(), BackendError> {
        let body = serde_json::json!({ "user_id": user_id, "password": password });
        let response: Envelope = self
            .post_json(&self.auth_endpoint("login/self_block"), &body)
            .await?;
        Self::expect_ok(response)
    }

    /// Ask the backend to start a password reset for an account.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure only; the backend answers a
    /// neutral envelope regardless of account existence.
    #[instrument(skip(self, email), fields(user_id = %user_id))]
    pub async fn request_password_reset(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "user_id": user_id, "email": email });
        let response: Envelope = self
            .post_json(&self.auth_endpoint("login/reset_request"), &body)
            .await?;
        Self::expect_ok(response)
    }

    // ---- admin endpoints (auth backend) ------------------------------------

    /// Fetch the full user-record snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an error envelope, or a
    /// snapshot row missing an expected column.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        let response: ListUsersResponse =
            self.get_json(&self.auth_endpoint("admin/users")).await?;

        if response.ok {
            Ok(response.users)
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    /// Grant or revoke signup approval for one row.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self))]
    pub async fn set_approval(
        &self,
        idx: UserIdx,
        approve: bool,
    ) -> Result<RowOutcome, BackendError> {
        self.row_action("admin/users/signup", idx, Some(approve), None)
            .await
    }

    /// Suspend or unsuspend one row.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self))]
    pub async fn set_suspension(
        &self,
        idx: UserIdx,
        suspend: bool,
    ) -> Result<RowOutcome, BackendError> {
        self.row_action("admin/users/block", idx, Some(suspend), None)
            .await
    }

    /// Permanently delete one row.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, idx: UserIdx) -> Result<RowOutcome, BackendError> {
        self.row_action("admin/users/delete", idx, None, None).await
    }

    /// Reset one row's password.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        idx: UserIdx,
        new_password: &str,
    ) -> Result<RowOutcome, BackendError> {
        self.row_action(
            "admin/users/password",
            idx,
            None,
            Some(new_password.to_owned()),
        )
        .await
    }

    async fn row_action(
        &self,
        path: &str,
        idx: UserIdx,
        way: Option<bool>,
        new_password: Option<String>,
    ) -> Result<RowOutcome, BackendError> {
        let request = RowActionRequest {
            idx,
            way,
            new_password,
        };
        let response: RowActionResponse =
            self.post_json(&self.auth_endpoint(path), &request).await?;

        if response.ok {
            response
                .outcome
                .ok_or_else(|| BackendError::Parse("action response missing outcome".to_owned()))
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    // ---- chat backend -------------------------------------------------------

    /// Health probe against the chat backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let response: Envelope = self.get_json(&self.chat_endpoint("base/ping")).await?;
        Self::expect_ok(response)
    }

    /// Fetch the list of available model names.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self))]
    pub async fn model_list(&self) -> Result<Vec<String>, BackendError> {
        let response: ModelListResponse = self
            .get_json(&self.chat_endpoint("base/model_list"))
            .await?;

        if response.ok {
            Ok(response.models)
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    /// Fetch the backend's default model name.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an error envelope.
    #[instrument(skip(self))]
    pub async fn default_model(&self) -> Result<String, BackendError> {
        let response: DefaultModelResponse = self
            .get_json(&self.chat_endpoint("base/default_model"))
            .await?;

        if response.ok {
            response
                .model
                .ok_or_else(|| BackendError::Parse("default model response missing model".to_owned()))
        } else {
            Err(BackendError::Api {
                message: response.msg,
            })
        }
    }

    /// Open a streaming chat completion.
    ///
    /// Returns a lazy, finite, non-restartable sequence of text fragments.
    /// An `Err` item ends the sequence; a `[DONE]` marker ends it cleanly.
    /// The backend consumes a role-to-content map of the latest exchange,
    /// so only the final user turn of the transcript is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be opened or the backend
    /// rejects it before streaming starts.
    #[instrument(skip(self, transcript), fields(model = %model))]
    pub async fn chat_stream(
        &self,
        transcript: &[ChatMessage],
        model: &str,
    ) -> Result<impl Stream<Item = Result<String, BackendError>> + use<>, BackendError> {
        let mut txt_dict = BTreeMap::new();
        if let Some(last_user) = transcript
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
        {
            txt_dict.insert(ChatRole::User.to_string(), last_user.content.clone());
        }

        let request = ChatStreamRequest {
            txt_dict,
            model_name: model.to_owned(),
        };

        let response = self
            .inner
            .stream_http
            .post(self.chat_endpoint("chat/web"))
            .json(&request)
            .send()
            .await?;

        // Reject before streaming starts
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_body(response).await);
        }

        Ok(stream! {
            use futures::StreamExt;

            let mut buffer = String::new();
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let text = match std::str::from_utf8(&chunk) {
                            Ok(t) => t,
                            Err(e) => {
                                yield Err(BackendError::Parse(format!("Invalid UTF-8: {e}")));
                                return;
                            }
                        };

                        buffer.push_str(text);

                        // Process complete SSE events
                        while let Some(event) = extract_sse_event(&mut buffer) {
                            match parse_sse_event(&event) {
                                Some(Ok(SseEvent::Fragment(fragment))) => yield Ok(fragment),
                                Some(Ok(SseEvent::Done)) => return,
                                Some(Err(e)) => {
                                    yield Err(e);
                                    return;
                                }
                                None => {}
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(BackendError::Stream(e.to_string()));
                        return;
                    }
                }
            }
        })
    }

    // ---- plumbing -----------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self.inner.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self.inner.http.post(url).json(body).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::error_from_body(response).await)
        }
    }

    async fn error_from_body(response: reqwest::Response) -> BackendError {
        match response.text().await {
            Ok(body) => {
                if let Ok(envelope) = serde_json::from_str::<Envelope>(&body) {
                    BackendError::Api {
                        message: envelope.msg,
                    }
                } else {
                    BackendError::Api { message: body }
                }
            }
            Err(e) => BackendError::Http(e),
        }
    }

    fn expect_ok(envelope: Envelope) -> Result<(), BackendError> {
        if envelope.ok {
            Ok(())
        } else {
            Err(BackendError::Api {
                message: envelope.msg,
            })
        }
    }
}

/// A parsed SSE event from the chat stream.
enum SseEvent {
    /// A text fragment of the reply.
    Fragment(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Extract a complete SSE event from the buffer.
///
/// Returns `Some(event)` if a complete event was found (and removes it from
/// the buffer), or `None` if no complete event is available yet.
fn extract_sse_event(buffer: &mut String) -> Option<String> {
    // SSE events are separated by double newlines
    buffer.find("\n\n").map(|idx| {
        let event = buffer.get(..idx).unwrap_or_default().to_owned();
        *buffer = buffer.get(idx + 2..).unwrap_or_default().to_owned();
        event
    })
}

/// Parse one SSE event into a fragment or terminator.
fn parse_sse_event(event: &str) -> Option<Result<SseEvent, BackendError>> {
    if event.trim().is_empty() {
        return None;
    }

    let mut data_line = None;
    for line in event.lines() {
        if let Some(stripped) = line.strip_prefix("data: ") {
            data_line = Some(stripped);
        }
    }

    let data = data_line?;

    if data == "[DONE]" {
        return Some(Ok(SseEvent::Done));
    }

    match serde_json::from_str::<StreamFragment>(data) {
        Ok(fragment) => Some(Ok(SseEvent::Fragment(fragment.text))),
        Err(e) => Some(Err(BackendError::Parse(format!(
            "Failed to parse stream event: {e}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sse_event() {
        let mut buffer =
            "data: {\"text\":\"Hel\"}\n\ndata: {\"text\":\"lo\"}\n\n".to_string();

        let event1 = extract_sse_event(&mut buffer);
        assert!(event1.is_some());
        assert!(event1.expect("no event").contains("Hel"));

        let event2 = extract_sse_event(&mut buffer);
        assert!(event2.is_some());

        let event3 = extract_sse_event(&mut buffer);
        assert!(event3.is_none());
    }

    #[test]
    fn test_extract_sse_event_incomplete() {
        let mut buffer = "data: {\"text\":\"partial".to_string();
        let event = extract_sse_event(&mut buffer);
        assert!(event.is_none());
        assert_eq!(buffer, "data: {\"text\":\"partial");
    }

    #[test]
    fn test_parse_sse_event_fragment() {
        let result = parse_sse_event("data: {\"text\":\"hi\"}");
        let event = result.expect("no result").expect("parse error");
        assert!(matches!(event, SseEvent::Fragment(ref t) if t == "hi"));
    }

    #[test]
    fn test_parse_sse_event_done() {
        let result = parse_sse_event("data: [DONE]");
        let event = result.expect("no result").expect("parse error");
        assert!(matches!(event, SseEvent::Done));
    }

    #[test]
    fn test_parse_sse_event_empty() {
        assert!(parse_sse_event("").is_none());
        assert!(parse_sse_event("   \n").is_none());
    }

    #[test]
    fn test_parse_sse_event_malformed_json() {
        let result = parse_sse_event("data: {not json");
        assert!(matches!(result, Some(Err(BackendError::Parse(_)))));
    }

    #[test]
    fn test_backend_client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<BackendClient>();
    }

    #[test]
    fn test_backend_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendClient>();
    }
}
